//! Persistent username → verdict store for resumable arbitration runs.
//!
//! The store is rewritten after every completed batch, so killing the process
//! is a safe cancellation: the next run resumes from the last persisted batch
//! and re-spends no API budget. Entries are never invalidated during normal
//! operation; full-rerun mode deletes the backing file before starting.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use makerscout_common::LlmVerdict;

use crate::error::CuratorError;

pub type VerdictMap = HashMap<String, LlmVerdict>;

/// Abstract key-value store so the arbitration logic works unchanged against
/// a file, an embedded database, or a remote cache.
pub trait VerdictStore {
    /// Load every cached verdict. An empty store is not an error.
    fn load(&self) -> Result<VerdictMap, CuratorError>;

    /// Replace the persisted contents with `verdicts`.
    fn persist(&self, verdicts: &VerdictMap) -> Result<(), CuratorError>;
}

/// JSON file store. An absent file reads as an empty map; the parent
/// directory is created on first persist.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file (full-rerun mode). Missing file is fine.
    pub fn clear(&self) -> Result<(), CuratorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl VerdictStore for JsonFileStore {
    fn load(&self) -> Result<VerdictMap, CuratorError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(VerdictMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn persist(&self, verdicts: &VerdictMap) -> Result<(), CuratorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(verdicts)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<VerdictMap>,
}

impl MemoryStore {
    pub fn with(verdicts: VerdictMap) -> Self {
        Self {
            inner: Mutex::new(verdicts),
        }
    }

    pub fn snapshot(&self) -> VerdictMap {
        self.inner.lock().expect("verdict store lock").clone()
    }
}

impl VerdictStore for MemoryStore {
    fn load(&self) -> Result<VerdictMap, CuratorError> {
        Ok(self.snapshot())
    }

    fn persist(&self, verdicts: &VerdictMap) -> Result<(), CuratorError> {
        *self.inner.lock().expect("verdict store lock") = verdicts.clone();
        Ok(())
    }
}
