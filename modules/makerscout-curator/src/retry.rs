//! Retry with exponential back-off for LLM batch calls.
//!
//! [`RetryPolicy::run`] wraps any fallible async operation. Transport errors
//! and malformed responses are retried, since the remediation for both is the same
//! (re-ask). Everything else is returned immediately: re-querying cannot fix
//! a corrupt store, and a missing credential fails the run before any batch
//! work starts.

use std::future::Future;
use std::time::Duration;

use deepseek_client::ClientError;
use tracing::warn;

use crate::error::CuratorError;

/// Returns `true` for errors worth retrying after a back-off delay.
pub(crate) fn is_retriable(err: &CuratorError) -> bool {
    match err {
        CuratorError::Llm(client_err) => matches!(
            client_err,
            ClientError::Http(_)
                | ClientError::Api { .. }
                | ClientError::EmptyCompletion
                | ClientError::MalformedResponse { .. }
        ),
        CuratorError::StoreIo(_) | CuratorError::StoreFormat(_) => false,
    }
}

/// Bounded retry policy, shared verbatim by the arbitrator and the tagger.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// Back-off doubles per attempt: with a 5 s base the sleeps are
    /// 5 s, 10 s, 20 s, …
    pub async fn run<T, F, Fut>(&self, stage: &str, mut operation: F) -> Result<T, CuratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CuratorError>>,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_retriable(&err) => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        stage,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "batch call failed, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
