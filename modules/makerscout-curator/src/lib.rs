//! Two-stage curation of scraped vendor profiles.
//!
//! A deterministic rules engine disposes of the unambiguous cases cheaply, a
//! batched LLM pass judges the rest (cached per username so runs are
//! resumable), a validation gate enforces the non-negotiable business
//! requirements, and a tagging pass files approved vendors into the
//! directory taxonomy.

pub mod arbitrator;
pub mod cache;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod retry;
pub mod rules;
pub mod signals;
pub mod tagger;

pub use error::CuratorError;
