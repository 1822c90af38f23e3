//! Errors produced ahead of dispatch: admission refusals and bad setup.
//!
//! Once a change is admitted, per-call failures travel as
//! [`SyncOutcome`](crate::executor::SyncOutcome) values instead; an error
//! here means the change never reached the remote at all.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Streamed payloads are not supported (path: {path})")]
    StreamedPayload { path: String },

    #[error("Cannot derive asset key for {path}: {reason}")]
    KeyMapping { path: String, reason: String },

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
