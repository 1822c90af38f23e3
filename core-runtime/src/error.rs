//! Runtime-level failures: configuration and wiring, not sync outcomes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration; the message names the setter to use.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required bridge implementation was not provided.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
