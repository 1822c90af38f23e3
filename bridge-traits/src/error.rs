//! Shared error vocabulary for bridge adapters.

use thiserror::Error;

/// Failures at the transport boundary.
///
/// Kept coarse on purpose: upstream classification only distinguishes
/// "timed out" from "failed some other way", and anything finer rides in
/// the message.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
