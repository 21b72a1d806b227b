//! Error types for PoET consensus

use thiserror::Error;

/// Core PoET errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoetError {
    /// Caller violated a precondition (insufficient history, bad parameter,
    /// malformed certificate)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The enclave could not create, reconstruct or verify a timer
    #[error("Enclave unavailable: {0}")]
    EnclaveUnavailable(String),
}

impl PoetError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PoetError::InvalidArgument(msg.into())
    }

    pub fn enclave_unavailable(msg: impl Into<String>) -> Self {
        PoetError::EnclaveUnavailable(msg.into())
    }
}

/// Result type for PoET operations
pub type PoetResult<T> = Result<T, PoetError>;
