//! Common error types shared by the primitive modules

use thiserror::Error;

/// Errors produced by the shared primitives.
///
/// Module-specific errors in downstream crates compose with this type at
/// their boundary rather than duplicating the variants.
#[derive(Debug, Error)]
pub enum CommonError {
    /// Encryption or decryption failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Stored value is neither a valid envelope nor legacy-shaped
    #[error("Unrecognized credential format: {0}")]
    Format(String),

    /// Caller passed malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization failed: {err}"))
    }
}

/// Result type alias for the shared primitives.
pub type CommonResult<T> = std::result::Result<T, CommonError>;
