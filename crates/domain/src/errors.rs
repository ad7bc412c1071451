//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for My500
///
/// Retry rules live with the callers: `Transport` and `RateLimit` are
/// retried by the CRM client only, `Conflict` is surfaced to the
/// reconciliation engine for policy handling, `Credential` halts the
/// current sync pass, and `Validation`/`NotFound` go straight to the
/// caller without retries.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum My500Error {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl My500Error {
    /// Whether the CRM client may retry the failed call.
    ///
    /// Only transport faults and explicit throttling signals qualify;
    /// everything else either needs caller policy (`Conflict`) or would
    /// fail identically on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimit(_))
    }
}

/// Result type alias for My500 operations
pub type Result<T> = std::result::Result<T, My500Error>;
