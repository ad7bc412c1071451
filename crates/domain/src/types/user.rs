//! User record and per-user sync state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user sync state machine: `Idle -> Syncing -> (Synced | Failed)`.
///
/// Persisted on the user row so mutual exclusion survives process
/// restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserSyncState {
    Idle,
    Syncing,
    Synced,
    Failed,
}

impl UserSyncState {
    /// Stable string form used in the database column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Syncing => "SYNCING",
            Self::Synced => "SYNCED",
            Self::Failed => "FAILED",
        }
    }

    /// Parse the database column form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IDLE" => Some(Self::Idle),
            "SYNCING" => Some(Self::Syncing),
            "SYNCED" => Some(Self::Synced),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// User owning a contact set and an external CRM credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Encrypted credential envelope, or legacy 40-hex plaintext awaiting
    /// lazy migration
    pub encrypted_api_token: Option<String>,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub sync_state: UserSyncState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
