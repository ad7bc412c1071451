//! Sync pass audit records and derived status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sync strategy for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Fetch the entire remote contact set
    Full,
    /// Fetch only records modified since the last successful pass
    Incremental,
}

impl SyncType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(Self::Full),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }
}

/// Terminal status of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncRunStatus {
    Running,
    Success,
    Failed,
}

impl SyncRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RUNNING" => Some(Self::Running),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Append-only audit record for one sync pass.
///
/// Created at pass start, finalized exactly once at pass end, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sync_type: SyncType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub processed: i64,
    pub created: i64,
    pub updated: i64,
    pub failed: i64,
    pub status: SyncRunStatus,
    pub error: Option<String>,
}

impl SyncHistory {
    /// Fresh `RUNNING` row for a pass starting now.
    pub fn started(user_id: Uuid, sync_type: SyncType, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            sync_type,
            start_time,
            end_time: None,
            processed: 0,
            created: 0,
            updated: 0,
            failed: 0,
            status: SyncRunStatus::Running,
            error: None,
        }
    }
}

/// Derived sync status reported to the UI layer; not persisted as its own
/// table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub total_contacts: i64,
    pub synced_contacts: i64,
    pub pending_sync: i64,
    pub sync_in_progress: bool,
}
