//! Contact, organization and activity records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local contact record mirrored against the remote CRM.
///
/// Contacts are never hard-deleted while a remote link exists; they are
/// soft-deactivated via `is_active` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Signed engagement score; negative values are the "lost" band
    pub warmness_score: i32,
    pub last_contacted: Option<DateTime<Utc>>,
    /// True for existing customers / priority leads
    pub added_to_campaign: bool,
    pub is_active: bool,
    /// Remote person id once the contact exists in the external CRM
    pub remote_person_id: Option<i64>,
    pub organization_id: Option<Uuid>,
    /// Raw organization string as entered or received from the remote side
    pub raw_organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical local entity for a deduplicated company name.
///
/// Exactly one organization exists per distinct `normalized_name` within a
/// user's data set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Display name as first seen
    pub name: String,
    /// Case/whitespace/punctuation-folded grouping key
    pub normalized_name: String,
    pub remote_org_id: Option<i64>,
    /// Aggregate recomputed after each reconciliation pass
    pub contact_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Timestamped interaction record linked to a contact.
///
/// Immutable once synced; only the remote-id link is back-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub remote_activity_id: Option<i64>,
    pub activity_type: String,
    pub subject: String,
    pub note: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Engagement band derived from the warmness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Lost,
    Cold,
    Warm,
    Hot,
}

/// Working-set priority label derived from campaign membership and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLabel {
    High,
    Medium,
    Low,
}
