//! Remote CRM resource representations
//!
//! Typed views of the remote person/organization/activity resources as the
//! engine consumes them. Raw wire envelopes live in the infra layer; these
//! are the shapes crossing the gateway port.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Remote person record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePerson {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub org_id: Option<i64>,
    pub org_name: Option<String>,
    pub label_ids: Vec<i64>,
    pub update_time: Option<DateTime<Utc>>,
}

/// Remote organization record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrganization {
    pub id: i64,
    pub name: String,
    pub update_time: Option<DateTime<Utc>>,
}

/// Payload for upserting a person remotely (idempotent by natural key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonUpsert {
    pub name: String,
    pub email: Option<String>,
    pub org_id: Option<i64>,
    pub label_ids: Vec<i64>,
}

/// Payload for creating a remote activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityCreate {
    pub person_id: i64,
    pub activity_type: String,
    pub subject: String,
    pub note: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Custom field descriptor from the remote schema introspection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub field_type: String,
}

/// Pagination window for list operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub start: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self { start: 0, limit }
    }

    /// Window for the page following this one.
    pub fn next(self) -> Self {
        Self { start: self.start + self.limit, limit: self.limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { start: 0, limit: 100 }
    }
}

/// One page of a list operation, with the remote "more available" flag so
/// callers can loop deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub more_items_in_collection: bool,
}

/// Result of an organization search, distinguishing cache hits, fresh
/// fetches and per-user budget throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrgSearchOutcome {
    /// Search was served; `from_cache` distinguishes hits from fetches
    Found { organizations: Vec<RemoteOrganization>, from_cache: bool },
    /// The per-user request budget is exhausted; no remote call was made
    Throttled,
}
