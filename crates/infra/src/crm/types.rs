//! Raw wire representations of the remote CRM API.
//!
//! Every response is wrapped in a `{success, data, error, additional_data}`
//! envelope; list endpoints carry a pagination block inside
//! `additional_data`. The structs here stay private to the adapter; the
//! gateway port exposes the typed domain shapes only.

use chrono::{DateTime, NaiveDateTime, Utc};
use my500_domain::{CustomField, RemoteOrganization, RemotePerson};
use serde::Deserialize;

/// Generic response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub additional_data: Option<AdditionalData>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the remote reports more items beyond this page.
    pub fn has_more(&self) -> bool {
        self.additional_data
            .as_ref()
            .and_then(|extra| extra.pagination.as_ref())
            .map(|page| page.more_items_in_collection)
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdditionalData {
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Deserialize)]
pub struct WirePagination {
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub limit: u32,
    pub more_items_in_collection: bool,
    #[serde(default)]
    pub next_start: Option<u32>,
}

/// Person record as the remote API ships it.
#[derive(Debug, Deserialize)]
pub struct WirePerson {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Vec<WireEmail>,
    #[serde(default)]
    pub org_id: Option<WireOrgRef>,
    #[serde(default)]
    pub label_ids: Vec<i64>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl WirePerson {
    pub fn into_remote(self) -> RemotePerson {
        let email = primary_email(&self.email);
        let (org_id, org_name) = match self.org_id {
            Some(org) => (Some(org.value), org.name),
            None => (None, None),
        };

        RemotePerson {
            id: self.id,
            name: self.name,
            email,
            org_id,
            org_name,
            label_ids: self.label_ids,
            update_time: self.update_time.as_deref().and_then(parse_remote_time),
        }
    }
}

/// Email entry; the remote sends a list with at most one `primary`.
#[derive(Debug, Deserialize)]
pub struct WireEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

/// Embedded organization reference on a person record.
#[derive(Debug, Deserialize)]
pub struct WireOrgRef {
    pub value: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireOrganization {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl WireOrganization {
    pub fn into_remote(self) -> RemoteOrganization {
        RemoteOrganization {
            id: self.id,
            name: self.name,
            update_time: self.update_time.as_deref().and_then(parse_remote_time),
        }
    }
}

/// Search responses nest each hit under an `item` key.
#[derive(Debug, Deserialize)]
pub struct WireSearchData {
    #[serde(default)]
    pub items: Vec<WireSearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct WireSearchItem {
    pub item: WireOrganization,
}

/// Custom field descriptor from the schema introspection endpoints.
#[derive(Debug, Deserialize)]
pub struct WireField {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub field_type: String,
}

impl WireField {
    pub fn into_custom_field(self) -> CustomField {
        CustomField { id: self.id, key: self.key, name: self.name, field_type: self.field_type }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireLabel {
    pub id: i64,
    pub name: String,
}

/// Minimal shape for create responses where only the new id matters.
#[derive(Debug, Deserialize)]
pub struct WireId {
    pub id: i64,
}

fn primary_email(emails: &[WireEmail]) -> Option<String> {
    emails
        .iter()
        .find(|email| email.primary)
        .or_else(|| emails.first())
        .map(|email| email.value.clone())
}

/// Parse the remote timestamp format (`YYYY-MM-DD HH:MM:SS`, UTC), falling
/// back to RFC 3339 for newer endpoints.
pub fn parse_remote_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}
