//! SQLite persistence for contacts, organizations, activities, users and
//! the sync audit log.
//!
//! Every repository implements its `my500-core` port by running the
//! blocking rusqlite work on the tokio blocking pool against the shared
//! [`DbManager`] connection pool. Identifiers are stored as UUID text,
//! timestamps as RFC 3339 text.

mod activity_repository;
mod contact_repository;
mod manager;
mod organization_repository;
mod sync_history_repository;
mod user_repository;

pub use activity_repository::SqliteActivityRepository;
pub use contact_repository::SqliteContactRepository;
pub use manager::DbManager;
pub use organization_repository::SqliteOrganizationRepository;
pub use sync_history_repository::SqliteSyncHistoryRepository;
pub use user_repository::SqliteUserRepository;

use chrono::{DateTime, NaiveDate, Utc};
use my500_domain::My500Error;
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

pub(crate) fn map_join_error(err: tokio::task::JoinError) -> My500Error {
    My500Error::Internal(format!("database task join failure: {err}"))
}

pub(crate) fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|err| conversion_failure(idx, err))
}

pub(crate) fn opt_uuid_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| Uuid::parse_str(&value).map_err(|err| conversion_failure(idx, err)))
        .transpose()
}

pub(crate) fn ts_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| conversion_failure(idx, err))
}

pub(crate) fn opt_ts_from_row(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| conversion_failure(idx, err))
    })
    .transpose()
}

pub(crate) fn opt_date_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|err| conversion_failure(idx, err))
    })
    .transpose()
}
