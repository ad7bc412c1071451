//! SQLite-backed sync audit log.
//!
//! Rows are append-only: created as `RUNNING`, finalized exactly once with
//! a terminal status, never touched again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use my500_core::SyncHistoryRepository;
use my500_domain::{My500Error, Result, SyncHistory, SyncRunStatus, SyncType};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{conversion_failure, map_join_error, opt_ts_from_row, ts_from_row, uuid_from_row};

const HISTORY_COLUMNS: &str = "id, user_id, sync_type, start_time, end_time, processed, created, \
     updated, failed, status, error";

pub struct SqliteSyncHistoryRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncHistoryRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    conversion_failure(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<SyncHistory> {
    let type_raw: String = row.get(2)?;
    let sync_type = SyncType::parse(&type_raw)
        .ok_or_else(|| invalid_column(2, format!("unknown sync type: {type_raw}")))?;

    let status_raw: String = row.get(9)?;
    let status = SyncRunStatus::parse(&status_raw)
        .ok_or_else(|| invalid_column(9, format!("unknown sync status: {status_raw}")))?;

    Ok(SyncHistory {
        id: uuid_from_row(row, 0)?,
        user_id: uuid_from_row(row, 1)?,
        sync_type,
        start_time: ts_from_row(row, 3)?,
        end_time: opt_ts_from_row(row, 4)?,
        processed: row.get(5)?,
        created: row.get(6)?,
        updated: row.get(7)?,
        failed: row.get(8)?,
        status,
        error: row.get(10)?,
    })
}

#[async_trait]
impl SyncHistoryRepository for SqliteSyncHistoryRepository {
    async fn create(&self, history: &SyncHistory) -> Result<()> {
        let db = Arc::clone(&self.db);
        let history = history.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_history (id, user_id, sync_type, start_time, end_time,
                     processed, created, updated, failed, status, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    history.id.to_string(),
                    history.user_id.to_string(),
                    history.sync_type.as_str(),
                    history.start_time.to_rfc3339(),
                    history.end_time.map(|ts| ts.to_rfc3339()),
                    history.processed,
                    history.created,
                    history.updated,
                    history.failed,
                    history.status.as_str(),
                    history.error,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        id: Uuid,
        status: SyncRunStatus,
        end_time: DateTime<Utc>,
        processed: i64,
        created: i64,
        updated: i64,
        failed: i64,
        error: Option<String>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            // Only a RUNNING row can be finalized; a second finalize is a no-op
            // guarded into an error so double finishes surface in tests.
            let changed = conn
                .execute(
                    "UPDATE sync_history
                     SET status = ?1, end_time = ?2, processed = ?3, created = ?4,
                         updated = ?5, failed = ?6, error = ?7
                     WHERE id = ?8 AND status = 'RUNNING'",
                    params![
                        status.as_str(),
                        end_time.to_rfc3339(),
                        processed,
                        created,
                        updated,
                        failed,
                        error,
                        id.to_string(),
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::Validation(format!(
                    "sync history {id} is not running or does not exist"
                )));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<SyncHistory>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<SyncHistory>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {HISTORY_COLUMNS} FROM sync_history
                     WHERE user_id = ?1 ORDER BY start_time DESC LIMIT 1"
                ))
                .map_err(map_sql_error)?;
            stmt.query_row(params![user_id.to_string()], history_from_row).map(Some).or_else(
                |err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                },
            )
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<i64> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT COUNT(*) FROM sync_history WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
