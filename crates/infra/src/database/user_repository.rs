//! SQLite-backed user repository and sync-state machine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use my500_core::UserRepository;
use my500_domain::{Result, User, UserSyncState};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{conversion_failure, map_join_error, opt_ts_from_row, ts_from_row, uuid_from_row};

const USER_COLUMNS: &str =
    "id, email, encrypted_api_token, last_sync_timestamp, sync_state, created_at, updated_at";

pub struct SqliteUserRepository {
    db: Arc<DbManager>,
}

impl SqliteUserRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert a new user row. Not part of the port; used by wiring and
    /// account provisioning.
    pub async fn create(&self, user: &User) -> Result<()> {
        let db = Arc::clone(&self.db);
        let user = user.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO users (id, email, encrypted_api_token, last_sync_timestamp, sync_state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.encrypted_api_token,
                    user.last_sync_timestamp.map(|ts| ts.to_rfc3339()),
                    user.sync_state.as_str(),
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let state_raw: String = row.get(4)?;
    let sync_state = UserSyncState::parse(&state_raw).ok_or_else(|| {
        conversion_failure(
            4,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown sync state: {state_raw}"),
            ),
        )
    })?;

    Ok(User {
        id: uuid_from_row(row, 0)?,
        email: row.get(1)?,
        encrypted_api_token: row.get(2)?,
        last_sync_timestamp: opt_ts_from_row(row, 3)?,
        sync_state,
        created_at: ts_from_row(row, 5)?,
        updated_at: ts_from_row(row, 6)?,
    })
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<User>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .map_err(map_sql_error)?;
            let user = stmt
                .query_row(params![id.to_string()], user_from_row)
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;
            Ok(user)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn try_mark_syncing(&self, id: Uuid) -> Result<bool> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            // Single conditional UPDATE keeps the state transition atomic;
            // two concurrent callers cannot both see a non-SYNCING row.
            let changed = conn
                .execute(
                    "UPDATE users SET sync_state = 'SYNCING', updated_at = ?1
                     WHERE id = ?2 AND sync_state != 'SYNCING'",
                    params![Utc::now().to_rfc3339(), id.to_string()],
                )
                .map_err(map_sql_error)?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_sync_state(&self, id: Uuid, state: UserSyncState) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE users SET sync_state = ?1, updated_at = ?2 WHERE id = ?3",
                params![state.as_str(), Utc::now().to_rfc3339(), id.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_last_sync_timestamp(&self, id: Uuid, timestamp: DateTime<Utc>) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE users SET last_sync_timestamp = ?1, updated_at = ?2 WHERE id = ?3",
                params![timestamp.to_rfc3339(), Utc::now().to_rfc3339(), id.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_encrypted_api_token(&self, id: Uuid, envelope: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let envelope = envelope.to_string();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE users SET encrypted_api_token = ?1, updated_at = ?2 WHERE id = ?3",
                params![envelope, Utc::now().to_rfc3339(), id.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{seed_user, test_db};
    use super::*;

    #[tokio::test]
    async fn find_round_trips_the_user_row() {
        let (_dir, db) = test_db();
        let repo = SqliteUserRepository::new(Arc::clone(&db));
        let user = seed_user(&db).await;

        let found = repo.find_by_id(user.id).await.unwrap().expect("user exists");
        assert_eq!(found.email, user.email);
        assert_eq!(found.sync_state, UserSyncState::Idle);
        assert!(found.last_sync_timestamp.is_none());
    }

    #[tokio::test]
    async fn try_mark_syncing_is_exclusive() {
        let (_dir, db) = test_db();
        let repo = SqliteUserRepository::new(Arc::clone(&db));
        let user = seed_user(&db).await;

        assert!(repo.try_mark_syncing(user.id).await.unwrap());
        // Second caller is rejected while the first pass runs
        assert!(!repo.try_mark_syncing(user.id).await.unwrap());

        repo.set_sync_state(user.id, UserSyncState::Synced).await.unwrap();
        assert!(repo.try_mark_syncing(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn try_mark_syncing_unknown_user_is_false() {
        let (_dir, db) = test_db();
        let repo = SqliteUserRepository::new(db);
        assert!(!repo.try_mark_syncing(Uuid::now_v7()).await.unwrap());
    }

    #[tokio::test]
    async fn token_and_timestamp_updates_persist() {
        let (_dir, db) = test_db();
        let repo = SqliteUserRepository::new(Arc::clone(&db));
        let user = seed_user(&db).await;

        let ts = Utc::now();
        repo.set_encrypted_api_token(user.id, "envelope-data").await.unwrap();
        repo.set_last_sync_timestamp(user.id, ts).await.unwrap();

        let found = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.encrypted_api_token.as_deref(), Some("envelope-data"));
        assert_eq!(found.last_sync_timestamp.map(|t| t.timestamp()), Some(ts.timestamp()));
    }
}
