//! SQLite-backed contact repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use my500_core::ContactRepository;
use my500_domain::{Contact, My500Error, Result};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{map_join_error, opt_ts_from_row, opt_uuid_from_row, ts_from_row, uuid_from_row};

const CONTACT_COLUMNS: &str = "id, user_id, name, email, warmness_score, last_contacted, \
     added_to_campaign, is_active, remote_person_id, organization_id, raw_organization, \
     created_at, updated_at";

pub struct SqliteContactRepository {
    db: Arc<DbManager>,
}

impl SqliteContactRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: uuid_from_row(row, 0)?,
        user_id: uuid_from_row(row, 1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        warmness_score: row.get(4)?,
        last_contacted: opt_ts_from_row(row, 5)?,
        added_to_campaign: row.get(6)?,
        is_active: row.get(7)?,
        remote_person_id: row.get(8)?,
        organization_id: opt_uuid_from_row(row, 9)?,
        raw_organization: row.get(10)?,
        created_at: ts_from_row(row, 11)?,
        updated_at: ts_from_row(row, 12)?,
    })
}

fn count_query<P: rusqlite::Params>(db: &DbManager, sql: &str, params: P) -> Result<i64> {
    let conn = db.get_connection()?;
    conn.query_row(sql, params, |row| row.get(0)).map_err(map_sql_error)
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<Contact>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"))
                .map_err(map_sql_error)?;
            stmt.query_row(params![id.to_string()], contact_from_row).map(Some).or_else(|err| {
                match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                }
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Contact>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Vec<Contact>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE user_id = ?1 AND is_active = 1
                     ORDER BY created_at"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![user_id.to_string()], contact_from_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_remote_person_id(
        &self,
        user_id: Uuid,
        remote_person_id: i64,
    ) -> Result<Option<Contact>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<Contact>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE user_id = ?1 AND remote_person_id = ?2"
                ))
                .map_err(map_sql_error)?;
            stmt.query_row(params![user_id.to_string(), remote_person_id], contact_from_row)
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create(&self, contact: &Contact) -> Result<()> {
        let db = Arc::clone(&self.db);
        let contact = contact.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO contacts (id, user_id, name, email, warmness_score, last_contacted,
                     added_to_campaign, is_active, remote_person_id, organization_id,
                     raw_organization, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    contact.id.to_string(),
                    contact.user_id.to_string(),
                    contact.name,
                    contact.email,
                    contact.warmness_score,
                    contact.last_contacted.map(|ts| ts.to_rfc3339()),
                    contact.added_to_campaign,
                    contact.is_active,
                    contact.remote_person_id,
                    contact.organization_id.map(|id| id.to_string()),
                    contact.raw_organization,
                    contact.created_at.to_rfc3339(),
                    contact.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, contact: &Contact) -> Result<()> {
        let db = Arc::clone(&self.db);
        let contact = contact.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE contacts SET name = ?1, email = ?2, warmness_score = ?3,
                         last_contacted = ?4, added_to_campaign = ?5, is_active = ?6,
                         raw_organization = ?7, updated_at = ?8
                     WHERE id = ?9",
                    params![
                        contact.name,
                        contact.email,
                        contact.warmness_score,
                        contact.last_contacted.map(|ts| ts.to_rfc3339()),
                        contact.added_to_campaign,
                        contact.is_active,
                        contact.raw_organization,
                        Utc::now().to_rfc3339(),
                        contact.id.to_string(),
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::NotFound(format!("contact {} not found", contact.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_organization(&self, contact_id: Uuid, organization_id: Uuid) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE contacts SET organization_id = ?1, updated_at = ?2 WHERE id = ?3",
                    params![
                        organization_id.to_string(),
                        Utc::now().to_rfc3339(),
                        contact_id.to_string()
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::NotFound(format!("contact {contact_id} not found")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_remote_person_id(&self, contact_id: Uuid, remote_person_id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE contacts SET remote_person_id = ?1, updated_at = ?2 WHERE id = ?3",
                    params![remote_person_id, Utc::now().to_rfc3339(), contact_id.to_string()],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::NotFound(format!("contact {contact_id} not found")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<i64> {
            count_query(
                &db,
                "SELECT COUNT(*) FROM contacts WHERE user_id = ?1 AND is_active = 1",
                params![user_id.to_string()],
            )
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_synced(&self, user_id: Uuid) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<i64> {
            count_query(
                &db,
                "SELECT COUNT(*) FROM contacts
                 WHERE user_id = ?1 AND is_active = 1 AND remote_person_id IS NOT NULL",
                params![user_id.to_string()],
            )
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_by_organization(&self, organization_id: Uuid) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<i64> {
            count_query(
                &db,
                "SELECT COUNT(*) FROM contacts WHERE organization_id = ?1 AND is_active = 1",
                params![organization_id.to_string()],
            )
        })
        .await
        .map_err(map_join_error)?
    }
}
