//! SQLite-backed organization repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use my500_core::OrganizationRepository;
use my500_domain::{My500Error, Organization, Result};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{map_join_error, ts_from_row, uuid_from_row};

const ORG_COLUMNS: &str =
    "id, user_id, name, normalized_name, remote_org_id, contact_count, created_at, updated_at";

pub struct SqliteOrganizationRepository {
    db: Arc<DbManager>,
}

impl SqliteOrganizationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: uuid_from_row(row, 0)?,
        user_id: uuid_from_row(row, 1)?,
        name: row.get(2)?,
        normalized_name: row.get(3)?,
        remote_org_id: row.get(4)?,
        contact_count: row.get(5)?,
        created_at: ts_from_row(row, 6)?,
        updated_at: ts_from_row(row, 7)?,
    })
}

#[async_trait]
impl OrganizationRepository for SqliteOrganizationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<Organization>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1"))
                .map_err(map_sql_error)?;
            stmt.query_row(params![id.to_string()], organization_from_row).map(Some).or_else(
                |err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                },
            )
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_normalized_name(
        &self,
        user_id: Uuid,
        normalized_name: &str,
    ) -> Result<Option<Organization>> {
        let db = Arc::clone(&self.db);
        let normalized_name = normalized_name.to_string();
        task::spawn_blocking(move || -> Result<Option<Organization>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ORG_COLUMNS} FROM organizations
                     WHERE user_id = ?1 AND normalized_name = ?2"
                ))
                .map_err(map_sql_error)?;
            stmt.query_row(params![user_id.to_string(), normalized_name], organization_from_row)
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create(&self, organization: &Organization) -> Result<()> {
        let db = Arc::clone(&self.db);
        let organization = organization.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO organizations (id, user_id, name, normalized_name, remote_org_id,
                     contact_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    organization.id.to_string(),
                    organization.user_id.to_string(),
                    organization.name,
                    organization.normalized_name,
                    organization.remote_org_id,
                    organization.contact_count,
                    organization.created_at.to_rfc3339(),
                    organization.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_contact_count(&self, id: Uuid, contact_count: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE organizations SET contact_count = ?1, updated_at = ?2 WHERE id = ?3",
                    params![contact_count, Utc::now().to_rfc3339(), id.to_string()],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::NotFound(format!("organization {id} not found")));
            }
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

    fn organization(user_id: Uuid, name: &str, normalized: &str) -> Organization {
        let now = Utc::now();
        Organization {
            id: Uuid::now_v7(),
            user_id,
            name: name.into(),
            normalized_name: normalized.into(),
            remote_org_id: None,
            contact_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn normalized_lookup_is_scoped_per_user() {
        let (_dir, db) = test_db();
        let alice = seed_user(&db).await;
        let bob = seed_user(&db).await;
        let repo = SqliteOrganizationRepository::new(db);

        repo.create(&organization(alice.id, "Acme Corp", "acme corp")).await.unwrap();

        assert!(repo.find_by_normalized_name(alice.id, "acme corp").await.unwrap().is_some());
        assert!(repo.find_by_normalized_name(bob.id, "acme corp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_normalized_name_for_one_user_is_rejected() {
        let (_dir, db) = test_db();
        let user = seed_user(&db).await;
        let repo = SqliteOrganizationRepository::new(db);

        repo.create(&organization(user.id, "Acme Corp", "acme corp")).await.unwrap();
        let err =
            repo.create(&organization(user.id, "ACME corp", "acme corp")).await.unwrap_err();
        assert!(matches!(err, My500Error::Database(_)));
    }

    #[tokio::test]
    async fn contact_count_updates_persist() {
        let (_dir, db) = test_db();
        let user = seed_user(&db).await;
        let repo = SqliteOrganizationRepository::new(db);

        let org = organization(user.id, "Acme Corp", "acme corp");
        repo.create(&org).await.unwrap();
        repo.set_contact_count(org.id, 7).await.unwrap();

        let found = repo.find_by_id(org.id).await.unwrap().unwrap();
        assert_eq!(found.contact_count, 7);
    }
}
