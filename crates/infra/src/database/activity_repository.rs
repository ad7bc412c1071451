//! SQLite-backed activity repository.
//!
//! Activity rows are immutable once written; only the remote-id link is
//! back-filled after a successful remote create.

use std::sync::Arc;

use async_trait::async_trait;
use my500_core::ActivityRepository;
use my500_domain::{Activity, My500Error, Result};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{map_join_error, opt_date_from_row, ts_from_row, uuid_from_row};

const ACTIVITY_COLUMNS: &str =
    "id, contact_id, remote_activity_id, activity_type, subject, note, due_date, created_at";

pub struct SqliteActivityRepository {
    db: Arc<DbManager>,
}

impl SqliteActivityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: uuid_from_row(row, 0)?,
        contact_id: uuid_from_row(row, 1)?,
        remote_activity_id: row.get(2)?,
        activity_type: row.get(3)?,
        subject: row.get(4)?,
        note: row.get(5)?,
        due_date: opt_date_from_row(row, 6)?,
        created_at: ts_from_row(row, 7)?,
    })
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn create(&self, activity: &Activity) -> Result<()> {
        let db = Arc::clone(&self.db);
        let activity = activity.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO activities (id, contact_id, remote_activity_id, activity_type,
                     subject, note, due_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    activity.id.to_string(),
                    activity.contact_id.to_string(),
                    activity.remote_activity_id,
                    activity.activity_type,
                    activity.subject,
                    activity.note,
                    activity.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    activity.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_contact(&self, contact_id: Uuid) -> Result<Vec<Activity>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Vec<Activity>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM activities
                     WHERE contact_id = ?1 ORDER BY created_at"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![contact_id.to_string()], activity_from_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_remote_activity_id(&self, id: Uuid, remote_activity_id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE activities SET remote_activity_id = ?1 WHERE id = ?2",
                    params![remote_activity_id, id.to_string()],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(My500Error::NotFound(format!("activity {id} not found")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use my500_core::ContactRepository;
    use my500_domain::Contact;

    use super::super::test_util::{seed_user, test_db};
    use super::super::SqliteContactRepository;
    use super::*;

    async fn seed_contact(db: &Arc<DbManager>, user_id: Uuid) -> Contact {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::now_v7(),
            user_id,
            name: "Ada".into(),
            email: None,
            warmness_score: 0,
            last_contacted: None,
            added_to_campaign: false,
            is_active: true,
            remote_person_id: None,
            organization_id: None,
            raw_organization: None,
            created_at: now,
            updated_at: now,
        };
        SqliteContactRepository::new(Arc::clone(db)).create(&contact).await.unwrap();
        contact
    }

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let (_dir, db) = test_db();
        let user = seed_user(&db).await;
        let contact = seed_contact(&db, user.id).await;
        let repo = SqliteActivityRepository::new(db);

        let activity = Activity {
            id: Uuid::now_v7(),
            contact_id: contact.id,
            remote_activity_id: None,
            activity_type: "call".into(),
            subject: "Intro call".into(),
            note: Some("left voicemail".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            created_at: Utc::now(),
        };
        repo.create(&activity).await.unwrap();

        let listed = repo.find_by_contact(contact.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subject, "Intro call");
        assert_eq!(listed[0].due_date, NaiveDate::from_ymd_opt(2026, 9, 1));
    }

    #[tokio::test]
    async fn remote_id_backfill_persists() {
        let (_dir, db) = test_db();
        let user = seed_user(&db).await;
        let contact = seed_contact(&db, user.id).await;
        let repo = SqliteActivityRepository::new(db);

        let activity = Activity {
            id: Uuid::now_v7(),
            contact_id: contact.id,
            remote_activity_id: None,
            activity_type: "email".into(),
            subject: "Follow up".into(),
            note: None,
            due_date: None,
            created_at: Utc::now(),
        };
        repo.create(&activity).await.unwrap();
        repo.set_remote_activity_id(activity.id, 321).await.unwrap();

        let listed = repo.find_by_contact(contact.id).await.unwrap();
        assert_eq!(listed[0].remote_activity_id, Some(321));
    }

    #[tokio::test]
    async fn backfill_of_missing_activity_is_not_found() {
        let (_dir, db) = test_db();
        let repo = SqliteActivityRepository::new(db);
        let err = repo.set_remote_activity_id(Uuid::now_v7(), 1).await.unwrap_err();
        assert!(matches!(err, My500Error::NotFound(_)));
    }
}
