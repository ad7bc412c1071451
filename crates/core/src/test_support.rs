//! In-memory test doubles for the port interfaces

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use my500_domain::{
    ActivityCreate, Contact, CustomField, My500Error, Organization, OrgSearchOutcome, Page,
    PageRequest, PersonUpsert, RemoteOrganization, RemotePerson, Result, SyncHistory,
    SyncRunStatus, User, UserSyncState,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::ports::{
    ContactRepository, CrmGateway, OrganizationRepository, SyncHistoryRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryContacts {
    pub rows: Mutex<Vec<Contact>>,
}

#[async_trait]
impl ContactRepository for InMemoryContacts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>> {
        Ok(self.rows.lock().iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Contact>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|c| c.user_id == user_id && c.is_active)
            .cloned()
            .collect())
    }

    async fn find_by_remote_person_id(
        &self,
        user_id: Uuid,
        remote_person_id: i64,
    ) -> Result<Option<Contact>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|c| c.user_id == user_id && c.remote_person_id == Some(remote_person_id))
            .cloned())
    }

    async fn create(&self, contact: &Contact) -> Result<()> {
        self.rows.lock().push(contact.clone());
        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|c| c.id == contact.id)
            .ok_or_else(|| My500Error::NotFound(format!("contact {}", contact.id)))?;
        *row = contact.clone();
        Ok(())
    }

    async fn set_organization(&self, contact_id: Uuid, organization_id: Uuid) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|c| c.id == contact_id)
            .ok_or_else(|| My500Error::NotFound(format!("contact {contact_id}")))?;
        row.organization_id = Some(organization_id);
        Ok(())
    }

    async fn set_remote_person_id(&self, contact_id: Uuid, remote_person_id: i64) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|c| c.id == contact_id)
            .ok_or_else(|| My500Error::NotFound(format!("contact {contact_id}")))?;
        row.remote_person_id = Some(remote_person_id);
        Ok(())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.rows.lock().iter().filter(|c| c.user_id == user_id).count() as i64)
    }

    async fn count_synced(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|c| c.user_id == user_id && c.remote_person_id.is_some())
            .count() as i64)
    }

    async fn count_by_organization(&self, organization_id: Uuid) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|c| c.organization_id == Some(organization_id))
            .count() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryOrganizations {
    pub rows: Mutex<Vec<Organization>>,
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizations {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.rows.lock().iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_normalized_name(
        &self,
        user_id: Uuid,
        normalized_name: &str,
    ) -> Result<Option<Organization>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|o| o.user_id == user_id && o.normalized_name == normalized_name)
            .cloned())
    }

    async fn create(&self, organization: &Organization) -> Result<()> {
        self.rows.lock().push(organization.clone());
        Ok(())
    }

    async fn set_contact_count(&self, id: Uuid, contact_count: i64) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("organization {id}")))?;
        row.contact_count = contact_count;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryHistory {
    pub rows: Mutex<Vec<SyncHistory>>,
    /// Error returned by the next `create` call, consumed on use
    pub fail_next_create: Mutex<Option<My500Error>>,
}

#[async_trait]
impl SyncHistoryRepository for InMemoryHistory {
    async fn create(&self, history: &SyncHistory) -> Result<()> {
        if let Some(err) = self.fail_next_create.lock().take() {
            return Err(err);
        }
        self.rows.lock().push(history.clone());
        Ok(())
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
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("sync history {id}")))?;
        row.status = status;
        row.end_time = Some(end_time);
        row.processed = processed;
        row.created = created;
        row.updated = updated;
        row.failed = failed;
        row.error = error;
        Ok(())
    }

    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<SyncHistory>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|h| h.user_id == user_id)
            .max_by_key(|h| h.start_time)
            .cloned())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.rows.lock().iter().filter(|h| h.user_id == user_id).count() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    pub rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn with_user(user: User) -> Self {
        Self { rows: Mutex::new(vec![user]) }
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.rows.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn try_mark_syncing(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("user {id}")))?;
        if row.sync_state == UserSyncState::Syncing {
            return Ok(false);
        }
        row.sync_state = UserSyncState::Syncing;
        Ok(true)
    }

    async fn set_sync_state(&self, id: Uuid, state: UserSyncState) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("user {id}")))?;
        row.sync_state = state;
        Ok(())
    }

    async fn set_last_sync_timestamp(&self, id: Uuid, timestamp: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("user {id}")))?;
        row.last_sync_timestamp = Some(timestamp);
        Ok(())
    }

    async fn set_encrypted_api_token(&self, id: Uuid, envelope: &str) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| My500Error::NotFound(format!("user {id}")))?;
        row.encrypted_api_token = Some(envelope.to_string());
        Ok(())
    }
}

/// Configurable CRM gateway double.
#[derive(Default)]
pub struct FakeCrm {
    /// Remote persons, served through `get_persons` with paging and
    /// `modified_since` filtering
    pub persons: Mutex<Vec<RemotePerson>>,
    /// Remote ids whose updates fail with the given error
    pub failing_updates: Mutex<HashMap<i64, My500Error>>,
    /// Error returned by every `get_persons` call while set
    pub fail_get_persons: Mutex<Option<My500Error>>,
    /// Artificial latency applied to `get_persons`
    pub get_persons_delay: Mutex<Option<std::time::Duration>>,
    pub label_calls: AtomicI64,
    next_person_id: AtomicI64,
}

impl FakeCrm {
    pub fn with_persons(persons: Vec<RemotePerson>) -> Self {
        Self { persons: Mutex::new(persons), next_person_id: AtomicI64::new(9000), ..Self::default() }
    }

    pub fn fail_update(&self, record_id: i64, error: My500Error) {
        self.failing_updates.lock().insert(record_id, error);
    }

    fn check_update(&self, id: i64) -> Result<()> {
        match self.failing_updates.lock().get(&id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CrmGateway for FakeCrm {
    async fn get_persons(
        &self,
        page: PageRequest,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Page<RemotePerson>> {
        let delay = *self.get_persons_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.fail_get_persons.lock().clone() {
            return Err(err);
        }

        let filtered: Vec<RemotePerson> = self
            .persons
            .lock()
            .iter()
            .filter(|p| match (modified_since, p.update_time) {
                (Some(since), Some(updated)) => updated > since,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();

        let start = page.start as usize;
        let end = (start + page.limit as usize).min(filtered.len());
        let items = if start < filtered.len() { filtered[start..end].to_vec() } else { vec![] };

        Ok(Page { items, more_items_in_collection: end < filtered.len() })
    }

    async fn get_organizations(&self, _page: PageRequest) -> Result<Page<RemoteOrganization>> {
        Ok(Page { items: vec![], more_items_in_collection: false })
    }

    async fn create_or_update_person(&self, person: &PersonUpsert) -> Result<RemotePerson> {
        let id = self.next_person_id.fetch_add(1, Ordering::SeqCst);
        Ok(RemotePerson {
            id,
            name: person.name.clone(),
            email: person.email.clone(),
            org_id: person.org_id,
            org_name: None,
            label_ids: person.label_ids.clone(),
            update_time: Some(Utc::now()),
        })
    }

    async fn update_person(&self, id: i64, _data: &serde_json::Value) -> Result<()> {
        self.check_update(id)
    }

    async fn update_organization(&self, id: i64, _data: &serde_json::Value) -> Result<()> {
        self.check_update(id)
    }

    async fn update_deal(&self, id: i64, _data: &serde_json::Value) -> Result<()> {
        self.check_update(id)
    }

    async fn create_activity(&self, _activity: &ActivityCreate) -> Result<i64> {
        Ok(1)
    }

    async fn update_activity(&self, id: i64, _data: &serde_json::Value) -> Result<()> {
        self.check_update(id)
    }

    async fn search_organizations(&self, _query: &str) -> Result<OrgSearchOutcome> {
        Ok(OrgSearchOutcome::Found { organizations: vec![], from_cache: false })
    }

    async fn get_person_custom_fields(&self) -> Result<Vec<CustomField>> {
        Ok(vec![])
    }

    async fn get_organization_custom_fields(&self) -> Result<Vec<CustomField>> {
        Ok(vec![])
    }

    async fn find_or_create_label(&self, _name: &str) -> Result<i64> {
        self.label_calls.fetch_add(1, Ordering::SeqCst);
        Ok(77)
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Build a contact row for tests.
pub fn contact_fixture(user_id: Uuid, name: &str) -> Contact {
    let now = Utc::now();
    Contact {
        id: Uuid::now_v7(),
        user_id,
        name: name.to_string(),
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
    }
}

/// Build a user row for tests.
pub fn user_fixture() -> User {
    let now = Utc::now();
    User {
        id: Uuid::now_v7(),
        email: "lead@example.com".to_string(),
        encrypted_api_token: None,
        last_sync_timestamp: None,
        sync_state: UserSyncState::Idle,
        created_at: now,
        updated_at: now,
    }
}

/// Build a remote person for tests.
pub fn remote_person_fixture(id: i64, name: &str, org: Option<&str>) -> RemotePerson {
    RemotePerson {
        id,
        name: name.to_string(),
        email: None,
        org_id: None,
        org_name: org.map(str::to_string),
        label_ids: vec![],
        update_time: Some(Utc::now()),
    }
}
