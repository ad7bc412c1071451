//! Port interfaces for persistence and the external CRM
//!
//! Infrastructure adapters implement these traits; the engines only ever
//! see the traits, so test doubles can substitute without process-wide
//! state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use my500_domain::{
    Activity, ActivityCreate, Contact, CustomField, Organization, OrgSearchOutcome, Page,
    PageRequest, PersonUpsert, RemoteOrganization, RemotePerson, Result, SyncHistory,
    SyncRunStatus, User,
};
use uuid::Uuid;

/// Persistence for contact records.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>>;

    /// All active contacts for a user.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Contact>>;

    async fn find_by_remote_person_id(
        &self,
        user_id: Uuid,
        remote_person_id: i64,
    ) -> Result<Option<Contact>>;

    async fn create(&self, contact: &Contact) -> Result<()>;

    async fn update(&self, contact: &Contact) -> Result<()>;

    /// Attach a contact to its deduplicated organization.
    async fn set_organization(&self, contact_id: Uuid, organization_id: Uuid) -> Result<()>;

    /// Back-fill the remote person id after promotion or sync.
    async fn set_remote_person_id(&self, contact_id: Uuid, remote_person_id: i64) -> Result<()>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64>;

    /// Contacts holding a remote person link.
    async fn count_synced(&self, user_id: Uuid) -> Result<i64>;

    async fn count_by_organization(&self, organization_id: Uuid) -> Result<i64>;
}

/// Persistence for deduplicated organizations.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>>;

    /// Lookup by the normalized dedup key within one user's data set.
    async fn find_by_normalized_name(
        &self,
        user_id: Uuid,
        normalized_name: &str,
    ) -> Result<Option<Organization>>;

    async fn create(&self, organization: &Organization) -> Result<()>;

    /// Persist recomputed aggregate stats.
    async fn set_contact_count(&self, id: Uuid, contact_count: i64) -> Result<()>;
}

/// Persistence for activity records.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: &Activity) -> Result<()>;

    async fn find_by_contact(&self, contact_id: Uuid) -> Result<Vec<Activity>>;

    /// Back-fill the remote activity id once synced; the rest of the row
    /// is immutable.
    async fn set_remote_activity_id(&self, id: Uuid, remote_activity_id: i64) -> Result<()>;
}

/// Persistence for the append-only sync audit log.
#[async_trait]
pub trait SyncHistoryRepository: Send + Sync {
    async fn create(&self, history: &SyncHistory) -> Result<()>;

    /// Finalize a running row exactly once with its terminal status.
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
    ) -> Result<()>;

    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<SyncHistory>>;

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64>;
}

/// Persistence for users and their sync state machine.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Atomically move the user into `SYNCING` unless already there.
    ///
    /// Returns `false` when a pass is already in flight; the persisted
    /// state is the mutual-exclusion mechanism, so it survives restarts.
    async fn try_mark_syncing(&self, id: Uuid) -> Result<bool>;

    async fn set_sync_state(&self, id: Uuid, state: my500_domain::UserSyncState) -> Result<()>;

    async fn set_last_sync_timestamp(&self, id: Uuid, timestamp: DateTime<Utc>) -> Result<()>;

    /// Persist a (re-)encrypted credential envelope.
    async fn set_encrypted_api_token(&self, id: Uuid, envelope: &str) -> Result<()>;
}

/// Typed gateway to the external CRM service.
///
/// Implementations own rate limiting, retries, pagination envelopes and
/// conflict mapping; callers see typed results and the error taxonomy
/// only. Expected remote failures come back as typed errors, never
/// panics.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Fetch a page of persons, optionally restricted to records modified
    /// since the given instant (incremental sync).
    async fn get_persons(
        &self,
        page: PageRequest,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Page<RemotePerson>>;

    async fn get_organizations(&self, page: PageRequest) -> Result<Page<RemoteOrganization>>;

    /// Upsert a person by natural key; idempotent, so safe to retry.
    async fn create_or_update_person(&self, person: &PersonUpsert) -> Result<RemotePerson>;

    async fn update_person(&self, id: i64, data: &serde_json::Value) -> Result<()>;

    async fn update_organization(&self, id: i64, data: &serde_json::Value) -> Result<()>;

    async fn update_deal(&self, id: i64, data: &serde_json::Value) -> Result<()>;

    async fn create_activity(&self, activity: &ActivityCreate) -> Result<i64>;

    async fn update_activity(&self, id: i64, data: &serde_json::Value) -> Result<()>;

    /// Search organizations by name, subject to the per-user budget and
    /// the bounded result cache.
    async fn search_organizations(&self, query: &str) -> Result<OrgSearchOutcome>;

    async fn get_person_custom_fields(&self) -> Result<Vec<CustomField>>;

    async fn get_organization_custom_fields(&self) -> Result<Vec<CustomField>>;

    /// Find a person label by name, creating it remotely when absent.
    async fn find_or_create_label(&self, name: &str) -> Result<i64>;

    /// Validate the credential against the remote service.
    async fn test_connection(&self) -> Result<bool>;
}
