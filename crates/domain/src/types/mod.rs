//! Domain types and models

pub mod contact;
pub mod crm;
pub mod sync;
pub mod user;

pub use contact::{Activity, ActivityStatus, Contact, Organization, PriorityLabel};
pub use crm::{
    ActivityCreate, CustomField, OrgSearchOutcome, Page, PageRequest, PersonUpsert,
    RemoteOrganization, RemotePerson,
};
pub use sync::{SyncHistory, SyncRunStatus, SyncStatus, SyncType};
pub use user::{User, UserSyncState};
