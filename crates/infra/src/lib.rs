//! Infrastructure adapters: the external CRM client, SQLite persistence,
//! credential storage and configuration loading.
//!
//! Everything here implements a port from `my500-core` or loads wiring for
//! the engines; no sync or ranking policy lives in this crate.

pub mod config;
pub mod credentials;
pub mod crm;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;

pub use config::load as load_config;
pub use credentials::CredentialStore;
pub use crm::CrmClient;
pub use database::{
    DbManager, SqliteActivityRepository, SqliteContactRepository, SqliteOrganizationRepository,
    SqliteSyncHistoryRepository, SqliteUserRepository,
};
pub use errors::InfraError;
pub use http::HttpClient;
