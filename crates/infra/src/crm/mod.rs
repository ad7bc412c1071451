//! External CRM adapter
//!
//! [`client`] implements the `CrmGateway` port against the remote HTTP
//! API; [`types`] holds the raw wire envelopes, [`search`] the shared
//! organization-search cache and per-user budget, and [`sanitize`] the
//! outbound payload scrubber.

pub mod client;
pub mod sanitize;
pub mod search;
pub mod types;

pub use client::CrmClient;
pub use search::OrgSearchCache;
