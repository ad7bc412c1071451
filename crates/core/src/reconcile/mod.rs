//! Reconciliation engine
//!
//! Brings remote and local records back into agreement:
//!
//! - [`dedup`]: organization deduplication by normalized name
//! - [`warm_lead`]: threshold-based promotion into the remote CRM
//! - [`batch`]: multi-record updates with per-item result accounting

pub mod batch;
pub mod dedup;
pub mod warm_lead;
