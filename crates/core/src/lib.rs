//! # My500 Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (persistence repositories, CRM gateway)
//! - The priority ranking engine ("My-500" ordering)
//! - The reconciliation engine (org dedup, warm-lead promotion, batch
//!   updates)
//! - The sync orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `my500-domain`
//! - No database, HTTP, or crypto code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod ports;
pub mod ranking;
pub mod reconcile;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use ports::{
    ActivityRepository, ContactRepository, CrmGateway, OrganizationRepository,
    SyncHistoryRepository, UserRepository,
};
pub use ranking::RankingEngine;
pub use reconcile::batch::{
    BatchItemResult, BatchSummary, BatchUpdateEngine, BatchUpdateItem, BatchUpdateReport,
    ItemStatus, RecordType,
};
pub use reconcile::dedup::{normalize_org_name, DedupInput, DedupReport, OrganizationDeduper};
pub use reconcile::warm_lead::{PromotionRequest, WarmLeadPromoter};
pub use sync::{SyncOrchestrator, SyncOrchestratorConfig, SyncReport};
