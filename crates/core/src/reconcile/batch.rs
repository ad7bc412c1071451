//! Batched multi-record updates with per-item accounting
//!
//! Items fan out concurrently to the matching gateway operation and fan
//! back in without short-circuiting; one failing record never aborts the
//! batch. Each item goes `pending -> success | failed` in a single hop
//! with no internal retries (transport-level retries belong to the
//! client). Conflicts follow the skip-and-report policy: recorded as a
//! failed item, batch continues.

use std::sync::Arc;

use futures::future::join_all;
use my500_domain::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::ports::CrmGateway;

/// Remote record kind an update item targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Person,
    Organization,
    Deal,
    Activity,
}

/// One record update in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdateItem {
    pub record_type: RecordType,
    pub record_id: i64,
    pub data: serde_json::Value,
}

/// Terminal status of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Success,
    Failed,
}

/// Per-item outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub record_type: RecordType,
    pub record_id: i64,
    pub status: ItemStatus,
    pub error: Option<String>,
}

/// Batch summary; `success` is true only when nothing failed. The mapping
/// of partial success onto HTTP status codes lives with HTTP-facing
/// callers, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub success: bool,
}

/// Summary plus the per-item result list, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdateReport {
    pub summary: BatchSummary,
    pub items: Vec<BatchItemResult>,
}

/// Dispatches batch updates against the CRM gateway.
pub struct BatchUpdateEngine {
    crm: Arc<dyn CrmGateway>,
}

impl BatchUpdateEngine {
    pub fn new(crm: Arc<dyn CrmGateway>) -> Self {
        Self { crm }
    }

    /// Apply every item, collecting results without aborting on failure.
    #[instrument(skip(self, items), fields(total = items.len()))]
    pub async fn run(&self, items: Vec<BatchUpdateItem>) -> BatchUpdateReport {
        let futures = items.into_iter().map(|item| async move {
            let outcome = self.dispatch(&item).await;
            match outcome {
                Ok(()) => BatchItemResult {
                    record_type: item.record_type,
                    record_id: item.record_id,
                    status: ItemStatus::Success,
                    error: None,
                },
                Err(err) => {
                    warn!(
                        record_id = item.record_id,
                        error = %err,
                        "batch item failed"
                    );
                    BatchItemResult {
                        record_type: item.record_type,
                        record_id: item.record_id,
                        status: ItemStatus::Failed,
                        error: Some(err.to_string()),
                    }
                }
            }
        });

        let items = join_all(futures).await;

        let total = items.len();
        let failed_items: Vec<&BatchItemResult> =
            items.iter().filter(|i| i.status == ItemStatus::Failed).collect();
        let failed = failed_items.len();
        let errors = failed_items.iter().filter_map(|i| i.error.clone()).collect();

        let summary = BatchSummary {
            total,
            successful: total - failed,
            failed,
            errors,
            success: failed == 0,
        };

        debug!(total, failed, "batch update finished");
        BatchUpdateReport { summary, items }
    }

    async fn dispatch(&self, item: &BatchUpdateItem) -> Result<()> {
        match item.record_type {
            RecordType::Person => self.crm.update_person(item.record_id, &item.data).await,
            RecordType::Organization => {
                self.crm.update_organization(item.record_id, &item.data).await
            }
            RecordType::Deal => self.crm.update_deal(item.record_id, &item.data).await,
            RecordType::Activity => self.crm.update_activity(item.record_id, &item.data).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use my500_domain::My500Error;
    use serde_json::json;

    use super::*;
    use crate::test_support::FakeCrm;

    fn item(record_type: RecordType, record_id: i64) -> BatchUpdateItem {
        BatchUpdateItem { record_type, record_id, data: json!({"name": "updated"}) }
    }

    #[tokio::test]
    async fn all_successful_batch_reports_success() {
        let crm = Arc::new(FakeCrm::default());
        let engine = BatchUpdateEngine::new(crm);

        let report = engine
            .run(vec![item(RecordType::Person, 1), item(RecordType::Deal, 2)])
            .await;

        assert!(report.summary.success);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 0);
        assert!(report.summary.errors.is_empty());
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_batch() {
        let crm = Arc::new(FakeCrm::default());
        crm.fail_update(2, My500Error::Transport("boom".into()));
        let engine = BatchUpdateEngine::new(crm);

        let report = engine
            .run(vec![
                item(RecordType::Person, 1),
                item(RecordType::Person, 2),
                item(RecordType::Organization, 3),
            ])
            .await;

        assert!(!report.summary.success);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.errors.len(), 1);

        // Items 1 and 3 went through; the failed item carries its message
        assert_eq!(report.items[0].status, ItemStatus::Success);
        assert_eq!(report.items[1].status, ItemStatus::Failed);
        assert!(report.items[1].error.as_deref().unwrap_or_default().contains("boom"));
        assert_eq!(report.items[2].status, ItemStatus::Success);
    }

    #[tokio::test]
    async fn conflict_is_recorded_and_the_batch_continues() {
        let crm = Arc::new(FakeCrm::default());
        crm.fail_update(7, My500Error::Conflict("remote version is newer".into()));
        let engine = BatchUpdateEngine::new(crm);

        let report = engine
            .run(vec![item(RecordType::Deal, 7), item(RecordType::Deal, 8)])
            .await;

        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.items[0].status, ItemStatus::Failed);
        assert_eq!(report.items[1].status, ItemStatus::Success);
    }

    #[tokio::test]
    async fn empty_batch_is_trivially_successful() {
        let engine = BatchUpdateEngine::new(Arc::new(FakeCrm::default()));
        let report = engine.run(vec![]).await;

        assert!(report.summary.success);
        assert_eq!(report.summary.total, 0);
        assert!(report.items.is_empty());
    }
}
