//! Sync orchestrator
//!
//! Runs full or incremental sync passes per user, composing the CRM
//! gateway, the reconciliation engine and persistence. Each pass is
//! audited in an append-only `SyncHistory` row; per-user mutual exclusion
//! is enforced through the persisted `SYNCING` state so it survives
//! process restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use my500_domain::{
    Contact, My500Error, PageRequest, RemotePerson, Result, SyncHistory, SyncRunStatus,
    SyncStatus, SyncType, User, UserSyncState,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::ports::{
    ContactRepository, CrmGateway, OrganizationRepository, SyncHistoryRepository, UserRepository,
};
use crate::reconcile::dedup::{DedupInput, OrganizationDeduper};

/// Tunables for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncOrchestratorConfig {
    /// Page size requested from the remote list endpoint
    pub page_limit: u32,
    /// Wall-clock budget for one pass; overruns fail with a retryable
    /// error
    pub pass_timeout: Duration,
}

impl Default for SyncOrchestratorConfig {
    fn default() -> Self {
        Self { page_limit: 100, pass_timeout: Duration::from_secs(600) }
    }
}

/// Counts reported from a finished pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub sync_type: SyncType,
    pub processed: i64,
    pub created: i64,
    pub updated: i64,
    pub failed: i64,
}

/// Composes gateway, reconciliation and persistence into sync passes.
pub struct SyncOrchestrator {
    crm: Arc<dyn CrmGateway>,
    contacts: Arc<dyn ContactRepository>,
    history: Arc<dyn SyncHistoryRepository>,
    users: Arc<dyn UserRepository>,
    deduper: OrganizationDeduper,
    config: SyncOrchestratorConfig,
}

impl SyncOrchestrator {
    pub fn new(
        crm: Arc<dyn CrmGateway>,
        contacts: Arc<dyn ContactRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        history: Arc<dyn SyncHistoryRepository>,
        users: Arc<dyn UserRepository>,
        config: SyncOrchestratorConfig,
    ) -> Self {
        let deduper = OrganizationDeduper::new(organizations, Arc::clone(&contacts));
        Self { crm, contacts, history, users, deduper, config }
    }

    /// Run one sync pass for a user.
    ///
    /// Rejects (rather than queues) a request while a pass is already in
    /// flight; no second history row is created in that case.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn run_sync(&self, user_id: Uuid) -> Result<SyncReport> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| My500Error::NotFound(format!("user {user_id}")))?;

        if !self.users.try_mark_syncing(user_id).await? {
            warn!("sync already in progress; rejecting request");
            return Err(My500Error::Validation("a sync is already in progress".to_string()));
        }

        // A prior successful sync enables the incremental strategy
        let sync_type = if user.last_sync_timestamp.is_some() {
            SyncType::Incremental
        } else {
            SyncType::Full
        };

        let started_at = Utc::now();
        let history = SyncHistory::started(user_id, sync_type, started_at);
        if let Err(err) = self.history.create(&history).await {
            self.release_as_failed(user_id).await;
            return Err(err);
        }

        info!(sync_type = sync_type.as_str(), "sync pass started");

        let pass = self.sync_pass(&user, sync_type);
        let outcome = match tokio::time::timeout(self.config.pass_timeout, pass).await {
            Ok(result) => result,
            // Retryable: the pass can safely be re-run
            Err(_) => Err(My500Error::Transport(format!(
                "sync pass exceeded {:?} budget",
                self.config.pass_timeout
            ))),
        };

        match outcome {
            Ok(report) => {
                if let Err(err) = self.record_success(user_id, history.id, &report, started_at).await
                {
                    error!(error = %err, "sync pass succeeded but bookkeeping failed");
                    self.release_as_failed(user_id).await;
                    return Err(err);
                }

                info!(
                    processed = report.processed,
                    created = report.created,
                    updated = report.updated,
                    failed = report.failed,
                    "sync pass completed"
                );
                Ok(report)
            }
            Err(err) => {
                // Partial progress is kept; the pass is designed to be
                // safely re-run.
                error!(error = %err, "sync pass failed");
                if let Err(finalize_err) = self
                    .history
                    .finalize(
                        history.id,
                        SyncRunStatus::Failed,
                        Utc::now(),
                        0,
                        0,
                        0,
                        0,
                        Some(err.to_string()),
                    )
                    .await
                {
                    warn!(error = %finalize_err, "failed to finalize the audit row");
                }
                self.release_as_failed(user_id).await;
                Err(err)
            }
        }
    }

    async fn record_success(
        &self,
        user_id: Uuid,
        history_id: Uuid,
        report: &SyncReport,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<()> {
        self.history
            .finalize(
                history_id,
                SyncRunStatus::Success,
                Utc::now(),
                report.processed,
                report.created,
                report.updated,
                report.failed,
                None,
            )
            .await?;
        self.users.set_last_sync_timestamp(user_id, started_at).await?;
        self.users.set_sync_state(user_id, UserSyncState::Synced).await
    }

    /// Best-effort exit from `Syncing`.
    ///
    /// The exclusive state is persisted and survives restarts, so leaving
    /// it set after a dead pass would reject every later request for the
    /// user.
    async fn release_as_failed(&self, user_id: Uuid) {
        if let Err(err) = self.users.set_sync_state(user_id, UserSyncState::Failed).await {
            error!(error = %err, "failed to clear the in-progress sync state");
        }
    }

    /// Current sync status for the UI layer.
    pub async fn sync_status(&self, user_id: Uuid) -> Result<SyncStatus> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| My500Error::NotFound(format!("user {user_id}")))?;

        let total_contacts = self.contacts.count_by_user(user_id).await?;
        let synced_contacts = self.contacts.count_synced(user_id).await?;
        let latest = self.history.latest_for_user(user_id).await?;

        let sync_in_progress = user.sync_state == UserSyncState::Syncing
            || latest.as_ref().is_some_and(|h| h.status == SyncRunStatus::Running);

        Ok(SyncStatus {
            last_sync: user.last_sync_timestamp,
            total_contacts,
            synced_contacts,
            pending_sync: total_contacts - synced_contacts,
            sync_in_progress,
        })
    }

    /// Fetch remote persons page by page, upsert local contacts and run
    /// organization dedup over the touched set.
    async fn sync_pass(&self, user: &User, sync_type: SyncType) -> Result<SyncReport> {
        let modified_since = match sync_type {
            SyncType::Incremental => user.last_sync_timestamp,
            SyncType::Full => None,
        };

        let mut report =
            SyncReport { sync_type, processed: 0, created: 0, updated: 0, failed: 0 };
        let mut dedup_inputs: Vec<DedupInput> = Vec::new();
        let mut page = PageRequest::first(self.config.page_limit);

        loop {
            let batch = self.crm.get_persons(page, modified_since).await.map_err(|err| {
                // Credential failures would also fail every later call
                if matches!(err, My500Error::Credential(_)) {
                    error!("credential rejected mid-pass; halting");
                }
                err
            })?;

            for person in &batch.items {
                report.processed += 1;
                match self.upsert_contact(user.id, person).await {
                    Ok((contact_id, was_created)) => {
                        if was_created {
                            report.created += 1;
                        } else {
                            report.updated += 1;
                        }
                        if let Some(org_name) = &person.org_name {
                            dedup_inputs.push(DedupInput {
                                contact_id,
                                raw_name: org_name.clone(),
                                remote_org_id: person.org_id,
                            });
                        }
                    }
                    Err(err) => {
                        // Keep going; the record is retried on the next pass
                        warn!(remote_person_id = person.id, error = %err, "failed to upsert contact");
                        report.failed += 1;
                    }
                }
            }

            if !batch.more_items_in_collection {
                break;
            }
            page = page.next();
        }

        let dedup = self.deduper.reconcile(user.id, &dedup_inputs).await?;
        debug!(
            created = dedup.organizations_created,
            reused = dedup.organizations_reused,
            attached = dedup.contacts_attached,
            "organization dedup finished"
        );

        Ok(report)
    }

    /// Returns the local contact id and whether it was newly created.
    async fn upsert_contact(
        &self,
        user_id: Uuid,
        person: &RemotePerson,
    ) -> Result<(Uuid, bool)> {
        match self.contacts.find_by_remote_person_id(user_id, person.id).await? {
            Some(mut existing) => {
                existing.name = person.name.clone();
                existing.email = person.email.clone();
                existing.raw_organization = person.org_name.clone();
                existing.updated_at = Utc::now();
                self.contacts.update(&existing).await?;
                Ok((existing.id, false))
            }
            None => {
                let now = Utc::now();
                let contact = Contact {
                    id: Uuid::now_v7(),
                    user_id,
                    name: person.name.clone(),
                    email: person.email.clone(),
                    warmness_score: 0,
                    last_contacted: None,
                    added_to_campaign: false,
                    is_active: true,
                    remote_person_id: Some(person.id),
                    organization_id: None,
                    raw_organization: person.org_name.clone(),
                    created_at: now,
                    updated_at: now,
                };
                self.contacts.create(&contact).await?;
                Ok((contact.id, true))
            }
        }
    }
}
