//! Organization deduplication by normalized name
//!
//! Raw organization strings arrive in every spelling users and remote
//! systems can produce. Normalization folds case, whitespace and
//! punctuation into a stable key; one local Organization exists per key
//! per user.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use my500_domain::{Organization, Result};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ports::{ContactRepository, OrganizationRepository};

/// Fold an organization name into its deduplication key: lowercase,
/// trimmed, with runs of whitespace and punctuation collapsed to single
/// spaces.
pub fn normalize_org_name(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_gap = false;

    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_gap && !key.is_empty() {
                key.push(' ');
            }
            pending_gap = false;
            key.extend(c.to_lowercase());
        } else {
            pending_gap = true;
        }
    }

    key
}

/// One contact's organization link candidate.
#[derive(Debug, Clone)]
pub struct DedupInput {
    pub contact_id: Uuid,
    /// Raw organization string as seen on the contact
    pub raw_name: String,
    /// Remote organization id, when the remote side supplied one
    pub remote_org_id: Option<i64>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub organizations_created: usize,
    pub organizations_reused: usize,
    pub contacts_attached: usize,
}

/// Deduplicates organizations and attaches contacts to them.
pub struct OrganizationDeduper {
    organizations: Arc<dyn OrganizationRepository>,
    contacts: Arc<dyn ContactRepository>,
}

impl OrganizationDeduper {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        contacts: Arc<dyn ContactRepository>,
    ) -> Self {
        Self { organizations, contacts }
    }

    /// Reconcile a batch of contacts for one user.
    ///
    /// Groups by normalized key; reuses the existing Organization for a
    /// key or creates one from the first-seen raw name; attaches every
    /// contact in the group; then recomputes contact counts for all
    /// affected organizations.
    #[instrument(skip(self, inputs), fields(batch = inputs.len()))]
    pub async fn reconcile(&self, user_id: Uuid, inputs: &[DedupInput]) -> Result<DedupReport> {
        let mut groups: HashMap<String, Vec<&DedupInput>> = HashMap::new();
        for input in inputs {
            let key = normalize_org_name(&input.raw_name);
            if key.is_empty() {
                continue;
            }
            groups.entry(key).or_default().push(input);
        }

        let mut report = DedupReport::default();
        let mut affected: Vec<Uuid> = Vec::with_capacity(groups.len());

        for (key, group) in groups {
            let organization =
                match self.organizations.find_by_normalized_name(user_id, &key).await? {
                    Some(existing) => {
                        report.organizations_reused += 1;
                        existing
                    }
                    None => {
                        let now = Utc::now();
                        // First-seen raw name becomes the display name
                        let organization = Organization {
                            id: Uuid::now_v7(),
                            user_id,
                            name: group[0].raw_name.trim().to_string(),
                            normalized_name: key.clone(),
                            remote_org_id: group.iter().find_map(|g| g.remote_org_id),
                            contact_count: 0,
                            created_at: now,
                            updated_at: now,
                        };
                        self.organizations.create(&organization).await?;
                        report.organizations_created += 1;
                        debug!(normalized = %key, "created organization");
                        organization
                    }
                };

            for input in &group {
                self.contacts.set_organization(input.contact_id, organization.id).await?;
                report.contacts_attached += 1;
            }

            affected.push(organization.id);
        }

        // Recompute aggregates once per affected organization
        for organization_id in affected {
            let count = self.contacts.count_by_organization(organization_id).await?;
            self.organizations.set_contact_count(organization_id, count).await?;
        }

        Ok(report)
    }
}
