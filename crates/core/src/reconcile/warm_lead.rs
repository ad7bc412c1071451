//! Warm-lead promotion
//!
//! A contact whose warmness score crosses the configured floor is promoted
//! into the remote CRM: the remote person is resolved or created, tagged
//! with the "Warm Lead" label, and the returned person id is persisted
//! locally. The label is looked up or created once per account and cached.

use std::sync::Arc;

use my500_domain::{My500Error, PersonUpsert, Result, WarmLeadConfig};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::ports::{ContactRepository, CrmGateway};

/// Input to a promotion evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PromotionRequest {
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub warmness_score: i32,
}

/// Evaluates the warm-lead rule and promotes qualifying contacts.
pub struct WarmLeadPromoter {
    crm: Arc<dyn CrmGateway>,
    contacts: Arc<dyn ContactRepository>,
    config: WarmLeadConfig,
    /// Remote label id, resolved at most once per promoter instance
    label_id: Mutex<Option<i64>>,
}

impl WarmLeadPromoter {
    pub fn new(
        crm: Arc<dyn CrmGateway>,
        contacts: Arc<dyn ContactRepository>,
        config: WarmLeadConfig,
    ) -> Self {
        Self { crm, contacts, config, label_id: Mutex::new(None) }
    }

    /// Evaluate the threshold rule and promote when it qualifies.
    ///
    /// Returns whether the contact is (now or already) a warm lead;
    /// `false` is a valid, non-error outcome for scores below the floor.
    #[instrument(skip(self), fields(contact_id = %request.contact_id))]
    pub async fn promote(&self, request: PromotionRequest) -> Result<bool> {
        if request.warmness_score < self.config.score_floor {
            debug!(
                score = request.warmness_score,
                floor = self.config.score_floor,
                "contact below warm-lead floor"
            );
            return Ok(false);
        }

        let contact = self
            .contacts
            .find_by_id(request.contact_id)
            .await?
            .ok_or_else(|| My500Error::NotFound(format!("contact {}", request.contact_id)))?;

        if contact.user_id != request.user_id {
            return Err(My500Error::Validation(format!(
                "contact {} does not belong to user {}",
                request.contact_id, request.user_id
            )));
        }

        if contact.remote_person_id.is_some() {
            // Already promoted in an earlier pass
            return Ok(true);
        }

        let label_id = self.ensure_label().await?;

        let person = self
            .crm
            .create_or_update_person(&PersonUpsert {
                name: contact.name.clone(),
                email: contact.email.clone(),
                org_id: None,
                label_ids: vec![label_id],
            })
            .await?;

        self.contacts.set_remote_person_id(contact.id, person.id).await?;

        info!(remote_person_id = person.id, "promoted contact to warm lead");
        Ok(true)
    }

    /// Resolve the warm-lead label id, hitting the remote at most once.
    async fn ensure_label(&self) -> Result<i64> {
        let mut cached = self.label_id.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }

        let id = self.crm.find_or_create_label(&self.config.label_name).await?;
        *cached = Some(id);
        Ok(id)
    }
}
