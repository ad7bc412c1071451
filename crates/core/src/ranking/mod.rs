//! Priority ranking engine ("My-500" ordering)
//!
//! A pure function over local contact records: no I/O, deterministic, and
//! stable. The comparator keys, in precedence order:
//!
//! 1. `added_to_campaign` - true before false (existing customers first)
//! 2. `warmness_score` - ascending (needier scores surface first)
//! 3. `last_contacted` - ascending, nulls first (never-contacted outranks
//!    any dated contact)
//! 4. `created_at` - descending (newest records break remaining ties)
//!
//! Contacts equal on all four keys retain their relative input order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use my500_domain::{ActivityStatus, Contact, PriorityLabel, RankingThresholds};

/// Ranking and classification over contact records.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    thresholds: RankingThresholds,
}

impl RankingEngine {
    pub fn new(thresholds: RankingThresholds) -> Self {
        Self { thresholds }
    }

    /// Produce the My-500 ordering for a contact set.
    pub fn rank(&self, mut contacts: Vec<Contact>) -> Vec<Contact> {
        // sort_by is stable, which the tie-break contract relies on
        contacts.sort_by(compare);
        contacts
    }

    /// Engagement band for a contact's warmness score.
    pub fn activity_status(&self, contact: &Contact) -> ActivityStatus {
        let t = &self.thresholds;
        let score = contact.warmness_score;
        if score < t.cold_min {
            ActivityStatus::Lost
        } else if score < t.warm_min {
            ActivityStatus::Cold
        } else if score < t.hot_min {
            ActivityStatus::Warm
        } else {
            ActivityStatus::Hot
        }
    }

    /// Working-set priority label.
    pub fn priority(&self, contact: &Contact) -> PriorityLabel {
        if contact.added_to_campaign {
            PriorityLabel::High
        } else if contact.warmness_score >= self.thresholds.attention_floor {
            PriorityLabel::Medium
        } else {
            PriorityLabel::Low
        }
    }

    /// Whole days elapsed since the last contact, `None` if never
    /// contacted.
    pub fn days_since_last_contact(
        &self,
        contact: &Contact,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        contact.last_contacted.map(|last| (now - last).num_days())
    }

    /// Presentation-layer flag; never a sort key.
    pub fn needs_attention(&self, contact: &Contact, now: DateTime<Utc>) -> bool {
        match self.days_since_last_contact(contact, now) {
            None => true,
            Some(days) => {
                days > self.thresholds.stale_after_days
                    && contact.warmness_score < self.thresholds.attention_floor
            }
        }
    }
}

fn compare(a: &Contact, b: &Contact) -> Ordering {
    // true-first on campaign membership
    b.added_to_campaign
        .cmp(&a.added_to_campaign)
        .then_with(|| a.warmness_score.cmp(&b.warmness_score))
        .then_with(|| compare_last_contacted(a.last_contacted, b.last_contacted))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn compare_last_contacted(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}
