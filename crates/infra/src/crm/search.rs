//! Shared organization-search cache with a per-user request budget.
//!
//! Search is the most expensive remote call the reconciliation engine
//! makes, so results are cached for five minutes (bounded to 100 entries,
//! oldest evicted first) and each user gets a budget of ten uncached
//! searches per minute. Both structures are shared across every client
//! built for the process, keyed by user id plus the normalized query.

use std::time::Duration;

use my500_common::cache::TtlCache;
use my500_common::resilience::{RateLimiterRegistry, TokenBucketConfig};
use my500_domain::RemoteOrganization;
use uuid::Uuid;

const SEARCH_TTL: Duration = Duration::from_secs(300);
const SEARCH_CAPACITY: usize = 100;
const BUDGET_PER_MINUTE: u64 = 10;

/// Process-wide search cache and budget, injected into each [`super::CrmClient`].
pub struct OrgSearchCache {
    results: TtlCache<String, Vec<RemoteOrganization>>,
    budget: RateLimiterRegistry,
}

impl OrgSearchCache {
    pub fn new() -> Self {
        Self {
            results: TtlCache::new(SEARCH_CAPACITY, SEARCH_TTL),
            budget: RateLimiterRegistry::new(TokenBucketConfig {
                capacity: BUDGET_PER_MINUTE,
                refill_amount: BUDGET_PER_MINUTE,
                refill_interval: Duration::from_secs(60),
            }),
        }
    }

    /// Cached results for a user's normalized query, if still live.
    pub fn lookup(&self, user_id: Uuid, normalized_query: &str) -> Option<Vec<RemoteOrganization>> {
        self.results.get(&cache_key(user_id, normalized_query))
    }

    /// Store fresh results for a user's normalized query.
    pub fn store(&self, user_id: Uuid, normalized_query: &str, results: Vec<RemoteOrganization>) {
        self.results.insert(cache_key(user_id, normalized_query), results);
    }

    /// Spend one unit of the user's uncached-search budget.
    ///
    /// Returns `false` when the budget for the current minute is gone;
    /// callers report a throttled outcome instead of calling the remote.
    pub fn try_spend(&self, user_id: Uuid) -> bool {
        self.budget.try_acquire(&user_id.to_string())
    }
}

impl Default for OrgSearchCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(user_id: Uuid, normalized_query: &str) -> String {
    format!("{user_id}:{normalized_query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(id: i64) -> RemoteOrganization {
        RemoteOrganization { id, name: format!("org-{id}"), update_time: None }
    }

    #[test]
    fn results_are_scoped_per_user() {
        let cache = OrgSearchCache::new();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        cache.store(alice, "acme corp", vec![org(1)]);

        assert!(cache.lookup(alice, "acme corp").is_some());
        assert!(cache.lookup(bob, "acme corp").is_none());
    }

    #[test]
    fn budget_exhausts_after_ten_spends() {
        let cache = OrgSearchCache::new();
        let user = Uuid::now_v7();

        for _ in 0..10 {
            assert!(cache.try_spend(user));
        }
        assert!(!cache.try_spend(user));

        // Another user's budget is untouched
        assert!(cache.try_spend(Uuid::now_v7()));
    }
}
