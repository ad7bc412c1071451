//! Configuration structures
//!
//! Profiles mirror the deployment environments: development keeps generous
//! retry budgets, production trims them, and test disables retries and
//! shortens every delay so suites run fast.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deployment profile selecting default timings and retry budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Development,
    Production,
    Test,
}

/// Configuration for the external CRM client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Base URL of the remote CRM API
    pub base_url: String,
    /// API version segment appended to the base URL
    pub api_version: String,
    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
    /// Maximum retries for retryable failures (transport, throttling)
    pub max_retries: u32,
    /// Base delay between transport retries (capped-exponential growth)
    pub retry_delay: Duration,
    /// Sleep applied when the remote signals rate-limit exhaustion
    pub rate_limit_delay: Duration,
    /// Whether retries are attempted at all
    pub retries_enabled: bool,
    /// Whether the local token bucket is consulted before each call
    pub rate_limiting_enabled: bool,
    /// Whether outbound payloads are sanitized before sending
    pub sanitize_data: bool,
    /// Emit request/response debug logging
    pub verbose_logging: bool,
}

impl CrmConfig {
    /// Development defaults: generous retries for flaky local networks.
    pub fn development() -> Self {
        Self {
            base_url: "https://api.pipedrive.com".to_string(),
            api_version: "v1".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(60),
            retries_enabled: true,
            rate_limiting_enabled: true,
            sanitize_data: true,
            verbose_logging: true,
        }
    }

    /// Production defaults: fail fast, let the orchestrator re-run.
    pub fn production() -> Self {
        Self {
            max_retries: 2,
            verbose_logging: false,
            ..Self::development()
        }
    }

    /// Test defaults: no retries, short delays.
    pub fn test() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::from_millis(10),
            rate_limit_delay: Duration::from_secs(1),
            retries_enabled: false,
            request_timeout: Duration::from_secs(5),
            ..Self::development()
        }
    }

    /// Defaults for the given profile.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self::development(),
            Profile::Production => Self::production(),
            Profile::Test => Self::test(),
        }
    }

    /// Fully qualified endpoint URL for a resource path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            path.trim_start_matches('/')
        )
    }
}

/// Score boundaries for the activity-status classifier.
///
/// The exact constants are a product decision; these are the observed
/// defaults and every consumer takes the struct rather than hard-coding
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingThresholds {
    /// Scores strictly below zero are "lost"; this is the cold floor
    pub cold_min: i32,
    /// First score counted as "warm"
    pub warm_min: i32,
    /// First score counted as "hot"
    pub hot_min: i32,
    /// Floor at or above which a non-campaign contact is medium priority
    pub attention_floor: i32,
    /// Days without contact before a low-score contact needs attention
    pub stale_after_days: i64,
}

impl Default for RankingThresholds {
    fn default() -> Self {
        Self { cold_min: 0, warm_min: 3, hot_min: 7, attention_floor: 3, stale_after_days: 30 }
    }
}

/// Warm-lead promotion rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmLeadConfig {
    /// Minimum warmness score that qualifies a contact for promotion
    pub score_floor: i32,
    /// Label attached to promoted persons in the remote CRM
    pub label_name: String,
}

impl Default for WarmLeadConfig {
    fn default() -> Self {
        Self { score_floor: 4, label_name: "Warm Lead".to_string() }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub profile: Profile,
    pub database: DatabaseConfig,
    pub crm: CrmConfig,
    pub thresholds: RankingThresholds,
    pub warm_lead: WarmLeadConfig,
}
