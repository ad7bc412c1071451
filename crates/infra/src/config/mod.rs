//! Configuration loader
//!
//! Profile defaults come from the domain layer; environment variables
//! override individual fields. A `.env` file in the working directory is
//! honored for local development.
//!
//! ## Environment Variables
//! - `MY500_PROFILE`: `development` (default), `production` or `test`
//! - `MY500_CRM_BASE_URL`: remote CRM base URL
//! - `MY500_CRM_API_VERSION`: API version path segment
//! - `MY500_CRM_TIMEOUT_SECS`: per-request timeout
//! - `MY500_CRM_MAX_RETRIES`: retry budget for retryable failures
//! - `MY500_CRM_RETRY_DELAY_MS`: base transport backoff
//! - `MY500_CRM_RATE_LIMIT_DELAY_SECS`: sleep after a throttle signal
//! - `MY500_CRM_RETRIES_ENABLED` / `MY500_CRM_RATE_LIMITING_ENABLED`
//! - `MY500_CRM_SANITIZE_DATA` / `MY500_CRM_VERBOSE_LOGGING`
//! - `MY500_DB_PATH`: database file path (default `my500.db`)
//! - `MY500_DB_POOL_SIZE`: connection pool size (default 4)
//! - `MY500_WARM_LEAD_FLOOR`: minimum score for warm-lead promotion
//! - `MY500_WARM_LEAD_LABEL`: remote label attached to promoted persons

use std::str::FromStr;
use std::time::Duration;

use my500_domain::{
    Config, CrmConfig, DatabaseConfig, My500Error, Profile, RankingThresholds, Result,
    WarmLeadConfig,
};
use url::Url;

/// Load configuration, honoring a `.env` file when present.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();
    let config = load_from_env()?;
    tracing::info!(profile = ?config.profile, "configuration loaded");
    Ok(config)
}

/// Load configuration from environment variables on top of profile
/// defaults.
pub fn load_from_env() -> Result<Config> {
    let profile = match opt_var("MY500_PROFILE") {
        Some(value) => parse_profile(&value)?,
        None => Profile::Development,
    };

    let mut crm = CrmConfig::for_profile(profile);
    if let Some(base_url) = opt_var("MY500_CRM_BASE_URL") {
        Url::parse(&base_url)
            .map_err(|err| My500Error::Config(format!("invalid MY500_CRM_BASE_URL: {err}")))?;
        crm.base_url = base_url;
    }
    if let Some(version) = opt_var("MY500_CRM_API_VERSION") {
        crm.api_version = version;
    }
    if let Some(secs) = parse_var::<u64>("MY500_CRM_TIMEOUT_SECS")? {
        crm.request_timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = parse_var::<u32>("MY500_CRM_MAX_RETRIES")? {
        crm.max_retries = retries;
    }
    if let Some(millis) = parse_var::<u64>("MY500_CRM_RETRY_DELAY_MS")? {
        crm.retry_delay = Duration::from_millis(millis);
    }
    if let Some(secs) = parse_var::<u64>("MY500_CRM_RATE_LIMIT_DELAY_SECS")? {
        crm.rate_limit_delay = Duration::from_secs(secs);
    }
    if let Some(enabled) = parse_var::<bool>("MY500_CRM_RETRIES_ENABLED")? {
        crm.retries_enabled = enabled;
    }
    if let Some(enabled) = parse_var::<bool>("MY500_CRM_RATE_LIMITING_ENABLED")? {
        crm.rate_limiting_enabled = enabled;
    }
    if let Some(enabled) = parse_var::<bool>("MY500_CRM_SANITIZE_DATA")? {
        crm.sanitize_data = enabled;
    }
    if let Some(enabled) = parse_var::<bool>("MY500_CRM_VERBOSE_LOGGING")? {
        crm.verbose_logging = enabled;
    }

    let database = DatabaseConfig {
        path: opt_var("MY500_DB_PATH").unwrap_or_else(|| "my500.db".to_string()),
        pool_size: parse_var::<u32>("MY500_DB_POOL_SIZE")?.unwrap_or(4),
    };

    let mut warm_lead = WarmLeadConfig::default();
    if let Some(floor) = parse_var::<i32>("MY500_WARM_LEAD_FLOOR")? {
        warm_lead.score_floor = floor;
    }
    if let Some(label) = opt_var("MY500_WARM_LEAD_LABEL") {
        warm_lead.label_name = label;
    }

    Ok(Config { profile, database, crm, thresholds: RankingThresholds::default(), warm_lead })
}

fn parse_profile(value: &str) -> Result<Profile> {
    match value.to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Profile::Development),
        "production" | "prod" => Ok(Profile::Production),
        "test" => Ok(Profile::Test),
        other => Err(My500Error::Config(format!("unknown profile: {other}"))),
    }
}

fn opt_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match opt_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| My500Error::Config(format!("invalid {name}: {err}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Environment variables are process-global; serialize the tests that
    // touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_my500_vars() {
        for (key, _) in std::env::vars() {
            if key.starts_with("MY500_") {
                std::env::remove_var(&key);
            }
        }
    }

    #[test]
    fn defaults_to_development_profile() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_my500_vars();

        let config = load_from_env().unwrap();
        assert_eq!(config.profile, Profile::Development);
        assert_eq!(config.crm.max_retries, 5);
        assert_eq!(config.database.path, "my500.db");
    }

    #[test]
    fn env_overrides_profile_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_my500_vars();

        std::env::set_var("MY500_PROFILE", "production");
        std::env::set_var("MY500_CRM_BASE_URL", "https://crm.example.com");
        std::env::set_var("MY500_CRM_MAX_RETRIES", "7");
        std::env::set_var("MY500_DB_POOL_SIZE", "8");
        std::env::set_var("MY500_WARM_LEAD_FLOOR", "5");

        let config = load_from_env().unwrap();
        clear_my500_vars();

        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.crm.base_url, "https://crm.example.com");
        assert_eq!(config.crm.max_retries, 7);
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.warm_lead.score_floor, 5);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_my500_vars();

        std::env::set_var("MY500_CRM_MAX_RETRIES", "many");
        let err = load_from_env().unwrap_err();
        clear_my500_vars();
        assert!(matches!(err, My500Error::Config(_)));

        std::env::set_var("MY500_CRM_BASE_URL", "not a url");
        let err = load_from_env().unwrap_err();
        clear_my500_vars();
        assert!(matches!(err, My500Error::Config(_)));

        std::env::set_var("MY500_PROFILE", "staging");
        let err = load_from_env().unwrap_err();
        clear_my500_vars();
        assert!(matches!(err, My500Error::Config(_)));
    }
}
