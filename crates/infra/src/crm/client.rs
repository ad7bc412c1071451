//! HTTP client for the external CRM, implementing the `CrmGateway` port.
//!
//! Responsibilities live here and nowhere above: the local token-bucket
//! check before every call, the remote 429 sleep-and-retry discipline,
//! transport retries for idempotent calls only, pagination envelopes,
//! conflict mapping and the organization-search cache. Callers see typed
//! results and the domain error taxonomy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use my500_common::resilience::RateLimiterRegistry;
use my500_core::{normalize_org_name, CrmGateway};
use my500_domain::{
    ActivityCreate, CrmConfig, CustomField, My500Error, OrgSearchOutcome, Page, PageRequest,
    PersonUpsert, RemoteOrganization, RemotePerson, Result,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::sanitize::sanitize;
use super::search::OrgSearchCache;
use super::types::{
    ApiEnvelope, WireField, WireId, WireLabel, WireOrganization, WirePerson, WireSearchData,
};
use crate::http::HttpClient;

const REMOTE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CRM client bound to one user's credential.
///
/// The limiter and search cache are shared across clients so per-credential
/// and per-user budgets hold process-wide.
pub struct CrmClient {
    config: CrmConfig,
    http: HttpClient,
    api_token: String,
    user_id: Uuid,
    limiter: Arc<RateLimiterRegistry>,
    search: Arc<OrgSearchCache>,
}

impl CrmClient {
    pub fn new(
        config: CrmConfig,
        api_token: String,
        user_id: Uuid,
        limiter: Arc<RateLimiterRegistry>,
        search: Arc<OrgSearchCache>,
    ) -> Result<Self> {
        if api_token.is_empty() {
            return Err(My500Error::Credential("api token must not be empty".into()));
        }

        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .base_backoff(config.retry_delay)
            .user_agent("my500-sync")
            .build()?;

        Ok(Self { config, http, api_token, user_id, limiter, search })
    }

    /// Transport attempt budget for one logical call.
    fn transport_attempts(&self, idempotent: bool) -> usize {
        if self.config.retries_enabled && idempotent {
            self.config.max_retries as usize + 1
        } else {
            1
        }
    }

    /// Execute one logical API call with local throttling and remote 429
    /// handling. Transport retries happen below this level, inside
    /// [`HttpClient`], and only for idempotent calls.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        idempotent: bool,
    ) -> Result<ApiEnvelope<T>> {
        let url = self.config.endpoint(path);
        let attempts = self.transport_attempts(idempotent);
        let body = body.map(|mut payload| {
            if self.config.sanitize_data {
                sanitize(&mut payload);
            }
            payload
        });

        let mut throttle_retries = 0u32;
        loop {
            if self.config.rate_limiting_enabled && !self.limiter.try_acquire(&self.api_token) {
                if self.config.retries_enabled && throttle_retries < self.config.max_retries {
                    throttle_retries += 1;
                    debug!(
                        path,
                        retry = throttle_retries,
                        "local rate-limit budget exhausted; backing off"
                    );
                    tokio::time::sleep(self.config.rate_limit_delay).await;
                    continue;
                }
                return Err(My500Error::RateLimit("rate-limit budget exhausted".into()));
            }

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .query(&[("api_token", self.api_token.as_str())]);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(ref payload) = body {
                builder = builder.json(payload);
            }

            let response = self.http.send_with_attempts(builder, attempts).await?;
            let status = response.status();
            self.log_rate_limit_headers(path, &response);

            if status == StatusCode::TOO_MANY_REQUESTS {
                if self.config.retries_enabled && throttle_retries < self.config.max_retries {
                    throttle_retries += 1;
                    warn!(path, retry = throttle_retries, "remote throttled the call; sleeping");
                    tokio::time::sleep(self.config.rate_limit_delay).await;
                    continue;
                }
                let message = remote_error_message(response).await;
                return Err(My500Error::RateLimit(message));
            }

            if !status.is_success() {
                let message = remote_error_message(response).await;
                return Err(match status.as_u16() {
                    401 | 403 => My500Error::Credential(message),
                    404 => My500Error::NotFound(message),
                    409 => My500Error::Conflict(message),
                    400..=499 => My500Error::Validation(message),
                    _ => My500Error::Transport(message),
                });
            }

            let envelope: ApiEnvelope<T> = response
                .json()
                .await
                .map_err(|err| My500Error::Transport(format!("malformed response body: {err}")))?;

            if !envelope.success {
                return Err(My500Error::Validation(
                    envelope.error.unwrap_or_else(|| "remote reported failure".to_string()),
                ));
            }

            return Ok(envelope);
        }
    }

    fn log_rate_limit_headers(&self, path: &str, response: &Response) {
        if !self.config.verbose_logging {
            return;
        }
        let remaining = header_value(response, "x-ratelimit-remaining");
        let limit = header_value(response, "x-ratelimit-limit");
        let reset = header_value(response, "x-ratelimit-reset");
        if remaining.is_some() || limit.is_some() {
            debug!(path, ?remaining, ?limit, ?reset, "remote rate-limit window");
        }
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response.headers().get(name).and_then(|v| v.to_str().ok()).map(ToString::to_string)
}

/// Best-effort extraction of the remote error message from a failed
/// response; falls back to the status line.
async fn remote_error_message(response: Response) -> String {
    let status = response.status();
    let fallback = format!("HTTP {status}");
    match response.text().await {
        Ok(text) => serde_json::from_str::<ApiEnvelope<Value>>(&text)
            .ok()
            .and_then(|envelope| envelope.error)
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn require_data<T>(envelope: ApiEnvelope<T>, context: &str) -> Result<T> {
    envelope.data.ok_or_else(|| My500Error::Internal(format!("{context}: response carried no data")))
}

#[async_trait]
impl CrmGateway for CrmClient {
    #[instrument(skip(self), fields(start = page.start, limit = page.limit))]
    async fn get_persons(
        &self,
        page: PageRequest,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Page<RemotePerson>> {
        let mut query =
            vec![("start", page.start.to_string()), ("limit", page.limit.to_string())];
        if let Some(since) = modified_since {
            query.push(("since_timestamp", since.format(REMOTE_TIME_FORMAT).to_string()));
        }

        let envelope: ApiEnvelope<Vec<WirePerson>> =
            self.execute(Method::GET, "persons", &query, None, true).await?;

        let more = envelope.has_more();
        let items = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WirePerson::into_remote)
            .collect();

        Ok(Page { items, more_items_in_collection: more })
    }

    async fn get_organizations(&self, page: PageRequest) -> Result<Page<RemoteOrganization>> {
        let query = [("start", page.start.to_string()), ("limit", page.limit.to_string())];
        let envelope: ApiEnvelope<Vec<WireOrganization>> =
            self.execute(Method::GET, "organizations", &query, None, true).await?;

        let more = envelope.has_more();
        let items = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WireOrganization::into_remote)
            .collect();

        Ok(Page { items, more_items_in_collection: more })
    }

    async fn create_or_update_person(&self, person: &PersonUpsert) -> Result<RemotePerson> {
        let body = serde_json::to_value(person)
            .map_err(|err| My500Error::Internal(format!("serialize person upsert: {err}")))?;

        // Upsert by natural key is idempotent, so transport retries are safe
        let envelope: ApiEnvelope<WirePerson> =
            self.execute(Method::PUT, "persons", &[], Some(body), true).await?;

        Ok(require_data(envelope, "persons upsert")?.into_remote())
    }

    async fn update_person(&self, id: i64, data: &Value) -> Result<()> {
        let path = format!("persons/{id}");
        let _: ApiEnvelope<Value> =
            self.execute(Method::PUT, &path, &[], Some(data.clone()), true).await?;
        Ok(())
    }

    async fn update_organization(&self, id: i64, data: &Value) -> Result<()> {
        let path = format!("organizations/{id}");
        let _: ApiEnvelope<Value> =
            self.execute(Method::PUT, &path, &[], Some(data.clone()), true).await?;
        Ok(())
    }

    async fn update_deal(&self, id: i64, data: &Value) -> Result<()> {
        let path = format!("deals/{id}");
        let _: ApiEnvelope<Value> =
            self.execute(Method::PUT, &path, &[], Some(data.clone()), true).await?;
        Ok(())
    }

    async fn create_activity(&self, activity: &ActivityCreate) -> Result<i64> {
        let body = serde_json::to_value(activity)
            .map_err(|err| My500Error::Internal(format!("serialize activity: {err}")))?;

        // Creates are not replay-safe, so no transport retries
        let envelope: ApiEnvelope<WireId> =
            self.execute(Method::POST, "activities", &[], Some(body), false).await?;

        Ok(require_data(envelope, "activity create")?.id)
    }

    async fn update_activity(&self, id: i64, data: &Value) -> Result<()> {
        let path = format!("activities/{id}");
        let _: ApiEnvelope<Value> =
            self.execute(Method::PUT, &path, &[], Some(data.clone()), true).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_organizations(&self, query: &str) -> Result<OrgSearchOutcome> {
        let normalized = normalize_org_name(query);
        if normalized.is_empty() {
            return Err(My500Error::Validation("search query must not be empty".into()));
        }

        if let Some(organizations) = self.search.lookup(self.user_id, &normalized) {
            debug!(query = %normalized, "organization search served from cache");
            return Ok(OrgSearchOutcome::Found { organizations, from_cache: true });
        }

        if !self.search.try_spend(self.user_id) {
            debug!(query = %normalized, "organization search budget exhausted");
            return Ok(OrgSearchOutcome::Throttled);
        }

        let params = [("term", query.trim().to_string())];
        let envelope: ApiEnvelope<WireSearchData> =
            self.execute(Method::GET, "organizations/search", &params, None, true).await?;

        let organizations: Vec<RemoteOrganization> = envelope
            .data
            .map(|data| data.items.into_iter().map(|hit| hit.item.into_remote()).collect())
            .unwrap_or_default();

        self.search.store(self.user_id, &normalized, organizations.clone());
        Ok(OrgSearchOutcome::Found { organizations, from_cache: false })
    }

    async fn get_person_custom_fields(&self) -> Result<Vec<CustomField>> {
        let envelope: ApiEnvelope<Vec<WireField>> =
            self.execute(Method::GET, "personFields", &[], None, true).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WireField::into_custom_field)
            .collect())
    }

    async fn get_organization_custom_fields(&self) -> Result<Vec<CustomField>> {
        let envelope: ApiEnvelope<Vec<WireField>> =
            self.execute(Method::GET, "organizationFields", &[], None, true).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WireField::into_custom_field)
            .collect())
    }

    async fn find_or_create_label(&self, name: &str) -> Result<i64> {
        let envelope: ApiEnvelope<Vec<WireLabel>> =
            self.execute(Method::GET, "labels", &[], None, true).await?;

        if let Some(label) = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .find(|label| label.name.eq_ignore_ascii_case(name))
        {
            return Ok(label.id);
        }

        let body = serde_json::json!({ "name": name });
        let created: ApiEnvelope<WireId> =
            self.execute(Method::POST, "labels", &[], Some(body), false).await?;

        Ok(require_data(created, "label create")?.id)
    }

    async fn test_connection(&self) -> Result<bool> {
        let result: Result<ApiEnvelope<Value>> =
            self.execute(Method::GET, "users/me", &[], None, true).await;

        match result {
            Ok(envelope) => Ok(envelope.success),
            Err(My500Error::Credential(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
