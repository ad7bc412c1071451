use std::time::Duration;

use my500_domain::My500Error;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Thin retrying wrapper around a shared [`reqwest::Client`].
///
/// Only transport-level trouble is handled here: timeouts, connection
/// failures and 5xx responses are retried with capped-exponential backoff
/// until the attempt budget runs out. Anything status-code-shaped below 500
/// is returned to the caller untouched, since what a 404 or 409 means
/// depends entirely on which endpoint was hit.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    default_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder bound to the shared connection pool.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.inner.request(method, url)
    }

    /// Execute a request with the client-wide attempt budget.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, My500Error> {
        self.send_with_attempts(builder, self.default_attempts).await
    }

    /// Execute a request with an explicit attempt budget.
    ///
    /// Non-idempotent calls pass `1` so a transport fault after the request
    /// left the process is never silently replayed.
    pub async fn send_with_attempts(
        &self,
        builder: RequestBuilder,
        budget: usize,
    ) -> Result<Response, My500Error> {
        let budget = budget.max(1);
        let mut attempt = 1usize;

        loop {
            let prepared = builder
                .try_clone()
                .ok_or_else(|| {
                    My500Error::Internal(
                        "request body is not replayable; buffer it before sending".into(),
                    )
                })?
                .build()
                .map_err(map_transport)?;

            let method = prepared.method().clone();
            let url = prepared.url().clone();
            debug!(attempt, budget, %method, %url, "dispatching HTTP request");

            let outcome = self.inner.execute(prepared).await;
            let retryable = match &outcome {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "HTTP response");
                    status.is_server_error()
                }
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "HTTP request failed");
                    err.is_timeout() || err.is_request() || err.is_connect()
                }
            };

            if retryable && attempt < budget {
                self.pause_before_retry(attempt).await;
                attempt += 1;
                continue;
            }

            return outcome.map_err(map_transport);
        }
    }

    async fn pause_before_retry(&self, completed_attempts: usize) {
        // Doubles per retry; the shift cap keeps the multiplier from
        // overflowing on absurd budgets.
        let shift = completed_attempts.saturating_sub(1).min(8) as u32;
        let delay = self.base_backoff.saturating_mul(1u32 << shift);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn map_transport(err: reqwest::Error) -> My500Error {
    My500Error::from(InfraError::from(err))
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per call: the initial try plus retries.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, My500Error> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let inner = builder.build().map_err(map_transport)?;

        Ok(HttpClient {
            inner,
            default_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}
