//! Authenticated HTTP transport and response checks.
//!
//! Every request a virtual user makes goes through an [`ApiClient`]. The
//! production implementation, [`RequestClient`], attaches the app token,
//! classifies the response status and feeds the shared check counters.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::metrics::MetricsCollector;

/// Header carrying the application token on every call.
pub const APP_TOKEN_HEADER: &str = "App-Token";

/// Coarse classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    /// HTTP 200.
    Ok,
    /// HTTP 429. Logged and counted, but not a failed check.
    RateLimited,
    /// Any other status, or no response at all.
    Failed,
}

/// Map an HTTP status code to its check outcome.
pub fn classify_status(status: u16) -> OutcomeClass {
    match status {
        200 => OutcomeClass::Ok,
        429 => OutcomeClass::RateLimited,
        _ => OutcomeClass::Failed,
    }
}

/// Result of one HTTP call.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub url: String,
    /// `None` when the request never got a response.
    pub status: Option<u16>,
    pub class: OutcomeClass,
    /// Parsed JSON body, when the response declared a JSON content type.
    pub body: Option<Value>,
    pub latency_us: u64,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn is_ok(&self) -> bool {
        self.class == OutcomeClass::Ok
    }
}

/// Request primitive used by virtual users.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, url: &str) -> RequestOutcome;

    async fn post_json(&self, url: &str, body: &Value) -> RequestOutcome;
}

/// [`ApiClient`] backed by `reqwest`, shared by all virtual users of a run.
#[derive(Clone)]
pub struct RequestClient {
    client: reqwest::Client,
    app_token: String,
    metrics: Arc<Mutex<MetricsCollector>>,
}

impl RequestClient {
    /// Create a client recording outcomes into `metrics`.
    ///
    /// No request timeout is configured beyond the transport default.
    pub fn new(app_token: impl Into<String>, metrics: Arc<Mutex<MetricsCollector>>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            app_token: app_token.into(),
            metrics,
        })
    }

    pub fn metrics(&self) -> Arc<Mutex<MetricsCollector>> {
        self.metrics.clone()
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> RequestOutcome {
        let start = Instant::now();
        let request = request.header(APP_TOKEN_HEADER, &self.app_token);

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let is_json = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_ascii_lowercase().contains("json"))
                    .unwrap_or(false);

                // Read the full body so latency covers the transfer
                let body = match response.bytes().await {
                    Ok(bytes) if is_json => serde_json::from_slice::<Value>(&bytes).ok(),
                    _ => None,
                };

                RequestOutcome {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    class: classify_status(status.as_u16()),
                    body,
                    latency_us: start.elapsed().as_micros() as u64,
                    error: None,
                }
            }
            Err(e) => RequestOutcome {
                url: url.to_string(),
                status: None,
                class: OutcomeClass::Failed,
                body: None,
                latency_us: start.elapsed().as_micros() as u64,
                error: Some(e.to_string()),
            },
        };

        self.check(&outcome).await;
        outcome
    }

    /// Log and count the outcome.
    async fn check(&self, outcome: &RequestOutcome) {
        let status_text = outcome
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");

        match (outcome.class, outcome.status) {
            (OutcomeClass::Ok, _) => {
                debug!(url = %outcome.url, latency_us = outcome.latency_us, "Request ok");
            }
            (OutcomeClass::RateLimited, status) => {
                error!(url = %outcome.url, status = ?status, status_text, "Rate limited");
            }
            (OutcomeClass::Failed, Some(status)) => {
                error!(url = %outcome.url, status, status_text, "Non 200 response");
            }
            (OutcomeClass::Failed, None) => {
                error!(
                    url = %outcome.url,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Request failed"
                );
            }
        }

        self.metrics
            .lock()
            .await
            .record_request(outcome.class, outcome.latency_us);
    }
}

#[async_trait]
impl ApiClient for RequestClient {
    async fn get(&self, url: &str) -> RequestOutcome {
        self.execute(url, self.client.get(url)).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> RequestOutcome {
        self.execute(url, self.client.post(url).json(body)).await
    }
}
