//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use search_load_test::{classify_status, ApiClient, OutcomeClass, RandomSource, RequestOutcome};
use serde_json::{json, Value};

/// Random source that replays a fixed list of draws.
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
}

impl ScriptedRandom {
    pub fn new(draws: &[f64]) -> Self {
        Self {
            draws: draws.iter().copied().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        self.draws
            .pop_front()
            .expect("scripted random source exhausted")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// Fake client that records every call. GETs succeed; the search POST
/// answers with the configured status and body.
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    search_status: u16,
    search_body: Value,
}

impl RecordingClient {
    pub fn new(search_status: u16, search_body: Value) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            search_status,
            search_body,
        }
    }

    /// Search succeeds with a single family holding a single document.
    pub fn with_one_result(family_slug: &str, document_slug: &str) -> Self {
        Self::new(
            200,
            json!({
                "hits": 1,
                "families": [{
                    "family_slug": family_slug,
                    "family_documents": [{"document_slug": document_slug}]
                }]
            }),
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// `METHOD url` lines, for compact assertions.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| format!("{} {}", c.method, c.url))
            .collect()
    }
}

#[async_trait]
impl ApiClient for RecordingClient {
    async fn get(&self, url: &str) -> RequestOutcome {
        self.calls.lock().unwrap().push(Call {
            method: "GET",
            url: url.to_string(),
            body: None,
        });
        RequestOutcome {
            url: url.to_string(),
            status: Some(200),
            class: OutcomeClass::Ok,
            body: None,
            latency_us: 1,
            error: None,
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> RequestOutcome {
        self.calls.lock().unwrap().push(Call {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
        });
        RequestOutcome {
            url: url.to_string(),
            status: Some(self.search_status),
            class: classify_status(self.search_status),
            body: Some(self.search_body.clone()),
            latency_us: 1,
            error: None,
        }
    }
}
