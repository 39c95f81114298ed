//! Check counters and walk statistics.

use std::collections::BTreeMap;
use std::time::Instant;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::behavior::WalkSummary;
use crate::client::OutcomeClass;

/// Collects request outcomes and walk summaries during a run.
pub struct MetricsCollector {
    histogram: Histogram<u64>,
    requests_total: u64,
    requests_ok: u64,
    requests_failed: u64,
    requests_rate_limited: u64,
    walks_completed: u64,
    walks_capped: u64,
    walks_panicked: u64,
    steps_total: u64,
    page_visits: BTreeMap<String, u64>,
    first_request_time: Option<Instant>,
    last_request_time: Option<Instant>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            // 1µs to 10 minutes, 3 significant figures
            histogram: Histogram::new_with_bounds(1, 600_000_000, 3)
                .expect("Failed to create histogram"),
            requests_total: 0,
            requests_ok: 0,
            requests_failed: 0,
            requests_rate_limited: 0,
            walks_completed: 0,
            walks_capped: 0,
            walks_panicked: 0,
            steps_total: 0,
            page_visits: BTreeMap::new(),
            first_request_time: None,
            last_request_time: None,
        }
    }

    /// Record the outcome of one HTTP request.
    pub fn record_request(&mut self, class: OutcomeClass, latency_us: u64) {
        self.requests_total += 1;
        match class {
            OutcomeClass::Ok => self.requests_ok += 1,
            OutcomeClass::RateLimited => self.requests_rate_limited += 1,
            OutcomeClass::Failed => self.requests_failed += 1,
        }
        self.histogram.saturating_record(latency_us.max(1));

        let now = Instant::now();
        if self.first_request_time.is_none() {
            self.first_request_time = Some(now);
        }
        self.last_request_time = Some(now);
    }

    /// Record a finished walk.
    pub fn record_walk(&mut self, summary: &WalkSummary) {
        self.walks_completed += 1;
        if summary.capped {
            self.walks_capped += 1;
        }
        self.steps_total += summary.steps as u64;
        for task in &summary.visited {
            *self.page_visits.entry(task.kind().to_string()).or_insert(0) += 1;
        }
    }

    /// Record a walk whose task panicked.
    pub fn record_walk_panic(&mut self) {
        self.walks_panicked += 1;
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total
    }

    pub fn requests_ok(&self) -> u64 {
        self.requests_ok
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed
    }

    pub fn requests_rate_limited(&self) -> u64 {
        self.requests_rate_limited
    }

    /// Generate final test results.
    pub fn results(&self, config_name: String, scenario_name: String, vus: u32) -> TestResults {
        let duration_secs = self
            .last_request_time
            .and_then(|last| self.first_request_time.map(|first| last.duration_since(first)))
            .unwrap_or_default()
            .as_secs_f64();

        let rps = if duration_secs > 0.0 {
            self.requests_total as f64 / duration_secs
        } else {
            0.0
        };

        let ms = |v: u64| v as f64 / 1000.0;
        let (p50, p90, p95, p99, min, max, avg) = if self.histogram.len() == 0 {
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
        } else {
            (
                ms(self.histogram.value_at_percentile(50.0)),
                ms(self.histogram.value_at_percentile(90.0)),
                ms(self.histogram.value_at_percentile(95.0)),
                ms(self.histogram.value_at_percentile(99.0)),
                ms(self.histogram.min()),
                ms(self.histogram.max()),
                self.histogram.mean() / 1000.0,
            )
        };

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            config_name,
            scenario_name,
            vus,
            duration_secs,
            total_requests: self.requests_total,
            ok_requests: self.requests_ok,
            failed_requests: self.requests_failed,
            rate_limited_requests: self.requests_rate_limited,
            requests_per_second: rps,
            latency_p50: p50,
            latency_p90: p90,
            latency_p95: p95,
            latency_p99: p99,
            latency_min: min,
            latency_max: max,
            latency_avg: avg,
            walks_completed: self.walks_completed,
            walks_capped: self.walks_capped,
            walks_panicked: self.walks_panicked,
            steps_total: self.steps_total,
            page_visits: self.page_visits.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Final test results, handed to the reporting step as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub config_name: String,
    pub scenario_name: String,
    pub vus: u32,
    pub duration_secs: f64,

    // Check outcomes
    pub total_requests: u64,
    pub ok_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub requests_per_second: f64,

    // Latency (ms)
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    // Walks
    pub walks_completed: u64,
    pub walks_capped: u64,
    pub walks_panicked: u64,
    pub steps_total: u64,
    pub page_visits: BTreeMap<String, u64>,
}

impl TestResults {
    /// Percentage of requests that passed the status check (429 counts as passing).
    pub fn check_pass_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }
        (self.total_requests - self.failed_requests) as f64 / self.total_requests as f64 * 100.0
    }
}
