//! Load test orchestration: many virtual users running concurrently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::behavior::BehaviorConfig;
use crate::client::RequestClient;
use crate::config::{ExecutorConfig, TestConfig};
use crate::corpus::QueryCorpus;
use crate::metrics::{MetricsCollector, TestResults};
use crate::random::StdRandom;
use crate::scenario::Scenario;
use crate::target::Target;

/// Executes a scenario with the configured number of virtual users.
pub struct LoadRunner {
    config: TestConfig,
    app_token: String,
    show_progress: bool,
}

/// Everything a worker needs to start iterations. Shared read-only.
struct Plan {
    scenario: Scenario,
    target: Target,
    corpus: QueryCorpus,
    behavior: BehaviorConfig,
    seed: Option<u64>,
    iterations: Option<u64>,
    deadline: Option<Instant>,
    duration_secs: u64,
}

impl LoadRunner {
    pub fn new(config: TestConfig, app_token: impl Into<String>) -> Self {
        Self {
            config,
            app_token: app_token.into(),
            show_progress: true,
        }
    }

    /// Disable the progress bar (tests, non-interactive runs).
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Run the load test.
    pub async fn run(&self) -> anyhow::Result<TestResults> {
        self.config.validate()?;

        let target = self.config.resolve_target()?;
        let corpus = self.config.load_corpus()?;
        let vus = self.config.executor.vus();

        info!(
            name = %self.config.name,
            scenario = %self.config.scenario,
            base_url = %target.base_url,
            api_url = %target.api_url,
            queries = corpus.len(),
            vus,
            "Starting load test"
        );

        let (iterations, deadline, pb) = match &self.config.executor {
            ExecutorConfig::SharedIterations { iterations, .. } => {
                (Some(*iterations), None, self.progress_bar(*iterations, "{pos}/{len} iterations"))
            }
            ExecutorConfig::ConstantVus { duration_secs, .. } => (
                None,
                Some(Instant::now() + Duration::from_secs(*duration_secs)),
                self.progress_bar(*duration_secs, "{pos}/{len}s"),
            ),
        };

        let metrics = Arc::new(Mutex::new(MetricsCollector::new()));
        let client = Arc::new(RequestClient::new(self.app_token.clone(), metrics.clone())?);
        let plan = Arc::new(Plan {
            scenario: self.config.scenario,
            target,
            corpus,
            behavior: self.config.behavior.clone(),
            seed: self.config.seed,
            iterations,
            deadline,
            duration_secs: match &self.config.executor {
                ExecutorConfig::ConstantVus { duration_secs, .. } => *duration_secs,
                ExecutorConfig::SharedIterations { .. } => 0,
            },
        });
        let next_iteration = Arc::new(AtomicU64::new(0));
        let started = Instant::now();

        let mut workers = Vec::with_capacity(vus as usize);
        for vu in 0..vus {
            workers.push(tokio::spawn(run_worker(
                vu,
                plan.clone(),
                client.clone(),
                metrics.clone(),
                next_iteration.clone(),
                pb.clone(),
                started,
            )));
        }

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Virtual user worker stopped unexpectedly");
            }
        }

        pb.finish_with_message("Complete!");

        let m = metrics.lock().await;
        let results = m.results(
            self.config.name.clone(),
            self.config.scenario.to_string(),
            vus,
        );
        info!(
            requests = results.total_requests,
            ok = results.ok_requests,
            failed = results.failed_requests,
            rate_limited = results.rate_limited_requests,
            walks = results.walks_completed,
            "Load test finished"
        );
        Ok(results)
    }

    fn progress_bar(&self, len: u64, counter: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        let template = format!("[{{elapsed_precise}}] {{bar:40.cyan/blue}} {} {{msg}}", counter);
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    }
}

/// Claim and run iterations until the executor's budget is spent.
///
/// Each iteration runs in its own task so that a panicking walk is counted
/// and the worker carries on.
async fn run_worker(
    vu: u32,
    plan: Arc<Plan>,
    client: Arc<RequestClient>,
    metrics: Arc<Mutex<MetricsCollector>>,
    next_iteration: Arc<AtomicU64>,
    pb: ProgressBar,
    started: Instant,
) {
    loop {
        if plan.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        let iteration = next_iteration.fetch_add(1, Ordering::Relaxed);
        if plan.iterations.is_some_and(|limit| iteration >= limit) {
            break;
        }

        let rng = StdRandom::new(plan.seed.map(|seed| seed.wrapping_add(iteration)));
        let walk = {
            let plan = plan.clone();
            let client = client.clone();
            tokio::spawn(async move {
                plan.scenario
                    .run(client.as_ref(), &plan.target, &plan.corpus, &plan.behavior, rng)
                    .await
            })
        };

        match walk.await {
            Ok(summary) => metrics.lock().await.record_walk(&summary),
            Err(e) => {
                error!(vu, iteration, error = %e, "Virtual user walk aborted");
                metrics.lock().await.record_walk_panic();
            }
        }

        if plan.deadline.is_some() {
            pb.set_position(started.elapsed().as_secs().min(plan.duration_secs));
        } else {
            pb.inc(1);
        }
    }
}
