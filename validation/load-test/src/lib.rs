//! Synthetic traffic generator for the search and browse web application.
//!
//! This crate provides tools to:
//! - Simulate virtual users that land, search and open documents or families
//! - Issue authenticated requests and classify responses (ok, failed, rate-limited)
//! - Run many virtual users concurrently from a YAML scenario file
//! - Collect request and walk metrics for an external reporting step

pub mod behavior;
pub mod client;
pub mod config;
pub mod corpus;
pub mod metrics;
pub mod random;
pub mod runner;
pub mod scenario;
pub mod search;
pub mod target;

pub use behavior::{BehaviorConfig, NavigationTask, SpeedClass, VirtualUser, WalkSummary};
pub use client::{classify_status, ApiClient, OutcomeClass, RequestClient, RequestOutcome};
pub use config::{ExecutorConfig, TestConfig};
pub use corpus::{CorpusError, QueryCorpus};
pub use metrics::{MetricsCollector, TestResults};
pub use random::{RandomSource, StdRandom};
pub use runner::LoadRunner;
pub use scenario::Scenario;
pub use search::{SearchRequest, SearchResponse};
pub use target::{Environment, Target, TargetError};
