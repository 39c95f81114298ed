//! Virtual user behaviour.
//!
//! A virtual user is a random walk over the pages of the site driven by a
//! LIFO stack of [`NavigationTask`]s. It starts on the landing page and keeps
//! going as long as independent continuation draws succeed:
//!
//! ```text
//! landing --p_search--> search --ok && p_choose--> document, family
//!                         ^                               |
//!                         +-------------p_search----------+
//! ```
//!
//! A search that opens a result pushes the family page and then the document
//! page, so the document is visited first. Only the last pending page of a
//! search branch decides whether to search again, which keeps the stack at
//! most two tasks deep.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::corpus::QueryCorpus;
use crate::random::RandomSource;
use crate::search::{do_basic_search, SearchResponse};
use crate::target::Target;

/// How long a user pauses after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedClass {
    Slow,
    Medium,
    Fast,
}

impl SpeedClass {
    pub const ALL: [SpeedClass; 3] = [SpeedClass::Slow, SpeedClass::Medium, SpeedClass::Fast];

    pub fn think_time(&self) -> Duration {
        match self {
            SpeedClass::Slow => Duration::from_secs(5),
            SpeedClass::Medium => Duration::from_secs(2),
            SpeedClass::Fast => Duration::from_secs(1),
        }
    }

    /// Uniform draw over the three classes.
    pub fn draw(rng: &mut dyn RandomSource) -> Self {
        Self::ALL[rng.index(Self::ALL.len())]
    }
}

/// A page a virtual user intends to visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationTask {
    LandingPage,
    SearchPage,
    DocumentPage { slug: String },
    FamilyPage { slug: String },
}

impl NavigationTask {
    pub fn kind(&self) -> &'static str {
        match self {
            NavigationTask::LandingPage => "landing_page",
            NavigationTask::SearchPage => "search_page",
            NavigationTask::DocumentPage { .. } => "document_page",
            NavigationTask::FamilyPage { .. } => "family_page",
        }
    }
}

impl fmt::Display for NavigationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationTask::DocumentPage { slug } | NavigationTask::FamilyPage { slug } => {
                write!(f, "{}:{}", self.kind(), slug)
            }
            _ => f.write_str(self.kind()),
        }
    }
}

/// Tunables for a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Probability of searching after a page load.
    pub p_search: f64,
    /// Probability of opening a result after a successful search.
    pub p_choose: f64,
    /// Upper bound on pages per walk. Remaining tasks are dropped.
    pub max_steps: usize,
    /// Multiplier on the speed class think time. 0 disables pauses.
    pub think_time_scale: f64,
    /// Send the URL-encoded query as the search API `query_string`.
    pub encode_query_in_body: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            p_search: 0.9,
            p_choose: 0.7,
            max_steps: 1000,
            think_time_scale: 1.0,
            encode_query_in_body: true,
        }
    }
}

impl BehaviorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, p) in [("p_search", self.p_search), ("p_choose", self.p_choose)] {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, p);
            }
        }
        if self.max_steps == 0 {
            anyhow::bail!("max_steps must be > 0");
        }
        if !self.think_time_scale.is_finite() || self.think_time_scale < 0.0 {
            anyhow::bail!("think_time_scale must be a non-negative number");
        }
        Ok(())
    }
}

/// What a finished walk did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub speed: SpeedClass,
    /// Tasks in the order they were processed.
    pub visited: Vec<NavigationTask>,
    pub steps: usize,
    /// Deepest stack seen when popping a task.
    pub max_depth: usize,
    /// The walk hit `max_steps` before the stack emptied.
    pub capped: bool,
}

/// One simulated user session.
pub struct VirtualUser<'a, R: RandomSource> {
    client: &'a dyn ApiClient,
    target: &'a Target,
    queries: &'a QueryCorpus,
    config: &'a BehaviorConfig,
    rng: R,
    speed: SpeedClass,
    stack: Vec<NavigationTask>,
}

impl<'a, R: RandomSource> VirtualUser<'a, R> {
    /// Create a user. The speed class is drawn here, before any other draw.
    pub fn new(
        client: &'a dyn ApiClient,
        target: &'a Target,
        queries: &'a QueryCorpus,
        config: &'a BehaviorConfig,
        mut rng: R,
    ) -> Self {
        let speed = SpeedClass::draw(&mut rng);
        Self {
            client,
            target,
            queries,
            config,
            rng,
            speed,
            stack: Vec::new(),
        }
    }

    pub fn speed(&self) -> SpeedClass {
        self.speed
    }

    /// Pause applied after every page.
    pub fn think_time(&self) -> Duration {
        let scale = self.config.think_time_scale;
        if scale.is_finite() && scale > 0.0 {
            self.speed.think_time().mul_f64(scale)
        } else {
            Duration::ZERO
        }
    }

    /// Walk until the stack is empty or `max_steps` pages have been visited.
    pub async fn run(mut self) -> WalkSummary {
        debug!(speed = ?self.speed, "Starting walk");
        self.stack.push(NavigationTask::LandingPage);

        let mut summary = WalkSummary {
            speed: self.speed,
            visited: Vec::new(),
            steps: 0,
            max_depth: 0,
            capped: false,
        };

        while let Some(task) = self.stack.pop() {
            if summary.steps >= self.config.max_steps {
                warn!(
                    max_steps = self.config.max_steps,
                    pending = self.stack.len() + 1,
                    "Walk reached step ceiling"
                );
                summary.capped = true;
                self.stack.clear();
                break;
            }

            summary.max_depth = summary.max_depth.max(self.stack.len() + 1);
            summary.steps += 1;
            self.visit(&task).await;
            summary.visited.push(task);
        }

        debug!(steps = summary.steps, capped = summary.capped, "Walk finished");
        summary
    }

    /// Visit a single search page and stop, without branching into results.
    pub async fn search_once(mut self) -> WalkSummary {
        let task = NavigationTask::SearchPage;
        let query = self.queries.choose(&mut self.rng);
        do_basic_search(self.client, self.target, query, self.config.encode_query_in_body).await;
        pause(self.think_time()).await;

        WalkSummary {
            speed: self.speed,
            visited: vec![task],
            steps: 1,
            max_depth: 1,
            capped: false,
        }
    }

    async fn visit(&mut self, task: &NavigationTask) {
        match task {
            NavigationTask::LandingPage => {
                self.client.get(&self.target.landing_url()).await;
                self.client.get(&self.target.config_url()).await;
                pause(self.think_time()).await;

                if self.rng.chance(self.config.p_search) {
                    self.stack.push(NavigationTask::SearchPage);
                }
            }
            NavigationTask::SearchPage => {
                let query = self.queries.choose(&mut self.rng);
                let outcome = do_basic_search(
                    self.client,
                    self.target,
                    query,
                    self.config.encode_query_in_body,
                )
                .await;
                pause(self.think_time()).await;

                if outcome.is_ok() && self.rng.chance(self.config.p_choose) {
                    self.open_result(&SearchResponse::from_outcome(&outcome));
                }
            }
            NavigationTask::DocumentPage { slug } => {
                debug!(slug = %slug, "Loading document page");
                self.client.get(&self.target.document_url(slug)).await;
                pause(self.think_time()).await;
                self.continue_searching();
            }
            NavigationTask::FamilyPage { slug } => {
                debug!(slug = %slug, "Loading family page");
                self.client.get(&self.target.family_url(slug)).await;
                pause(self.think_time()).await;
                self.continue_searching();
            }
        }
    }

    /// Queue a random document and its family. The document is popped first.
    fn open_result(&mut self, response: &SearchResponse) {
        let families = response.openable_families();
        if families.is_empty() {
            debug!("Search returned no openable results");
            return;
        }

        let family = families[self.rng.index(families.len())];
        let documents = &family.family_documents;
        let document = &documents[self.rng.index(documents.len())];

        self.stack.push(NavigationTask::FamilyPage {
            slug: family.family_slug.clone(),
        });
        self.stack.push(NavigationTask::DocumentPage {
            slug: document.document_slug.clone(),
        });
    }

    /// After a detail page, go back to searching. A sibling page still on the
    /// stack makes this decision instead.
    fn continue_searching(&mut self) {
        if self.stack.is_empty() && self.rng.chance(self.config.p_search) {
            self.stack.push(NavigationTask::SearchPage);
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_class_think_times() {
        assert_eq!(SpeedClass::Slow.think_time(), Duration::from_secs(5));
        assert_eq!(SpeedClass::Medium.think_time(), Duration::from_secs(2));
        assert_eq!(SpeedClass::Fast.think_time(), Duration::from_secs(1));
    }

    #[test]
    fn test_task_display() {
        assert_eq!(NavigationTask::LandingPage.to_string(), "landing_page");
        assert_eq!(
            NavigationTask::DocumentPage { slug: "doc-1".into() }.to_string(),
            "document_page:doc-1"
        );
        assert_eq!(
            NavigationTask::FamilyPage { slug: "fam-1".into() }.to_string(),
            "family_page:fam-1"
        );
    }

    #[test]
    fn test_default_behavior_config() {
        let config = BehaviorConfig::default();
        assert_eq!(config.p_search, 0.9);
        assert_eq!(config.p_choose, 0.7);
        assert!(config.encode_query_in_body);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_behavior_config_validation() {
        let bad_probability = BehaviorConfig {
            p_choose: 1.5,
            ..Default::default()
        };
        assert!(bad_probability.validate().is_err());

        let no_steps = BehaviorConfig {
            max_steps: 0,
            ..Default::default()
        };
        assert!(no_steps.validate().is_err());

        let negative_scale = BehaviorConfig {
            think_time_scale: -1.0,
            ..Default::default()
        };
        assert!(negative_scale.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: BehaviorConfig = serde_yaml::from_str("p_choose: 0.5\n").unwrap();
        assert_eq!(config.p_choose, 0.5);
        assert_eq!(config.p_search, 0.9);
        assert_eq!(config.max_steps, 1000);
    }
}
