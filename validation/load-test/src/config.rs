//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorConfig;
use crate::corpus::QueryCorpus;
use crate::scenario::Scenario;
use crate::target::{Environment, Target};

/// Main test configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub environment: Environment,
    /// Explicit URLs, taking precedence over `environment`.
    #[serde(default)]
    pub target: Option<TargetOverride>,
    #[serde(default)]
    pub queries: Vec<String>,
    /// One query per line; resolved relative to the scenario file.
    #[serde(default)]
    pub queries_file: Option<PathBuf>,
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub seed: Option<u64>, // Optional RNG seed for reproducible tests
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOverride {
    pub base_url: String,
    pub api_url: String,
}

/// How iterations are scheduled across virtual users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// `vus` workers share a fixed number of iterations.
    SharedIterations { vus: u32, iterations: u64 },
    /// `vus` workers loop over iterations until the duration elapses.
    ConstantVus { vus: u32, duration_secs: u64 },
}

impl ExecutorConfig {
    pub fn vus(&self) -> u32 {
        match self {
            ExecutorConfig::SharedIterations { vus, .. } | ExecutorConfig::ConstantVus { vus, .. } => *vus,
        }
    }

    pub fn set_vus(&mut self, value: u32) {
        match self {
            ExecutorConfig::SharedIterations { vus, .. } | ExecutorConfig::ConstantVus { vus, .. } => *vus = value,
        }
    }
}

impl TestConfig {
    /// Load configuration from YAML file.
    ///
    /// A relative `queries_file` is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        let mut config: TestConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing scenario file {}", path.display()))?;

        if let (Some(file), Some(dir)) = (&config.queries_file, path.parent()) {
            if file.is_relative() {
                config.queries_file = Some(dir.join(file));
            }
        }
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.executor {
            ExecutorConfig::SharedIterations { vus, iterations } => {
                if *vus == 0 {
                    anyhow::bail!("vus must be > 0");
                }
                if *iterations == 0 {
                    anyhow::bail!("iterations must be > 0");
                }
            }
            ExecutorConfig::ConstantVus { vus, duration_secs } => {
                if *vus == 0 {
                    anyhow::bail!("vus must be > 0");
                }
                if *duration_secs == 0 {
                    anyhow::bail!("duration_secs must be > 0");
                }
            }
        }
        if self.queries.is_empty() && self.queries_file.is_none() {
            anyhow::bail!("either queries or queries_file must be specified");
        }
        self.behavior.validate()?;
        self.resolve_target()?;
        Ok(())
    }

    /// Explicit target if given, otherwise the environment's URLs.
    pub fn resolve_target(&self) -> anyhow::Result<Target> {
        let target = match &self.target {
            Some(t) => Target::new(&t.base_url, &t.api_url)?,
            None => self.environment.target(),
        };
        Ok(target)
    }

    /// Inline queries followed by those from `queries_file`.
    pub fn load_corpus(&self) -> anyhow::Result<QueryCorpus> {
        let mut queries = self.queries.clone();
        if let Some(path) = &self.queries_file {
            queries.extend(QueryCorpus::from_file(path)?.queries().iter().cloned());
        }
        Ok(QueryCorpus::new(queries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"
name: smoke
description: Small search and browse run
scenario: basic-search-browse
environment: production
queries: ["flood", "climate law"]
executor:
  type: shared_iterations
  vus: 2
  iterations: 10
behavior:
  p_choose: 0.5
seed: 7
"#;

    #[test]
    fn test_parse_scenario_yaml() {
        let config: TestConfig = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(config.name, "smoke");
        assert_eq!(config.scenario, Scenario::BasicSearchBrowse);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.executor.vus(), 2);
        assert_eq!(config.behavior.p_choose, 0.5);
        assert_eq!(config.behavior.p_search, 0.9);
        assert_eq!(config.seed, Some(7));
        config.validate().unwrap();

        let target = config.resolve_target().unwrap();
        assert_eq!(target.base_url, "https://ccc.climatepolicyradar.org");
    }

    #[test]
    fn test_defaults_to_staging() {
        let config: TestConfig = serde_yaml::from_str(
            "name: x\nqueries: [flood]\nexecutor: {type: constant_vus, vus: 1, duration_secs: 5}\n",
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.scenario, Scenario::BasicSearchBrowse);
        assert_eq!(
            config.resolve_target().unwrap().api_url,
            "https://cpr.staging.climatepolicyradar.org"
        );
    }

    #[test]
    fn test_target_override() {
        let config: TestConfig = serde_yaml::from_str(
            r#"
name: local
queries: [flood]
target: {base_url: "http://localhost:3000/", api_url: "http://localhost:8888"}
executor: {type: shared_iterations, vus: 1, iterations: 1}
"#,
        )
        .unwrap();
        let target = config.resolve_target().unwrap();
        assert_eq!(target.base_url, "http://localhost:3000");
        assert_eq!(target.api_url, "http://localhost:8888");
    }

    #[test]
    fn test_validation_errors() {
        let mut config: TestConfig = serde_yaml::from_str(SCENARIO).unwrap();
        config.executor.set_vus(0);
        assert!(config.validate().is_err());

        let mut config: TestConfig = serde_yaml::from_str(SCENARIO).unwrap();
        config.queries.clear();
        assert!(config.validate().is_err());

        let mut config: TestConfig = serde_yaml::from_str(SCENARIO).unwrap();
        config.behavior.p_search = 2.0;
        assert!(config.validate().is_err());

        let mut config: TestConfig = serde_yaml::from_str(SCENARIO).unwrap();
        config.target = Some(TargetOverride {
            base_url: "not a url".into(),
            api_url: "http://localhost".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_resolves_queries_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut queries = std::fs::File::create(dir.path().join("queries.txt")).unwrap();
        writeln!(queries, "adaptation").unwrap();
        writeln!(queries, "carbon tax").unwrap();

        let scenario_path = dir.path().join("scenario.yaml");
        std::fs::write(
            &scenario_path,
            "name: file\nqueries: [flood]\nqueries_file: queries.txt\nexecutor: {type: shared_iterations, vus: 1, iterations: 1}\n",
        )
        .unwrap();

        let config = TestConfig::from_file(&scenario_path).unwrap();
        let corpus = config.load_corpus().unwrap();
        assert_eq!(corpus.queries(), &["flood", "adaptation", "carbon tax"]);
    }

    #[test]
    fn test_bundled_scenarios_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        let mut checked = 0;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let config = TestConfig::from_file(&path).unwrap();
            config.validate().unwrap();
            assert!(!config.load_corpus().unwrap().is_empty());
            checked += 1;
        }
        assert!(checked >= 2);
    }
}
