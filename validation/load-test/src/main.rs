//! Load test CLI for the search and browse application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use search_load_test::{
    BehaviorConfig, Environment, ExecutorConfig, LoadRunner, MetricsCollector, QueryCorpus,
    RequestClient, Scenario, StdRandom, Target, TestConfig,
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "search-load-test")]
#[command(about = "Virtual-user load testing for the search and browse application", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Application token sent as the App-Token header
    #[arg(long, global = true, env = "APP_TOKEN", default_value = "", hide_env_values = true)]
    app_token: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override the scenario to run per iteration
        #[arg(long, env = "SCENARIO")]
        name: Option<Scenario>,

        /// Override the target environment (staging, production)
        #[arg(short, long, env = "ENVIRONMENT")]
        environment: Option<Environment>,

        /// Override number of virtual users
        #[arg(short, long)]
        vus: Option<u32>,

        /// Override the run: fixed number of iterations shared by all users
        #[arg(short, long, conflicts_with = "duration")]
        iterations: Option<u64>,

        /// Override the run: loop users for this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Override RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a single virtual user walk
    Quick {
        /// Search query (repeat for several)
        #[arg(short, long, default_value = "flood")]
        query: Vec<String>,

        /// Target environment
        #[arg(short, long, env = "ENVIRONMENT", default_value = "staging")]
        environment: Environment,

        /// UI base URL (overrides environment, requires --api-url)
        #[arg(long, requires = "api_url")]
        base_url: Option<String>,

        /// API base URL (overrides environment, requires --base-url)
        #[arg(long, requires = "base_url")]
        api_url: Option<String>,

        /// Skip think time between pages
        #[arg(long)]
        no_think: bool,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().try_init().map_err(|e| anyhow::anyhow!(e))
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    if cli.app_token.is_empty() && !matches!(cli.command, Commands::List { .. }) {
        warn!("APP_TOKEN is not set; requests will carry an empty App-Token header");
    }

    match cli.command {
        Commands::Run {
            scenario,
            name,
            environment,
            vus,
            iterations,
            duration,
            seed,
        } => {
            info!(path = %scenario.display(), "Loading scenario");
            let mut config = TestConfig::from_file(&scenario)?;

            // Apply overrides
            if let Some(name) = name {
                config.scenario = name;
            }
            if let Some(environment) = environment {
                config.environment = environment;
                config.target = None;
            }
            let current_vus = vus.unwrap_or_else(|| config.executor.vus());
            if let Some(iterations) = iterations {
                config.executor = ExecutorConfig::SharedIterations {
                    vus: current_vus,
                    iterations,
                };
            }
            if let Some(duration_secs) = duration {
                config.executor = ExecutorConfig::ConstantVus {
                    vus: current_vus,
                    duration_secs,
                };
            }
            config.executor.set_vus(current_vus);
            if seed.is_some() {
                config.seed = seed;
            }

            config.validate()?;
            info!(
                name = %config.name,
                description = %config.description,
                environment = %config.environment,
                "Configuration loaded"
            );

            let results = LoadRunner::new(config, cli.app_token).run().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::Quick {
            query,
            environment,
            base_url,
            api_url,
            no_think,
            seed,
        } => {
            let target = match (base_url, api_url) {
                (Some(base), Some(api)) => Target::new(&base, &api)?,
                _ => environment.target(),
            };
            let corpus = QueryCorpus::new(query)?;
            let behavior = BehaviorConfig {
                think_time_scale: if no_think { 0.0 } else { 1.0 },
                ..Default::default()
            };

            info!(base_url = %target.base_url, api_url = %target.api_url, "Running quick walk");

            let metrics = Arc::new(Mutex::new(MetricsCollector::new()));
            let client = RequestClient::new(cli.app_token, metrics.clone())?;
            let summary = Scenario::BasicSearchBrowse
                .run(&client, &target, &corpus, &behavior, StdRandom::new(seed))
                .await;

            for (step, task) in summary.visited.iter().enumerate() {
                info!(step = step + 1, page = %task, "Visited");
            }
            let mut m = metrics.lock().await;
            m.record_walk(&summary);
            let results = m.results("quick".to_string(), Scenario::BasicSearchBrowse.to_string(), 1);
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("reading scenarios directory {}", dir.display()))?;

            let mut scenarios = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if !matches!(path.extension().and_then(|s| s.to_str()), Some("yaml" | "yml")) {
                    continue;
                }
                match TestConfig::from_file(&path) {
                    Ok(config) => scenarios.push((
                        entry.file_name().to_string_lossy().to_string(),
                        config,
                    )),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping invalid scenario"),
                }
            }

            scenarios.sort_by(|a, b| a.0.cmp(&b.0));

            if scenarios.is_empty() {
                println!("No scenario files found");
            } else {
                for (filename, config) in scenarios {
                    println!("  {} - {} ({})", filename, config.name, config.scenario);
                    println!("    {}", config.description);
                    println!();
                }
            }

            Ok(())
        }
    }
}
