//! Steptrack CLI - drives a progress store through a simulated run.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use steptrack_core::ProgressConfig;
use steptrack_progress::{CompletionEstimator, Progress, ProgressTracker, Subscriber};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "steptrack")]
#[command(about = "In-process step progress tracking demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with the store configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subscriber channel capacity (overrides the config file)
    #[arg(long)]
    capacity: Option<usize>,

    /// Publish timeout in milliseconds (overrides the config file)
    #[arg(long)]
    publish_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated sequence of steps
    Run {
        /// Number of steps
        #[arg(long, default_value = "4")]
        steps: usize,
        /// Time spent in each step, in milliseconds
        #[arg(long, default_value = "200")]
        delay: u64,
        /// Attach a nested store with this many sub-steps to the first step
        #[arg(long, default_value = "0")]
        substeps: u32,
        /// Print the final store as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<ProgressConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ProgressConfig::default(),
    };
    if let Some(capacity) = cli.capacity {
        config = config.with_subscriber_capacity(capacity);
    }
    if let Some(timeout) = cli.publish_timeout {
        config = config.with_publish_timeout(Duration::from_millis(timeout));
    }
    Ok(config)
}

/// Log every event until the store closes the channel.
async fn watch(mut events: Subscriber) -> usize {
    let mut seen = 0;
    while let Some(step) = events.recv().await {
        info!(step = %step.id, state = %step.state, progress = step.progress, "event");
        seen += 1;
    }
    seen
}

async fn report(tracker: &dyn ProgressTracker) {
    let snapshot = tracker.snapshot().await;
    let estimator = CompletionEstimator;
    let eta = estimator.estimate_remaining(&snapshot);
    let done_at = estimator
        .estimate_done_at(&snapshot, Utc::now())
        .map(|at| at.to_rfc3339())
        .unwrap_or_default();
    info!(
        state = %snapshot.state,
        doing = %snapshot.doing,
        completed = snapshot.completed,
        total = snapshot.total,
        done_at = %done_at,
        "{:.0}% done, ~{:?} left",
        snapshot.progress * 100.0,
        eta
    );
}

async fn run_child(child: &Progress, substeps: u32, delay: Duration) -> Result<()> {
    for i in 1..=substeps {
        let step = child.add_step(format!("sub{i}")).await?;
        step.set_as_current().await?;
        tokio::time::sleep(delay).await;
    }
    if let Some(last) = child.steps().await.last() {
        last.done().await?;
    }
    Ok(())
}

async fn run(config: ProgressConfig, steps: usize, delay: Duration, substeps: u32) -> Result<Progress> {
    let prog = Progress::with_config(config);
    info!(
        capacity = prog.config().subscriber_capacity,
        publish_timeout = ?prog.config().publish_timeout,
        "store created"
    );
    let watcher = tokio::spawn(watch(prog.subscribe().await));

    for i in 1..=steps {
        prog.add_step(format!("step{i}"))
            .await?
            .set_description(format!("step {i}"))
            .await;
    }

    for (i, step) in prog.steps().await.into_iter().enumerate() {
        step.set_as_current().await?;
        if i == 0 && substeps > 0 {
            let child = Progress::new();
            step.set_child(child.clone()).await;
            run_child(&child, substeps, delay / substeps).await?;
        } else {
            tokio::time::sleep(delay / 2).await;
            step.set_progress(0.75).await?;
            tokio::time::sleep(delay / 2).await;
        }
        step.set_data(serde_json::json!({ "attempt": 1 })).await;
        report(&prog).await;
    }

    if let Some(last) = prog.steps().await.last() {
        last.done().await?;
    }
    report(&prog).await;

    // no-op once every step is done
    prog.close().await;
    match watcher.await {
        Ok(seen) => info!(events = seen, "watcher finished"),
        Err(err) => warn!("watcher failed: {}", err),
    }
    Ok(prog)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { steps, delay, substeps, json } => {
            let prog = run(config, steps, Duration::from_millis(delay), substeps).await?;
            if json {
                println!("{}", prog.to_json_pretty().await?);
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
