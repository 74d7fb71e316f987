//! Extract engagers for a batch of targets and print a JSON report.
//!
//! Usage:
//!   engagement-run 1789 1790 --max-results 500
//!   engagement-run --targets-file targets.txt --report out.json
//!
//! API settings come from the environment (see `RunConfig`). Ctrl-C stops
//! dispatching new targets; in-flight targets finish their current page.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engagement::{
    BulkOrchestrator, EngagementSource, EngagementStore, HttpEngagementSource, MemoryStore,
    RateLimitedSource, Report, RunConfig,
};

#[derive(Debug, Parser)]
#[command(name = "engagement-run", about = "Extract and score engagers for a batch of targets")]
struct Args {
    /// Target ids (post or content ids)
    targets: Vec<String>,

    /// File with one target id per line
    #[arg(long)]
    targets_file: Option<PathBuf>,

    /// Stop each target after this many actors
    #[arg(long)]
    max_results: Option<usize>,

    /// Number of targets extracted at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// SQLite URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Write the report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn target_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.targets.clone();
        if let Some(path) = &self.targets_file {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ids.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(String::from),
            );
        }
        Ok(ids)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,engagement=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let target_ids = args.target_ids()?;
    if target_ids.is_empty() {
        bail!("No targets given; pass ids or --targets-file");
    }

    let mut config = RunConfig::from_env().context("Failed to load configuration")?;
    if let Some(limit) = args.max_results {
        config.max_results_per_target = Some(limit);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency_limit = concurrency;
    }
    if let Some(url) = args.database_url.clone() {
        config.database_url = Some(url);
    }

    let bulk_config = config.bulk_config().context("Invalid run configuration")?;
    let source = build_source(&config)?;
    let store = build_store(&config).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight targets");
            shutdown.cancel();
        }
    });

    info!(targets = target_ids.len(), source = source.name(), "Starting extraction run");
    let orchestrator = BulkOrchestrator::new(source, store, bulk_config);
    let batch = orchestrator.run_with_cancel(target_ids, &cancel).await;

    info!(
        run_id = %batch.run_id,
        succeeded = batch.success_count(),
        failed = batch.failure_count(),
        skipped = batch.skipped.len(),
        "Extraction run finished"
    );

    let json = Report::from_batch(&batch)
        .to_json()
        .context("Failed to serialize report")?;
    match &args.report {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn build_source(config: &RunConfig) -> Result<Arc<dyn EngagementSource>> {
    let credentials = config.credentials().context("Invalid API credentials")?;
    let http = HttpEngagementSource::new(credentials).context("Failed to build HTTP client")?;

    let source: Arc<dyn EngagementSource> = match config.requests_per_second {
        Some(rps) => Arc::new(
            RateLimitedSource::new(http, rps).context("Invalid REQUESTS_PER_SECOND")?,
        ),
        None => Arc::new(http),
    };
    Ok(source)
}

#[cfg(feature = "sqlite")]
async fn build_store(config: &RunConfig) -> Result<Arc<dyn EngagementStore>> {
    match &config.database_url {
        Some(url) => {
            let store = engagement::SqliteStore::new(url)
                .await
                .context("Failed to open database")?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
async fn build_store(config: &RunConfig) -> Result<Arc<dyn EngagementStore>> {
    if config.database_url.is_some() {
        warn!("Built without the sqlite feature; keeping results in memory");
    }
    Ok(Arc::new(MemoryStore::new()))
}
