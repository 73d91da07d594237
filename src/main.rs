use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use catalog_harvest::{
    Bootstrap, Config, CsvSnapshotSink, Harvester, HttpFetcher, RunEnd, SearchTarget,
    cancel_on_signal,
};

/// Page through the SAMR standards catalog search and save the results as CSV
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest", version, about)]
struct Cli {
    /// Path to the JSON config file; a default one is written if it does not exist
    #[arg(short, long, env = "CATALOG_HARVEST_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Search keywords (overrides `search_keywords`); empty searches the whole catalog
    #[arg(short, long)]
    keywords: Option<String>,

    /// What to search: standards or plans (overrides `target`)
    #[arg(short, long)]
    target: Option<SearchTarget>,

    /// Directory snapshots are written under (overrides `results_dir`)
    #[arg(short, long)]
    results_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load_or_bootstrap(&cli.config).await {
        Ok(Bootstrap::Loaded(config)) => config,
        Ok(Bootstrap::Created(path)) => {
            info!(
                path = %path.display(),
                "Config file did not exist, wrote defaults. Edit it and run again"
            );
            return ExitCode::SUCCESS;
        }
        Err(e) if e.is_fatal() => {
            error!(error = %e, path = %cli.config.display(), "Invalid config file");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(error = %e, path = %cli.config.display(), "Failed to read config file");
            return ExitCode::FAILURE;
        }
    };

    if let Some(keywords) = cli.keywords {
        config.search_keywords = keywords;
    }
    if let Some(target) = cli.target {
        config.target = target;
    }
    if let Some(results_dir) = cli.results_dir {
        config.results_dir = results_dir;
    }

    let fetcher = match HttpFetcher::new(&config.http) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Failed to set up HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let sink = CsvSnapshotSink::new(&config.results_dir);
    let harvester = match Harvester::from_config(fetcher, sink, &config) {
        Ok(harvester) => harvester,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let signal_task = cancel_on_signal(cancel.clone());

    let report = harvester.run(cancel.clone()).await;
    cancel.cancel();
    signal_task.await.ok();

    if report.end == RunEnd::PageLimit {
        warn!(
            max_pages = config.pagination.max_pages,
            "Stopped at the page limit; results may be incomplete"
        );
    }
    if !report.abandoned_pages.is_empty() {
        warn!(pages = ?report.abandoned_pages, "Some pages were skipped after repeated failures");
    }

    match report.snapshot {
        Some(path) => {
            info!(
                records = report.records,
                pages = report.pages_fetched,
                path = %path.display(),
                "Results saved"
            );
            ExitCode::SUCCESS
        }
        None => {
            error!(records = report.records, "Final snapshot could not be written");
            ExitCode::FAILURE
        }
    }
}
