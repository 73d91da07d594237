//! # catalog-harvest
//!
//! Resumable, throttle-aware harvester for the SAMR national standards catalog search.
//!
//! A run pages through one search (standards or plans) from page 1 until the remote
//! returns an empty page, normalizing every row into a typed record and periodically
//! writing the full result set to a CSV snapshot.
//!
//! ## Design
//!
//! - **Sequential** - One request in flight; pacing is a randomized pause between pages
//! - **Throttle-aware** - Blocks are waited out in fixed intervals, transient failures are
//!   retried, and a page that keeps failing is skipped rather than ending the run
//! - **Crash-tolerant** - Snapshots are whole-set and atomically replaced, so an
//!   interrupted run leaves at most `checkpoint_every` pages unsaved
//! - **Interruptible** - A [`CancellationToken`] stops the run at the next page boundary
//!   or mid-wait, and the final snapshot is still written
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_harvest::{Config, CsvSnapshotSink, Harvester, HttpFetcher, SearchTarget};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         search_keywords: "dairy".to_string(),
//!         target: SearchTarget::Standards,
//!         ..Default::default()
//!     };
//!
//!     let fetcher = HttpFetcher::new(&config.http)?;
//!     let sink = CsvSnapshotSink::new(&config.results_dir);
//!     let harvester = Harvester::from_config(fetcher, sink, &config)?;
//!
//!     let cancel = CancellationToken::new();
//!     catalog_harvest::cancel_on_signal(cancel.clone());
//!
//!     let report = harvester.run(cancel).await;
//!     println!("{} records, ended with {:?}", report.records, report.end);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Response classification
pub mod classify;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// HTTP page fetching
pub mod fetch;
/// Pagination controller
pub mod harvester;
/// Record normalization
pub mod normalize;
/// Retry accounting and block waits
pub mod retry;
/// Snapshot persistence
pub mod sink;
/// Core types
pub mod types;

pub use classify::classify;
pub use config::{Bootstrap, Config, HttpConfig, PaginationConfig, RetryConfig};
pub use error::{Error, Result};
pub use fetch::{HttpFetcher, PageFetcher, PageRequest};
pub use harvester::Harvester;
pub use normalize::normalize;
pub use sink::{CsvSnapshotSink, SnapshotSink};
pub use types::{CanonicalRecord, PageOutcome, RunEnd, RunId, RunReport, SearchTarget};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives SIGTERM or SIGINT (Ctrl+C elsewhere)
///
/// Spawns a background task and returns immediately. Must be called from within a
/// Tokio runtime.
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::warn!("Interrupt received, finishing current page and saving results");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
