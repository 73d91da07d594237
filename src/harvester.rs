//! Pagination controller
//!
//! Drives one run from page 1 until the remote returns an empty page, the page-count
//! safety bound is reached, or the run is cancelled. Per page:
//!
//! ```text
//! Fetching(n) ── Rows ──────────────▶ append, maybe checkpoint ──▶ Advancing(n+1)
//!      │      ── EndOfStream ───────▶ Done
//!      │      ── Blocked ───────────▶ wait + probe ──▶ (probe result handled as above)
//!      │      ── Transient/Malformed▶ Retrying(n) ──▶ Fetching(n) | Advancing(n+1)
//!      └────── cancelled ───────────▶ Done
//! ```
//!
//! The loop is strictly sequential: one request in flight, one page fully processed
//! before the next begins. The result set and the retry counter are local to
//! [`Harvester::run`] and owned by it alone.
//!
//! Whatever the exit path, the final snapshot is written before `run` returns.

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::config::{Config, PaginationConfig, RetryConfig};
use crate::error::Result;
use crate::fetch::{PageFetcher, PageRequest};
use crate::normalize::normalize_page;
use crate::retry::{RetryDecision, RetryState, UnblockOutcome, page_delay};
use crate::sink::SnapshotSink;
use crate::types::{CanonicalRecord, PageOutcome, RunEnd, RunId, RunReport, SearchTarget};

/// What the loop does after handling one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// The page is finished (appended or abandoned); move on
    Advance,
    /// Fetch the same page again
    Retry,
    /// Leave the loop
    Finish(RunEnd),
}

/// Mutable state of one run, owned by [`Harvester::run`]
struct RunState {
    records: Vec<CanonicalRecord>,
    retry: RetryState,
    abandoned_pages: Vec<u32>,
    pages_fetched: u32,
}

impl RunState {
    fn new(threshold: u32) -> Self {
        Self {
            records: Vec::new(),
            retry: RetryState::new(threshold),
            abandoned_pages: Vec::new(),
            pages_fetched: 0,
        }
    }
}

/// One harvest run over a fixed keyword/target pair
///
/// Generic over the fetch and storage collaborators so the loop can be driven by
/// scripted fetchers and in-memory sinks in tests.
pub struct Harvester<F, S>
where
    F: PageFetcher,
    S: SnapshotSink,
{
    fetcher: F,
    sink: S,
    keywords: String,
    target: SearchTarget,
    pagination: PaginationConfig,
    retry: RetryConfig,
}

impl<F, S> Harvester<F, S>
where
    F: PageFetcher,
    S: SnapshotSink,
{
    /// Create a harvester with default pagination and retry settings
    pub fn new(fetcher: F, sink: S, keywords: impl Into<String>, target: SearchTarget) -> Self {
        Self {
            fetcher,
            sink,
            keywords: keywords.into(),
            target,
            pagination: PaginationConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Create a harvester from a full configuration
    ///
    /// # Errors
    ///
    /// Returns the validation error if the configuration is unusable. This is the only
    /// fatal path of a run and it happens before any request is sent.
    pub fn from_config(fetcher: F, sink: S, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(fetcher, sink, config.search_keywords.clone(), config.target)
            .with_pagination(config.pagination.clone())
            .with_retry(config.retry.clone()))
    }

    /// Override pagination settings
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Override retry settings
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Consume the harvester, returning its fetcher
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Identifier used for this run's snapshots
    pub fn run_id(&self) -> RunId {
        RunId::new(&self.keywords, self.target)
    }

    /// Fetch and classify one page; transport errors become `TransientFailure`
    async fn fetch_outcome(&self, page: u32) -> PageOutcome {
        let request = PageRequest {
            target: self.target,
            keywords: &self.keywords,
            page,
        };
        match self.fetcher.fetch_page(request).await {
            Ok(body) => classify(&body, self.target),
            Err(e) => PageOutcome::TransientFailure {
                cause: e.to_string(),
            },
        }
    }

    /// Run until end of stream, the page bound, or cancellation
    ///
    /// Page-level failures never surface as errors: they are retried, waited out or
    /// abandoned. The returned report says how the run ended and where the final
    /// snapshot landed.
    pub async fn run(&self, cancel: CancellationToken) -> RunReport {
        self.run_from(1, cancel).await
    }

    async fn run_from(&self, first_page: u32, cancel: CancellationToken) -> RunReport {
        let run_id = self.run_id();
        let mut state = RunState::new(self.retry.threshold);
        let mut page = first_page;

        info!(
            run_id = %run_id,
            keywords = %self.keywords,
            target = %self.target,
            max_pages = self.pagination.max_pages,
            "Starting harvest"
        );

        let end = loop {
            if cancel.is_cancelled() {
                warn!(page, "Interrupt received, stopping and saving results");
                break RunEnd::Cancelled;
            }
            if page > self.pagination.max_pages {
                warn!(
                    max_pages = self.pagination.max_pages,
                    "Reached page limit without an empty page"
                );
                break RunEnd::PageLimit;
            }

            let step = match self.fetch_outcome(page).await {
                PageOutcome::Blocked { code, message } => {
                    warn!(page, %code, %message, "Remote blocked the request");
                    match state
                        .retry
                        .await_unblock(&self.retry, &cancel, || self.fetch_outcome(page))
                        .await
                    {
                        UnblockOutcome::Unblocked(outcome) => {
                            self.handle(&mut state, &run_id, page, outcome).await
                        }
                        UnblockOutcome::Exhausted(decision) => {
                            self.apply_decision(decision, page, &mut state)
                        }
                        UnblockOutcome::Cancelled => Step::Finish(RunEnd::Cancelled),
                    }
                }
                outcome => self.handle(&mut state, &run_id, page, outcome).await,
            };

            match step {
                Step::Finish(end) => break end,
                Step::Retry => debug!(page, "Retrying page"),
                Step::Advance => {
                    let Some(next) = page.checked_add(1) else {
                        warn!(page, "Page counter exhausted");
                        break RunEnd::PageLimit;
                    };
                    page = next;
                    if !self.pause(&cancel).await {
                        warn!(page, "Interrupt received, stopping and saving results");
                        break RunEnd::Cancelled;
                    }
                }
            }
        };

        let snapshot = self.flush(&run_id, &state.records, "final").await;
        info!(
            run_id = %run_id,
            end = ?end,
            records = state.records.len(),
            pages = state.pages_fetched,
            abandoned = state.abandoned_pages.len(),
            "Harvest finished"
        );

        RunReport {
            run_id,
            end,
            pages_fetched: state.pages_fetched,
            abandoned_pages: state.abandoned_pages,
            records: state.records.len(),
            snapshot,
        }
    }

    /// Act on one page outcome that is not (or is no longer) a block
    async fn handle(
        &self,
        state: &mut RunState,
        run_id: &RunId,
        page: u32,
        outcome: PageOutcome,
    ) -> Step {
        let decision = match outcome {
            PageOutcome::Rows(rows) => {
                state.retry.record_success();
                state.records.extend(normalize_page(&rows, self.target));
                state.pages_fetched += 1;
                info!(
                    page,
                    rows = rows.len(),
                    total = state.records.len(),
                    "Page retrieved"
                );
                if self.is_checkpoint(page) {
                    self.flush(run_id, &state.records, "checkpoint").await;
                }
                return Step::Advance;
            }
            PageOutcome::EndOfStream => {
                state.retry.record_success();
                info!(page, "No more results, finishing retrieval");
                return Step::Finish(RunEnd::EndOfStream);
            }
            PageOutcome::Blocked { code, message } => {
                // await_unblock never hands back a block, but a stray one still costs a try
                warn!(page, %code, %message, "Still blocked");
                state.retry.record_failure()
            }
            PageOutcome::TransientFailure { cause } => {
                warn!(page, %cause, "Failed to connect to host server");
                state.retry.record_failure()
            }
            PageOutcome::MalformedResponse { body } => {
                warn!(page, %body, "Unrecognized response body");
                state.retry.record_failure()
            }
        };
        self.apply_decision(decision, page, state)
    }

    fn apply_decision(&self, decision: RetryDecision, page: u32, state: &mut RunState) -> Step {
        match decision {
            RetryDecision::RetrySamePage => Step::Retry,
            RetryDecision::AbandonPage => {
                error!(
                    page,
                    threshold = state.retry.threshold(),
                    "Failed to retrieve page, threshold exceeded; skipping it"
                );
                state.abandoned_pages.push(page);
                Step::Advance
            }
        }
    }

    fn is_checkpoint(&self, page: u32) -> bool {
        let every = self.pagination.checkpoint_every.max(1);
        page % every == every - 1
    }

    /// Randomized pause before the next page; `false` if cancelled while waiting
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        let delay = page_delay(
            self.pagination.min_page_delay,
            self.pagination.max_page_delay,
        );
        debug!(delay_ms = delay.as_millis() as u64, "Sleeping before next page");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Write a snapshot; failures are logged and swallowed
    async fn flush(&self, run_id: &RunId, records: &[CanonicalRecord], reason: &str) -> Option<PathBuf> {
        match self.sink.write_snapshot(run_id, self.target, records).await {
            Ok(path) => {
                info!(reason, path = %path.display(), records = records.len(), "Saved snapshot");
                Some(path)
            }
            Err(e) => {
                error!(reason, error = %e, records = records.len(), "Failed to save snapshot");
                None
            }
        }
    }
}
