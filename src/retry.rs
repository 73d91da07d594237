//! Per-page retry accounting and the blocked-state wait protocol
//!
//! Two failure families share one retry budget but recover differently:
//!
//! - **Transient failures** (dropped connections, unreadable bodies) are retried
//!   immediately on the same page.
//! - **Blocks** are time-gated by the remote, so the controller sits out fixed
//!   cool-down intervals and probes the same page after each one. Only a block that
//!   outlasts the whole wait budget is charged as a failure.
//!
//! Once a page has failed `threshold` times in a row it is abandoned and the counter
//! starts fresh for the next page.
//!
//! # Example
//!
//! ```
//! use catalog_harvest::retry::{RetryDecision, RetryState};
//!
//! let mut state = RetryState::new(3);
//! assert_eq!(state.record_failure(), RetryDecision::RetrySamePage);
//! assert_eq!(state.record_failure(), RetryDecision::RetrySamePage);
//! assert_eq!(state.record_failure(), RetryDecision::AbandonPage);
//! assert_eq!(state.consecutive_failures(), 0);
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::types::PageOutcome;

/// What the pagination controller should do after a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Fetch the same page again
    RetrySamePage,
    /// Give up on this page and move to the next one
    AbandonPage,
}

/// Result of [`RetryState::await_unblock`]
#[derive(Debug, PartialEq)]
pub enum UnblockOutcome {
    /// A probe returned something other than `Blocked`; the caller handles it as if
    /// it were the page's fetch result
    Unblocked(PageOutcome),
    /// Every wait interval elapsed while still blocked; charged as one failure
    Exhausted(RetryDecision),
    /// Cancellation was observed during a wait; no further probe was sent
    Cancelled,
}

/// Consecutive-failure counter for the page currently being fetched
///
/// Owned by the pagination controller and passed by `&mut`, never shared, so one run
/// cannot leak retry state into another.
#[derive(Clone, Debug)]
pub struct RetryState {
    consecutive_failures: u32,
    threshold: u32,
}

impl RetryState {
    /// Create a counter that abandons a page after `threshold` consecutive failures
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// Failures recorded since the last success or abandonment
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Configured threshold
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// A page was fetched successfully
    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            debug!(
                failures = self.consecutive_failures,
                "Page recovered, resetting retry counter"
            );
        }
        self.consecutive_failures = 0;
    }

    /// A fetch attempt failed; decide whether to retry or abandon the page
    ///
    /// Returns [`RetryDecision::AbandonPage`] on the `threshold`-th consecutive failure
    /// and resets the counter so the next page starts with a full budget.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.consecutive_failures += 1;
        warn!(
            failures = self.consecutive_failures,
            threshold = self.threshold,
            "Failed to retrieve page"
        );

        if self.consecutive_failures < self.threshold {
            RetryDecision::RetrySamePage
        } else {
            self.consecutive_failures = 0;
            RetryDecision::AbandonPage
        }
    }

    /// Sit out a block, probing the same page after each cool-down interval
    ///
    /// Sleeps `config.block_wait_interval` up to `config.block_wait_rounds` times.
    /// After each interval `probe` is awaited once; the first non-`Blocked` result is
    /// returned as [`UnblockOutcome::Unblocked`]. If every probe is still blocked the
    /// block is charged through [`record_failure`](Self::record_failure).
    ///
    /// The cancellation token is raced against every interval, so an interrupt ends
    /// the wait without sending another request.
    pub async fn await_unblock<F, Fut>(
        &mut self,
        config: &RetryConfig,
        cancel: &CancellationToken,
        mut probe: F,
    ) -> UnblockOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PageOutcome>,
    {
        warn!(
            interval_secs = config.block_wait_interval.as_secs_f64(),
            rounds = config.block_wait_rounds,
            "Remote is blocking requests, waiting for the block to lift"
        );

        for round in 1..=config.block_wait_rounds {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(round, "Cancelled while waiting for block to lift");
                    return UnblockOutcome::Cancelled;
                }
                _ = tokio::time::sleep(config.block_wait_interval) => {}
            }
            info!(round, of = config.block_wait_rounds, "Block wait interval elapsed, probing");

            match probe().await {
                PageOutcome::Blocked { code, message } => {
                    debug!(round, %code, %message, "Retrieval still being blocked");
                }
                outcome => {
                    info!(round, outcome = outcome.kind(), "Retrieval no longer blocked");
                    return UnblockOutcome::Unblocked(outcome);
                }
            }
        }

        warn!(
            rounds = config.block_wait_rounds,
            "Block did not lift within the wait budget"
        );
        UnblockOutcome::Exhausted(self.record_failure())
    }
}

/// Draw the pause before the next page uniformly from `[min, max]`
///
/// Randomized pacing keeps the request rhythm from looking scripted to the remote's
/// abuse detection. An inverted range collapses to `min`.
pub fn page_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let millis = rng.gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}
