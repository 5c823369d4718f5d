//! Open-order supervision between iterations.
//!
//! Placed limit orders are expected to fill quickly. The monitor watches the
//! exchange's open-order list and, once the same orders have survived too
//! many checks, cancels everything it tracks so the engine can trade again.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::error::AdapterError;
use crate::exchange::ExchangeAdapter;

/// Open-order state carried between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    /// No orders believed open.
    Clear,
    /// Orders may be resting; counts consecutive polls that saw them.
    Outstanding {
        /// Consecutive polls that found open orders.
        stale_checks: u32,
    },
}

/// Result of one monitor poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing tracked as open; no request made.
    AlreadyClear,
    /// The open-order list came back empty; state reset.
    Cleared,
    /// Open orders seen again; stale count now at `stale_checks`.
    StillOpen {
        /// Consecutive polls that found open orders.
        stale_checks: u32,
    },
    /// Stale threshold hit; every tracked order was cancelled.
    ForcedCancel {
        /// Number of orders swept.
        cancelled: usize,
    },
}

/// Tracks resting orders and sweeps them once they go stale.
pub struct OpenOrderMonitor {
    /// Exchange the open-order list comes from.
    adapter: Arc<dyn ExchangeAdapter>,
    /// Current open-order state.
    state: OrderState,
    /// Ids seen open on the most recent poll.
    tracked: Vec<String>,
    /// Consecutive stale polls tolerated before a forced cancel.
    max_stale_checks: u32,
}

impl OpenOrderMonitor {
    /// Create a monitor over the given adapter.
    ///
    /// Starts in [`OrderState::Outstanding`]: anything resting on the book
    /// from a previous run is drained before the first order goes out.
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, max_stale_checks: u32) -> Self {
        Self {
            adapter,
            state: OrderState::Outstanding { stale_checks: 0 },
            tracked: Vec::new(),
            max_stale_checks,
        }
    }

    /// Current state.
    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Whether orders are believed to be resting.
    pub fn is_outstanding(&self) -> bool {
        matches!(self.state, OrderState::Outstanding { .. })
    }

    /// Order ids seen open on the most recent poll.
    pub fn tracked(&self) -> &[String] {
        &self.tracked
    }

    /// Flag that orders were just sent, resetting the stale count.
    ///
    /// Called after every placement attempt, successful or not: a failed
    /// attempt may still have left legs on the book.
    pub fn mark_outstanding(&mut self) {
        self.state = OrderState::Outstanding { stale_checks: 0 };
    }

    /// Check on outstanding orders, sweeping them once they go stale.
    #[instrument(skip(self))]
    pub async fn poll(&mut self) -> Result<PollOutcome, AdapterError> {
        let stale_checks = match self.state {
            OrderState::Clear => return Ok(PollOutcome::AlreadyClear),
            OrderState::Outstanding { stale_checks } => stale_checks,
        };

        // Threshold check comes before the status poll so a stuck book is
        // swept even if this poll would fail.
        if stale_checks >= self.max_stale_checks {
            let cancelled = self.cancel_tracked().await?;
            return Ok(PollOutcome::ForcedCancel { cancelled });
        }

        let open = self.adapter.list_open_orders().await?;
        if open.is_empty() {
            info!("open orders drained");
            self.state = OrderState::Clear;
            self.tracked.clear();
            return Ok(PollOutcome::Cleared);
        }

        let stale_checks = stale_checks + 1;
        warn!(
            open = open.len(),
            stale_checks, "orders still open, holding back"
        );
        self.tracked = open;
        self.state = OrderState::Outstanding { stale_checks };
        Ok(PollOutcome::StillOpen { stale_checks })
    }

    /// Cancel every tracked order concurrently.
    ///
    /// On any cancel failure the state is left untouched so the next poll
    /// retries the sweep.
    async fn cancel_tracked(&mut self) -> Result<usize, AdapterError> {
        let ids = self.tracked.clone();
        warn!(count = ids.len(), "stale threshold hit, cancelling tracked orders");

        let results = join_all(ids.iter().map(|id| self.adapter.cancel_order(id))).await;

        let mut first_error = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => info!(order_id = %id, "order cancelled"),
                Err(e) => {
                    warn!(order_id = %id, error = %e, "cancel failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.state = OrderState::Clear;
        self.tracked.clear();
        Ok(ids.len())
    }
}

impl std::fmt::Debug for OpenOrderMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenOrderMonitor")
            .field("state", &self.state)
            .field("tracked", &self.tracked)
            .field("max_stale_checks", &self.max_stale_checks)
            .finish_non_exhaustive()
    }
}
