//! Order placement for detected opportunities.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use super::detector::Opportunity;
use crate::error::AdapterError;
use crate::exchange::ExchangeAdapter;
use crate::metrics;

/// Result of handing an opportunity to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// All three legs accepted; exchange order ids in leg order.
    Placed {
        /// Ids returned by the exchange.
        order_ids: Vec<String>,
    },
    /// Mock mode, nothing was sent.
    Simulated,
}

/// Places the three-leg order sequence and tracks placement counters.
#[derive(Clone)]
pub struct OrderExecutor {
    /// Exchange the orders go to.
    adapter: Arc<dyn ExchangeAdapter>,
    /// Mock mode: log the legs instead of sending them.
    mock: bool,
    /// Opportunities handed to `place`.
    pub opportunities_seen: u64,
    /// Individual legs accepted by the exchange.
    pub orders_placed: u64,
    /// Individual legs that failed to place.
    pub placements_failed: u64,
}

impl OrderExecutor {
    /// Create an executor over the given adapter.
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, mock: bool) -> Self {
        Self {
            adapter,
            mock,
            opportunities_seen: 0,
            orders_placed: 0,
            placements_failed: 0,
        }
    }

    /// Place all three legs of an opportunity.
    ///
    /// Legs are submitted concurrently and every result is logged before the
    /// first failure is surfaced. A leg that placed before another failed is
    /// not cancelled here; it shows up on the next open-order poll.
    #[instrument(skip(self, opportunity), fields(route = %opportunity.route()))]
    pub async fn place(
        &mut self,
        opportunity: &Opportunity,
    ) -> Result<PlacementOutcome, AdapterError> {
        self.opportunities_seen += 1;
        self.log_opportunity(opportunity);

        if self.mock {
            info!("MOCK MODE - orders not sent");
            return Ok(PlacementOutcome::Simulated);
        }

        let start = Instant::now();
        let (a, b, c) = tokio::join!(
            self.adapter.place_order(&opportunity.intents[0]),
            self.adapter.place_order(&opportunity.intents[1]),
            self.adapter.place_order(&opportunity.intents[2]),
        );
        metrics::record_order_place_latency(start);

        let mut order_ids = Vec::with_capacity(3);
        let mut first_error = None;
        for (intent, result) in opportunity.intents.iter().zip([a, b, c]) {
            match result {
                Ok(order_id) => {
                    info!(
                        pair = %intent.pair,
                        side = %intent.side,
                        order_id = %order_id,
                        "order placed"
                    );
                    self.orders_placed += 1;
                    order_ids.push(order_id);
                }
                Err(e) => {
                    error!(
                        pair = %intent.pair,
                        side = %intent.side,
                        error = %e,
                        "order placement failed"
                    );
                    self.placements_failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(PlacementOutcome::Placed { order_ids }),
        }
    }

    /// Log opportunity details.
    fn log_opportunity(&self, opportunity: &Opportunity) {
        let evaluation = &opportunity.evaluation;
        info!("========================================");
        info!("TRIANGULAR OPPORTUNITY DETECTED");
        info!("========================================");
        info!("Route:            {}", evaluation.route);
        info!("Bid factor:       {}", evaluation.bid_factor);
        info!("Ask factor:       {}", evaluation.ask_factor);
        info!("----------------------------------------");
        for intent in &opportunity.intents {
            info!(
                "{:<4} {} {} @ {}",
                intent.side.to_string(),
                intent.amount,
                intent.pair,
                intent.price
            );
        }
        info!("----------------------------------------");
        info!("Gross profit:     {}", evaluation.profit);
        info!("Fee:              {}", evaluation.fee);
        info!("NET PROFIT:       {}", evaluation.net_profit);
        info!("========================================");
    }

    /// Get statistics summary.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            opportunities_seen: self.opportunities_seen,
            orders_placed: self.orders_placed,
            placements_failed: self.placements_failed,
        }
    }
}

impl std::fmt::Debug for OrderExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderExecutor")
            .field("mock", &self.mock)
            .field("opportunities_seen", &self.opportunities_seen)
            .field("orders_placed", &self.orders_placed)
            .field("placements_failed", &self.placements_failed)
            .finish_non_exhaustive()
    }
}

/// Executor statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Opportunities handed to the executor.
    pub opportunities_seen: u64,
    /// Individual legs accepted by the exchange.
    pub orders_placed: u64,
    /// Individual legs that failed to place.
    pub placements_failed: u64,
}
