//! Main trading loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use super::monitor::{OpenOrderMonitor, PollOutcome};
use crate::arbitrage::{detect, ExecutorStats, LastPrices, OrderExecutor, PlacementOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::exchange::{Balance, ExchangeAdapter};
use crate::metrics;
use crate::orderbook::BookTop;

/// What a single iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Waited on open orders instead of trading.
    AwaitedOpenOrders(PollOutcome),
    /// Books evaluated, nothing actionable.
    NoOpportunity,
    /// An opportunity was placed, or logged in mock mode.
    Placed,
}

/// Counters accumulated over the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Iterations attempted.
    pub iterations: u64,
    /// Forced cancel sweeps of stale orders.
    pub forced_cancels: u64,
    /// Placement counters.
    pub executor: ExecutorStats,
}

/// Single-route trading engine.
///
/// Each iteration either babysits outstanding orders or takes a fresh
/// market snapshot, evaluates the route and places the three legs.
pub struct Engine {
    config: Config,
    adapter: Arc<dyn ExchangeAdapter>,
    executor: OrderExecutor,
    monitor: OpenOrderMonitor,
    iterations: u64,
    forced_cancels: u64,
}

impl Engine {
    /// Build an engine over an already-connected adapter.
    pub fn new(config: Config, adapter: Arc<dyn ExchangeAdapter>) -> Self {
        let executor = OrderExecutor::new(adapter.clone(), config.mock);
        let monitor = OpenOrderMonitor::new(adapter.clone(), config.stale_order_checks);
        Self {
            config,
            adapter,
            executor,
            monitor,
            iterations: 0,
            forced_cancels: 0,
        }
    }

    /// Lifetime counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            iterations: self.iterations,
            forced_cancels: self.forced_cancels,
            executor: self.executor.stats(),
        }
    }

    /// Open-order monitor state, read-only.
    pub fn monitor(&self) -> &OpenOrderMonitor {
        &self.monitor
    }

    /// Run one iteration.
    #[instrument(skip(self), fields(iteration = self.iterations + 1))]
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.iterations += 1;
        let _timer = metrics::timer_iteration();
        metrics::inc_iterations();

        // Never stack a new order sequence on top of resting orders. Mock
        // mode places nothing real, so there is nothing to wait for.
        if !self.config.mock && self.monitor.is_outstanding() {
            metrics::inc_open_order_polls();
            let outcome = self.monitor.poll().await?;
            match &outcome {
                PollOutcome::ForcedCancel { cancelled } => {
                    metrics::inc_forced_cancels();
                    self.forced_cancels += 1;
                    warn!(cancelled = *cancelled, "stale orders force-cancelled");
                }
                PollOutcome::StillOpen { stale_checks } => {
                    debug!(stale_checks = *stale_checks, "orders still open, skipping iteration");
                }
                PollOutcome::Cleared => info!("open orders cleared, trading resumes"),
                PollOutcome::AlreadyClear => {}
            }
            return Ok(TickOutcome::AwaitedOpenOrders(outcome));
        }

        let (balance, last, books) = self.fetch_snapshot().await?;

        if self.config.mock {
            for book in &books {
                info!("{book}");
            }
        }

        let Some(opportunity) = detect(&last, &books, &balance, &self.config) else {
            return Ok(TickOutcome::NoOpportunity);
        };
        metrics::inc_opportunities_detected();

        // Place first, flip state second: even a failed placement may have
        // left legs on the book.
        let placement = self.executor.place(&opportunity).await;
        self.monitor.mark_outstanding();

        match placement {
            Ok(PlacementOutcome::Placed { order_ids }) => {
                metrics::inc_orders_placed(order_ids.len() as u64);
                Ok(TickOutcome::Placed)
            }
            Ok(PlacementOutcome::Simulated) => Ok(TickOutcome::Placed),
            Err(e) => {
                metrics::inc_orders_failed();
                Err(e.into())
            }
        }
    }

    /// Run the loop until a shutdown signal arrives.
    pub async fn run(&mut self) -> Result<()> {
        self.log_startup();

        loop {
            match self.tick().await {
                Ok(outcome) => {
                    debug!(?outcome, iteration = self.iterations, "iteration complete");
                }
                Err(e) => {
                    // One bad iteration never takes the loop down.
                    metrics::inc_iteration_failures();
                    error!(error = %e, iteration = self.iterations, "iteration failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.sleep_secs)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.log_summary();
        Ok(())
    }

    /// Fetch balance, reference prices and book tops for the route.
    async fn fetch_snapshot(&self) -> Result<(Balance, LastPrices, [BookTop; 3])> {
        let _timer = metrics::timer_snapshot_fetch();

        let tickers = self.config.tickers();
        let balance = self.adapter.get_balance(&tickers).await?;

        let (last_a, last_b, last_c) = tokio::try_join!(
            self.adapter.get_last_price(&self.config.ticker_a),
            self.adapter.get_last_price(&self.config.ticker_b),
            self.adapter.get_last_price(&self.config.ticker_c),
        )?;
        let last = LastPrices::new(last_a, last_b, last_c);

        let (book_a, book_b, book_c) = tokio::try_join!(
            self.adapter.get_book_top(&self.config.ticker_pair_a),
            self.adapter.get_book_top(&self.config.ticker_pair_b),
            self.adapter.get_book_top(&self.config.ticker_pair_c),
        )?;

        Ok((balance, last, [book_a, book_b, book_c]))
    }

    /// Log startup banner.
    fn log_startup(&self) {
        info!("========================================");
        info!("TRIANGULAR ARBITRAGE ENGINE STARTED");
        info!("========================================");
        info!("Exchange:   {}", self.config.exchange);
        info!(
            "Route:      {} -> {} -> {} -> {}",
            self.config.ticker_a, self.config.ticker_b, self.config.ticker_c, self.config.ticker_a
        );
        info!(
            "Pairs:      {} / {} / {}",
            self.config.ticker_pair_a, self.config.ticker_pair_b, self.config.ticker_pair_c
        );
        info!("Mode:       {}", if self.config.mock { "MOCK" } else { "LIVE TRADING" });
        info!("Fee ratio:  {}", self.config.fee_ratio);
        info!(
            "Min profit: {} {}",
            self.config.min_profit, self.config.valuation_currency
        );
        info!("Interval:   {}s", self.config.sleep_secs);
        info!("========================================");
    }

    /// Log final summary.
    fn log_summary(&self) {
        let stats = self.stats();
        info!("========================================");
        info!("ENGINE STOPPED - FINAL SUMMARY");
        info!("========================================");
        info!("Iterations:             {}", stats.iterations);
        info!("Opportunities detected: {}", stats.executor.opportunities_seen);
        info!("Orders placed:          {}", stats.executor.orders_placed);
        info!("Placement failures:     {}", stats.executor.placements_failed);
        info!("Forced cancels:         {}", stats.forced_cancels);
        info!("Mode:                   {}", if self.config.mock { "MOCK" } else { "LIVE TRADING" });
        info!("========================================");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("mock", &self.config.mock)
            .field("iterations", &self.iterations)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
