//! The adapter trait every exchange implementation satisfies.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AdapterError;
use crate::orderbook::BookTop;
use crate::trading::OrderIntent;

/// Available funds per ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balance(HashMap<String, Decimal>);

impl Balance {
    /// Create an empty balance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the available amount for a ticker.
    pub fn insert(&mut self, ticker: impl Into<String>, amount: Decimal) {
        self.0.insert(ticker.into(), amount);
    }

    /// Available amount for a ticker, zero if untracked.
    pub fn available(&self, ticker: &str) -> Decimal {
        self.0.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    /// Tickers from `wanted` that this balance does not cover.
    pub fn missing_from(&self, wanted: &[&str]) -> Vec<String> {
        wanted
            .iter()
            .filter(|t| !self.0.contains_key(**t))
            .map(|t| t.to_string())
            .collect()
    }

    /// Number of tracked tickers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no tickers are tracked.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for Balance {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Uniform capability surface over one exchange.
///
/// Implementations must tolerate several operations in flight at once on a
/// shared instance; the engine fans out independent reads within an
/// iteration. Any error is treated by the caller as a whole-iteration
/// failure, so implementations should prefer failing loudly over returning
/// partial data.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync + std::fmt::Debug {
    /// Fetch available funds for every ticker in `tickers`.
    ///
    /// Fails with [`AdapterError::IncompleteBalance`] when the account
    /// listing does not cover all of them.
    async fn get_balance(&self, tickers: &[&str]) -> Result<Balance, AdapterError>;

    /// Last traded price of `ticker` against the valuation currency.
    async fn get_last_price(&self, ticker: &str) -> Result<Decimal, AdapterError>;

    /// Best bid and ask for `pair`.
    ///
    /// Fails with [`AdapterError::EmptyBook`] when either side has no
    /// resting orders.
    async fn get_book_top(&self, pair: &str) -> Result<BookTop, AdapterError>;

    /// Ids of all currently open orders on the account.
    async fn list_open_orders(&self) -> Result<Vec<String>, AdapterError>;

    /// Submit a limit order; returns the exchange-assigned order id.
    async fn place_order(&self, intent: &OrderIntent) -> Result<String, AdapterError>;

    /// Cancel an open order.
    ///
    /// Idempotent: cancelling an id the exchange no longer knows (already
    /// filled or already cancelled) succeeds.
    async fn cancel_order(&self, order_id: &str) -> Result<(), AdapterError>;
}
