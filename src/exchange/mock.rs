//! In-memory exchange for unit tests and dry-runs.
//!
//! No network requests; every response is scripted through setters, and
//! every order placed or cancelled is recorded for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AdapterError;
use crate::exchange::adapter::{Balance, ExchangeAdapter};
use crate::orderbook::BookTop;
use crate::trading::OrderIntent;

/// Behavior switches for the mock.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether to fail balance requests.
    pub fail_balance: bool,
    /// Whether to fail last-price requests.
    pub fail_last_price: bool,
    /// Whether to fail book requests.
    pub fail_book: bool,
    /// Whether to reject order placement.
    pub fail_place: bool,
    /// Whether to fail order cancellation.
    pub fail_cancel: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Scriptable [`ExchangeAdapter`] backed by in-memory state.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    /// Behavior switches.
    config: MockConfig,
    /// Available funds by ticker.
    balances: Arc<Mutex<HashMap<String, Decimal>>>,
    /// Last prices by ticker.
    last_prices: Arc<Mutex<HashMap<String, Decimal>>>,
    /// Book tops by pair.
    books: Arc<Mutex<HashMap<String, BookTop>>>,
    /// Ids currently reported as open.
    open_orders: Arc<Mutex<Vec<String>>>,
    /// Every intent accepted by `place_order`.
    placed: Arc<Mutex<Vec<OrderIntent>>>,
    /// Every id accepted by `cancel_order`.
    cancelled: Arc<Mutex<Vec<String>>>,
    /// Sequence for generated order ids.
    next_order_id: Arc<Mutex<u64>>,
}

impl MockExchange {
    /// Create a mock with default behavior (everything succeeds).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom behavior switches.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Script the available funds for a ticker.
    pub fn set_balance(&self, ticker: impl Into<String>, amount: Decimal) {
        self.balances.lock().unwrap().insert(ticker.into(), amount);
    }

    /// Script the last price for a ticker.
    pub fn set_last_price(&self, ticker: impl Into<String>, price: Decimal) {
        self.last_prices.lock().unwrap().insert(ticker.into(), price);
    }

    /// Script the book top for a pair.
    pub fn set_book(&self, book: BookTop) {
        self.books.lock().unwrap().insert(book.pair.clone(), book);
    }

    /// Add an order id to the open-order listing.
    pub fn push_open_order(&self, order_id: impl Into<String>) {
        self.open_orders.lock().unwrap().push(order_id.into());
    }

    /// Intents accepted so far.
    pub fn placed_orders(&self) -> Vec<OrderIntent> {
        self.placed.lock().unwrap().clone()
    }

    /// Ids cancelled so far.
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Ids currently open.
    pub fn open_orders(&self) -> Vec<String> {
        self.open_orders.lock().unwrap().clone()
    }

    /// Clear all scripted data and recordings.
    pub fn clear(&self) {
        self.balances.lock().unwrap().clear();
        self.last_prices.lock().unwrap().clear();
        self.books.lock().unwrap().clear();
        self.open_orders.lock().unwrap().clear();
        self.placed.lock().unwrap().clear();
        self.cancelled.lock().unwrap().clear();
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn scripted_failure(endpoint: &str) -> AdapterError {
        AdapterError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockExchange {
    async fn get_balance(&self, tickers: &[&str]) -> Result<Balance, AdapterError> {
        self.simulate_latency().await;
        if self.config.fail_balance {
            return Err(Self::scripted_failure("balance"));
        }

        let balances = self.balances.lock().unwrap();
        let balance: Balance = tickers
            .iter()
            .filter_map(|t| balances.get(*t).map(|amount| (t.to_string(), *amount)))
            .collect();

        let missing = balance.missing_from(tickers);
        if !missing.is_empty() {
            return Err(AdapterError::IncompleteBalance { missing });
        }
        Ok(balance)
    }

    async fn get_last_price(&self, ticker: &str) -> Result<Decimal, AdapterError> {
        self.simulate_latency().await;
        if self.config.fail_last_price {
            return Err(Self::scripted_failure("last_price"));
        }

        self.last_prices
            .lock()
            .unwrap()
            .get(ticker)
            .copied()
            .ok_or_else(|| AdapterError::RequestFailed {
                endpoint: "last_price".to_string(),
                reason: format!("no price scripted for {ticker}"),
            })
    }

    async fn get_book_top(&self, pair: &str) -> Result<BookTop, AdapterError> {
        self.simulate_latency().await;
        if self.config.fail_book {
            return Err(Self::scripted_failure("book"));
        }

        self.books
            .lock()
            .unwrap()
            .get(pair)
            .cloned()
            .ok_or_else(|| AdapterError::RequestFailed {
                endpoint: "book".to_string(),
                reason: format!("no book scripted for {pair}"),
            })
    }

    async fn list_open_orders(&self) -> Result<Vec<String>, AdapterError> {
        self.simulate_latency().await;
        Ok(self.open_orders.lock().unwrap().clone())
    }

    async fn place_order(&self, intent: &OrderIntent) -> Result<String, AdapterError> {
        self.simulate_latency().await;
        if self.config.fail_place {
            return Err(AdapterError::Rejected {
                reason: "scripted rejection".to_string(),
            });
        }
        intent
            .validate()
            .map_err(|reason| AdapterError::Rejected { reason })?;

        let order_id = {
            let mut next = self.next_order_id.lock().unwrap();
            *next += 1;
            format!("mock-{next}")
        };

        self.placed.lock().unwrap().push(intent.clone());
        // Placed limit orders rest on the book until cancelled.
        self.open_orders.lock().unwrap().push(order_id.clone());
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), AdapterError> {
        self.simulate_latency().await;
        if self.config.fail_cancel {
            return Err(Self::scripted_failure("cancel"));
        }

        // Unknown ids cancel cleanly, mirroring the live idempotence rule.
        self.open_orders.lock().unwrap().retain(|id| id != order_id);
        self.cancelled.lock().unwrap().push(order_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Quote;
    use rust_decimal_macros::dec;

    fn test_book(pair: &str, bid: Decimal, ask: Decimal) -> BookTop {
        BookTop::new(pair, Quote::new(bid, dec!(100)), Quote::new(ask, dec!(100)))
    }

    #[tokio::test]
    async fn balance_requires_every_ticker() {
        let exchange = MockExchange::new();
        exchange.set_balance("ADA", dec!(500));
        exchange.set_balance("ETH", dec!(2));

        let err = exchange.get_balance(&["ADA", "ETH", "BTC"]).await.unwrap_err();
        assert!(matches!(err, AdapterError::IncompleteBalance { missing } if missing == ["BTC"]));

        exchange.set_balance("BTC", dec!(0.4));
        let balance = exchange.get_balance(&["ADA", "ETH", "BTC"]).await.unwrap();
        assert_eq!(balance.available("BTC"), dec!(0.4));
    }

    #[tokio::test]
    async fn placed_orders_rest_until_cancelled() {
        let exchange = MockExchange::new();
        let intent = OrderIntent::bid("ADA-ETH", dec!(0.022), dec!(100));

        let order_id = exchange.place_order(&intent).await.unwrap();
        assert_eq!(exchange.open_orders(), vec![order_id.clone()]);
        assert_eq!(exchange.placed_orders(), vec![intent]);

        exchange.cancel_order(&order_id).await.unwrap();
        assert!(exchange.open_orders().is_empty());
        assert_eq!(exchange.cancelled_orders(), vec![order_id]);
    }

    #[tokio::test]
    async fn cancel_of_unknown_id_succeeds() {
        let exchange = MockExchange::new();
        assert!(exchange.cancel_order("never-existed").await.is_ok());
        assert_eq!(exchange.cancelled_orders(), vec!["never-existed"]);
    }

    #[tokio::test]
    async fn scripted_failures_surface() {
        let exchange = MockExchange::with_config(MockConfig {
            fail_balance: true,
            ..Default::default()
        });
        exchange.set_balance("ADA", dec!(500));

        assert!(exchange.get_balance(&["ADA"]).await.is_err());
    }

    #[tokio::test]
    async fn book_lookup_uses_scripted_top() {
        let exchange = MockExchange::new();
        exchange.set_book(test_book("ETH-BTC", dec!(0.070), dec!(0.071)));

        let top = exchange.get_book_top("ETH-BTC").await.unwrap();
        assert_eq!(top.bid.price, dec!(0.070));
        assert!(exchange.get_book_top("ADA-ETH").await.is_err());
    }
}
