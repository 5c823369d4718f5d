//! Single-exchange triangular arbitrage engine.
//!
//! Watches one A->B->C->A currency loop on a single exchange, prices both
//! directions around the loop from top-of-book quotes and places all three
//! limit orders when the round trip nets more than a configured threshold.
//!
//! # Strategy
//!
//! Multiply one unit of value around the loop; if it comes back above 1 the
//! books are momentarily inconsistent:
//!
//! ```text
//! ADA-ETH ask: 0.022
//! ETH-BTC ask: 0.071
//! ADA-BTC bid: 0.0016
//! ────────────────────
//! (1 / 0.022) / 0.071 * 0.0016 = 1.0243 > 1 ✅
//! ```
//!
//! Both directions are priced each iteration: the bid route buys A with B,
//! buys B with C and sells A for C; the ask route is the mirror image.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment or file
//! - [`error`]: Unified error types
//! - [`exchange`]: Exchange adapters and credentials
//! - [`orderbook`]: Top-of-book snapshots
//! - [`arbitrage`]: Route evaluation, sizing and order placement
//! - [`engine`]: Trading loop and open-order supervision
//! - [`trading`]: Order types
//! - [`metrics`]: Prometheus metrics

pub mod arbitrage;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod orderbook;
pub mod trading;

pub use config::Config;
pub use error::{EngineError, Result};
