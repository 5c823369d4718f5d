//! Unified error types for the arbitrage engine.

use thiserror::Error;

use crate::trading::Side;

/// Unified error type for the arbitrage engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Exchange adapter error.
    #[error("exchange error: {0}")]
    Adapter(#[from] AdapterError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),

    /// Config file could not be read or parsed.
    #[error("failed to load config file {path}: {reason}")]
    FileLoad {
        /// Path that failed to load.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Key file could not be read or parsed.
    #[error("failed to load key file {path}: {reason}")]
    KeyFile {
        /// Path that failed to load.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Config failed semantic validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// No adapter registered for the configured exchange id.
    #[error("unknown exchange: {exchange}")]
    UnknownExchange {
        /// The unrecognized exchange id.
        exchange: String,
    },
}

/// Exchange adapter errors.
///
/// Every adapter operation fails with one of these; the control loop treats
/// any of them as a whole-iteration failure. Conditions the engine may want
/// to tell apart in logs (missing balances, empty books) get their own
/// variants rather than riding on transport errors.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Authentication or signing failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited by the API.
    #[error("rate limited on {endpoint}")]
    RateLimited {
        /// Endpoint that returned 429.
        endpoint: String,
    },

    /// Request reached the exchange but was not served.
    #[error("request to {endpoint} failed: {reason}")]
    RequestFailed {
        /// Endpoint that failed.
        endpoint: String,
        /// Reason for failure.
        reason: String,
    },

    /// Response could not be parsed or contained invalid values.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        /// Endpoint that produced the response.
        endpoint: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Account listing did not cover every tracked ticker.
    #[error("balance listing missing tickers: {missing:?}")]
    IncompleteBalance {
        /// Tickers absent from the account listing.
        missing: Vec<String>,
    },

    /// Order book has no resting orders on one side.
    #[error("empty {side} side of book for {pair}")]
    EmptyBook {
        /// Pair whose book was fetched.
        pair: String,
        /// Side with no liquidity.
        side: Side,
    },

    /// Order rejected by the exchange.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Rejection reason from the exchange.
        reason: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
