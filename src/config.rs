//! Engine configuration and exchange credentials.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;

/// Engine configuration.
///
/// Loaded once at startup from a JSON file or from `TRIARB_`-prefixed
/// environment variables, then treated as immutable.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Exchange ===
    /// Exchange id selecting the adapter implementation (e.g. "coinbase").
    pub exchange: String,

    /// Path to the JSON key file with API credentials.
    #[serde(default)]
    pub key_file: Option<String>,

    // === Route ===
    /// First ticker of the loop (A in A->B->C->A).
    pub ticker_a: String,

    /// Second ticker of the loop.
    pub ticker_b: String,

    /// Third ticker of the loop.
    pub ticker_c: String,

    /// Pair trading A against B, formatted "A-B".
    pub ticker_pair_a: String,

    /// Pair trading B against C, formatted "B-C".
    pub ticker_pair_b: String,

    /// Pair trading A against C, formatted "A-C".
    pub ticker_pair_c: String,

    // === Trading Parameters ===
    /// Flat fee ratio applied to traded notional.
    #[serde(default = "default_fee_ratio")]
    pub fee_ratio: Decimal,

    /// Minimum net profit (in the valuation currency) to act on.
    #[serde(default = "default_min_profit")]
    pub min_profit: Decimal,

    /// Quote currency used for reference prices and profit thresholds.
    #[serde(default = "default_valuation_currency")]
    pub valuation_currency: String,

    // === Operation Modes ===
    /// Mock mode (no real orders).
    #[serde(default = "default_true")]
    pub mock: bool,

    /// Seconds to sleep between iterations.
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,

    /// Consecutive stale open-order checks before a forced cancel-all.
    #[serde(default = "default_stale_order_checks")]
    pub stale_order_checks: u32,

    // === Observability ===
    /// Expose a Prometheus scrape endpoint.
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Port for the Prometheus scrape endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_fee_ratio() -> Decimal {
    Decimal::new(50, 4) // 0.0050
}

fn default_min_profit() -> Decimal {
    Decimal::new(3, 1) // 0.3
}

fn default_valuation_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sleep_secs() -> u64 {
    5
}

fn default_stale_order_checks() -> u32 {
    5
}

fn default_metrics_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from the environment, reading .env first.
    ///
    /// Variables are prefixed `TRIARB_` (e.g. `TRIARB_TICKER_A`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed("TRIARB_").from_env()?)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |reason: String| ConfigError::FileLoad {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        for (name, ticker) in [
            ("ticker_a", &self.ticker_a),
            ("ticker_b", &self.ticker_b),
            ("ticker_c", &self.ticker_c),
        ] {
            if ticker.is_empty() {
                return Err(format!("{name} is required"));
            }
        }

        if self.ticker_a == self.ticker_b
            || self.ticker_b == self.ticker_c
            || self.ticker_a == self.ticker_c
        {
            return Err("tickers must be three distinct assets".to_string());
        }

        // Pair symbols must agree with the loop ordering.
        let expected = [
            ("ticker_pair_a", &self.ticker_pair_a, &self.ticker_a, &self.ticker_b),
            ("ticker_pair_b", &self.ticker_pair_b, &self.ticker_b, &self.ticker_c),
            ("ticker_pair_c", &self.ticker_pair_c, &self.ticker_a, &self.ticker_c),
        ];
        for (name, pair, base, quote) in expected {
            let want = format!("{base}-{quote}");
            if *pair != want {
                return Err(format!("{name} must be {want}, got {pair}"));
            }
        }

        if self.fee_ratio < Decimal::ZERO || self.fee_ratio >= Decimal::ONE {
            return Err("fee_ratio must be in [0, 1)".to_string());
        }

        if self.min_profit < Decimal::ZERO {
            return Err("min_profit must not be negative".to_string());
        }

        if self.valuation_currency.is_empty() {
            return Err("valuation_currency is required".to_string());
        }

        if self.sleep_secs == 0 {
            return Err("sleep_secs must be at least 1".to_string());
        }

        if self.stale_order_checks == 0 {
            return Err("stale_order_checks must be at least 1".to_string());
        }

        Ok(())
    }

    /// The three tracked tickers in loop order [A, B, C].
    pub fn tickers(&self) -> [&str; 3] {
        [&self.ticker_a, &self.ticker_b, &self.ticker_c]
    }

    /// The three trading pairs in leg order [A-B, B-C, A-C].
    pub fn pairs(&self) -> [&str; 3] {
        [
            &self.ticker_pair_a,
            &self.ticker_pair_b,
            &self.ticker_pair_c,
        ]
    }
}

/// API credentials loaded from a JSON key file.
///
/// All three fields are required; a key file missing any of them fails the
/// load rather than surfacing as an auth error mid-run.
#[derive(Clone, Deserialize)]
pub struct KeyFile {
    /// API key id.
    pub api_key: String,
    /// API passphrase.
    pub passphrase: String,
    /// Base64-encoded API secret.
    pub api_secret: String,
}

impl KeyFile {
    /// Load credentials from a JSON key file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |reason: String| ConfigError::KeyFile {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let key: KeyFile = serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
        if key.api_key.is_empty() || key.passphrase.is_empty() || key.api_secret.is_empty() {
            return Err(load_err("api_key, passphrase, api_secret must be non-empty".into()));
        }
        Ok(key)
    }
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFile")
            .field("api_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
