//! Exchange adapters.
//!
//! The engine only sees [`ExchangeAdapter`]; [`connect`] picks the concrete
//! implementation from the configured exchange id.

pub mod adapter;
pub mod coinbase;
pub mod mock;

use std::sync::Arc;

pub use adapter::{Balance, ExchangeAdapter};
pub use coinbase::CoinbaseExchange;
pub use mock::{MockConfig, MockExchange};

use crate::config::{Config, KeyFile};
use crate::error::{ConfigError, Result};

/// Build the adapter selected by `config.exchange`.
pub fn connect(config: &Config) -> Result<Arc<dyn ExchangeAdapter>> {
    match config.exchange.as_str() {
        "coinbase" => {
            let key_path = config.key_file.as_deref().ok_or_else(|| {
                ConfigError::Invalid("key_file is required for the coinbase exchange".to_string())
            })?;
            let key = KeyFile::load(key_path)?;
            let adapter = CoinbaseExchange::new(&key, config.valuation_currency.clone())?;
            Ok(Arc::new(adapter))
        }
        other => Err(ConfigError::UnknownExchange {
            exchange: other.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn route_config(exchange: &str) -> Config {
        let raw = format!(
            r#"{{
                "exchange": "{exchange}",
                "ticker_a": "ADA",
                "ticker_b": "ETH",
                "ticker_c": "BTC",
                "ticker_pair_a": "ADA-ETH",
                "ticker_pair_b": "ETH-BTC",
                "ticker_pair_c": "ADA-BTC"
            }}"#
        );
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn unknown_exchange_is_rejected() {
        let err = connect(&route_config("kraken")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::UnknownExchange { exchange }) if exchange == "kraken"
        ));
    }

    #[test]
    fn coinbase_without_key_file_is_rejected() {
        let err = connect(&route_config("coinbase")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::Invalid(_))
        ));
    }
}
