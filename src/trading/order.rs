//! Order intent types shared by the detector, executor, and adapters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Order side.
///
/// `Bid` buys the base asset of the pair, `Ask` sells it. Venue adapters
/// translate these into whatever the exchange's order API calls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// Buy the base asset.
    Bid,
    /// Sell the base asset.
    Ask,
}

impl Side {
    /// The side a taker of this order sits on.
    pub fn counterparty(&self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// One leg of an arbitrage sequence, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Trading pair to submit against.
    pub pair: String,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Amount of the base asset.
    pub amount: Decimal,
}

impl OrderIntent {
    /// Create a bid (buy) intent.
    pub fn bid(pair: impl Into<String>, price: Decimal, amount: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side: Side::Bid,
            price,
            amount,
        }
    }

    /// Create an ask (sell) intent.
    pub fn ask(pair: impl Into<String>, price: Decimal, amount: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side: Side::Ask,
            price,
            amount,
        }
    }

    /// Validate the intent before submission.
    pub fn validate(&self) -> Result<(), String> {
        if self.pair.is_empty() {
            return Err("pair is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if self.amount <= Decimal::ZERO {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}
