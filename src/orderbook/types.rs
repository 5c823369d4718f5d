//! Top-of-book types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One resting price level: a price and the amount available at it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    /// Quoted price.
    pub price: Decimal,
    /// Amount of the base asset available at this price.
    pub amount: Decimal,
}

impl Quote {
    /// Create a new quote.
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }

    /// Validate the quote.
    ///
    /// Adapters call this before building a [`BookTop`], so downstream code
    /// can divide by quote prices without re-checking.
    pub fn validate(&self) -> Result<(), String> {
        if self.price <= Decimal::ZERO {
            return Err(format!("price must be positive, got {}", self.price));
        }
        if self.amount <= Decimal::ZERO {
            return Err(format!("amount must be positive, got {}", self.amount));
        }
        Ok(())
    }
}

/// Best bid and ask for one trading pair.
///
/// Both sides are always present; an adapter that finds an empty side fails
/// the fetch instead of constructing a one-sided top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookTop {
    /// Pair this snapshot belongs to.
    pub pair: String,
    /// Best bid.
    pub bid: Quote,
    /// Best ask.
    pub ask: Quote,
    /// When this snapshot was fetched.
    pub fetched_at: OffsetDateTime,
}

impl BookTop {
    /// Create a snapshot stamped with the current time.
    pub fn new(pair: impl Into<String>, bid: Quote, ask: Quote) -> Self {
        Self {
            pair: pair.into(),
            bid,
            ask,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Decimal {
        self.ask.price - self.bid.price
    }

    /// Check if the book is crossed (best ask below best bid).
    pub fn is_crossed(&self) -> bool {
        self.ask.price < self.bid.price
    }
}

impl fmt::Display for BookTop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: bid {} x {} / ask {} x {}",
            self.pair, self.bid.price, self.bid.amount, self.ask.price, self.ask.amount
        )
    }
}
