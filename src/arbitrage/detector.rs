//! Opportunity detection: route evaluation plus order construction.

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::calculator::{evaluate_route, LastPrices, Route, RouteEvaluation};
use crate::config::Config;
use crate::exchange::Balance;
use crate::orderbook::BookTop;
use crate::trading::OrderIntent;

/// An actionable three-leg opportunity, ready for the executor.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// The evaluation that produced it.
    pub evaluation: RouteEvaluation,
    /// Orders in leg order [A-B, B-C, A-C].
    pub intents: [OrderIntent; 3],
    /// Timestamp when the opportunity was detected.
    pub detected_at: OffsetDateTime,
}

impl Opportunity {
    /// Selected route.
    pub fn route(&self) -> Route {
        self.evaluation.route
    }
}

/// Evaluate one snapshot and build the order sequence if it clears the
/// profit threshold.
///
/// `books` is the [A-B, B-C, A-C] triple matching `config`'s pairs. Legs are
/// priced on the side they trade against: the bid route lifts the asks on
/// legs A and B and hits the bid on leg C, the ask route is the mirror.
#[instrument(skip_all)]
pub fn detect(
    last: &LastPrices,
    books: &[BookTop; 3],
    balance: &Balance,
    config: &Config,
) -> Option<Opportunity> {
    let tickers = config.tickers();
    let evaluation = evaluate_route(last, books, balance, &tickers, config.fee_ratio);

    if !evaluation.is_actionable(config.min_profit) {
        debug!(
            diagnosis = %diagnose(&evaluation, config.min_profit),
            "no actionable opportunity"
        );
        return None;
    }

    let pairs = config.pairs();
    let amounts = &evaluation.amounts;
    let intents = match evaluation.route {
        Route::None => return None,
        Route::Bid => [
            OrderIntent::bid(pairs[0], books[0].ask.price, amounts[0]),
            OrderIntent::bid(pairs[1], books[1].ask.price, amounts[1]),
            OrderIntent::ask(pairs[2], books[2].bid.price, amounts[2]),
        ],
        Route::Ask => [
            OrderIntent::ask(pairs[0], books[0].bid.price, amounts[0]),
            OrderIntent::ask(pairs[1], books[1].bid.price, amounts[1]),
            OrderIntent::bid(pairs[2], books[2].ask.price, amounts[2]),
        ],
    };

    info!(
        route = %evaluation.route,
        bid_factor = %evaluation.bid_factor,
        ask_factor = %evaluation.ask_factor,
        profit = %evaluation.profit,
        fee = %evaluation.fee,
        net_profit = %evaluation.net_profit,
        "opportunity found"
    );

    Some(Opportunity {
        evaluation,
        intents,
        detected_at: OffsetDateTime::now_utc(),
    })
}

/// Why an evaluation was not acted on.
#[derive(Debug, Clone)]
pub struct NoOpportunity {
    /// Bid route multiplier.
    pub bid_factor: Decimal,
    /// Ask route multiplier.
    pub ask_factor: Decimal,
    /// Route that was selected, possibly none.
    pub route: Route,
    /// Net profit of the selected route.
    pub net_profit: Decimal,
    /// Threshold it failed to clear.
    pub min_profit: Decimal,
}

/// Summarize an unactionable evaluation for logging.
pub fn diagnose(evaluation: &RouteEvaluation, min_profit: Decimal) -> NoOpportunity {
    NoOpportunity {
        bid_factor: evaluation.bid_factor,
        ask_factor: evaluation.ask_factor,
        route: evaluation.route,
        net_profit: evaluation.net_profit,
        min_profit,
    }
}

impl std::fmt::Display for NoOpportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.route {
            Route::None => write!(
                f,
                "no route above 1 (bid={}, ask={})",
                self.bid_factor, self.ask_factor
            ),
            route => write!(
                f,
                "{} route net {} below threshold {} (bid={}, ask={})",
                route, self.net_profit, self.min_profit, self.bid_factor, self.ask_factor
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Quote;
    use crate::trading::Side;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        serde_json::from_str(
            r#"{
                "exchange": "coinbase",
                "ticker_a": "ADA",
                "ticker_b": "ETH",
                "ticker_c": "BTC",
                "ticker_pair_a": "ADA-ETH",
                "ticker_pair_b": "ETH-BTC",
                "ticker_pair_c": "ADA-BTC"
            }"#,
        )
        .unwrap()
    }

    fn book(pair: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) -> BookTop {
        BookTop::new(pair, Quote::new(bid.0, bid.1), Quote::new(ask.0, ask.1))
    }

    fn last_prices() -> LastPrices {
        LastPrices::new(dec!(0.30), dec!(0.07), dec!(0.021))
    }

    fn balance(ada: Decimal, eth: Decimal, btc: Decimal) -> Balance {
        [
            ("ADA".to_string(), ada),
            ("ETH".to_string(), eth),
            ("BTC".to_string(), btc),
        ]
        .into_iter()
        .collect()
    }

    fn bid_route_books() -> [BookTop; 3] {
        [
            book("ADA-ETH", (dec!(0.0215), dec!(800)), (dec!(0.022), dec!(1000))),
            book("ETH-BTC", (dec!(0.070), dec!(450)), (dec!(0.071), dec!(600))),
            book("ADA-BTC", (dec!(0.0016), dec!(2500)), (dec!(0.0017), dec!(1800))),
        ]
    }

    fn ask_route_books() -> [BookTop; 3] {
        [
            book("ADA-ETH", (dec!(0.023), dec!(800)), (dec!(0.0235), dec!(1000))),
            book("ETH-BTC", (dec!(0.071), dec!(450)), (dec!(0.072), dec!(600))),
            book("ADA-BTC", (dec!(0.0014), dec!(2500)), (dec!(0.0015), dec!(1800))),
        ]
    }

    #[test]
    fn bid_route_opportunity_builds_bid_bid_ask() {
        let config = test_config();
        let opportunity = detect(
            &last_prices(),
            &bid_route_books(),
            &balance(dec!(1000), dec!(750), dec!(3000)),
            &config,
        )
        .expect("bid route should be actionable");

        assert_eq!(opportunity.route(), Route::Bid);
        let sides: Vec<Side> = opportunity.intents.iter().map(|i| i.side).collect();
        assert_eq!(sides, [Side::Bid, Side::Bid, Side::Ask]);

        // Legs A and B buy at the ask, leg C sells at the bid.
        assert_eq!(opportunity.intents[0].pair, "ADA-ETH");
        assert_eq!(opportunity.intents[0].price, dec!(0.022));
        assert_eq!(opportunity.intents[1].price, dec!(0.071));
        assert_eq!(opportunity.intents[2].price, dec!(0.0016));
        assert_eq!(
            [
                opportunity.intents[0].amount,
                opportunity.intents[1].amount,
                opportunity.intents[2].amount,
            ],
            [dec!(139.3), dec!(597), dec!(1990)]
        );
    }

    #[test]
    fn ask_route_opportunity_mirrors_the_legs() {
        let config = test_config();
        let opportunity = detect(
            &last_prices(),
            &ask_route_books(),
            &balance(dec!(10000), dec!(10000), dec!(10000)),
            &config,
        )
        .expect("ask route should be actionable");

        assert_eq!(opportunity.route(), Route::Ask);
        let sides: Vec<Side> = opportunity.intents.iter().map(|i| i.side).collect();
        assert_eq!(sides, [Side::Ask, Side::Ask, Side::Bid]);

        // Legs A and B sell at the bid, leg C buys at the ask.
        assert_eq!(opportunity.intents[0].price, dec!(0.023));
        assert_eq!(opportunity.intents[1].price, dec!(0.071));
        assert_eq!(opportunity.intents[2].price, dec!(0.0015));
        assert_eq!(
            [
                opportunity.intents[0].amount,
                opportunity.intents[1].amount,
                opportunity.intents[2].amount,
            ],
            [dec!(104.475), dec!(447.75), dec!(1492.5)]
        );
    }

    #[test]
    fn profitable_route_below_threshold_is_not_actionable() {
        let mut config = test_config();
        config.min_profit = dec!(100);

        let opportunity = detect(
            &last_prices(),
            &bid_route_books(),
            &balance(dec!(1000), dec!(750), dec!(3000)),
            &config,
        );

        assert!(opportunity.is_none());
    }

    #[test]
    fn flat_books_yield_nothing() {
        let config = test_config();
        let books = [
            book("ADA-ETH", (dec!(0.0219), dec!(800)), (dec!(0.0221), dec!(1000))),
            book("ETH-BTC", (dec!(0.0709), dec!(450)), (dec!(0.0711), dec!(600))),
            book("ADA-BTC", (dec!(0.00155), dec!(2500)), (dec!(0.00157), dec!(1800))),
        ];

        let opportunity = detect(
            &last_prices(),
            &books,
            &balance(dec!(1000), dec!(750), dec!(3000)),
            &config,
        );

        assert!(opportunity.is_none());
    }

    #[test]
    fn diagnosis_reads_differently_per_route() {
        let flat = NoOpportunity {
            bid_factor: dec!(0.98),
            ask_factor: dec!(0.99),
            route: Route::None,
            net_profit: Decimal::ZERO,
            min_profit: dec!(0.3),
        };
        assert_eq!(flat.to_string(), "no route above 1 (bid=0.98, ask=0.99)");

        let thin = NoOpportunity {
            bid_factor: dec!(1.002),
            ask_factor: dec!(0.99),
            route: Route::Bid,
            net_profit: dec!(0.05),
            min_profit: dec!(0.3),
        };
        assert_eq!(
            thin.to_string(),
            "bid route net 0.05 below threshold 0.3 (bid=1.002, ask=0.99)"
        );
    }
}
