//! Route math: factors, sizing, fees, and profit for the three-leg loop.
//!
//! Legs are indexed in loop order: 0 trades pair A-B, 1 trades B-C, 2 trades
//! A-C. All functions here are pure; prices must already be validated
//! positive (the adapter boundary guarantees this), so divisions are safe.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::exchange::Balance;
use crate::orderbook::BookTop;
use crate::trading::Side;

/// Reference prices for the loop tickers, ordered [A, B, C].
///
/// Quoted in the valuation currency; used for sizing and fee valuation,
/// never as an execution price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPrices(pub [Decimal; 3]);

impl LastPrices {
    /// Prices for tickers A, B, C in loop order.
    pub fn new(a: Decimal, b: Decimal, c: Decimal) -> Self {
        Self([a, b, c])
    }
}

/// Direction around the loop, or no profitable direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Route {
    /// Neither direction multiplies above 1.
    None,
    /// A->B->C->A: lift the asks on legs A and B, hit the bid on leg C.
    Bid,
    /// The mirror direction: hit the bids on legs A and B, lift the ask on C.
    Ask,
}

impl Route {
    /// Whether this route carries orders.
    pub fn is_tradable(&self) -> bool {
        !matches!(self, Route::None)
    }
}

/// Everything the engine needs to decide and log one evaluation.
#[derive(Debug, Clone)]
pub struct RouteEvaluation {
    /// Multiplier for the bid route; above 1 means gross-profitable.
    pub bid_factor: Decimal,
    /// Multiplier for the ask route.
    pub ask_factor: Decimal,
    /// Selected route.
    pub route: Route,
    /// Sized per-leg amounts (base asset units), zero when route is none.
    pub amounts: [Decimal; 3],
    /// Fee across all three legs, in the valuation currency.
    pub fee: Decimal,
    /// Gross profit of the selected route, in the valuation currency.
    pub profit: Decimal,
    /// `profit - fee`.
    pub net_profit: Decimal,
}

impl RouteEvaluation {
    /// Whether the evaluation clears the profit threshold.
    pub fn is_actionable(&self, min_profit: Decimal) -> bool {
        self.route.is_tradable() && self.net_profit > min_profit
    }
}

/// Multiplier of starting capital after A->B->C->A at top-of-book prices.
pub fn bid_route_factor(books: &[BookTop; 3]) -> Decimal {
    (Decimal::ONE / books[0].ask.price) / books[1].ask.price * books[2].bid.price
}

/// Multiplier for the mirror direction.
pub fn ask_route_factor(books: &[BookTop; 3]) -> Decimal {
    books[0].bid.price / books[2].ask.price * books[1].bid.price
}

/// Pick a direction: bid route wins when above 1, else ask route, else none.
pub fn select_route(bid_factor: Decimal, ask_factor: Decimal) -> Route {
    if bid_factor > Decimal::ONE {
        Route::Bid
    } else if ask_factor > Decimal::ONE {
        Route::Ask
    } else {
        Route::None
    }
}

/// Book side leg `leg` trades against on `route`.
fn depth_side(route: Route, leg: usize) -> Side {
    let side = if leg == 2 { Side::Bid } else { Side::Ask };
    match route {
        Route::Ask => side.counterparty(),
        _ => side,
    }
}

/// Size the three legs to one shared notional.
///
/// Each leg's ceiling is `min(counterparty depth, own balance)` valued at the
/// leg's reference price net of fee; the smallest ceiling caps the whole
/// route, and every leg converts that notional back into asset units.
pub fn max_leg_amounts(
    route: Route,
    last: &LastPrices,
    books: &[BookTop; 3],
    balance: &Balance,
    tickers: &[&str; 3],
    fee_ratio: Decimal,
) -> [Decimal; 3] {
    let fee_keep = Decimal::ONE - fee_ratio;

    let notionals = [0usize, 1, 2].map(|leg| {
        let quote = match depth_side(route, leg) {
            Side::Bid => &books[leg].bid,
            Side::Ask => &books[leg].ask,
        };
        let ceiling = quote.amount.min(balance.available(tickers[leg]));
        ceiling * last.0[leg] * fee_keep
    });
    let max_notional = notionals
        .into_iter()
        .reduce(Decimal::min)
        .unwrap_or_default();

    [0usize, 1, 2].map(|leg| max_notional / last.0[leg])
}

/// Flat fee over the aggregate sized notional of all three legs.
pub fn total_fee(amounts: &[Decimal; 3], last: &LastPrices, fee_ratio: Decimal) -> Decimal {
    let notional: Decimal = amounts
        .iter()
        .zip(last.0.iter())
        .map(|(amount, price)| amount * price)
        .sum();
    notional * fee_ratio
}

/// Gross profit of the selected route.
///
/// The primary leg is A for the bid route and B for the ask route; its sized
/// notional times the factor's edge is what the loop returns.
pub fn route_profit(
    route: Route,
    bid_factor: Decimal,
    ask_factor: Decimal,
    last: &LastPrices,
    amounts: &[Decimal; 3],
) -> Decimal {
    match route {
        Route::Bid => (bid_factor - Decimal::ONE) * last.0[0] * amounts[0],
        Route::Ask => (ask_factor - Decimal::ONE) * last.0[1] * amounts[1],
        Route::None => Decimal::ZERO,
    }
}

/// Run the full evaluation: factors, route, sizing, fee, profit.
pub fn evaluate_route(
    last: &LastPrices,
    books: &[BookTop; 3],
    balance: &Balance,
    tickers: &[&str; 3],
    fee_ratio: Decimal,
) -> RouteEvaluation {
    let bid_factor = bid_route_factor(books);
    let ask_factor = ask_route_factor(books);
    let route = select_route(bid_factor, ask_factor);

    if !route.is_tradable() {
        return RouteEvaluation {
            bid_factor,
            ask_factor,
            route,
            amounts: [Decimal::ZERO; 3],
            fee: Decimal::ZERO,
            profit: Decimal::ZERO,
            net_profit: Decimal::ZERO,
        };
    }

    let amounts = max_leg_amounts(route, last, books, balance, tickers, fee_ratio);
    let fee = total_fee(&amounts, last, fee_ratio);
    let profit = route_profit(route, bid_factor, ask_factor, last, &amounts);

    RouteEvaluation {
        bid_factor,
        ask_factor,
        route,
        amounts,
        fee,
        profit,
        net_profit: profit - fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Quote;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const TICKERS: [&str; 3] = ["ADA", "ETH", "BTC"];

    fn book(pair: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) -> BookTop {
        BookTop::new(pair, Quote::new(bid.0, bid.1), Quote::new(ask.0, ask.1))
    }

    fn last_prices() -> LastPrices {
        LastPrices::new(dec!(0.30), dec!(0.07), dec!(0.021))
    }

    /// Books where the bid route multiplies above 1 and the ask route does not.
    fn bid_route_books() -> [BookTop; 3] {
        [
            book("ADA-ETH", (dec!(0.0215), dec!(800)), (dec!(0.022), dec!(1000))),
            book("ETH-BTC", (dec!(0.070), dec!(450)), (dec!(0.071), dec!(600))),
            book("ADA-BTC", (dec!(0.0016), dec!(2500)), (dec!(0.0017), dec!(1800))),
        ]
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

    #[test]
    fn bid_factor_matches_hand_computation() {
        let books = bid_route_books();
        // (1 / 0.022) / 0.071 * 0.0016
        let factor = bid_route_factor(&books);
        assert!(factor > dec!(1.0243) && factor < dec!(1.0244));
    }

    #[test]
    fn ask_factor_matches_hand_computation() {
        let books = bid_route_books();
        // 0.0215 / 0.0017 * 0.070
        let factor = ask_route_factor(&books);
        assert!(factor > dec!(0.885) && factor < dec!(0.886));
    }

    #[test]
    fn route_selection_prefers_bid_then_ask() {
        assert_eq!(select_route(dec!(1.01), dec!(0.99)), Route::Bid);
        assert_eq!(select_route(dec!(1.01), dec!(1.02)), Route::Bid);
        assert_eq!(select_route(dec!(0.99), dec!(1.01)), Route::Ask);
        assert_eq!(select_route(dec!(0.99), dec!(0.99)), Route::None);
        assert_eq!(select_route(dec!(1.00), dec!(1.00)), Route::None);
    }

    #[test]
    fn sizing_shares_one_notional_across_legs() {
        let books = bid_route_books();
        let amounts = max_leg_amounts(
            Route::Bid,
            &last_prices(),
            &books,
            &balance(dec!(1000), dec!(750), dec!(3000)),
            &TICKERS,
            dec!(0.005),
        );

        // Ceilings: leg 0 min(1000 ask depth, 1000) * 0.30 * 0.995 = 298.5,
        // leg 1 min(600 ask depth, 750) * 0.07 * 0.995 = 41.79,
        // leg 2 min(2500 bid depth, 3000) * 0.021 * 0.995 = 52.2375.
        // The ETH leg constrains the route at 41.79 of shared notional.
        assert_eq!(amounts, [dec!(139.3), dec!(597), dec!(1990)]);
    }

    #[test]
    fn sizing_never_exceeds_depth_or_balance() {
        let books = bid_route_books();
        let bal = balance(dec!(1000), dec!(100), dec!(3000));
        let amounts = max_leg_amounts(
            Route::Bid,
            &last_prices(),
            &books,
            &bal,
            &TICKERS,
            dec!(0.005),
        );

        let depths = [books[0].ask.amount, books[1].ask.amount, books[2].bid.amount];
        for (leg, ticker) in TICKERS.iter().enumerate() {
            assert!(amounts[leg] <= depths[leg].min(bal.available(ticker)));
        }
    }

    #[test]
    fn ask_route_flips_the_depth_sides() {
        let books = bid_route_books();
        // Large balances so the depths alone constrain the sizing.
        let bal = balance(dec!(1000000), dec!(1000000), dec!(1000000));
        let amounts = max_leg_amounts(
            Route::Ask,
            &last_prices(),
            &books,
            &bal,
            &TICKERS,
            dec!(0),
        );

        // Bid depths gate legs 0 and 1, the ask depth gates leg 2:
        // 800 * 0.30 = 240, 450 * 0.07 = 31.5, 1800 * 0.021 = 37.8.
        assert_eq!(amounts, [dec!(105), dec!(450), dec!(1500)]);
    }

    #[test]
    fn fee_applies_to_aggregate_notional() {
        let amounts = [dec!(174.125), dec!(746.25), dec!(2487.5)];
        // Each leg carries 52.2375 of notional.
        let fee = total_fee(&amounts, &last_prices(), dec!(0.005));
        assert_eq!(fee, dec!(0.7835625));
    }

    #[test]
    fn fee_grows_with_ratio() {
        let amounts = [dec!(174.125), dec!(746.25), dec!(2487.5)];
        let low = total_fee(&amounts, &last_prices(), dec!(0.001));
        let high = total_fee(&amounts, &last_prices(), dec!(0.005));
        assert!(low < high);
    }

    #[test]
    fn evaluation_selects_bid_route_with_shared_sizing() {
        let evaluation = evaluate_route(
            &last_prices(),
            &bid_route_books(),
            &balance(dec!(1000), dec!(750), dec!(3000)),
            &TICKERS,
            dec!(0.005),
        );

        assert_eq!(evaluation.route, Route::Bid);
        // The ETH leg constrains at 41.79 shared notional.
        assert_eq!(evaluation.amounts, [dec!(139.3), dec!(597), dec!(1990)]);
        assert_eq!(evaluation.fee, dec!(0.62685));
        // profit = (factor - 1) * 41.79 with factor about 1.02433
        assert!(evaluation.profit > dec!(1.01) && evaluation.profit < dec!(1.02));
        assert!(evaluation.is_actionable(dec!(0.3)));
        assert!(!evaluation.is_actionable(dec!(100)));
    }

    #[test]
    fn evaluation_with_no_edge_is_flat() {
        let books = [
            book("ADA-ETH", (dec!(0.0219), dec!(800)), (dec!(0.0221), dec!(1000))),
            book("ETH-BTC", (dec!(0.0709), dec!(450)), (dec!(0.0711), dec!(600))),
            book("ADA-BTC", (dec!(0.00155), dec!(2500)), (dec!(0.00157), dec!(1800))),
        ];
        let evaluation = evaluate_route(
            &last_prices(),
            &books,
            &balance(dec!(1000), dec!(100), dec!(3000)),
            &TICKERS,
            dec!(0.005),
        );

        assert_eq!(evaluation.route, Route::None);
        assert_eq!(evaluation.amounts, [Decimal::ZERO; 3]);
        assert_eq!(evaluation.net_profit, Decimal::ZERO);
        assert!(!evaluation.is_actionable(Decimal::ZERO));
    }

    #[test]
    fn empty_balance_sizes_to_zero() {
        let evaluation = evaluate_route(
            &last_prices(),
            &bid_route_books(),
            &balance(dec!(1000), dec!(100), Decimal::ZERO),
            &TICKERS,
            dec!(0.005),
        );

        assert_eq!(evaluation.route, Route::Bid);
        assert_eq!(evaluation.amounts, [Decimal::ZERO; 3]);
        assert!(!evaluation.is_actionable(dec!(0.3)));
    }
}
