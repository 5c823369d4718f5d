//! Arbitrage module for detecting and executing opportunities.
//!
//! This module handles:
//! - Route evaluation over the three order books
//! - Profit, fee and sizing calculations
//! - Order construction and placement

pub mod calculator;
pub mod detector;
pub mod executor;

pub use calculator::{evaluate_route, LastPrices, Route, RouteEvaluation};
pub use detector::{detect, diagnose, NoOpportunity, Opportunity};
pub use executor::{ExecutorStats, OrderExecutor, PlacementOutcome};
