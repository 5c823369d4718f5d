//! Top-of-book market data types.
//!
//! Only the best bid/ask of each pair is tracked; the engine never keeps
//! deeper book state between iterations.

pub mod types;

pub use types::{BookTop, Quote};
