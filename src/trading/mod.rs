//! Order intent types.
//!
//! The detector emits [`OrderIntent`]s, the executor submits them, and the
//! exchange adapters translate them into venue-specific requests.

pub mod order;

pub use order::{OrderIntent, Side};
