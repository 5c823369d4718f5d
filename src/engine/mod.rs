//! Trading loop and open-order supervision.

pub mod control;
pub mod monitor;

pub use control::{Engine, EngineStats, TickOutcome};
pub use monitor::{OpenOrderMonitor, OrderState, PollOutcome};
