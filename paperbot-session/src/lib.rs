//! Bot session runtime: the timer-driven trade loop and price alerts.

pub mod alerts;
pub mod service;

pub use alerts::{AlertBook, AlertCondition, PriceAlert};
pub use service::{SessionService, SessionSettings, TradeLog};
