//! Synthetic trade generation, bot form state, and portfolio series for
//! paperbot.

pub mod bot;
pub mod generate;
pub mod stats;
pub mod types;

pub use bot::{parse_numeric_field, BotConfig, ConfigPatch, FieldParseError, NumericField, Strategy};
pub use generate::{
    build_performance_series, generate_trade, round_dp, seed_trade_history, BASELINE_PRICE,
    DEFAULT_PAIR, SERIES_BASELINE,
};
pub use stats::TradeStats;
pub use types::{BotStatus, PerformanceDataPoint, Trade, TradeSide};
