use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BotStatus {
    Running,
    Stopped,
    Error,
}

impl Default for BotStatus {
    fn default() -> Self {
        BotStatus::Stopped
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: String,
    pub pair: String,
    pub side: TradeSide,
    pub price: f64,
    pub amount: f64,
    pub total: f64,
    pub ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceDataPoint {
    pub label: String,
    pub value: f64,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "Buy"),
            TradeSide::Sell => write!(f, "Sell"),
        }
    }
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotStatus::Running => write!(f, "Running"),
            BotStatus::Stopped => write!(f, "Stopped"),
            BotStatus::Error => write!(f, "Error"),
        }
    }
}
