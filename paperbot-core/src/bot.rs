use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Strategy {
    Grid,
    #[serde(rename = "DCA")]
    Dca,
    #[serde(rename = "RSI")]
    Rsi,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Grid
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Grid => write!(f, "Grid"),
            Strategy::Dca => write!(f, "DCA"),
            Strategy::Rsi => write!(f, "RSI"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "grid" => Ok(Strategy::Grid),
            "dca" => Ok(Strategy::Dca),
            "rsi" => Ok(Strategy::Rsi),
            other => anyhow::bail!("unknown strategy: {other}"),
        }
    }
}

/// Bot form state. Display data only; nothing here feeds the generator.
/// Missing fields deserialize to the dashboard defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub strategy: Strategy,
    pub trading_pair: String,
    pub investment: f64,
    pub grid_levels: Option<u32>,
    pub grid_step: Option<f64>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Grid,
            trading_pair: "BTC/USDT".to_string(),
            investment: 1_000.0,
            grid_levels: Some(10),
            grid_step: Some(1.0),
            take_profit: Some(5.0),
            stop_loss: Some(2.0),
        }
    }
}

/// Partial config overwrite, shaped like the advisor's JSON suggestion
/// (camelCase keys). Absent fields leave the target untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub strategy: Option<Strategy>,
    pub trading_pair: Option<String>,
    pub investment: Option<f64>,
    pub grid_levels: Option<u32>,
    pub grid_step: Option<f64>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericField {
    Investment,
    GridLevels,
    GridStep,
    TakeProfit,
    StopLoss,
}

impl NumericField {
    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Investment => "investment",
            NumericField::GridLevels => "grid_levels",
            NumericField::GridStep => "grid_step",
            NumericField::TakeProfit => "take_profit",
            NumericField::StopLoss => "stop_loss",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("field `{field}` expects a number, got `{raw}`")]
pub struct FieldParseError {
    pub field: &'static str,
    pub raw: String,
}

pub fn parse_numeric_field(field: &'static str, raw: &str) -> Result<f64, FieldParseError> {
    raw.trim().parse::<f64>().map_err(|_| FieldParseError {
        field,
        raw: raw.to_string(),
    })
}

impl BotConfig {
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        if let Some(strategy) = patch.strategy {
            self.strategy = strategy;
        }
        if let Some(pair) = &patch.trading_pair {
            self.trading_pair = pair.clone();
        }
        if let Some(investment) = patch.investment {
            self.investment = investment;
        }
        if let Some(levels) = patch.grid_levels {
            self.grid_levels = Some(levels);
        }
        if let Some(step) = patch.grid_step {
            self.grid_step = Some(step);
        }
        if let Some(take_profit) = patch.take_profit {
            self.take_profit = Some(take_profit);
        }
        if let Some(stop_loss) = patch.stop_loss {
            self.stop_loss = Some(stop_loss);
        }
    }

    /// Form-field edit with an explicit parse result instead of a silent
    /// fallback to the raw string.
    pub fn set_numeric(&mut self, field: NumericField, raw: &str) -> Result<(), FieldParseError> {
        match field {
            NumericField::Investment => self.investment = parse_numeric_field(field.name(), raw)?,
            NumericField::GridLevels => {
                let levels = raw.trim().parse::<u32>().map_err(|_| FieldParseError {
                    field: field.name(),
                    raw: raw.to_string(),
                })?;
                self.grid_levels = Some(levels);
            }
            NumericField::GridStep => {
                self.grid_step = Some(parse_numeric_field(field.name(), raw)?)
            }
            NumericField::TakeProfit => {
                self.take_profit = Some(parse_numeric_field(field.name(), raw)?)
            }
            NumericField::StopLoss => {
                self.stop_loss = Some(parse_numeric_field(field.name(), raw)?)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_partial_suggestion_keeps_other_fields() {
        let mut config = BotConfig::default();
        let patch = ConfigPatch {
            strategy: Some(Strategy::Dca),
            investment: Some(500.0),
            ..Default::default()
        };

        config.apply_patch(&patch);

        assert_eq!(config.strategy, Strategy::Dca);
        assert_eq!(config.investment, 500.0);
        assert_eq!(config.trading_pair, "BTC/USDT");
        assert_eq!(config.grid_levels, Some(10));
        assert_eq!(config.take_profit, Some(5.0));
    }

    #[test]
    fn patch_parses_camel_case_model_json() {
        let patch: ConfigPatch = serde_json::from_str(
            r#"{"strategy":"DCA","tradingPair":"ETH/USDT","investment":2500,"gridLevels":12}"#,
        )
        .unwrap();

        assert_eq!(patch.strategy, Some(Strategy::Dca));
        assert_eq!(patch.trading_pair.as_deref(), Some("ETH/USDT"));
        assert_eq!(patch.investment, Some(2500.0));
        assert_eq!(patch.grid_levels, Some(12));
        assert_eq!(patch.grid_step, None);
        assert_eq!(patch.stop_loss, None);
    }

    #[test]
    fn strategy_parses_known_names_only() {
        assert_eq!(Strategy::from_str("grid").unwrap(), Strategy::Grid);
        assert_eq!(Strategy::from_str("DCA").unwrap(), Strategy::Dca);
        assert_eq!(Strategy::from_str("Rsi").unwrap(), Strategy::Rsi);
        assert!(Strategy::from_str("martingale").is_err());
    }

    #[test]
    fn numeric_fields_reject_garbage() {
        let mut config = BotConfig::default();

        config.set_numeric(NumericField::Investment, " 750.5 ").unwrap();
        assert_eq!(config.investment, 750.5);

        let err = config
            .set_numeric(NumericField::Investment, "lots")
            .unwrap_err();
        assert_eq!(err.field, "investment");
        assert_eq!(err.raw, "lots");
        assert_eq!(config.investment, 750.5);

        config.set_numeric(NumericField::GridLevels, "15").unwrap();
        assert_eq!(config.grid_levels, Some(15));
        assert!(config.set_numeric(NumericField::GridLevels, "2.5").is_err());
    }

    #[test]
    fn defaults_match_dashboard_form() {
        let config = BotConfig::default();
        assert_eq!(config.strategy, Strategy::Grid);
        assert_eq!(config.trading_pair, "BTC/USDT");
        assert_eq!(config.investment, 1_000.0);
        assert_eq!(config.grid_step, Some(1.0));
        assert_eq!(config.stop_loss, Some(2.0));
        assert_eq!(config.strategy.to_string(), "Grid");
    }
}
