use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertCondition {
    Above,
    Below,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub id: String,
    pub coin: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub is_active: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AlertBook {
    alerts: Vec<PriceAlert>,
}

impl AlertBook {
    pub fn add(
        &mut self,
        coin: impl Into<String>,
        target_price: f64,
        condition: AlertCondition,
    ) -> PriceAlert {
        let alert = PriceAlert {
            id: Uuid::new_v4().to_string(),
            coin: coin.into().trim().to_uppercase(),
            target_price,
            condition,
            is_active: true,
        };
        self.alerts.push(alert.clone());
        alert
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        for alert in &mut self.alerts {
            if alert.id == id {
                alert.is_active = !alert.is_active;
                return true;
            }
        }
        false
    }

    pub fn list(&self) -> Vec<PriceAlert> {
        self.alerts.clone()
    }

    /// Fires active alerts for the pair's base coin whose condition the price
    /// crosses. Fired alerts deactivate so they do not retrigger on every
    /// tick while the price stays past the target.
    pub fn evaluate(&mut self, pair: &str, price: f64) -> Vec<PriceAlert> {
        let base = pair_base(pair);
        let mut fired = Vec::new();
        for alert in &mut self.alerts {
            if !alert.is_active || alert.coin != base {
                continue;
            }
            let crossed = match alert.condition {
                AlertCondition::Above => price > alert.target_price,
                AlertCondition::Below => price < alert.target_price,
            };
            if crossed {
                alert.is_active = false;
                fired.push(alert.clone());
            }
        }
        fired
    }
}

fn pair_base(pair: &str) -> String {
    pair.split('/').next().unwrap_or(pair).trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_alert_fires_once_then_deactivates() {
        let mut book = AlertBook::default();
        let alert = book.add("btc", 60_000.0, AlertCondition::Above);
        assert!(alert.is_active);
        assert_eq!(alert.coin, "BTC");

        assert!(book.evaluate("BTC/USDT", 59_000.0).is_empty());

        let fired = book.evaluate("BTC/USDT", 61_000.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, alert.id);

        // Deactivated, so the same crossing stays quiet.
        assert!(book.evaluate("BTC/USDT", 62_000.0).is_empty());
        assert!(!book.list()[0].is_active);
    }

    #[test]
    fn below_alert_ignores_other_pairs() {
        let mut book = AlertBook::default();
        book.add("ETH", 2_000.0, AlertCondition::Below);

        assert!(book.evaluate("BTC/USDT", 1_500.0).is_empty());
        assert_eq!(book.evaluate("ETH/USDT", 1_500.0).len(), 1);
    }

    #[test]
    fn toggle_and_remove_by_id() {
        let mut book = AlertBook::default();
        let alert = book.add("SOL", 150.0, AlertCondition::Above);

        assert!(book.toggle(&alert.id));
        assert!(!book.list()[0].is_active);
        assert!(book.toggle(&alert.id));
        assert!(book.list()[0].is_active);

        assert!(!book.toggle("missing"));
        assert!(!book.remove("missing"));
        assert!(book.remove(&alert.id));
        assert!(book.list().is_empty());
    }
}
