use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarketCoin {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
}

/// External citation attached to a grounded model answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarketSummary {
    pub coins: Vec<MarketCoin>,
    pub sources: Vec<GroundingSource>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsDigest {
    pub articles: Vec<NewsArticle>,
    pub sources: Vec<GroundingSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_coin_uses_model_key_for_daily_change() {
        let coin: MarketCoin = serde_json::from_str(
            r#"{"name":"Bitcoin","symbol":"BTC","price":64250.5,"change24h":-1.8}"#,
        )
        .unwrap();
        assert_eq!(coin.symbol, "BTC");
        assert_eq!(coin.change_24h, -1.8);

        let back = serde_json::to_value(&coin).unwrap();
        assert!(back.get("change24h").is_some());
    }
}
