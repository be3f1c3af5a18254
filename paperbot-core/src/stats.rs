use serde::{Deserialize, Serialize};

use crate::types::Trade;

/// Realized-PnL aggregates over a trade log, for the dashboard header cards.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeStats {
    pub total_pnl: f64,
    pub trade_count: usize,
    pub pnl_trade_count: usize,
    pub wins: usize,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut stats = TradeStats::default();
        for trade in trades {
            stats.record(trade);
        }
        stats
    }

    pub fn record(&mut self, trade: &Trade) {
        self.trade_count += 1;
        if let Some(pnl) = trade.pnl {
            self.total_pnl += pnl;
            self.pnl_trade_count += 1;
            if pnl > 0.0 {
                self.wins += 1;
            }
        }
    }

    /// Winning sells as a percentage of PnL-carrying trades. Trades without
    /// realized PnL are not counted against the rate.
    pub fn win_rate(&self) -> f64 {
        if self.pnl_trade_count == 0 {
            return 0.0;
        }
        (self.wins as f64 / self.pnl_trade_count as f64) * 100.0
    }
}
