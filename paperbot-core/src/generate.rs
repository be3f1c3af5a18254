use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::types::{PerformanceDataPoint, Trade, TradeSide};

pub const BASELINE_PRICE: f64 = 50_000.0;
pub const DEFAULT_PAIR: &str = "BTC/USDT";
pub const SERIES_BASELINE: f64 = 1_000.0;

/// Uniform draws land in [0, 1); subtracting 0.48 instead of 0.5 tilts the
/// walk upward over many steps.
const DRIFT_BIAS: f64 = 0.48;
const SEED_WALK_SPAN: f64 = 1_000.0;
const MAX_TRADE_AMOUNT: f64 = 0.1;
const ENTRY_OFFSET_SPAN: f64 = 100.0;
const SEED_ENTRY_DISCOUNT: f64 = 500.0;
const SERIES_JITTER_SPAN: f64 = 10.0;

pub fn round_dp(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

fn next_trade_id() -> String {
    Uuid::new_v4().to_string()
}

/// A sell's profit against an assumed entry price. Breakeven rounds to 0.00
/// and is indistinguishable from "no realized PnL", so it is omitted.
fn realized_pnl(price: f64, entry: f64, amount: f64) -> Option<f64> {
    let rounded = round_dp((price - entry) * amount, 2);
    (rounded != 0.0).then_some(rounded)
}

fn draw_side<R: Rng + ?Sized>(rng: &mut R) -> TradeSide {
    if rng.gen_bool(0.5) {
        TradeSide::Buy
    } else {
        TradeSide::Sell
    }
}

/// One random-walk step from the previous trade (or the 50000 baseline).
/// Sells carry a realized PnL against an entry price assumed a little below
/// the base, buys never do.
pub fn generate_trade<R: Rng + ?Sized>(rng: &mut R, previous: Option<&Trade>) -> Trade {
    let base_price = previous.map(|t| t.price).unwrap_or(BASELINE_PRICE);
    let delta = (rng.gen::<f64>() - DRIFT_BIAS) * (base_price * 0.01);
    let price = round_dp(base_price + delta, 2);
    let side = draw_side(rng);
    let amount = round_dp(rng.gen::<f64>() * MAX_TRADE_AMOUNT, 5);
    let pnl = match side {
        TradeSide::Sell => {
            let entry = base_price - rng.gen::<f64>() * ENTRY_OFFSET_SPAN;
            realized_pnl(price, entry, amount)
        }
        TradeSide::Buy => None,
    };

    Trade {
        id: next_trade_id(),
        pair: previous
            .map(|t| t.pair.clone())
            .unwrap_or_else(|| DEFAULT_PAIR.to_string()),
        side,
        price,
        amount,
        total: round_dp(price * amount, 2),
        ts: Utc::now(),
        pnl,
    }
}

/// Backfills `count` trades ending one hour before now, spaced hourly,
/// returned newest-first. A running holdings tally gates realized PnL:
/// sells larger than current holdings realize nothing rather than going
/// short.
pub fn seed_trade_history<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Trade> {
    let now = Utc::now();
    let mut trades = Vec::with_capacity(count);
    // The walk carries full precision between steps; only stored fields round.
    let mut walk_price = BASELINE_PRICE;
    let mut holdings = 0.0_f64;

    for i in 0..count {
        let prior_price = walk_price;
        walk_price += (rng.gen::<f64>() - 0.5) * SEED_WALK_SPAN;
        let side = draw_side(rng);
        let amount_raw = rng.gen::<f64>() * MAX_TRADE_AMOUNT;

        let mut pnl = None;
        match side {
            TradeSide::Sell if holdings > amount_raw => {
                pnl = realized_pnl(walk_price, prior_price - SEED_ENTRY_DISCOUNT, amount_raw);
                holdings -= amount_raw;
            }
            TradeSide::Buy => holdings += amount_raw,
            TradeSide::Sell => {}
        }

        let price = round_dp(walk_price, 2);
        let amount = round_dp(amount_raw, 5);
        trades.push(Trade {
            id: next_trade_id(),
            pair: DEFAULT_PAIR.to_string(),
            side,
            price,
            amount,
            total: round_dp(price * amount, 2),
            ts: now - Duration::hours((count - i) as i64),
            pnl,
        });
    }

    trades.reverse();
    trades
}

/// Folds a newest-first trade log into an oldest-first portfolio series
/// starting at 1000. Trades without realized PnL contribute a small uniform
/// jitter instead.
pub fn build_performance_series<R: Rng + ?Sized>(
    rng: &mut R,
    trades: &[Trade],
) -> Vec<PerformanceDataPoint> {
    let mut series = Vec::with_capacity(trades.len() + 1);
    series.push(PerformanceDataPoint {
        label: "Start".to_string(),
        value: SERIES_BASELINE,
    });

    let mut cumulative = SERIES_BASELINE;
    for (idx, trade) in trades.iter().rev().enumerate() {
        match trade.pnl {
            Some(pnl) => cumulative += pnl,
            None => cumulative += (rng.gen::<f64>() - 0.5) * SERIES_JITTER_SPAN,
        }
        series.push(PerformanceDataPoint {
            label: format!("Trade {}", idx + 1),
            value: round_dp(cumulative, 2),
        });
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seeded_history_is_newest_first_and_hourly() {
        let mut rng = StdRng::seed_from_u64(42);
        let trades = seed_trade_history(&mut rng, 50);
        assert_eq!(trades.len(), 50);
        for pair in trades.windows(2) {
            assert!(pair[0].ts >= pair[1].ts);
            assert_eq!((pair[0].ts - pair[1].ts).num_seconds(), 3600);
        }
    }

    #[test]
    fn totals_are_price_times_amount() {
        let mut rng = StdRng::seed_from_u64(7);
        for trade in seed_trade_history(&mut rng, 200) {
            assert!((trade.total - round_dp(trade.price * trade.amount, 2)).abs() < 1e-9);
        }
    }

    #[test]
    fn first_trade_stays_near_baseline() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let trade = generate_trade(&mut rng, None);
            assert!((trade.price - BASELINE_PRICE).abs() <= BASELINE_PRICE * 0.01);
            assert_eq!(trade.pair, DEFAULT_PAIR);
        }
    }

    #[test]
    fn walk_follows_previous_price() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut prev = generate_trade(&mut rng, None);
        for _ in 0..100 {
            let next = generate_trade(&mut rng, Some(&prev));
            assert!((next.price - prev.price).abs() <= prev.price * 0.01 + 0.01);
            assert_eq!(next.pair, prev.pair);
            prev = next;
        }
    }

    #[test]
    fn buys_never_carry_pnl() {
        let mut rng = StdRng::seed_from_u64(3);
        let trades = seed_trade_history(&mut rng, 300);
        for trade in &trades {
            if trade.pnl.is_some() {
                assert_eq!(trade.side, TradeSide::Sell);
            }
        }
        // Oldest step starts with zero holdings, so a leading sell cannot
        // realize anything.
        let oldest = trades.last().unwrap();
        if oldest.side == TradeSide::Sell {
            assert!(oldest.pnl.is_none());
        }
    }

    #[test]
    fn breakeven_pnl_is_omitted() {
        assert_eq!(realized_pnl(100.0, 100.0, 0.05), None);
        assert_eq!(realized_pnl(100.0, 100.001, 0.05), None);
        assert_eq!(realized_pnl(110.0, 100.0, 0.1), Some(1.0));
        assert_eq!(realized_pnl(90.0, 100.0, 0.1), Some(-1.0));
    }

    #[test]
    fn series_starts_at_baseline_with_one_point_per_trade() {
        let mut seed_rng = StdRng::seed_from_u64(4);
        let trades = seed_trade_history(&mut seed_rng, 25);
        let mut rng = StdRng::seed_from_u64(5);
        let series = build_performance_series(&mut rng, &trades);
        assert_eq!(series.len(), 26);
        assert_eq!(series[0].label, "Start");
        assert_eq!(series[0].value, SERIES_BASELINE);
        assert_eq!(series[1].label, "Trade 1");
        assert_eq!(series[25].label, "Trade 25");
    }

    #[test]
    fn series_is_deterministic_for_a_fixed_seed() {
        let mut seed_rng = StdRng::seed_from_u64(6);
        let trades = seed_trade_history(&mut seed_rng, 30);
        let a = build_performance_series(&mut StdRng::seed_from_u64(9), &trades);
        let b = build_performance_series(&mut StdRng::seed_from_u64(9), &trades);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_history_yields_start_only_series() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(seed_trade_history(&mut rng, 0).is_empty());
        let series = build_performance_series(&mut rng, &[]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Start");
    }

    #[test]
    fn pnl_is_skipped_when_serialized_absent() {
        let mut rng = StdRng::seed_from_u64(8);
        let trades = seed_trade_history(&mut rng, 50);
        let buy = trades.iter().find(|t| t.side == TradeSide::Buy).unwrap();
        let json = serde_json::to_value(buy).unwrap();
        assert!(json.get("pnl").is_none());
    }
}
