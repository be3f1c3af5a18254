use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use paperbot_core::{
    build_performance_series, generate_trade, seed_trade_history, BotConfig, BotStatus,
    ConfigPatch, FieldParseError, NumericField, PerformanceDataPoint, Strategy, Trade, TradeStats,
};
use paperbot_service::{Service, ServiceId};

use crate::alerts::{AlertBook, AlertCondition, PriceAlert};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_log_len")]
    pub max_log_len: usize,
    #[serde(default = "default_seed_trades")]
    pub seed_trades: usize,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_tick_interval_ms() -> u64 {
    5_000
}

fn default_max_log_len() -> usize {
    200
}

fn default_seed_trades() -> usize {
    100
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_log_len: default_max_log_len(),
            seed_trades: default_seed_trades(),
            rng_seed: None,
        }
    }
}

/// Newest-first bounded trade log. The timer task is the only writer;
/// readers take cloned snapshots.
#[derive(Clone, Debug)]
pub struct TradeLog {
    entries: Vec<Trade>,
    max_len: usize,
}

impl TradeLog {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
        }
    }

    /// Adopts an already newest-first seed, dropping overflow from the old
    /// end.
    pub fn from_seed(max_len: usize, mut entries: Vec<Trade>) -> Self {
        entries.truncate(max_len);
        Self { entries, max_len }
    }

    pub fn push(&mut self, trade: Trade) {
        self.entries.insert(0, trade);
        if self.entries.len() > self.max_len {
            self.entries.truncate(self.max_len);
        }
    }

    pub fn newest(&self) -> Option<&Trade> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Trade> {
        self.entries.clone()
    }
}

/// The running bot. Owns the trade log, the bot form config, the alert book,
/// and the timer task that appends synthetic trades while the session is
/// running.
pub struct SessionService {
    id: ServiceId,
    settings: SessionSettings,
    status: Arc<RwLock<BotStatus>>,
    log: Arc<RwLock<TradeLog>>,
    alerts: Arc<RwLock<AlertBook>>,
    bot_config: Arc<RwLock<BotConfig>>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionService {
    pub fn new(id: ServiceId, settings: SessionSettings) -> Self {
        let mut rng = seeded_rng(settings.rng_seed);
        let seed = seed_trade_history(&mut rng, settings.seed_trades);

        Self {
            id,
            status: Arc::new(RwLock::new(BotStatus::Stopped)),
            log: Arc::new(RwLock::new(TradeLog::from_seed(settings.max_log_len, seed))),
            alerts: Arc::new(RwLock::new(AlertBook::default())),
            bot_config: Arc::new(RwLock::new(BotConfig::default())),
            task_handle: Mutex::new(None),
            settings,
        }
    }

    pub async fn status(&self) -> BotStatus {
        *self.status.read().await
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.log.read().await.snapshot()
    }

    pub async fn newest_trade(&self) -> Option<Trade> {
        self.log.read().await.newest().cloned()
    }

    pub async fn stats(&self) -> TradeStats {
        TradeStats::from_trades(&self.log.read().await.snapshot())
    }

    pub async fn performance_series(&self) -> Vec<PerformanceDataPoint> {
        let trades = self.log.read().await.snapshot();
        let mut rng = seeded_rng(self.settings.rng_seed);
        build_performance_series(&mut rng, &trades)
    }

    pub async fn bot_config(&self) -> BotConfig {
        self.bot_config.read().await.clone()
    }

    pub async fn set_bot_config(&self, config: BotConfig) {
        *self.bot_config.write().await = config;
    }

    /// Accepts an advisor suggestion: only the fields present overwrite the
    /// current form state.
    pub async fn apply_suggestion(&self, patch: &ConfigPatch) {
        let mut guard = self.bot_config.write().await;
        guard.apply_patch(patch);
        info!(strategy = %guard.strategy, investment = guard.investment, "bot config updated from suggestion");
    }

    pub async fn set_strategy(&self, strategy: Strategy) {
        self.bot_config.write().await.strategy = strategy;
    }

    pub async fn set_trading_pair(&self, pair: impl Into<String>) {
        self.bot_config.write().await.trading_pair = pair.into();
    }

    pub async fn edit_numeric_field(
        &self,
        field: NumericField,
        raw: &str,
    ) -> Result<(), FieldParseError> {
        self.bot_config.write().await.set_numeric(field, raw)
    }

    pub async fn add_alert(
        &self,
        coin: impl Into<String>,
        target_price: f64,
        condition: AlertCondition,
    ) -> PriceAlert {
        self.alerts.write().await.add(coin, target_price, condition)
    }

    pub async fn remove_alert(&self, id: &str) -> bool {
        self.alerts.write().await.remove(id)
    }

    pub async fn toggle_alert(&self, id: &str) -> bool {
        self.alerts.write().await.toggle(id)
    }

    pub async fn alerts(&self) -> Vec<PriceAlert> {
        self.alerts.read().await.list()
    }

    async fn tick_once(
        rng: &mut StdRng,
        log: &Arc<RwLock<TradeLog>>,
        alerts: &Arc<RwLock<AlertBook>>,
    ) -> Result<Trade> {
        let trade = {
            let mut guard = log.write().await;
            let trade = generate_trade(rng, guard.newest());
            guard.push(trade.clone());
            trade
        };
        debug!(pair = %trade.pair, side = %trade.side, price = trade.price, "tick trade generated");

        let fired = alerts.write().await.evaluate(&trade.pair, trade.price);
        for alert in &fired {
            info!(
                alert_id = %alert.id,
                coin = %alert.coin,
                target = alert.target_price,
                price = trade.price,
                "price alert triggered"
            );
        }

        Ok(trade)
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[async_trait::async_trait]
impl Service for SessionService {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    async fn start(&self) -> Result<()> {
        // Zero would make interval() panic.
        let period = Duration::from_millis(self.settings.tick_interval_ms.max(1));
        let mut rng = seeded_rng(self.settings.rng_seed);
        let log = Arc::clone(&self.log);
        let alerts = Arc::clone(&self.alerts);

        {
            let mut guard = self.task_handle.lock().unwrap();
            if let Some(handle) = guard.as_ref() {
                if !handle.is_finished() {
                    anyhow::bail!("session already running");
                }
            }

            *guard = Some(tokio::spawn(async move {
                let mut ticker = interval(period);
                // The interval fires immediately; swallow that tick so the
                // first trade lands one full period after start.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if let Err(err) = Self::tick_once(&mut rng, &log, &alerts).await {
                        warn!(?err, "trade tick failed");
                    }
                }
            }));
        }

        *self.status.write().await = BotStatus::Running;
        info!(id = %self.id, period_ms = self.settings.tick_interval_ms, "session started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        {
            let mut guard = self.task_handle.lock().unwrap();
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }

        *self.status.write().await = BotStatus::Stopped;
        info!(id = %self.id, "session stopped");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let running = {
            let guard = self.task_handle.lock().unwrap();
            matches!(guard.as_ref(), Some(handle) if !handle.is_finished())
        };
        if running {
            Ok(())
        } else {
            anyhow::bail!("session timer not running")
        }
    }
}

impl Drop for SessionService {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.task_handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
