use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use paperbot_advisor::GeminiClient;
use paperbot_config::NodeConfig;
use paperbot_kernel::Kernel;
use paperbot_session::{AlertCondition, SessionService};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let env_name = std::env::var("PAPERBOT_ENV").ok();
    let config_path = std::env::var("PAPERBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/config.toml"));

    // Tracing wants the configured log path, so load first and report any
    // load failure right after the subscriber is up.
    let (node_config, load_err) = match NodeConfig::load_with_env(&config_path, env_name) {
        Ok(cfg) => (cfg, None),
        Err(err) => (NodeConfig::default(), Some(err)),
    };

    let log_dir = node_config.logging.log_path.clone();
    let _log_guard = Kernel::init_tracing_with_file(log_dir.as_deref().map(Path::new));
    let _ = Kernel::reload_tracing_filter(&node_config.logging.level);

    if let Some(err) = load_err {
        warn!(
            ?err,
            path = %config_path.display(),
            "failed to load config file, using defaults"
        );
    }
    info!(config = ?node_config.redacted(), "node configured");

    let session = Arc::new(SessionService::new(
        "session".to_string(),
        node_config.session.clone(),
    ));
    session.set_bot_config(node_config.bot.clone()).await;

    let mut kernel = Kernel::default();
    kernel.register_service(session.clone());

    kernel.start_all().await?;

    let stats = session.stats().await;
    info!(
        trades = session.trades().await.len(),
        total_pnl = stats.total_pnl,
        win_rate = stats.win_rate(),
        "trade history seeded"
    );

    let alert = session
        .add_alert("BTC", 52_000.0, AlertCondition::Above)
        .await;
    info!(alert_id = %alert.id, target = alert.target_price, "startup alert armed");

    match GeminiClient::new(&node_config.advisor) {
        Ok(client) => {
            let advisor_session = Arc::clone(&session);
            tokio::spawn(async move {
                match client.market_summary().await {
                    Ok(summary) => info!(
                        coins = summary.coins.len(),
                        sources = summary.sources.len(),
                        "market summary fetched"
                    ),
                    Err(err) => warn!(%err, "market summary unavailable"),
                }

                match client.crypto_news().await {
                    Ok(digest) => info!(articles = digest.articles.len(), "crypto news fetched"),
                    Err(err) => warn!(%err, "crypto news unavailable"),
                }

                let request =
                    "Suggest a conservative configuration for a BTC/USDT paper trading bot.";
                match client.suggest_strategy(request).await {
                    Ok(patch) => advisor_session.apply_suggestion(&patch).await,
                    Err(err) => warn!(%err, "strategy suggestion unavailable"),
                }
            });
        }
        Err(err) => warn!(?err, "advisor disabled"),
    }

    info!("paperbot node online");

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    kernel.stop_all().await?;
    Ok(())
}
