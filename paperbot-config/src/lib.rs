use std::path::{Path, PathBuf};

use anyhow::Result;
use paperbot_advisor::AdvisorSettings;
use paperbot_core::BotConfig;
use paperbot_session::SessionSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub type NodeId = String;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub log_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_path: Some("logs".to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub node_id: NodeId,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub advisor: AdvisorSettings,
    #[serde(default)]
    pub bot: BotConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            logging: LoggingConfig::default(),
            session: SessionSettings::default(),
            advisor: AdvisorSettings::default(),
            bot: BotConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let value = load_value(path)?;
        let mut cfg: NodeConfig = value.try_into()?;
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    /// Loads the base file, overlays `config.{env}.toml` from the same
    /// directory when an environment name is given (or `PAPERBOT_ENV` is
    /// set), then applies env-var overrides.
    pub fn load_with_env(base_path: &Path, env_name: Option<String>) -> Result<Self> {
        let mut merged = load_value(base_path)?;
        let env_overlay = env_name.or_else(|| std::env::var("PAPERBOT_ENV").ok());
        if let Some(env) = env_overlay {
            let env_path = env_config_path(base_path, &env);
            if env_path.exists() {
                let overlay = load_value(&env_path)?;
                merge_toml(&mut merged, overlay);
            }
        }

        let mut cfg: NodeConfig = merged.try_into()?;
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    pub fn redacted(&self) -> Self {
        let mut cloned = self.clone();
        if cloned.advisor.api_key.is_some() {
            cloned.advisor.api_key = Some("***".to_string());
        }
        cloned
    }
}

fn default_node_id() -> NodeId {
    "paperbot-1".to_string()
}

fn load_value(path: &Path) -> Result<toml::Value> {
    let contents = std::fs::read_to_string(path)?;
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        match ext {
            "yaml" | "yml" => {
                let json_value: JsonValue = serde_yaml::from_str(&contents)?;
                let toml_string = toml::to_string(&json_value)?;
                Ok(toml::from_str(&toml_string)?)
            }
            _ => Ok(toml::from_str(&contents)?),
        }
    } else {
        Ok(toml::from_str(&contents)?)
    }
}

fn env_config_path(base_path: &Path, env: &str) -> PathBuf {
    let mut env_path = base_path.to_path_buf();
    if let Some(parent) = base_path.parent() {
        env_path = parent.join(format!("config.{}.toml", env));
    } else {
        env_path.set_file_name(format!("config.{}.toml", env));
    }
    env_path
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    use toml::Value;
    match (base, overlay) {
        (Value::Table(base_map), Value::Table(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(base_val) => merge_toml(base_val, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (base_slot, overlay_val) => {
            *base_slot = overlay_val;
        }
    }
}

fn apply_env_overrides(cfg: &mut NodeConfig) {
    if let Ok(node_id) = std::env::var("PAPERBOT_NODE_ID") {
        cfg.node_id = node_id;
    }
    if let Ok(level) = std::env::var("PAPERBOT_LOG_LEVEL") {
        cfg.logging.level = level;
    }
    if let Ok(api_key) = std::env::var("PAPERBOT_GEMINI_API_KEY") {
        cfg.advisor.api_key = Some(api_key);
    }
    if let Ok(model) = std::env::var("PAPERBOT_GEMINI_MODEL") {
        cfg.advisor.model = model;
    }
    if let Ok(tick) = std::env::var("PAPERBOT_TICK_INTERVAL_MS") {
        if let Ok(parsed) = tick.parse::<u64>() {
            cfg.session.tick_interval_ms = parsed;
        }
    }
    if let Ok(cap) = std::env::var("PAPERBOT_MAX_LOG_LEN") {
        if let Ok(parsed) = cap.parse::<usize>() {
            cfg.session.max_log_len = parsed;
        }
    }

    if let Some(key) = cfg.advisor.api_key.clone() {
        cfg.advisor.api_key = Some(resolve_secret(&key));
    }
}

fn resolve_secret(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(stripped) = trimmed.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(stripped).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    }
}
