use serde::Deserialize;
use std::fs;
use time::UtcOffset;

use monitor_client::window::{APPLY_FILTERS_LIMIT, INITIAL_LOAD_LIMIT};

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_initial_limit")]
    pub initial_limit: u32,
    #[serde(default = "default_apply_limit")]
    pub apply_limit: u32,
    /// Offset used for calendar-day bounds; the host's local offset when unset.
    pub utc_offset_minutes: Option<i16>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            initial_limit: INITIAL_LOAD_LIMIT,
            apply_limit: APPLY_FILTERS_LIMIT,
            utc_offset_minutes: None,
        }
    }
}

impl HistoryConfig {
    pub fn local_offset(&self) -> anyhow::Result<UtcOffset> {
        match self.utc_offset_minutes {
            Some(minutes) => UtcOffset::from_whole_seconds(i32::from(minutes) * 60)
                .map_err(|e| anyhow::anyhow!("invalid history.utc_offset_minutes: {e}")),
            None => Ok(UtcOffset::current_local_offset().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "local offset unavailable, using UTC day bounds");
                UtcOffset::UTC
            })),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    pub http: HttpConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_initial_limit() -> u32 {
    INITIAL_LOAD_LIMIT
}

fn default_apply_limit() -> u32 {
    APPLY_FILTERS_LIMIT
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
