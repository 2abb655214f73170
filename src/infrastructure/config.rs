use crate::domain::display::{all_fields, DisplayField};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Single environment key naming the telemetry backend
pub const API_URL_ENV: &str = "TELEMETRY_API_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("history.capacity must be at least 1")]
    ZeroCapacity,
    #[error("poller.interval_ms must be at least 1")]
    ZeroInterval,
    #[error("source.base_url is not a valid URL: {0}")]
    InvalidBaseUrl(String),
    #[error("display.fields must name at least one field")]
    NoDisplayFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceSettings,
    pub poller: PollerSettings,
    pub history: HistorySettings,
    pub display: DisplaySettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerSettings {
    pub interval_ms: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistorySettings {
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    pub fields: Vec<DisplayField>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            fields: all_fields(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if let Err(e) = reqwest::Url::parse(&self.source.base_url) {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "{} ({})",
                self.source.base_url, e
            )));
        }
        if self.display.fields.is_empty() {
            return Err(ConfigError::NoDisplayFields);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poller.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.source.request_timeout_ms)
    }
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let vars = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false));

    build_config(with_environment(builder, vars)?)
}

/// `DASHBOARD__<SECTION>__<KEY>` variables, then `TELEMETRY_API_URL` on top.
/// List keys take comma-separated values.
fn with_environment(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    vars: config::Map<String, String>,
) -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let api_url = vars.get(API_URL_ENV).cloned();
    let environment = config::Environment::with_prefix("DASHBOARD")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("display.fields")
        .source(Some(vars));

    Ok(builder
        .add_source(environment)
        .set_override_option("source.base_url", api_url)?)
}

fn build_config(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<DashboardConfig> {
    let settings: DashboardConfig = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
