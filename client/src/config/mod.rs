//! Configuration management

use anyhow::{Context, Result};
use serde::Deserialize;
use session::SessionConfig;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Display name sent with join requests
    #[serde(default = "default_player_name")]
    pub player_name: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long `browse` (and `join` without a host) listens for answers
    #[serde(default = "default_browse_seconds")]
    pub browse_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub use_colors: bool,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Library logs go to stderr; chat output stays readable at "warn"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_browse_seconds() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_timestamp_format() -> String {
    "%H:%M:%S".to_string()
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            player_name: default_player_name(),
            tick_interval_ms: default_tick_interval_ms(),
            browse_seconds: default_browse_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_colors: default_true(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&contents).with_context(|| "Failed to parse config file")?;

        if config.general.tick_interval_ms == 0 {
            anyhow::bail!("general.tick_interval_ms must be greater than zero");
        }

        Ok(config)
    }
}
