//! Host configuration

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
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Name advertised to browsing clients
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// 0 disables the periodic statistics line
    #[serde(default = "default_stats_interval_sec")]
    pub stats_interval_sec: u64,
    /// Forward each peer's chat to the other peers
    #[serde(default = "default_true")]
    pub relay_chat: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_session_name() -> String {
    "LAN session".to_string()
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_stats_interval_sec() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            session_name: default_session_name(),
            tick_interval_ms: default_tick_interval_ms(),
            stats_interval_sec: default_stats_interval_sec(),
            relay_chat: default_true(),
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
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        if config.general.tick_interval_ms == 0 {
            anyhow::bail!("general.tick_interval_ms must be greater than zero");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_optional() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.general.session_name, "LAN session");
        assert_eq!(config.session.session_port, 7777);
        assert_eq!(config.logging.level, "info");
        assert!(config.general.relay_chat);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
            [general]
            session_name = "Friday night"
            relay_chat = false

            [session]
            session_port = 9000
            host_name = "den-pc"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.session_name, "Friday night");
        assert!(!config.general.relay_chat);
        assert_eq!(config.general.tick_interval_ms, 16);
        assert_eq!(config.session.session_port, 9000);
        assert_eq!(config.session.host_name, "den-pc");
        assert_eq!(config.session.discovery_port, 7778);
    }
}
