//! Engine configuration

use protocol::{
    DEFAULT_SESSION_PORT, DISCOVERY_INTERVAL_MS, DISCOVERY_PORT, JOIN_TIMEOUT_MS, MAX_PLAYERS,
};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Port a host binds when none is given explicitly
    #[serde(default = "default_session_port")]
    pub session_port: u16,
    /// Port discovery requests are broadcast to and hosts listen on
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// Remote peers a host admits; never more than [`MAX_PLAYERS`]
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Name a host advertises for itself
    #[serde(default = "default_host_name")]
    pub host_name: String,
}

fn default_session_port() -> u16 {
    DEFAULT_SESSION_PORT
}

fn default_discovery_port() -> u16 {
    DISCOVERY_PORT
}

fn default_broadcast_address() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_discovery_interval_ms() -> u64 {
    DISCOVERY_INTERVAL_MS
}

fn default_join_timeout_ms() -> u64 {
    JOIN_TIMEOUT_MS
}

fn default_max_players() -> usize {
    MAX_PLAYERS
}

fn default_host_name() -> String {
    "Host".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_port: default_session_port(),
            discovery_port: default_discovery_port(),
            broadcast_address: default_broadcast_address(),
            discovery_interval_ms: default_discovery_interval_ms(),
            join_timeout_ms: default_join_timeout_ms(),
            max_players: default_max_players(),
            host_name: default_host_name(),
        }
    }
}

impl SessionConfig {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Roster capacity actually used, clamped to `1..=MAX_PLAYERS`
    pub fn roster_capacity(&self) -> usize {
        self.max_players.clamp(1, MAX_PLAYERS)
    }
}
