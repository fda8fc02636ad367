//! Protocol constants and message type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message types carried in the header `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    /// Broadcast by browsing clients
    DiscoveryRequest = 1,

    /// Session advertisement sent back by a host
    DiscoveryResponse = 2,

    /// Client asks to join a hosted session
    JoinRequest = 3,

    /// Host accepts a join and assigns a peer id
    JoinResponse = 4,

    /// Reserved
    PlayerList = 5,

    /// Reserved
    GameStart = 6,

    /// Opaque application data
    Payload = 7,

    /// Sender is leaving the session
    PlayerDisconnect = 8,

    /// Reserved
    Ping = 9,

    /// Reserved
    Pong = 10,

    /// UTF-8 chat line
    Chat = 11,

    /// Opaque game state snapshot
    GameStateSync = 12,

    /// Opaque turn data
    TurnData = 13,

    /// Reserved
    Error = 14,
}

impl MessageType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::DiscoveryRequest),
            2 => Some(Self::DiscoveryResponse),
            3 => Some(Self::JoinRequest),
            4 => Some(Self::JoinResponse),
            5 => Some(Self::PlayerList),
            6 => Some(Self::GameStart),
            7 => Some(Self::Payload),
            8 => Some(Self::PlayerDisconnect),
            9 => Some(Self::Ping),
            10 => Some(Self::Pong),
            11 => Some(Self::Chat),
            12 => Some(Self::GameStateSync),
            13 => Some(Self::TurnData),
            14 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Types whose payload is handed to the application untouched
    pub fn is_application_data(self) -> bool {
        matches!(self, Self::Payload | Self::GameStateSync | Self::TurnData)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DiscoveryRequest => "discovery-request",
            Self::DiscoveryResponse => "discovery-response",
            Self::JoinRequest => "join-request",
            Self::JoinResponse => "join-response",
            Self::PlayerList => "player-list",
            Self::GameStart => "game-start",
            Self::Payload => "payload",
            Self::PlayerDisconnect => "player-disconnect",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Chat => "chat",
            Self::GameStateSync => "game-state-sync",
            Self::TurnData => "turn-data",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default port hosts bind their session socket to
pub const DEFAULT_SESSION_PORT: u16 = 7777;

/// Well-known port for discovery broadcasts
pub const DISCOVERY_PORT: u16 = 7778;

/// Maximum remote peers in one hosted session
pub const MAX_PLAYERS: usize = 8;

/// Maximum sessions remembered by a browsing client
pub const MAX_DISCOVERED_SESSIONS: usize = 16;

/// Maximum player display name length in bytes
pub const MAX_PLAYER_NAME_LEN: usize = 31;

/// Maximum session name length in bytes
pub const MAX_SESSION_NAME_LEN: usize = 63;

/// Re-broadcast interval for discovery requests (milliseconds)
pub const DISCOVERY_INTERVAL_MS: u64 = 1000;

/// Time a client waits for a join response (milliseconds)
pub const JOIN_TIMEOUT_MS: u64 = 5000;

/// Peer id meaning "sender not in the roster"
pub const UNATTRIBUTED_PEER: u32 = 0;
