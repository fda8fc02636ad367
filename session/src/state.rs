//! Connection lifecycle states

use serde::Serialize;
use std::fmt;

/// Connection lifecycle of a [`Session`](crate::Session).
///
/// `Disconnected` is both the initial state and the state every teardown
/// returns to. `Error` is only left through an explicit disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Disconnected,
    Hosting,
    Connecting,
    Connected,
    Error,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Hosting => "Hosting",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Error => "Error",
        }
    }

    /// Application traffic may only flow in these states
    pub fn can_send(self) -> bool {
        matches!(self, Self::Hosting | Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the protocol this process is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Role {
    #[default]
    Idle,
    Host,
    Client,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_hosting_and_connected_can_send() {
        assert!(SessionState::Hosting.can_send());
        assert!(SessionState::Connected.can_send());
        assert!(!SessionState::Disconnected.can_send());
        assert!(!SessionState::Connecting.can_send());
        assert!(!SessionState::Error.can_send());
    }

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
        assert_eq!(SessionState::default().to_string(), "Disconnected");
    }
}
