//! Session error types

use crate::state::SessionState;
use protocol::ProtocolError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Could not resolve host address {0}")]
    Resolve(String),

    #[error("Failed to send to {to}: {source}")]
    Send {
        to: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("No socket open for this operation")]
    NoSocket,

    #[error("Discovery is not active")]
    DiscoveryInactive,

    #[error("No peer with id {0}")]
    UnknownPeer(u32),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
