//! LAN session engine
//!
//! Hosts a session, joins one, browses advertised sessions and moves opaque
//! payloads between peers over fire-and-forget UDP. Everything is driven by
//! [`Session::update`], called once per application tick; nothing here blocks
//! or spawns threads.

pub mod config;
pub mod discovery;
mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod roster;
pub mod state;
pub mod stats;
pub mod transport;

pub use config::SessionConfig;
pub use discovery::{DiscoveredSession, DiscoveryRegistry, RegistryUpdate};
pub use engine::Session;
pub use error::SessionError;
pub use events::{EventQueue, NoopEvents, SessionEvent, SessionEvents};
pub use roster::{Admission, Peer, PeerId, Roster, RosterError};
pub use state::{Role, SessionState};
pub use stats::Statistics;

pub use protocol::{MessageType, SessionAdvert, MAX_DISCOVERED_SESSIONS, MAX_PLAYERS};
