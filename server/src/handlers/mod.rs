//! Handlers for session events raised while hosting

mod chat;
mod roster;

use session::{PeerId, Session, SessionEvent};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Host-side bookkeeping for drained events.
///
/// Events are handled after `update` returns, when a departed peer is
/// already gone from the roster, so names are remembered here.
pub struct Lobby {
    host_name: String,
    relay: bool,
    names: HashMap<PeerId, String>,
}

impl Lobby {
    pub fn new(host_name: &str, relay: bool) -> Self {
        Self {
            host_name: host_name.to_string(),
            relay,
            names: HashMap::new(),
        }
    }

    pub fn handle_event(&mut self, session: &mut Session, event: SessionEvent) {
        match event {
            SessionEvent::PeerJoined { peer_id, name } => {
                roster::announce_join(session, peer_id, &name, self.relay);
                self.names.insert(peer_id, name);
            }
            SessionEvent::PeerLeft { peer_id } => {
                let name = self.names.remove(&peer_id);
                roster::announce_leave(session, peer_id, name.as_deref(), self.relay);
            }
            SessionEvent::Chat { sender, text } => {
                let label = self.label(sender);
                chat::log_chat(&label, &text);
                if self.relay {
                    chat::relay_chat(session, sender, &label, &text);
                }
            }
            SessionEvent::Payload { sender, kind, data } => {
                debug!("{} from {}: {} bytes", kind, self.label(sender), data.len());
            }
            SessionEvent::Error { message } => warn!("Session error: {}", message),
        }
    }

    /// A line typed at the host console
    pub fn host_says(&self, session: &mut Session, text: &str) {
        chat::host_says(session, &self.host_name, text);
    }

    pub fn forget_all(&mut self) {
        self.names.clear();
    }

    fn label(&self, peer_id: PeerId) -> String {
        self.names
            .get(&peer_id)
            .cloned()
            .unwrap_or_else(|| format!("peer {peer_id}"))
    }
}
