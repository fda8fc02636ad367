//! Event handlers the engine reports into

use crate::roster::PeerId;
use protocol::MessageType;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Receiver for session events.
///
/// Every method has an empty default, so implementors only override what
/// they care about. Handlers run inside [`Session::update`](crate::Session::update)
/// and must not block.
pub trait SessionEvents {
    /// A join request was accepted (host only)
    fn on_peer_joined(&mut self, _peer_id: PeerId, _name: &str) {}

    /// A peer announced it is leaving (host only)
    fn on_peer_left(&mut self, _peer_id: PeerId) {}

    /// Payload, game-state-sync or turn-data bytes arrived.
    /// `sender` is 0 when the source address is not in the roster.
    fn on_payload(&mut self, _sender: PeerId, _kind: MessageType, _data: &[u8]) {}

    fn on_chat(&mut self, _sender: PeerId, _text: &str) {}

    fn on_error(&mut self, _message: &str) {}
}

/// Handler that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

/// Owned copy of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PeerJoined { peer_id: PeerId, name: String },
    PeerLeft { peer_id: PeerId },
    Payload {
        sender: PeerId,
        kind: MessageType,
        data: Vec<u8>,
    },
    Chat { sender: PeerId, text: String },
    Error { message: String },
}

/// Queue that records events for the caller to drain after `update`.
///
/// Clones share the same queue: hand one clone to the session and keep
/// another to read from.
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<SessionEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn pop(&self) -> Option<SessionEvent> {
        self.events.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn push(&self, event: SessionEvent) {
        self.events.borrow_mut().push_back(event);
    }
}

impl SessionEvents for EventQueue {
    fn on_peer_joined(&mut self, peer_id: PeerId, name: &str) {
        self.push(SessionEvent::PeerJoined {
            peer_id,
            name: name.to_string(),
        });
    }

    fn on_peer_left(&mut self, peer_id: PeerId) {
        self.push(SessionEvent::PeerLeft { peer_id });
    }

    fn on_payload(&mut self, sender: PeerId, kind: MessageType, data: &[u8]) {
        self.push(SessionEvent::Payload {
            sender,
            kind,
            data: data.to_vec(),
        });
    }

    fn on_chat(&mut self, sender: PeerId, text: &str) {
        self.push(SessionEvent::Chat {
            sender,
            text: text.to_string(),
        });
    }

    fn on_error(&mut self, message: &str) {
        self.push(SessionEvent::Error {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_queue() {
        let reader = EventQueue::new();
        let mut writer = reader.clone();

        writer.on_peer_joined(5, "Nova");
        writer.on_chat(5, "hi");

        assert_eq!(reader.len(), 2);
        assert_eq!(
            reader.pop(),
            Some(SessionEvent::PeerJoined {
                peer_id: 5,
                name: "Nova".to_string()
            })
        );
        assert_eq!(reader.drain().len(), 1);
        assert!(writer.is_empty());
    }
}
