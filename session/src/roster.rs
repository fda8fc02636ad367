//! Host-side roster of connected peers
//!
//! Peers are keyed by the source address their join request arrived from.
//! There is no handshake secret, so anyone on the LAN able to send from a
//! peer's address and port is treated as that peer.

use protocol::{truncate_utf8, MAX_PLAYER_NAME_LEN, UNATTRIBUTED_PEER};
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;

/// Host-assigned peer identifier; `0` is never assigned
pub type PeerId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    /// Reserved; always `true` while the peer is in the roster
    pub connected: bool,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterError {
    #[error("Roster is full ({0} peers)")]
    Full(usize),
}

/// Outcome of a successful [`Roster::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new peer was created
    Admitted(PeerId),
    /// The address was already in the roster; nothing changed
    Rejoined(PeerId),
}

impl Admission {
    pub fn peer_id(self) -> PeerId {
        match self {
            Self::Admitted(id) | Self::Rejoined(id) => id,
        }
    }
}

/// Bounded, insertion-ordered peer list
#[derive(Debug)]
pub struct Roster {
    peers: Vec<Peer>,
    capacity: usize,
}

impl Roster {
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit the sender of a join request.
    ///
    /// `reserved` is an id the new peer must not receive (the host's own).
    /// An empty name becomes `Player<n>`.
    pub fn admit(
        &mut self,
        name: &str,
        addr: SocketAddr,
        reserved: PeerId,
    ) -> Result<Admission, RosterError> {
        if let Some(existing) = self.peers.iter_mut().find(|p| p.addr == addr) {
            existing.last_seen = Instant::now();
            return Ok(Admission::Rejoined(existing.id));
        }

        if self.is_full() {
            return Err(RosterError::Full(self.capacity));
        }

        let name = match truncate_utf8(name.trim(), MAX_PLAYER_NAME_LEN) {
            "" => self.placeholder_name(),
            trimmed => trimmed.to_string(),
        };

        let id = self.generate_id(reserved);
        self.peers.push(Peer {
            id,
            name,
            addr,
            last_seen: Instant::now(),
            connected: true,
        });
        Ok(Admission::Admitted(id))
    }

    /// Lowest `Player<n>` not already taken
    fn placeholder_name(&self) -> String {
        (1..)
            .map(|n| format!("Player{n}"))
            .find(|candidate| self.peers.iter().all(|p| &p.name != candidate))
            .unwrap_or_default()
    }

    fn generate_id(&self, reserved: PeerId) -> PeerId {
        loop {
            let id: PeerId = rand::random();
            if id != UNATTRIBUTED_PEER && id != reserved && self.find(id).is_none() {
                return id;
            }
        }
    }

    /// Remove the peer at `addr`, keeping the others in join order.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<Peer> {
        let index = self.peers.iter().position(|p| p.addr == addr)?;
        Some(self.peers.remove(index))
    }

    pub fn find(&self, id: PeerId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.id == id)
    }

    pub fn find_by_address(&self, addr: SocketAddr) -> Option<&Peer> {
        self.peers.iter().find(|p| p.addr == addr)
    }

    /// Attribute a message from `addr`, refreshing the peer's `last_seen`.
    ///
    /// Returns [`UNATTRIBUTED_PEER`] for unknown senders.
    pub fn attribute(&mut self, addr: SocketAddr) -> PeerId {
        match self.peers.iter_mut().find(|p| p.addr == addr) {
            Some(peer) => {
                peer.last_seen = Instant::now();
                peer.id
            }
            None => UNATTRIBUTED_PEER,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn as_slice(&self) -> &[Peer] {
        &self.peers
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
