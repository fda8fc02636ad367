//! Client-side registry of advertised sessions

use protocol::SessionAdvert;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A session seen in a discovery response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    pub advert: SessionAdvert,
    /// Where to send the join request: responder ip, advertised port
    pub host_addr: SocketAddr,
    pub last_seen: Instant,
}

impl DiscoveredSession {
    pub fn new(advert: SessionAdvert, responder: SocketAddr) -> Self {
        let host_addr = SocketAddr::new(responder.ip(), advert.host_port);
        Self {
            advert,
            host_addr,
            last_seen: Instant::now(),
        }
    }

    pub fn session_id(&self) -> u32 {
        self.advert.session_id
    }
}

/// What [`DiscoveryRegistry::record`] did with an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryUpdate {
    Added,
    Refreshed,
    /// Registry was full and the session id unknown
    Dropped,
}

/// Bounded list of sessions, deduplicated by session id, in first-seen order
#[derive(Debug)]
pub struct DiscoveryRegistry {
    sessions: Vec<DiscoveredSession>,
    capacity: usize,
}

impl DiscoveryRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, entry: DiscoveredSession) -> RegistryUpdate {
        if let Some(existing) = self
            .sessions
            .iter_mut()
            .find(|s| s.session_id() == entry.session_id())
        {
            *existing = entry;
            return RegistryUpdate::Refreshed;
        }

        if self.sessions.len() >= self.capacity {
            return RegistryUpdate::Dropped;
        }

        self.sessions.push(entry);
        RegistryUpdate::Added
    }

    /// Up to `limit` sessions in first-seen order
    pub fn snapshot(&self, limit: usize) -> Vec<DiscoveredSession> {
        self.sessions.iter().take(limit).cloned().collect()
    }

    pub fn get(&self, session_id: u32) -> Option<&DiscoveredSession> {
        self.sessions.iter().find(|s| s.session_id() == session_id)
    }

    /// Forget sessions not refreshed within `max_age`; returns how many went.
    pub fn prune_stale(&mut self, max_age: Duration) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|s| now.duration_since(s.last_seen) < max_age);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::MAX_DISCOVERED_SESSIONS;

    fn entry(session_id: u32, current_players: u8) -> DiscoveredSession {
        let advert = SessionAdvert {
            session_id,
            session_name: format!("game-{session_id}"),
            host_name: "Host".to_string(),
            host_port: 7777,
            current_players,
            max_players: 8,
        };
        DiscoveredSession::new(advert, SocketAddr::from(([10, 0, 0, 5], 7778)))
    }

    #[test]
    fn test_same_session_id_refreshes_in_place() {
        let mut registry = DiscoveryRegistry::new(MAX_DISCOVERED_SESSIONS);
        assert_eq!(registry.record(entry(1, 1)), RegistryUpdate::Added);
        assert_eq!(registry.record(entry(2, 0)), RegistryUpdate::Added);
        assert_eq!(registry.record(entry(1, 4)), RegistryUpdate::Refreshed);

        let sessions = registry.snapshot(MAX_DISCOVERED_SESSIONS);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id(), 1);
        assert_eq!(sessions[0].advert.current_players, 4);
    }

    #[test]
    fn test_full_registry_drops_new_sessions() {
        let mut registry = DiscoveryRegistry::new(MAX_DISCOVERED_SESSIONS);
        for id in 0..MAX_DISCOVERED_SESSIONS as u32 {
            registry.record(entry(id, 0));
        }
        assert_eq!(registry.record(entry(999, 0)), RegistryUpdate::Dropped);
        assert_eq!(registry.len(), MAX_DISCOVERED_SESSIONS);
        assert!(registry.get(999).is_none());

        // Known sessions still refresh when full
        assert_eq!(registry.record(entry(3, 2)), RegistryUpdate::Refreshed);
    }

    #[test]
    fn test_host_addr_uses_responder_ip_and_advertised_port() {
        let session = entry(1, 0);
        assert_eq!(session.host_addr, SocketAddr::from(([10, 0, 0, 5], 7777)));
    }

    #[test]
    fn test_snapshot_respects_limit() {
        let mut registry = DiscoveryRegistry::new(MAX_DISCOVERED_SESSIONS);
        for id in 0..5 {
            registry.record(entry(id, 0));
        }
        assert_eq!(registry.snapshot(3).len(), 3);
        assert_eq!(registry.snapshot(0).len(), 0);
    }

    #[test]
    fn test_prune_stale_keeps_fresh_entries() {
        let mut registry = DiscoveryRegistry::new(MAX_DISCOVERED_SESSIONS);
        registry.record(entry(1, 0));
        assert_eq!(registry.prune_stale(Duration::from_secs(60)), 0);
        assert_eq!(registry.prune_stale(Duration::ZERO), 1);
        assert!(registry.is_empty());
    }
}
