//! The session context and its public operations
//!
//! A [`Session`] owns every socket, the roster, the discovery registry and the
//! counters. It is created once, reset on every disconnect and closes its
//! sockets when dropped.

use crate::config::SessionConfig;
use crate::discovery::{DiscoveredSession, DiscoveryRegistry};
use crate::error::SessionError;
use crate::events::{NoopEvents, SessionEvents};
use crate::roster::{Peer, PeerId, Roster};
use crate::state::{Role, SessionState};
use crate::stats::Statistics;
use crate::transport::Transport;
use protocol::{
    packets::{self, truncate_utf8, JoinRequestPayload},
    MessageType, ProtocolError, MAX_DISCOVERED_SESSIONS, MAX_MESSAGE_SIZE, MAX_SESSION_NAME_LEN,
    UNATTRIBUTED_PEER,
};
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Larger than any valid datagram so oversized ones arrive whole and get rejected
const RECV_BUFFER_SIZE: usize = 4096;

/// Which of the two sockets a message travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Session,
    Discovery,
}

pub struct Session {
    pub(crate) config: SessionConfig,
    pub(crate) state: SessionState,
    pub(crate) role: Role,
    pub(crate) local_peer_id: PeerId,
    pub(crate) session_id: u32,
    pub(crate) session_name: String,
    /// Actual port of the session socket while hosting
    pub(crate) local_port: u16,
    pub(crate) session_socket: Option<Transport>,
    pub(crate) discovery_socket: Option<Transport>,
    /// Join target while acting as a client
    pub(crate) host_addr: Option<SocketAddr>,
    pub(crate) roster: Roster,
    pub(crate) registry: DiscoveryRegistry,
    pub(crate) stats: Statistics,
    pub(crate) events: Box<dyn SessionEvents>,
    next_sequence: u32,
    last_discovery: Option<Instant>,
    pub(crate) join_started: Option<Instant>,
    recv_buf: Vec<u8>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let capacity = config.roster_capacity();
        Self {
            config,
            state: SessionState::Disconnected,
            role: Role::Idle,
            local_peer_id: random_id(),
            session_id: 0,
            session_name: String::new(),
            local_port: 0,
            session_socket: None,
            discovery_socket: None,
            host_addr: None,
            roster: Roster::new(capacity),
            registry: DiscoveryRegistry::new(MAX_DISCOVERED_SESSIONS),
            stats: Statistics::default(),
            events: Box::new(NoopEvents),
            next_sequence: 1,
            last_discovery: None,
            join_started: None,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
        }
    }

    /// Replace the event handler. Only one handler is active at a time.
    pub fn set_events<E: SessionEvents + 'static>(&mut self, events: E) {
        self.events = Box::new(events);
    }

    /// Start hosting `name` with the session socket bound to `port`.
    ///
    /// Port 0 binds an ephemeral port; [`local_addr`](Self::local_addr)
    /// reports the one chosen. Also binds the discovery port so browsing
    /// clients get answers. Any browsing socket held before is released.
    pub fn host(&mut self, name: &str, port: u16) -> Result<(), SessionError> {
        self.require_state(SessionState::Disconnected, "host")?;

        let session_socket =
            Transport::bind(port, false).map_err(|source| SessionError::Bind { port, source })?;
        let discovery_port = self.config.discovery_port;
        let discovery_socket =
            Transport::bind(discovery_port, true).map_err(|source| SessionError::Bind {
                port: discovery_port,
                source,
            })?;

        self.local_port = session_socket
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(port);
        self.session_socket = Some(session_socket);
        self.discovery_socket = Some(discovery_socket);
        self.last_discovery = None;
        self.registry.clear();
        self.roster.clear();

        self.session_name = match truncate_utf8(name.trim(), MAX_SESSION_NAME_LEN) {
            "" => "LAN session".to_string(),
            trimmed => trimmed.to_string(),
        };
        self.session_id = random_id();
        self.role = Role::Host;
        self.state = SessionState::Hosting;

        info!(
            "Hosting \"{}\" (session {:#010x}) on port {}, discovery on port {}",
            self.session_name, self.session_id, self.local_port, discovery_port
        );
        Ok(())
    }

    /// Send a join request to `host:port` and wait for the answer in
    /// [`update`](Self::update).
    pub fn join(&mut self, host: &str, port: u16, display_name: &str) -> Result<(), SessionError> {
        self.require_state(SessionState::Disconnected, "join")?;

        let host_addr = resolve_ipv4(host, port)?;
        let socket =
            Transport::ephemeral(false).map_err(|source| SessionError::Bind { port: 0, source })?;
        self.session_socket = Some(socket);

        let request = JoinRequestPayload::new(display_name);
        if let Err(e) = self.send_message(
            Channel::Session,
            host_addr,
            MessageType::JoinRequest,
            &request.to_bytes(),
        ) {
            self.session_socket = None;
            return Err(e);
        }

        self.host_addr = Some(host_addr);
        self.role = Role::Client;
        self.state = SessionState::Connecting;
        self.join_started = Some(Instant::now());

        info!(
            "Sent join request to {} as \"{}\"",
            host_addr, request.player_name
        );
        Ok(())
    }

    /// Leave the current session.
    ///
    /// From `Hosting` or `Connected` a disconnect notice goes to every known
    /// peer first. Sockets are closed and roster and registry cleared in
    /// every case. Does nothing while already disconnected.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }

        if self.state.can_send() {
            match self.send_to_all(MessageType::PlayerDisconnect, &[]) {
                Ok(notified) => debug!("Sent disconnect notice to {} peer(s)", notified),
                Err(e) => debug!("Disconnect notice failed: {}", e),
            }
        }

        info!("Disconnected (was {})", self.state);
        self.reset();
    }

    /// Disconnect and release the browsing socket as well.
    pub fn shutdown(&mut self) {
        self.disconnect();
        self.discovery_socket = None;
        self.last_discovery = None;
        self.registry.clear();
    }

    pub(crate) fn reset(&mut self) {
        self.session_socket = None;
        self.discovery_socket = None;
        self.roster.clear();
        self.registry.clear();
        self.host_addr = None;
        self.role = Role::Idle;
        self.state = SessionState::Disconnected;
        self.session_id = 0;
        self.session_name.clear();
        self.local_port = 0;
        self.last_discovery = None;
        self.join_started = None;
        self.local_peer_id = random_id();
    }

    /// Open a broadcast socket, forget earlier results and send a request.
    pub fn start_discovery(&mut self) -> Result<(), SessionError> {
        if self.role == Role::Host {
            return Err(SessionError::InvalidState {
                operation: "start discovery",
                state: self.state,
            });
        }

        if self.discovery_socket.is_none() {
            let socket = Transport::ephemeral(true)
                .map_err(|source| SessionError::Bind { port: 0, source })?;
            self.discovery_socket = Some(socket);
        }
        self.registry.clear();

        debug!(
            "Discovery started, broadcasting to {}:{}",
            self.config.broadcast_address, self.config.discovery_port
        );
        self.broadcast_discovery_request()
    }

    /// Close the browsing socket. Discovered sessions stay listed.
    ///
    /// A host keeps its discovery socket; it is needed to answer requests.
    pub fn stop_discovery(&mut self) {
        if self.role == Role::Host {
            return;
        }
        if self.discovery_socket.take().is_some() {
            debug!("Discovery stopped");
        }
        self.last_discovery = None;
    }

    pub fn broadcast_discovery_request(&mut self) -> Result<(), SessionError> {
        if self.role == Role::Host {
            return Err(SessionError::InvalidState {
                operation: "broadcast discovery",
                state: self.state,
            });
        }
        if self.discovery_socket.is_none() {
            return Err(SessionError::DiscoveryInactive);
        }

        let to = SocketAddr::V4(SocketAddrV4::new(
            self.config.broadcast_address,
            self.config.discovery_port,
        ));
        self.last_discovery = Some(Instant::now());
        self.send_message(Channel::Discovery, to, MessageType::DiscoveryRequest, &[])
    }

    /// Run one tick: at most one datagram per socket, the join timeout check
    /// and a discovery re-broadcast when one is due.
    ///
    /// Returns how many messages were dispatched.
    pub fn update(&mut self) -> usize {
        let mut dispatched = 0;
        if self.poll(Channel::Session) {
            dispatched += 1;
        }
        if self.poll(Channel::Discovery) {
            dispatched += 1;
        }
        self.check_join_timeout();
        self.rebroadcast_if_due();
        dispatched
    }

    fn poll(&mut self, channel: Channel) -> bool {
        let socket = match channel {
            Channel::Session => self.session_socket.as_ref(),
            Channel::Discovery => self.discovery_socket.as_ref(),
        };
        let Some(socket) = socket else {
            return false;
        };

        let (len, from) = match socket.recv(&mut self.recv_buf) {
            Ok(Some(received)) => received,
            Ok(None) => return false,
            Err(e) => {
                self.stats.record_error();
                warn!("Receive failed on {:?} socket: {}", channel, e);
                self.events.on_error(&format!("receive failed: {e}"));
                return false;
            }
        };

        let message = match packets::decode(&self.recv_buf[..len]) {
            Ok(message) => message,
            Err(e) => {
                self.stats.record_error();
                debug!("Dropping datagram from {}: {}", from, e);
                return false;
            }
        };

        self.stats.record_received(len);
        self.dispatch(channel, from, message);
        true
    }

    fn check_join_timeout(&mut self) {
        if self.state != SessionState::Connecting {
            return;
        }
        let Some(started) = self.join_started else {
            return;
        };
        if started.elapsed() < self.config.join_timeout() {
            return;
        }

        self.join_started = None;
        self.state = SessionState::Error;
        let message = match self.host_addr {
            Some(addr) => format!("no join response from {addr}"),
            None => "join timed out".to_string(),
        };
        warn!("{}", message);
        self.events.on_error(&message);
    }

    fn rebroadcast_if_due(&mut self) {
        if self.discovery_socket.is_none()
            || self.role == Role::Host
            || self.state == SessionState::Connected
        {
            return;
        }

        let interval = self.config.discovery_interval();
        let due = self
            .last_discovery
            .is_none_or(|sent| sent.elapsed() >= interval);
        if due {
            if let Err(e) = self.broadcast_discovery_request() {
                debug!("Discovery re-broadcast failed: {}", e);
            }
        }
    }

    /// Send to one roster entry (host only; a client's roster is empty).
    pub fn send_to_peer(
        &mut self,
        peer_id: PeerId,
        kind: MessageType,
        data: &[u8],
    ) -> Result<(), SessionError> {
        self.require_can_send("send to a peer")?;

        let addr = self
            .roster
            .find(peer_id)
            .map(|peer| peer.addr)
            .ok_or(SessionError::UnknownPeer(peer_id))?;
        self.send_message(Channel::Session, addr, kind, data)
    }

    /// Send to every connected peer, or to the host when acting as a client.
    ///
    /// Returns how many sends succeeded; zero peers is not an error.
    pub fn send_to_all(&mut self, kind: MessageType, data: &[u8]) -> Result<usize, SessionError> {
        self.require_can_send("send")?;
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                max: MAX_MESSAGE_SIZE,
                actual: data.len(),
            }
            .into());
        }

        let targets: Vec<SocketAddr> = match self.role {
            Role::Host => self
                .roster
                .iter()
                .filter(|peer| peer.connected)
                .map(|peer| peer.addr)
                .collect(),
            Role::Client | Role::Idle => self.host_addr.into_iter().collect(),
        };

        let mut delivered = 0;
        for to in targets {
            if self.send_message(Channel::Session, to, kind, data).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Send a chat line to everyone. Text is cut to fit one message.
    pub fn send_chat(&mut self, text: &str) -> Result<usize, SessionError> {
        self.require_can_send("send chat")?;
        let text = truncate_utf8(text, MAX_MESSAGE_SIZE);
        if text.is_empty() {
            return Ok(0);
        }
        self.send_to_all(MessageType::Chat, text.as_bytes())
    }

    pub fn send_game_state(&mut self, state: &[u8]) -> Result<usize, SessionError> {
        self.send_to_all(MessageType::GameStateSync, state)
    }

    pub fn send_turn_data(&mut self, turn: &[u8]) -> Result<usize, SessionError> {
        self.send_to_all(MessageType::TurnData, turn)
    }

    /// Frame and send one message; every send funnels through here.
    pub(crate) fn send_message(
        &mut self,
        channel: Channel,
        to: SocketAddr,
        kind: MessageType,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let datagram = packets::encode(kind, payload, sequence)?;
        let socket = match channel {
            Channel::Session => self.session_socket.as_ref(),
            Channel::Discovery => self.discovery_socket.as_ref(),
        }
        .ok_or(SessionError::NoSocket)?;

        match socket.send_to(&datagram, to) {
            Ok(()) => {
                self.stats.record_sent(datagram.len());
                trace!("Sent {} #{} ({} bytes) to {}", kind, sequence, datagram.len(), to);
                Ok(())
            }
            Err(source) => {
                self.stats.record_error();
                warn!("Failed to send {} to {}: {}", kind, to, source);
                Err(SessionError::Send { to, source })
            }
        }
    }

    fn require_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn require_can_send(&self, operation: &'static str) -> Result<(), SessionError> {
        if !self.state.can_send() {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Host: own id. Client: the id assigned by the host, or
    /// [`UNATTRIBUTED_PEER`] until the state reaches `Connected`.
    pub fn local_peer_id(&self) -> PeerId {
        if self.role == Role::Client && self.state != SessionState::Connected {
            return UNATTRIBUTED_PEER;
        }
        self.local_peer_id
    }

    /// Id of the hosted session, 0 when not hosting
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Address of the session socket, if one is open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session_socket
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
    }

    /// Host this client joined (or is joining)
    pub fn host_addr(&self) -> Option<SocketAddr> {
        self.host_addr
    }

    pub fn is_discovering(&self) -> bool {
        self.discovery_socket.is_some() && self.role != Role::Host
    }

    /// Up to `limit` discovered sessions, first seen first
    pub fn discovered_sessions(&self, limit: usize) -> Vec<DiscoveredSession> {
        self.registry.snapshot(limit)
    }

    /// Drop discovered sessions that have not answered within `max_age`.
    pub fn prune_discovered(&mut self, max_age: Duration) -> usize {
        self.registry.prune_stale(max_age)
    }

    pub fn roster(&self) -> &[Peer] {
        self.roster.as_slice()
    }

    pub fn peer(&self, peer_id: PeerId) -> Option<&Peer> {
        self.roster.find(peer_id)
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn random_id() -> u32 {
    loop {
        let id: u32 = rand::random();
        if id != 0 {
            return id;
        }
    }
}

fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddr, SessionError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|_| SessionError::Resolve(format!("{host}:{port}")))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| SessionError::Resolve(format!("{host}:{port}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_game_state_while_disconnected_sends_nothing() {
        let mut session = Session::default();
        let err = session.send_game_state(b"snapshot").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                state: SessionState::Disconnected,
                ..
            }
        ));
        assert_eq!(session.statistics().messages_sent, 0);
        assert_eq!(session.statistics().errors, 0);
    }

    #[test]
    fn test_update_while_idle_is_a_no_op() {
        let mut session = Session::default();
        assert_eq!(session.update(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_broadcast_requires_discovery() {
        let mut session = Session::default();
        assert!(matches!(
            session.broadcast_discovery_request(),
            Err(SessionError::DiscoveryInactive)
        ));
    }

    #[test]
    fn test_disconnect_while_disconnected_is_harmless() {
        let mut session = Session::default();
        let id = session.local_peer_id();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.local_peer_id(), id);
    }

    #[test]
    fn test_join_unresolvable_host_keeps_state() {
        let mut session = Session::default();
        let err = session
            .join("no-such-host.invalid", 7777, "Nova")
            .unwrap_err();
        assert!(matches!(err, SessionError::Resolve(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.local_addr().is_none());
    }

    #[test]
    fn test_local_peer_id_is_never_zero() {
        for _ in 0..32 {
            assert_ne!(Session::default().local_peer_id(), 0);
        }
    }
}
