//! Routing of validated inbound messages

use crate::discovery::{DiscoveredSession, RegistryUpdate};
use crate::engine::{Channel, Session};
use crate::roster::Admission;
use crate::state::{Role, SessionState};
use protocol::{
    decode_text, JoinRequestPayload, JoinResponsePayload, Message, MessageType, SessionAdvert,
};
use std::net::SocketAddr;
use tracing::{debug, info, trace};

impl Session {
    pub(crate) fn dispatch(&mut self, channel: Channel, from: SocketAddr, message: Message) {
        let kind = message.message_type();
        trace!(
            "Dispatching {} #{} from {} on {:?} socket",
            kind,
            message.header.sequence,
            from,
            channel
        );

        match kind {
            MessageType::DiscoveryRequest => self.handle_discovery_request(channel, from),
            MessageType::DiscoveryResponse => self.handle_discovery_response(from, &message.payload),
            MessageType::JoinRequest => self.handle_join_request(channel, from, &message.payload),
            MessageType::JoinResponse => self.handle_join_response(from, &message.payload),
            MessageType::Payload | MessageType::GameStateSync | MessageType::TurnData => {
                self.handle_application_data(from, kind, &message.payload)
            }
            MessageType::Chat => self.handle_chat(from, &message.payload),
            MessageType::PlayerDisconnect => self.handle_player_disconnect(from),
            MessageType::PlayerList
            | MessageType::GameStart
            | MessageType::Ping
            | MessageType::Pong
            | MessageType::Error => {
                trace!("Ignoring reserved {} message from {}", kind, from);
            }
        }
    }

    /// Answer on the socket the request came in on
    fn handle_discovery_request(&mut self, channel: Channel, from: SocketAddr) {
        if self.state != SessionState::Hosting {
            return;
        }

        let advert = SessionAdvert {
            session_id: self.session_id,
            session_name: self.session_name.clone(),
            host_name: self.config.host_name.clone(),
            host_port: self.local_port,
            current_players: u8::try_from(self.roster.len()).unwrap_or(u8::MAX),
            max_players: u8::try_from(self.roster.capacity()).unwrap_or(u8::MAX),
        };

        match self.send_message(channel, from, MessageType::DiscoveryResponse, &advert.to_bytes()) {
            Ok(()) => debug!("Answered discovery request from {}", from),
            Err(e) => debug!("Discovery reply to {} failed: {}", from, e),
        }
    }

    fn handle_discovery_response(&mut self, from: SocketAddr, payload: &[u8]) {
        if self.role == Role::Host {
            return;
        }

        let advert = match SessionAdvert::from_bytes(payload) {
            Ok(advert) => advert,
            Err(e) => {
                self.stats.record_error();
                debug!("Bad discovery response from {}: {}", from, e);
                return;
            }
        };

        let session_id = advert.session_id;
        let entry = DiscoveredSession::new(advert, from);
        let host_addr = entry.host_addr;
        let name = entry.advert.session_name.clone();

        match self.registry.record(entry) {
            RegistryUpdate::Added => info!(
                "Discovered session \"{}\" ({:#010x}) at {}",
                name, session_id, host_addr
            ),
            RegistryUpdate::Refreshed => trace!("Refreshed session {:#010x}", session_id),
            RegistryUpdate::Dropped => {
                debug!("Discovery list full, ignoring session {:#010x}", session_id)
            }
        }
    }

    fn handle_join_request(&mut self, channel: Channel, from: SocketAddr, payload: &[u8]) {
        if self.state != SessionState::Hosting {
            return;
        }
        if channel != Channel::Session {
            debug!("Ignoring join request from {} on the discovery port", from);
            return;
        }

        let request = JoinRequestPayload::from_bytes(payload);
        let admission = match self
            .roster
            .admit(&request.player_name, from, self.local_peer_id)
        {
            Ok(admission) => admission,
            Err(e) => {
                debug!("Rejected join from {}: {}", from, e);
                return;
            }
        };

        let response = JoinResponsePayload {
            player_id: admission.peer_id(),
        };
        if let Err(e) = self.send_message(
            Channel::Session,
            from,
            MessageType::JoinResponse,
            &response.to_bytes(),
        ) {
            debug!("Join response to {} failed: {}", from, e);
        }

        match admission {
            Admission::Admitted(peer_id) => {
                let name = self
                    .roster
                    .find(peer_id)
                    .map(|peer| peer.name.clone())
                    .unwrap_or_default();
                info!("Peer \"{}\" ({}) joined from {}", name, peer_id, from);
                self.events.on_peer_joined(peer_id, &name);
            }
            Admission::Rejoined(peer_id) => {
                debug!("Repeated join from {}, re-sent id {}", from, peer_id);
            }
        }
    }

    fn handle_join_response(&mut self, from: SocketAddr, payload: &[u8]) {
        if self.state != SessionState::Connecting || self.host_addr != Some(from) {
            debug!("Unexpected join response from {}", from);
            return;
        }

        let response = match JoinResponsePayload::from_bytes(payload) {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_error();
                debug!("Bad join response from {}: {}", from, e);
                return;
            }
        };

        self.local_peer_id = response.player_id;
        self.state = SessionState::Connected;
        self.join_started = None;
        info!("Joined session at {} as peer {}", from, response.player_id);
    }

    fn handle_application_data(&mut self, from: SocketAddr, kind: MessageType, payload: &[u8]) {
        if !self.state.can_send() {
            return;
        }
        let sender = self.roster.attribute(from);
        self.events.on_payload(sender, kind, payload);
    }

    fn handle_chat(&mut self, from: SocketAddr, payload: &[u8]) {
        if !self.state.can_send() {
            return;
        }
        let text = decode_text(payload);
        if text.is_empty() {
            return;
        }
        let sender = self.roster.attribute(from);
        self.events.on_chat(sender, &text);
    }

    fn handle_player_disconnect(&mut self, from: SocketAddr) {
        match self.role {
            Role::Host => {
                let Some(peer_id) = self.roster.find_by_address(from).map(|peer| peer.id) else {
                    debug!("Disconnect notice from unknown address {}", from);
                    return;
                };
                self.events.on_peer_left(peer_id);
                if let Some(peer) = self.roster.remove(from) {
                    info!("Peer \"{}\" ({}) left", peer.name, peer.id);
                }
            }
            Role::Client => {
                if self.host_addr != Some(from) {
                    return;
                }
                info!("Host at {} ended the session", from);
                self.reset();
                self.events.on_error("host ended the session");
            }
            Role::Idle => {}
        }
    }
}
