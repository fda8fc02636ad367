//! End-to-end session behavior over loopback UDP

use protocol::JoinResponsePayload;
use session::{
    EventQueue, MessageType, Role, Session, SessionConfig, SessionError, SessionEvent,
    SessionState,
};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::thread::sleep;
use std::time::Duration;

// Each test gets its own discovery port so tests can run in parallel
fn config(discovery_port: u16) -> SessionConfig {
    SessionConfig {
        discovery_port,
        broadcast_address: Ipv4Addr::LOCALHOST,
        discovery_interval_ms: 50,
        join_timeout_ms: 2_000,
        ..SessionConfig::default()
    }
}

fn with_queue(config: SessionConfig) -> (Session, EventQueue) {
    let mut session = Session::new(config);
    let queue = EventQueue::new();
    session.set_events(queue.clone());
    (session, queue)
}

fn session_port(session: &Session) -> u16 {
    session.local_addr().expect("session socket").port()
}

/// Tick every session until `done` holds or about two seconds pass.
fn pump(sessions: &mut [&mut Session], done: impl Fn(&[&mut Session]) -> bool) -> bool {
    for _ in 0..400 {
        for session in sessions.iter_mut() {
            session.update();
        }
        if done(sessions) {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    false
}

fn joined(
    host: &mut Session,
    discovery_port: u16,
    name: &str,
) -> (Session, EventQueue) {
    let (mut client, queue) = with_queue(config(discovery_port));
    client.join("127.0.0.1", session_port(host), name).unwrap();
    assert!(pump(&mut [host, &mut client], |s| s[1].state()
        == SessionState::Connected));
    (client, queue)
}

#[test]
fn test_host_and_join() {
    let (mut host, host_events) = with_queue(config(47_101));
    host.host("Arena", 0).unwrap();
    assert_eq!(host.state(), SessionState::Hosting);
    assert_eq!(host.role(), Role::Host);
    assert_eq!(host.session_name(), "Arena");

    let (mut client, _) = with_queue(config(47_101));
    client.join("127.0.0.1", session_port(&host), "Nova").unwrap();
    assert_eq!(client.state(), SessionState::Connecting);
    assert_eq!(client.statistics().messages_sent, 1);

    assert!(pump(&mut [&mut host, &mut client], |s| s[1].state()
        == SessionState::Connected));

    let roster = host.roster();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Nova");
    assert_ne!(client.local_peer_id(), 0);
    assert_eq!(client.local_peer_id(), roster[0].id);
    assert_ne!(roster[0].id, host.local_peer_id());

    assert_eq!(
        host_events.drain(),
        vec![SessionEvent::PeerJoined {
            peer_id: roster[0].id,
            name: "Nova".to_string()
        }]
    );
}

#[test]
fn test_leaving_peer_is_reported_once() {
    let (mut host, host_events) = with_queue(config(47_102));
    host.host("Arena", 0).unwrap();

    let (mut first, _) = joined(&mut host, 47_102, "Nova");
    let (mut second, _) = joined(&mut host, 47_102, "Vega");
    assert_eq!(host.roster().len(), 2);
    host_events.drain();

    let leaving_id = first.local_peer_id();
    first.disconnect();
    assert_eq!(first.state(), SessionState::Disconnected);
    assert!(first.local_addr().is_none());

    assert!(pump(&mut [&mut host, &mut second], |s| s[0].roster().len() == 1));
    // A few more ticks must not produce a second event
    for _ in 0..10 {
        host.update();
    }

    assert_eq!(
        host_events.drain(),
        vec![SessionEvent::PeerLeft {
            peer_id: leaving_id
        }]
    );
    assert_eq!(host.roster()[0].name, "Vega");
    assert_eq!(second.state(), SessionState::Connected);
}

#[test]
fn test_discovery_finds_host() {
    let (mut host, _) = with_queue(config(47_103));
    host.host("Arena", 0).unwrap();

    let (mut browser, _) = with_queue(config(47_103));
    browser.start_discovery().unwrap();
    assert!(browser.is_discovering());

    assert!(pump(&mut [&mut host, &mut browser], |s| !s[1]
        .discovered_sessions(16)
        .is_empty()));

    let sessions = browser.discovered_sessions(16);
    assert_eq!(sessions.len(), 1);
    let found = &sessions[0];
    assert_eq!(found.advert.session_name, "Arena");
    assert_eq!(found.advert.host_name, "Host");
    assert_eq!(found.session_id(), host.session_id());
    assert_eq!(found.advert.current_players, 0);
    assert_eq!(found.advert.max_players, 8);
    assert_eq!(found.host_addr.port(), session_port(&host));

    // Re-broadcasts refresh the same entry with the new player count
    let (_client, _) = joined(&mut host, 47_103, "Nova");
    assert!(pump(&mut [&mut host, &mut browser], |s| {
        let sessions = s[1].discovered_sessions(16);
        sessions.len() == 1 && sessions[0].advert.current_players == 1
    }));
}

#[test]
fn test_discovery_without_hosts_is_empty() {
    let (mut browser, events) = with_queue(config(47_104));
    browser.start_discovery().unwrap();

    for _ in 0..20 {
        browser.update();
        sleep(Duration::from_millis(5));
    }

    assert!(browser.discovered_sessions(16).is_empty());
    assert!(events.is_empty());
    assert_eq!(browser.state(), SessionState::Disconnected);

    browser.stop_discovery();
    assert!(!browser.is_discovering());
    assert!(matches!(
        browser.broadcast_discovery_request(),
        Err(SessionError::DiscoveryInactive)
    ));
}

#[test]
fn test_sending_requires_an_active_session() {
    let mut session = Session::new(config(47_105));
    assert!(matches!(
        session.send_game_state(b"state"),
        Err(SessionError::InvalidState { .. })
    ));
    assert!(matches!(
        session.send_chat("hello"),
        Err(SessionError::InvalidState { .. })
    ));
    assert_eq!(session.statistics().messages_sent, 0);
}

#[test]
fn test_host_and_join_while_hosting_are_rejected() {
    let mut host = Session::new(config(47_106));
    host.host("Arena", 0).unwrap();

    assert!(matches!(
        host.host("Again", 0),
        Err(SessionError::InvalidState {
            state: SessionState::Hosting,
            ..
        })
    ));
    assert!(matches!(
        host.join("127.0.0.1", 7777, "Nova"),
        Err(SessionError::InvalidState { .. })
    ));
    assert!(matches!(
        host.start_discovery(),
        Err(SessionError::InvalidState { .. })
    ));
    assert_eq!(host.state(), SessionState::Hosting);
    assert_eq!(host.session_name(), "Arena");
}

#[test]
fn test_malformed_datagram_counts_as_error() {
    let (mut host, events) = with_queue(config(47_107));
    host.host("Arena", 0).unwrap();

    let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, session_port(&host)));
    raw.send_to(b"definitely not a session message", target)
        .unwrap();

    assert!(pump(&mut [&mut host], |s| s[0].statistics().errors == 1));
    assert_eq!(host.statistics().messages_received, 0);
    assert!(host.roster().is_empty());
    assert!(events.is_empty());
}

#[test]
fn test_chat_and_payload_attribution() {
    let (mut host, host_events) = with_queue(config(47_108));
    host.host("Arena", 0).unwrap();
    let (mut client, client_events) = joined(&mut host, 47_108, "Nova");
    host_events.drain();

    assert_eq!(client.send_chat("gg").unwrap(), 1);
    assert!(pump(&mut [&mut host, &mut client], |_| !host_events.is_empty()));
    assert_eq!(
        host_events.drain(),
        vec![SessionEvent::Chat {
            sender: client.local_peer_id(),
            text: "gg".to_string()
        }]
    );

    assert_eq!(host.send_turn_data(&[1, 2, 3]).unwrap(), 1);
    let peer_id = client.local_peer_id();
    host.send_to_peer(peer_id, MessageType::Payload, b"direct")
        .unwrap();
    assert!(pump(&mut [&mut host, &mut client], |_| client_events.len() == 2));
    assert_eq!(
        client_events.drain(),
        vec![
            SessionEvent::Payload {
                sender: 0,
                kind: MessageType::TurnData,
                data: vec![1, 2, 3]
            },
            SessionEvent::Payload {
                sender: 0,
                kind: MessageType::Payload,
                data: b"direct".to_vec()
            },
        ]
    );

    assert!(matches!(
        host.send_to_peer(peer_id.wrapping_add(1), MessageType::Payload, b"x"),
        Err(SessionError::UnknownPeer(_))
    ));
}

#[test]
fn test_full_host_ignores_extra_joins() {
    let mut small = config(47_109);
    small.max_players = 1;
    let (mut host, host_events) = with_queue(small);
    host.host("Duel", 0).unwrap();

    let (_first, _) = joined(&mut host, 47_109, "Nova");
    let (mut late, _) = with_queue(config(47_109));
    late.join("127.0.0.1", session_port(&host), "Vega").unwrap();

    for _ in 0..40 {
        host.update();
        late.update();
        sleep(Duration::from_millis(5));
    }

    assert_eq!(late.state(), SessionState::Connecting);
    assert_eq!(host.roster().len(), 1);
    assert_eq!(host_events.drain().len(), 1);
}

#[test]
fn test_join_times_out_without_a_host() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();

    let mut quick = config(47_110);
    quick.join_timeout_ms = 100;
    let (mut client, events) = with_queue(quick);
    client.join("127.0.0.1", port, "Nova").unwrap();
    assert_eq!(client.local_peer_id(), 0);

    assert!(pump(&mut [&mut client], |s| s[0].state() == SessionState::Error));
    assert_eq!(client.local_peer_id(), 0);
    assert!(matches!(
        events.drain().as_slice(),
        [SessionEvent::Error { .. }]
    ));

    client.disconnect();
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(client.role(), Role::Idle);
}

#[test]
fn test_host_leaving_ends_client_session() {
    let (mut host, _) = with_queue(config(47_111));
    host.host("Arena", 0).unwrap();
    let (mut client, client_events) = joined(&mut host, 47_111, "Nova");

    host.disconnect();
    assert_eq!(host.state(), SessionState::Disconnected);
    assert!(host.roster().is_empty());

    assert!(pump(&mut [&mut client], |s| s[0].state()
        == SessionState::Disconnected));
    assert_eq!(
        client_events.drain(),
        vec![SessionEvent::Error {
            message: "host ended the session".to_string()
        }]
    );
}

#[test]
fn test_statistics_survive_disconnect() {
    let (mut host, _) = with_queue(config(47_112));
    host.host("Arena", 0).unwrap();
    let (mut client, _) = joined(&mut host, 47_112, "Nova");

    let sent_before = client.statistics().messages_sent;
    client.disconnect();
    let stats = client.statistics();
    assert_eq!(stats.messages_sent, sent_before + 1);
    assert!(stats.bytes_sent > 0);
    assert!(stats.messages_received >= 1);
}

/// Plain socket standing in for a remote host
fn fake_host(addr: &str) -> UdpSocket {
    let socket = UdpSocket::bind(addr).unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

fn reply(from: &UdpSocket, to: SocketAddr, kind: MessageType, body: &[u8]) {
    let datagram = protocol::encode(kind, body, 1).unwrap();
    from.send_to(&datagram, to).unwrap();
}

#[test]
fn test_failed_host_releases_sockets() {
    // Plain std socket without SO_REUSEADDR keeps the port exclusive
    let blocker = UdpSocket::bind("0.0.0.0:47113").unwrap();

    let mut session = Session::new(config(47_113));
    let err = session.host("Arena", 0).unwrap_err();

    assert!(matches!(err, SessionError::Bind { port: 47_113, .. }));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.role(), Role::Idle);
    assert!(session.local_addr().is_none());
    drop(blocker);
}

#[test]
fn test_bad_join_responses_are_counted_and_dropped() {
    let host = fake_host("127.0.0.1:0");
    let host_port = host.local_addr().unwrap().port();

    let (mut client, events) = with_queue(config(47_114));
    client.join("127.0.0.1", host_port, "Nova").unwrap();

    let mut buf = [0u8; 256];
    let (_, client_addr) = host.recv_from(&mut buf).unwrap();

    reply(&host, client_addr, MessageType::JoinResponse, &0u32.to_be_bytes());
    assert!(pump(&mut [&mut client], |s| s[0].statistics().errors == 1));
    assert_eq!(client.state(), SessionState::Connecting);

    reply(&host, client_addr, MessageType::JoinResponse, &[0, 0, 7]);
    assert!(pump(&mut [&mut client], |s| s[0].statistics().errors == 2));
    assert_eq!(client.state(), SessionState::Connecting);

    // A well-formed response from anyone but the join target is ignored
    let stranger = fake_host("127.0.0.1:0");
    let granted = JoinResponsePayload { player_id: 77 }.to_bytes();
    reply(&stranger, client_addr, MessageType::JoinResponse, &granted);
    let received = client.statistics().messages_received;
    assert!(pump(&mut [&mut client], |s| s[0].statistics().messages_received
        > received));
    assert_eq!(client.state(), SessionState::Connecting);
    assert_eq!(client.statistics().errors, 2);

    reply(&host, client_addr, MessageType::JoinResponse, &granted);
    assert!(pump(&mut [&mut client], |s| s[0].state()
        == SessionState::Connected));
    assert_eq!(client.local_peer_id(), 77);
    assert!(events.is_empty());
}

#[test]
fn test_bad_discovery_advert_is_counted_and_dropped() {
    let host = fake_host("127.0.0.1:47115");

    let (mut browser, events) = with_queue(config(47_115));
    browser.start_discovery().unwrap();

    let mut buf = [0u8; 256];
    let (_, browser_addr) = host.recv_from(&mut buf).unwrap();
    reply(&host, browser_addr, MessageType::DiscoveryResponse, &[1, 2, 3]);

    assert!(pump(&mut [&mut browser], |s| s[0].statistics().errors == 1));
    assert!(browser.discovered_sessions(16).is_empty());
    assert!(events.is_empty());
}
