//! Chat relay

use session::{MessageType, PeerId, Session};
use tracing::{debug, info};

pub fn log_chat(label: &str, text: &str) {
    info!("[chat] {}: {}", label, text);
}

/// Forward a chat line to every peer except its sender.
pub fn relay_chat(session: &mut Session, sender: PeerId, label: &str, text: &str) {
    let line = format!("{label}: {text}");
    let recipients: Vec<PeerId> = session
        .roster()
        .iter()
        .filter(|peer| peer.id != sender)
        .map(|peer| peer.id)
        .collect();

    for peer_id in recipients {
        if let Err(e) = session.send_to_peer(peer_id, MessageType::Chat, line.as_bytes()) {
            debug!("Chat relay to peer {} failed: {}", peer_id, e);
        }
    }
}

pub fn host_says(session: &mut Session, host_name: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let line = format!("{host_name}: {text}");
    match session.send_chat(&line) {
        Ok(delivered) => info!("[chat] {} (to {} peer(s))", line, delivered),
        Err(e) => debug!("Host chat failed: {}", e),
    }
}
