//! Join and leave notices

use session::{PeerId, Session};
use tracing::{debug, info};

pub fn announce_join(session: &mut Session, peer_id: PeerId, name: &str, broadcast: bool) {
    info!(
        "{} joined as peer {} ({}/{} players)",
        name,
        peer_id,
        session.roster().len(),
        session.config().roster_capacity()
    );
    if broadcast {
        notify(session, &format!("*** {name} joined"));
    }
}

pub fn announce_leave(session: &mut Session, peer_id: PeerId, name: Option<&str>, broadcast: bool) {
    let name = name.map_or_else(|| format!("peer {peer_id}"), str::to_string);
    info!("{} left ({} players remain)", name, session.roster().len());
    if broadcast {
        notify(session, &format!("*** {name} left"));
    }
}

fn notify(session: &mut Session, line: &str) {
    if let Err(e) = session.send_chat(line) {
        debug!("Roster notice failed: {}", e);
    }
}
