//! Console output for browse listings and session events

use crate::config::OutputConfig;
use anyhow::Result;
use crossterm::style::{style, Color, Stylize};
use serde::Serialize;
use session::{DiscoveredSession, SessionEvent, Statistics};

/// Flat view of a discovered session, as printed by `browse --json`
#[derive(Debug, Serialize)]
pub struct SessionListing {
    pub session_id: String,
    pub name: String,
    pub host_name: String,
    pub address: String,
    pub current_players: u8,
    pub max_players: u8,
}

impl From<&DiscoveredSession> for SessionListing {
    fn from(session: &DiscoveredSession) -> Self {
        Self {
            session_id: format!("{:08x}", session.session_id()),
            name: session.advert.session_name.clone(),
            host_name: session.advert.host_name.clone(),
            address: session.host_addr.to_string(),
            current_players: session.advert.current_players,
            max_players: session.advert.max_players,
        }
    }
}

pub fn sessions_json(sessions: &[DiscoveredSession]) -> Result<String> {
    let listings: Vec<SessionListing> = sessions.iter().map(SessionListing::from).collect();
    Ok(serde_json::to_string_pretty(&listings)?)
}

pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.config.use_colors {
            style(text).with(color).to_string()
        } else {
            text
        }
    }

    fn stamp(&self) -> String {
        chrono::Local::now()
            .format(&self.config.timestamp_format)
            .to_string()
    }

    pub fn sessions_table(&self, sessions: &[DiscoveredSession]) {
        if sessions.is_empty() {
            println!("No sessions found");
            return;
        }

        println!(
            "{:<4} {:<24} {:<16} {:<22} {}",
            "#", "SESSION", "HOST", "ADDRESS", "PLAYERS"
        );
        for (index, session) in sessions.iter().enumerate() {
            let players = format!(
                "{}/{}",
                session.advert.current_players, session.advert.max_players
            );
            let players = if session.advert.current_players >= session.advert.max_players {
                self.paint(players, Color::Red)
            } else {
                self.paint(players, Color::Green)
            };
            println!(
                "{:<4} {:<24} {:<16} {:<22} {}",
                index + 1,
                session.advert.session_name,
                session.advert.host_name,
                session.host_addr,
                players
            );
        }
    }

    pub fn notice(&self, text: &str) {
        println!("[{}] {}", self.stamp(), self.paint(text.to_string(), Color::Cyan));
    }

    pub fn own_chat(&self, name: &str, text: &str) {
        let label = self.paint(format!("{name}:"), Color::Blue);
        println!("[{}] {} {}", self.stamp(), label, text);
    }

    pub fn event(&self, event: &SessionEvent) {
        let stamp = self.stamp();
        match event {
            SessionEvent::Chat { text, .. } => println!("[{stamp}] {text}"),
            SessionEvent::Payload { kind, data, .. } => println!(
                "[{stamp}] {}",
                self.paint(format!("{kind}: {} bytes", data.len()), Color::DarkGrey)
            ),
            SessionEvent::Error { message } => println!(
                "[{stamp}] {}",
                self.paint(format!("ERROR: {message}"), Color::Red)
            ),
            SessionEvent::PeerJoined { name, .. } => {
                println!("[{stamp}] {}", self.paint(format!("{name} joined"), Color::Green))
            }
            SessionEvent::PeerLeft { peer_id } => println!(
                "[{stamp}] {}",
                self.paint(format!("peer {peer_id} left"), Color::Yellow)
            ),
        }
    }

    pub fn statistics(&self, stats: &Statistics) {
        println!(
            "Sent {} messages ({} bytes), received {} messages ({} bytes), {} errors",
            stats.messages_sent,
            stats.bytes_sent,
            stats.messages_received,
            stats.bytes_received,
            stats.errors
        );
    }
}
