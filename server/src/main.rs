//! LAN lobby host - advertises a session on the local network and admits peers

mod config;
mod handlers;

use anyhow::{Context, Result};
use clap::Parser;
use handlers::Lobby;
use session::{EventQueue, Session};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, MissedTickBehavior};
use tracing::info;

/// Bound on back-to-back polls so a flood cannot starve the other branches
const MAX_UPDATES_PER_TICK: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "lanlobby-host")]
#[command(version)]
#[command(about = "Host a LAN lobby session", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session name shown to browsing clients
    #[arg(short, long)]
    name: Option<String>,

    /// UDP port for the session socket (0 picks a free one)
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of peers to admit
    #[arg(long)]
    max_players: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::Config::load(path)?,
        None => config::Config::default(),
    };
    if let Some(name) = args.name {
        config.general.session_name = name;
    }
    if let Some(port) = args.port {
        config.session.session_port = port;
    }
    if let Some(max_players) = args.max_players {
        config.session.max_players = max_players;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting lanlobby host v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    run(config).await
}

async fn run(config: config::Config) -> Result<()> {
    let port = config.session.session_port;
    let mut session = Session::new(config.session.clone());
    let events = EventQueue::new();
    session.set_events(events.clone());

    session
        .host(&config.general.session_name, port)
        .with_context(|| format!("Failed to host on port {port}"))?;

    let mut lobby = Lobby::new(&config.session.host_name, config.general.relay_chat);
    let started = chrono::Local::now();
    info!(
        "Hosting \"{}\" on {:?}, up to {} players (Ctrl+C to stop)",
        session.session_name(),
        session.local_addr(),
        config.session.roster_capacity()
    );

    let mut tick = tokio::time::interval(Duration::from_millis(config.general.tick_interval_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stats_every = config.general.stats_interval_sec;
    let mut stats_tick = tokio::time::interval(Duration::from_secs(stats_every.max(1)));
    stats_tick.tick().await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                for _ in 0..MAX_UPDATES_PER_TICK {
                    if session.update() == 0 {
                        break;
                    }
                }
                for event in events.drain() {
                    lobby.handle_event(&mut session, event);
                }
            }
            _ = stats_tick.tick(), if stats_every > 0 => {
                let stats = session.statistics();
                info!(
                    "Up since {}: {} peer(s), sent {} msgs/{} bytes, received {} msgs/{} bytes, {} errors",
                    started.format("%H:%M:%S"),
                    session.roster().len(),
                    stats.messages_sent,
                    stats.bytes_sent,
                    stats.messages_received,
                    stats.bytes_received,
                    stats.errors
                );
            }
            line = stdin.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim() == "/quit" => break,
                    Some(line) => lobby.host_says(&mut session, &line),
                    None => stdin_open = false,
                }
            }
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Interrupted");
                break;
            }
        }
    }

    session.disconnect();
    lobby.forget_all();
    info!(
        "Session closed ({} messages received)",
        session.statistics().messages_received
    );
    Ok(())
}
