//! lanlobby - browse LAN sessions and join one as a chat client

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::OutputManager;
use session::{DiscoveredSession, EventQueue, Session, SessionState, MAX_DISCOVERED_SESSIONS};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Bound on back-to-back polls so a flood cannot starve stdin
const MAX_UPDATES_PER_TICK: usize = 64;

const STALE_AFTER_BROADCASTS: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "lanlobby")]
#[command(version)]
#[command(about = "Find and join sessions on the local network", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sessions answering discovery broadcasts
    Browse {
        /// Seconds to listen for answers
        #[arg(short, long)]
        seconds: Option<u64>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Join a session and chat; lines typed are sent, /quit leaves
    Join {
        /// Host address; the first discovered session is used when omitted
        #[arg(long)]
        host: Option<String>,

        /// Host session port
        #[arg(short, long)]
        port: Option<u16>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::Config::load(path)?,
        None => config::Config::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    debug!("lanlobby v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Browse { seconds, json } => {
            let seconds = seconds.unwrap_or(config.general.browse_seconds);
            run_browse(&config, seconds, json).await
        }
        Command::Join { host, port, name } => {
            let name = name.unwrap_or_else(|| config.general.player_name.clone());
            run_join(&config, host, port, &name).await
        }
    }
}

/// Broadcast discovery requests for `seconds` and collect the answers.
async fn browse(config: &config::Config, seconds: u64) -> Result<Vec<DiscoveredSession>> {
    let mut session = Session::new(config.session.clone());
    session
        .start_discovery()
        .context("Failed to start discovery")?;
    info!(
        "Browsing on {}:{} for {}s",
        config.session.broadcast_address, config.session.discovery_port, seconds
    );

    // Hosts that miss several re-broadcasts in a row have gone away
    let stale_after = config.session.discovery_interval() * STALE_AFTER_BROADCASTS;
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut tick = tokio::time::interval(Duration::from_millis(config.general.tick_interval_ms));
    while Instant::now() < deadline {
        tick.tick().await;
        pump(&mut session);
        let dropped = session.prune_discovered(stale_after);
        if dropped > 0 {
            debug!("Forgot {} session(s) that stopped answering", dropped);
        }
    }

    let sessions = session.discovered_sessions(MAX_DISCOVERED_SESSIONS);
    session.stop_discovery();
    Ok(sessions)
}

async fn run_browse(config: &config::Config, seconds: u64, json: bool) -> Result<()> {
    let sessions = browse(config, seconds).await?;

    if json {
        println!("{}", output::sessions_json(&sessions)?);
    } else {
        OutputManager::new(config.output.clone()).sessions_table(&sessions);
    }
    Ok(())
}

async fn run_join(
    config: &config::Config,
    host: Option<String>,
    port: Option<u16>,
    name: &str,
) -> Result<()> {
    let output = OutputManager::new(config.output.clone());

    let (host, port) = match host {
        Some(host) => (host, port.unwrap_or(config.session.session_port)),
        None => {
            let sessions = browse(config, config.general.browse_seconds).await?;
            let first = sessions
                .first()
                .context("No sessions found on the local network")?;
            output.notice(&format!(
                "Found \"{}\" hosted by {} at {}",
                first.advert.session_name, first.advert.host_name, first.host_addr
            ));
            (first.host_addr.ip().to_string(), first.host_addr.port())
        }
    };

    let mut session = Session::new(config.session.clone());
    let events = EventQueue::new();
    session.set_events(events.clone());
    session
        .join(&host, port, name)
        .with_context(|| format!("Failed to join {host}:{port}"))?;
    output.notice(&format!("Joining {host}:{port} as {name}..."));

    let mut tick = tokio::time::interval(Duration::from_millis(config.general.tick_interval_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_state = session.state();
    loop {
        tokio::select! {
            _ = tick.tick() => {
                pump(&mut session);
                for event in events.drain() {
                    output.event(&event);
                }

                let state = session.state();
                if state != last_state {
                    match state {
                        SessionState::Connected => output.notice(&format!(
                            "Connected as peer {} (type /quit to leave)",
                            session.local_peer_id()
                        )),
                        SessionState::Error => anyhow::bail!("Could not join {host}:{port}"),
                        SessionState::Disconnected => break,
                        _ => {}
                    }
                    last_state = state;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim() == "/quit" => break,
                    Some(line) if line.trim() == "/stats" => output.statistics(&session.statistics()),
                    Some(line) => {
                        let text = line.trim();
                        if !text.is_empty() && session.state() == SessionState::Connected {
                            session.send_chat(text).context("Failed to send chat")?;
                            output.own_chat(name, text);
                        }
                    }
                    None => stdin_open = false,
                }
            }
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    session.disconnect();
    output.notice("Left the session");
    Ok(())
}

fn pump(session: &mut Session) {
    for _ in 0..MAX_UPDATES_PER_TICK {
        if session.update() == 0 {
            break;
        }
    }
}
