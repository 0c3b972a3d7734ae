use std::{
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings,
    route_event,
    transport::{NoCredentials, StaticToken},
    ChatState, RealtimeConnection, Routed, WsConnection,
};
use shared::protocol::ServerEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fold a JSON-lines file of realtime events into a state and print it.
    Replay {
        #[arg(long)]
        events: PathBuf,
        /// Starting state, as printed by an earlier replay.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print the resolved client settings.
    Settings,
    /// Follow the live realtime endpoint and log each event.
    Listen {
        #[arg(long, env = "APP__TOKEN")]
        token: Option<String>,
    },
}

#[derive(Debug, Default)]
struct ReplayStats {
    applied: usize,
    ignored: usize,
}

fn replay(events: PathBuf, state: Option<PathBuf>) -> Result<()> {
    let mut chat = match state {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read state {}", path.display()))?;
            serde_json::from_str::<ChatState>(&raw)
                .with_context(|| format!("invalid state snapshot {}", path.display()))?
        }
        None => ChatState::default(),
    };

    let file = fs::File::open(&events)
        .with_context(|| format!("failed to open events {}", events.display()))?;
    let mut stats = ReplayStats::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: ServerEvent = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid event", index + 1))?;
        match route_event(&mut chat, event) {
            Routed::Applied => stats.applied += 1,
            Routed::Ignored(_) => stats.ignored += 1,
        }
    }

    info!(applied = stats.applied, ignored = stats.ignored, "replay finished");
    println!("{}", serde_json::to_string_pretty(&chat)?);
    Ok(())
}

async fn listen(token: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ws_url = settings.ws_url()?;
    let connection = match token {
        Some(token) => WsConnection::connect(&ws_url, &StaticToken(token)).await?,
        None => WsConnection::connect(&ws_url, &NoCredentials).await?,
    };
    let mut inbound = connection.subscribe();
    let mut chat = ChatState::default();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = inbound.recv() => match received {
                Ok(event) => {
                    let name = event.name();
                    let routed = route_event(&mut chat, event);
                    println!("{name}: {routed:?}");
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "listener lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Replay { events, state } => replay(events, state)?,
        Command::Settings => {
            let settings = load_settings();
            println!("{}", serde_json::to_string_pretty(&settings)?);
            println!("ws_url = {}", settings.ws_url()?);
        }
        Command::Listen { token } => listen(token).await?,
    }

    Ok(())
}
