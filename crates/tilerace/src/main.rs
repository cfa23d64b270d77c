//! Tilerace - multiplayer sliding-tile puzzle over TCP.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tilerace::cli::{Cli, Command};
use tilerace::client::{Client, GameEvent, LocalOutcome};
use tilerace::relay::{self, RelayConfig};
use tilerace_puzzle::MoveCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Host {
            players,
            port,
            width,
            height,
        } => run_host(Some(players), port, width, height).await,
        Command::Join { addr } => run_join(addr).await,
        Command::Solo {
            width,
            height,
            port,
        } => run_host(None, port, width, height).await,
    }
}

/// Runs the relay locally and joins it as participant 0. `players` of
/// `None` means a solo session with a fixed count of 1.
async fn run_host(players: Option<u8>, port: u16, width: u32, height: u32) -> Result<()> {
    let config = RelayConfig {
        participants: if players.is_some() { None } else { Some(1) },
    };
    let relay = tokio::spawn(relay::run(port, config));

    let addr = format!("127.0.0.1:{port}");
    let client = connect_as_host_with_retry(&addr, players, width, height).await?;
    play(client).await?;

    // Dropping the client closes the host connection, which ends the relay.
    relay.await??;
    Ok(())
}

async fn run_join(addr: String) -> Result<()> {
    println!("Joining {addr}...");
    let client = Client::connect(&addr).await?;
    play(client).await
}

/// The spawned relay may not have bound its listener yet; retry briefly.
async fn connect_as_host_with_retry(
    addr: &str,
    players: Option<u8>,
    width: u32,
    height: u32,
) -> Result<Client> {
    let mut last = None;
    for _ in 0..20 {
        match Client::connect_as_host(addr, players, width, height).await {
            Ok(client) => return Ok(client),
            Err(e) => {
                last = Some(e);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
    Err(last.expect("retry loop ran at least once").into())
}

/// Drives one participant: stdin lines for movement, relayed events for
/// everyone else's progress.
async fn play(mut client: Client) -> Result<()> {
    println!(
        "You are player {} of {}.",
        client.ordinal(),
        client.participants()
    );
    println!("{}", client.board());
    println!("Move with u/d/l/r + Enter; q quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(GameEvent::PeerMoved { ordinal, .. }) => {
                    info!(ordinal, "peer moved");
                }
                Some(GameEvent::PeerWon { ordinal }) => {
                    println!("Player {ordinal} won!");
                    break;
                }
                Some(GameEvent::Desynced { ordinal }) => {
                    println!("Lost sync with player {ordinal}; their board may be stale.");
                }
                Some(GameEvent::ConnectionLost) | None => {
                    println!("Connection to the host was lost.");
                    break;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let code = match line.trim() {
                    "u" => MoveCode::Up,
                    "d" => MoveCode::Down,
                    "l" => MoveCode::Left,
                    "r" => MoveCode::Right,
                    "q" => break,
                    "" => continue,
                    other => {
                        println!("Unknown input {other:?}");
                        continue;
                    }
                };
                match client.apply_local(code) {
                    LocalOutcome::Moved => println!("{}", client.board()),
                    LocalOutcome::Won => {
                        println!("{}", client.board());
                        println!("You won!");
                        break;
                    }
                    LocalOutcome::Blocked => {}
                    LocalOutcome::Frozen => println!("The game is already over."),
                }
            }
        }
    }
    Ok(())
}
