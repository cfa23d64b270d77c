//! Host-side relay: accept, negotiate, distribute, forward.
//!
//! One hosted session walks through five phases: accept connections until
//! the participant count is reached, generate a solvable board, distribute
//! it with each participant's assigned ordinal, forward moves between
//! connections, and close everything once the host leaves. After
//! distribution the relay treats move messages as opaque; it never applies
//! them to a board of its own.

use crate::protocol::{self, HOST_LIVENESS_TIMEOUT, Message, ProtocolError};
use derive_more::{Display, Error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tilerace_puzzle::{Board, BoardError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

const PLAYER_COUNT_PROMPT: &str =
    "Please enter number of players to join (game does not start until all have joined, 1-3): ";
const DIMENSIONS_PROMPT: &str = "Set your board dimensions (format: width height): ";

/// Relay configuration for one hosted session.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Fixed participant count. `None` negotiates the count with the
    /// first-joined connection (the host) before accepting anyone else.
    pub participants: Option<u8>,
}

/// Errors that end a hosted session.
#[derive(Debug, Display, Error)]
pub enum RelayError {
    /// Negotiated participant count outside `1..=3`.
    #[display("participant count {count} is out of range (1-3)")]
    InvalidParticipantCount { count: u8 },
    /// Host asked for a zero-sized board.
    #[display("board dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: u32, height: u32 },
    /// Host sent something other than the negotiation step expected.
    #[display("expected {expected} from host, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
    /// The host connection failed; fatal to the whole session.
    #[display("host connection failed: {_0}")]
    Host(ProtocolError),
    /// Board construction failed.
    #[display("board generation failed: {_0}")]
    Board(BoardError),
    /// Listener or accept failure.
    #[display("i/o failure: {_0}")]
    Io(std::io::Error),
}

impl From<ProtocolError> for RelayError {
    fn from(err: ProtocolError) -> Self {
        RelayError::Host(err)
    }
}

impl From<BoardError> for RelayError {
    fn from(err: BoardError) -> Self {
        RelayError::Board(err)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err)
    }
}

/// Binds `port` on all interfaces and runs one session to completion.
pub async fn run(port: u16, config: RelayConfig) -> Result<(), RelayError> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "relay listening");
    serve(listener, config).await
}

/// Runs one session on an already-bound listener.
///
/// Returns once the host disconnects (or fails liveness) and all remaining
/// connections are closed.
#[instrument(skip_all)]
pub async fn serve(listener: TcpListener, config: RelayConfig) -> Result<(), RelayError> {
    // The first connection is the host; the count and dimensions are
    // settled with it before anyone else is accepted.
    let (mut host, host_addr) = listener.accept().await?;
    info!(%host_addr, "host connected");
    let (participants, width, height) = negotiate(&mut host, &config).await?;
    info!(participants, width, height, "session negotiated");

    let mut conns = vec![host];
    while conns.len() < participants as usize {
        let (stream, addr) = listener.accept().await?;
        info!(%addr, ordinal = conns.len(), "participant connected");
        conns.push(stream);
    }

    let board = {
        let mut rng = rand::thread_rng();
        Board::new_solvable(width, height, &mut rng)?
    };

    // Distribute in join order; ordinals are assigned once and never
    // reused. A participant that fails during distribution is dropped,
    // unless it is the host.
    let mut joined = Vec::new();
    for (ordinal, mut stream) in conns.into_iter().enumerate() {
        let ordinal = ordinal as u8;
        let init = Message::Init {
            cells: board.cells().to_vec(),
            ordinal,
            participants,
        };
        match protocol::write_message(&mut stream, &init).await {
            Ok(()) => joined.push((ordinal, stream)),
            Err(e) if ordinal == 0 => return Err(RelayError::Host(e)),
            Err(e) => warn!(ordinal, error = %e, "dropping participant during distribution"),
        }
    }

    relay_moves(joined).await;
    info!("session closed");
    Ok(())
}

async fn negotiate(
    host: &mut TcpStream,
    config: &RelayConfig,
) -> Result<(u8, usize, usize), RelayError> {
    let participants = match config.participants {
        Some(count) => validate_count(count)?,
        None => {
            let prompt = Message::Prompt {
                text: PLAYER_COUNT_PROMPT.into(),
            };
            protocol::write_message(host, &prompt).await?;
            match protocol::read_message(host).await? {
                Message::PlayerCount { count } => validate_count(count)?,
                other => {
                    return Err(RelayError::UnexpectedMessage {
                        expected: "player_count",
                        got: other.kind(),
                    });
                }
            }
        }
    };

    let ack = Message::Ack {
        text: DIMENSIONS_PROMPT.into(),
    };
    protocol::write_message(host, &ack).await?;
    match protocol::read_message(host).await? {
        Message::Dimensions { width, height } => {
            if width == 0 || height == 0 {
                return Err(RelayError::InvalidDimensions { width, height });
            }
            Ok((participants, width as usize, height as usize))
        }
        other => Err(RelayError::UnexpectedMessage {
            expected: "dimensions",
            got: other.kind(),
        }),
    }
}

fn validate_count(count: u8) -> Result<u8, RelayError> {
    if (1..=3).contains(&count) {
        Ok(count)
    } else {
        Err(RelayError::InvalidParticipantCount { count })
    }
}

/// The forward set: one outbound queue per live connection.
#[derive(Debug, Default)]
struct Roster {
    senders: Mutex<HashMap<u8, mpsc::UnboundedSender<Message>>>,
}

impl Roster {
    fn insert(&self, ordinal: u8, tx: mpsc::UnboundedSender<Message>) {
        self.senders.lock().unwrap().insert(ordinal, tx);
    }

    fn remove(&self, ordinal: u8) {
        if self.senders.lock().unwrap().remove(&ordinal).is_some() {
            debug!(ordinal, "removed from forward set");
        }
    }

    /// Queues `message` for every connection except the one it came from.
    fn forward_from(&self, sender: u8, message: &Message) {
        let senders = self.senders.lock().unwrap();
        for (&ordinal, tx) in senders.iter() {
            if ordinal != sender {
                let _ = tx.send(message.clone());
            }
        }
    }

    fn clear(&self) {
        self.senders.lock().unwrap().clear();
    }
}

/// Forwards moves between connections until the host leaves.
async fn relay_moves(conns: Vec<(u8, TcpStream)>) {
    let roster = Arc::new(Roster::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut host_reader = None;
    let mut tasks = Vec::new();

    for (ordinal, stream) in conns {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        roster.insert(ordinal, tx);
        tasks.push(tokio::spawn(write_loop(
            ordinal,
            write_half,
            rx,
            roster.clone(),
        )));
        let reader = tokio::spawn(read_loop(
            ordinal,
            read_half,
            roster.clone(),
            shutdown_rx.clone(),
        ));
        if ordinal == 0 {
            host_reader = Some(reader);
        } else {
            tasks.push(reader);
        }
    }

    if let Some(host_reader) = host_reader {
        let _ = host_reader.await;
    }
    info!("host disconnected; closing remaining connections");
    let _ = shutdown_tx.send(true);
    // Dropping the queues ends the writer tasks; readers observe shutdown.
    roster.clear();
    for task in tasks {
        let _ = task.await;
    }
}

async fn read_loop(
    ordinal: u8,
    mut reader: OwnedReadHalf,
    roster: Arc<Roster>,
    mut shutdown: watch::Receiver<bool>,
) {
    let is_host = ordinal == 0;
    loop {
        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = read_next(&mut reader, is_host) => next,
        };
        match next {
            Ok(Message::Move {
                ordinal: sender,
                code,
            }) => {
                debug!(ordinal, sender, code, "forwarding move");
                roster.forward_from(ordinal, &Message::Move {
                    ordinal: sender,
                    code,
                });
            }
            Ok(Message::Ping) => {}
            Ok(other) => {
                // Anything off-protocol counts as a malformed connection.
                warn!(ordinal, kind = other.kind(), "unexpected message; dropping connection");
                break;
            }
            Err(e) => {
                info!(ordinal, error = %e, "connection lost");
                break;
            }
        }
    }
    roster.remove(ordinal);
}

async fn read_next(reader: &mut OwnedReadHalf, is_host: bool) -> Result<Message, ProtocolError> {
    if is_host {
        // Clients heartbeat on a fixed interval; prolonged silence from
        // the host ends the session even without a clean close.
        match tokio::time::timeout(HOST_LIVENESS_TIMEOUT, protocol::read_message(reader)).await {
            Ok(next) => next,
            Err(_) => {
                warn!("host liveness timeout");
                Err(ProtocolError::Closed)
            }
        }
    } else {
        protocol::read_message(reader).await
    }
}

async fn write_loop(
    ordinal: u8,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Message>,
    roster: Arc<Roster>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = protocol::write_message(&mut writer, &message).await {
            info!(ordinal, error = %e, "write failed; dropping connection");
            roster.remove(ordinal);
            break;
        }
    }
}
