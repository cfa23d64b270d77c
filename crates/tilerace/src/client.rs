//! Participant-side client: connection setup, local and remote moves.
//!
//! A [`Client`] owns one connection to the relay and a
//! [`PuzzleSession`] behind a mutex. Local input applies moves through
//! [`Client::apply_local`]; a background reader task applies relayed moves
//! to the session's mirror boards. The mutex serializes those two paths,
//! which both read-modify-write the same session state.

use crate::protocol::{self, HEARTBEAT_INTERVAL, Message, ProtocolError};
use derive_more::{Display, Error};
use std::sync::{Arc, Mutex};
use tilerace_puzzle::{Board, BoardError, MoveCode, PuzzleSession, RemoteOutcome};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Something observed from the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A peer's move was applied to their mirror board.
    PeerMoved { ordinal: u8, code: MoveCode },
    /// A peer solved their board; the session is frozen.
    PeerWon { ordinal: u8 },
    /// A relayed move could not be applied; the mirror is out of sync.
    Desynced { ordinal: u8 },
    /// The connection to the relay is gone; the session is over.
    ConnectionLost,
}

/// Result of a local move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOutcome {
    /// The board changed and the move was announced to the relay.
    Moved,
    /// The move solved the board; a win announcement was sent.
    Won,
    /// The move was blocked by the board edge; nothing was sent.
    Blocked,
    /// Another participant already won; input is ignored.
    Frozen,
}

/// Errors joining a session.
#[derive(Debug, Display, Error)]
pub enum ClientError {
    /// Framing or transport failure during setup.
    #[display("protocol failure: {_0}")]
    Protocol(ProtocolError),
    /// The distributed board was not a valid permutation grid.
    #[display("received board is invalid: {_0}")]
    Board(BoardError),
    /// The relay sent something out of sequence.
    #[display("expected {expected}, got {got}")]
    Unexpected {
        expected: &'static str,
        got: &'static str,
    },
    /// Connect failure.
    #[display("i/o failure: {_0}")]
    Io(std::io::Error),
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        ClientError::Protocol(err)
    }
}

impl From<BoardError> for ClientError {
    fn from(err: BoardError) -> Self {
        ClientError::Board(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

/// One participant's live connection to a session.
#[derive(Debug)]
pub struct Client {
    session: Arc<Mutex<PuzzleSession>>,
    outgoing: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedReceiver<GameEvent>,
    ordinal: u8,
    participants: u8,
    tasks: Vec<JoinHandle<()>>,
}

impl Client {
    /// Joins an existing session as a non-host participant.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Self::setup(stream).await
    }

    /// Connects as the session host.
    ///
    /// When `count` is given the relay is expected to prompt for a
    /// participant count and `count` is sent in reply; a solo session skips
    /// that exchange. Board dimensions are supplied either way.
    pub async fn connect_as_host(
        addr: &str,
        count: Option<u8>,
        width: u32,
        height: u32,
    ) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        if let Some(count) = count {
            match protocol::read_message(&mut stream).await? {
                Message::Prompt { text } => info!(%text, "relay prompt"),
                other => {
                    return Err(ClientError::Unexpected {
                        expected: "prompt",
                        got: other.kind(),
                    });
                }
            }
            protocol::write_message(&mut stream, &Message::PlayerCount { count }).await?;
        }
        match protocol::read_message(&mut stream).await? {
            Message::Ack { text } => info!(%text, "relay ack"),
            other => {
                return Err(ClientError::Unexpected {
                    expected: "ack",
                    got: other.kind(),
                });
            }
        }
        protocol::write_message(&mut stream, &Message::Dimensions { width, height }).await?;
        Self::setup(stream).await
    }

    async fn setup(mut stream: TcpStream) -> Result<Self, ClientError> {
        let (cells, ordinal, participants) = match protocol::read_message(&mut stream).await? {
            Message::Init {
                cells,
                ordinal,
                participants,
            } => (cells, ordinal, participants),
            other => {
                return Err(ClientError::Unexpected {
                    expected: "init",
                    got: other.kind(),
                });
            }
        };
        let board = Board::from_cells(cells)?;
        info!(
            ordinal,
            participants,
            width = board.width(),
            height = board.height(),
            "session joined"
        );
        let session = Arc::new(Mutex::new(PuzzleSession::new(board, ordinal, participants)));

        let (read_half, write_half) = stream.into_split();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let tasks = vec![
            tokio::spawn(write_loop(write_half, outgoing_rx)),
            tokio::spawn(read_loop(read_half, session.clone(), events_tx)),
            tokio::spawn(heartbeat_loop(outgoing.clone())),
        ];

        Ok(Self {
            session,
            outgoing,
            events,
            ordinal,
            participants,
            tasks,
        })
    }

    /// This participant's assigned ordinal.
    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Total participant count in the session.
    pub fn participants(&self) -> u8 {
        self.participants
    }

    /// Snapshot of the local playable board.
    pub fn board(&self) -> Board {
        self.session.lock().unwrap().board().clone()
    }

    /// Snapshot of the mirror board tracking `ordinal`.
    pub fn peer_board(&self, ordinal: u8) -> Option<Board> {
        self.session.lock().unwrap().peer_board(ordinal).cloned()
    }

    /// True once another participant has announced a win.
    pub fn frozen(&self) -> bool {
        self.session.lock().unwrap().frozen()
    }

    /// Waits for the next observed session event.
    pub async fn next_event(&mut self) -> Option<GameEvent> {
        self.events.recv().await
    }

    /// Applies a local directional move and, if the board changed,
    /// announces it to the relay. A winning move additionally announces
    /// the `WON` sentinel.
    pub fn apply_local(&self, code: MoveCode) -> LocalOutcome {
        let mut session = self.session.lock().unwrap();
        if session.frozen() {
            return LocalOutcome::Frozen;
        }
        if !session.apply_local(code) {
            return LocalOutcome::Blocked;
        }
        let _ = self.outgoing.send(Message::Move {
            ordinal: self.ordinal,
            code: code.code(),
        });
        if session.has_won() {
            let _ = self.outgoing.send(Message::Move {
                ordinal: self.ordinal,
                code: MoveCode::Won.code(),
            });
            LocalOutcome::Won
        } else {
            LocalOutcome::Moved
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    session: Arc<Mutex<PuzzleSession>>,
    events: mpsc::UnboundedSender<GameEvent>,
) {
    loop {
        match protocol::read_message(&mut reader).await {
            Ok(Message::Move {
                ordinal: sender,
                code,
            }) => {
                let Some(code) = MoveCode::from_repr(code) else {
                    warn!(sender, code, "unknown move code; treating connection as lost");
                    let _ = events.send(GameEvent::ConnectionLost);
                    break;
                };
                let outcome = session.lock().unwrap().apply_remote(sender, code);
                let event = match outcome {
                    RemoteOutcome::Applied => Some(GameEvent::PeerMoved {
                        ordinal: sender,
                        code,
                    }),
                    RemoteOutcome::Won => Some(GameEvent::PeerWon { ordinal: sender }),
                    RemoteOutcome::Desynced => Some(GameEvent::Desynced { ordinal: sender }),
                    RemoteOutcome::Frozen | RemoteOutcome::BadSender => None,
                };
                if let Some(event) = event {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
            Ok(other) => {
                warn!(kind = other.kind(), "unexpected message from relay");
                let _ = events.send(GameEvent::ConnectionLost);
                break;
            }
            Err(e) => {
                info!(error = %e, "connection to relay lost");
                let _ = events.send(GameEvent::ConnectionLost);
                break;
            }
        }
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = protocol::write_message(&mut writer, &message).await {
            info!(error = %e, "write to relay failed");
            break;
        }
    }
}

async fn heartbeat_loop(outgoing: mpsc::UnboundedSender<Message>) {
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    interval.tick().await; // first tick fires immediately
    loop {
        interval.tick().await;
        if outgoing.send(Message::Ping).is_err() {
            break;
        }
    }
}
