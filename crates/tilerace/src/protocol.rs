//! Wire protocol: length-prefixed, type-tagged messages.
//!
//! Every message travels as a `u32` big-endian length prefix followed by a
//! JSON body. The explicit framing and the `type` tag mean receivers never
//! depend on stream read boundaries lining up with message boundaries. A
//! frame that fails to decode is not retried; the connection that sent it
//! is treated as lost.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default TCP port for hosting and joining.
pub const DEFAULT_PORT: u16 = 8001;

/// Upper bound on a single frame body. Init frames grow with board area;
/// a megabyte covers any board a human would attempt.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

/// How often clients send [`Message::Ping`].
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Silence on the host connection longer than this ends the session.
pub const HOST_LIVENESS_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything that travels between relay and participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Relay asks the host how many participants will play.
    Prompt { text: String },
    /// Host's answer to [`Message::Prompt`].
    PlayerCount { count: u8 },
    /// Relay acknowledges the count and asks for board dimensions.
    Ack { text: String },
    /// Host's chosen board dimensions.
    Dimensions { width: u32, height: u32 },
    /// One-time session init: the shared board, the receiver's ordinal and
    /// the total participant count.
    Init {
        cells: Vec<Vec<u32>>,
        ordinal: u8,
        participants: u8,
    },
    /// A participant's move, relayed verbatim to everyone else.
    Move { ordinal: u8, code: u8 },
    /// Client heartbeat; feeds host-liveness detection, never forwarded.
    Ping,
}

impl Message {
    /// Short name for logs and unexpected-message errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Prompt { .. } => "prompt",
            Message::PlayerCount { .. } => "player_count",
            Message::Ack { .. } => "ack",
            Message::Dimensions { .. } => "dimensions",
            Message::Init { .. } => "init",
            Message::Move { .. } => "move",
            Message::Ping => "ping",
        }
    }
}

/// Errors reading or writing framed messages.
#[derive(Debug, Display, Error)]
pub enum ProtocolError {
    /// Peer closed the stream at a frame boundary.
    #[display("connection closed by peer")]
    Closed,
    /// Frame length prefix exceeds [`MAX_FRAME_LEN`].
    #[display("frame of {len} bytes exceeds limit of {limit}")]
    FrameTooLarge { len: u32, limit: u32 },
    /// Frame body did not decode into a [`Message`].
    #[display("malformed frame: {_0}")]
    Malformed(serde_json::Error),
    /// Underlying transport failure.
    #[display("i/o failure: {_0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::Io(err)
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err)
    }
}

/// Reads one framed [`Message`].
///
/// A clean EOF before the length prefix maps to [`ProtocolError::Closed`];
/// EOF inside a frame is an I/O error, which callers treat the same way.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(ProtocolError::Closed),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            limit: MAX_FRAME_LEN,
        });
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Writes one framed [`Message`] and flushes it.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(message)?;
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let messages = [
            Message::Prompt {
                text: "players?".into(),
            },
            Message::PlayerCount { count: 2 },
            Message::Init {
                cells: vec![vec![1, 2], vec![3, 0]],
                ordinal: 1,
                participants: 2,
            },
            Message::Move { ordinal: 0, code: 3 },
            Message::Ping,
        ];
        for message in &messages {
            write_message(&mut a, message).await.unwrap();
        }
        for message in &messages {
            assert_eq!(&read_message(&mut b).await.unwrap(), message);
        }
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let _ = a.write_u32(MAX_FRAME_LEN + 1).await;
        });
        assert!(matches!(
            read_message(&mut b).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_frames_are_malformed() {
        let (mut a, mut b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let _ = a.write_u32(4).await;
            let _ = a.write_all(b"!!!!").await;
        });
        assert!(matches!(
            read_message(&mut b).await,
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn clean_eof_reads_as_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_message(&mut b).await,
            Err(ProtocolError::Closed)
        ));
    }
}
