//! Networked multiplayer sliding-tile puzzle.
//!
//! Several participants solve independent copies of the same board while
//! watching each other's progress. One process hosts a [`relay`]: it
//! accepts TCP connections until the negotiated participant count is
//! reached, generates one solvable board, distributes it to everyone
//! along with their assigned ordinal, and from then on forwards every
//! `(ordinal, move)` message to all *other* participants. The relay never
//! interprets board state after generation; each [`client`] keeps its own
//! copies consistent by replaying relayed moves through
//! [`tilerace_puzzle::PuzzleSession`].
//!
//! Module responsibilities:
//! - [`protocol`] — length-prefixed, type-tagged wire messages.
//! - [`relay`]    — host-side accept / negotiate / distribute / forward loop.
//! - [`client`]   — participant-side connection, local and remote moves.
//! - [`cli`]      — `host` / `join` / `solo` command-line surface.

pub mod cli;
pub mod client;
pub mod protocol;
pub mod relay;
