//! Pure sliding-tile puzzle logic.
//!
//! This crate holds everything about the puzzle itself and nothing about
//! how it travels over the network or reaches a screen:
//! - [`Board`] — an N×M grid of unique tiles plus one empty cell, with
//!   legal-move application, solvability and win detection.
//! - [`MoveCode`] — the small-integer move encoding shared with the wire
//!   protocol (`0=WON, 1=UP, 2=RIGHT, 3=DOWN, 4=LEFT`).
//! - [`PuzzleSession`] — a participant's view of a running game: its own
//!   playable board plus one mirror board per remote participant, kept in
//!   sync by applying relayed moves.

pub mod board;
pub mod session;

pub use board::{Board, BoardError, MoveCode};
pub use session::{PuzzleSession, RemoteOutcome};
