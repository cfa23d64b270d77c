//! Per-participant session state: own board plus per-sender mirrors.

use crate::board::{Board, MoveCode};
use tracing::{debug, warn};

/// Result of applying a relayed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The move was applied to the sender's mirror board.
    Applied,
    /// The sender announced a win; the session is now frozen.
    Won,
    /// The session is frozen (someone already won); the move was dropped.
    Frozen,
    /// The move was illegal on the sender's mirror board. The mirror no
    /// longer matches the sender's real board and nothing re-syncs it.
    Desynced,
    /// The sender ordinal does not belong to this session.
    BadSender,
}

/// A participant's view of a running game.
///
/// Holds one board per participant ordinal, all initialized from the same
/// cell values the relay distributed. The board at `ordinal` is the local
/// playable copy; the others mirror remote participants and advance only
/// through [`PuzzleSession::apply_remote`]. Remote moves go through the
/// same validation path as local ones, so a bad relayed code cannot
/// silently corrupt a mirror.
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    ordinal: u8,
    boards: Vec<Board>,
    frozen: bool,
    desynced: bool,
}

impl PuzzleSession {
    /// Creates a session for `ordinal` out of `participants` total, every
    /// board starting as a copy of `board`.
    pub fn new(board: Board, ordinal: u8, participants: u8) -> Self {
        // A count that does not cover the ordinal would leave the session
        // without a playable board; widen rather than trust the sender.
        let count = (participants as usize).max(ordinal as usize + 1);
        Self {
            ordinal,
            boards: vec![board; count],
            frozen: false,
            desynced: false,
        }
    }

    /// This participant's ordinal.
    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Number of participants in the session.
    pub fn participants(&self) -> u8 {
        self.boards.len() as u8
    }

    /// The local playable board.
    pub fn board(&self) -> &Board {
        &self.boards[self.ordinal as usize]
    }

    /// The mirror board tracking `ordinal`, if it belongs to the session.
    pub fn peer_board(&self, ordinal: u8) -> Option<&Board> {
        self.boards.get(ordinal as usize)
    }

    /// True once another participant has announced a win.
    pub fn frozen(&self) -> bool {
        self.frozen
    }

    /// True once a relayed move failed to apply to its mirror.
    pub fn desynced(&self) -> bool {
        self.desynced
    }

    /// True iff the local playable board is solved.
    pub fn has_won(&self) -> bool {
        self.board().has_won()
    }

    /// Applies a local move to the playable board.
    ///
    /// Returns `true` iff the board changed, in which case the caller must
    /// announce `(ordinal, code)` to the relay. Blocked moves and moves
    /// after a freeze return `false` and announce nothing.
    pub fn apply_local(&mut self, code: MoveCode) -> bool {
        if self.frozen {
            return false;
        }
        self.boards[self.ordinal as usize].apply_code(code)
    }

    /// Applies a move relayed from `sender` to that sender's mirror board.
    pub fn apply_remote(&mut self, sender: u8, code: MoveCode) -> RemoteOutcome {
        if self.frozen {
            return RemoteOutcome::Frozen;
        }
        if sender == self.ordinal || usize::from(sender) >= self.boards.len() {
            warn!(sender, ordinal = self.ordinal, "move from invalid sender");
            return RemoteOutcome::BadSender;
        }
        if code == MoveCode::Won {
            debug!(sender, "peer won; freezing session");
            self.frozen = true;
            return RemoteOutcome::Won;
        }
        if self.boards[sender as usize].apply_code(code) {
            RemoteOutcome::Applied
        } else {
            warn!(
                sender,
                code = code.code(),
                "relayed move is illegal on mirror board; session desynchronized"
            );
            self.desynced = true;
            RemoteOutcome::Desynced
        }
    }
}
