//! Board state, move application, solvability and win detection.

use derive_more::{Display, Error};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum::FromRepr;
use tracing::debug;

/// Move encoding shared with the wire protocol.
///
/// Directional codes move the *empty cell* by one unit vector. `Won` is a
/// sentinel announcing that the sender finished their board; it is not a
/// movable code and [`Board::apply_code`] rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr)]
#[repr(u8)]
pub enum MoveCode {
    /// Sender solved their board.
    Won = 0,
    /// Empty cell moves up.
    Up = 1,
    /// Empty cell moves right.
    Right = 2,
    /// Empty cell moves down.
    Down = 3,
    /// Empty cell moves left.
    Left = 4,
}

impl MoveCode {
    /// Returns the wire value of this code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the unit vector the empty cell moves by, or `None` for `Won`.
    pub fn offset(self) -> Option<(i32, i32)> {
        match self {
            MoveCode::Won => None,
            MoveCode::Up => Some((0, -1)),
            MoveCode::Right => Some((1, 0)),
            MoveCode::Down => Some((0, 1)),
            MoveCode::Left => Some((-1, 0)),
        }
    }
}

/// Errors constructing a board.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    /// Width or height is zero.
    #[display("board dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: usize, height: usize },
    /// Received rows of differing widths.
    #[display("board rows are not all the same width")]
    NotRectangular,
    /// Cell values are not a permutation of `0..size`.
    #[display("board cells are not a permutation of 0..{size}")]
    NotAPermutation { size: usize },
}

/// An N×M sliding-tile board.
///
/// `cells` holds each value of `{0, .., width*height-1}` exactly once in
/// row-major rows; `0` marks the empty cell and `empty` always points at
/// it. [`Board::slide`] is the only mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Vec<u32>>,
    /// `(x, y)` of the cell holding `0`.
    empty: (usize, usize),
}

impl Board {
    /// Creates a board with a uniformly random tile permutation.
    ///
    /// The result is *not* guaranteed solvable; callers filter through
    /// [`Board::is_solvable`] or use [`Board::new_solvable`].
    pub fn generate<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::InvalidDimensions { width, height });
        }
        let mut values: Vec<u32> = (0..(width * height) as u32).collect();
        values.shuffle(rng);
        let cells: Vec<Vec<u32>> = values.chunks(width).map(|row| row.to_vec()).collect();
        Self::from_cells(cells)
    }

    /// Creates a solvable board by rejection sampling.
    ///
    /// Re-generates until [`Board::is_solvable`] passes (expected O(1)
    /// retries). Trivially-won candidates short-circuit, so a 1×1 board
    /// never loops.
    pub fn new_solvable<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let mut attempts = 0u32;
        loop {
            let board = Self::generate(width, height, rng)?;
            attempts += 1;
            if board.has_won() || board.is_solvable() {
                debug!(width, height, attempts, "generated solvable board");
                return Ok(board);
            }
        }
    }

    /// Builds a board from received cell values, validating that the grid
    /// is rectangular and a permutation of `0..width*height`.
    pub fn from_cells(cells: Vec<Vec<u32>>) -> Result<Self, BoardError> {
        let height = cells.len();
        let width = cells.first().map_or(0, Vec::len);
        if width == 0 || height == 0 {
            return Err(BoardError::InvalidDimensions { width, height });
        }
        if cells.iter().any(|row| row.len() != width) {
            return Err(BoardError::NotRectangular);
        }

        let size = width * height;
        let mut seen = vec![false; size];
        let mut empty = None;
        for (y, row) in cells.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                let value = value as usize;
                if value >= size || seen[value] {
                    return Err(BoardError::NotAPermutation { size });
                }
                seen[value] = true;
                if value == 0 {
                    empty = Some((x, y));
                }
            }
        }
        // A full permutation of 0..size always contains 0.
        let empty = empty.ok_or(BoardError::NotAPermutation { size })?;

        Ok(Self {
            width,
            height,
            cells,
            empty,
        })
    }

    /// Board width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Board height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell values in row-major rows.
    pub fn cells(&self) -> &[Vec<u32>] {
        &self.cells
    }

    /// `(x, y)` of the empty cell.
    pub fn empty(&self) -> (usize, usize) {
        self.empty
    }

    /// Moves the empty cell by `(dx, dy)`, one of the four unit vectors.
    ///
    /// Returns `false` without mutating if the target lies outside the
    /// board; otherwise swaps the target value into the old empty position,
    /// updates the empty position, and returns `true`.
    pub fn slide(&mut self, dx: i32, dy: i32) -> bool {
        let (ex, ey) = self.empty;
        let nx = ex as i32 + dx;
        let ny = ey as i32 + dy;
        if nx < 0 || nx >= self.width as i32 || ny < 0 || ny >= self.height as i32 {
            return false;
        }
        let (nx, ny) = (nx as usize, ny as usize);
        self.cells[ey][ex] = self.cells[ny][nx];
        self.cells[ny][nx] = 0;
        self.empty = (nx, ny);
        true
    }

    /// Applies a directional move code; `Won` is rejected.
    pub fn apply_code(&mut self, code: MoveCode) -> bool {
        match code.offset() {
            Some((dx, dy)) => self.slide(dx, dy),
            None => false,
        }
    }

    /// True iff the flattened non-zero values contain an even number of
    /// inversions (pairs appearing in descending order).
    pub fn is_solvable(&self) -> bool {
        let tiles: Vec<u32> = self
            .cells
            .iter()
            .flatten()
            .copied()
            .filter(|&v| v != 0)
            .collect();
        let mut inversions = 0usize;
        for i in 0..tiles.len() {
            for j in i + 1..tiles.len() {
                if tiles[i] > tiles[j] {
                    inversions += 1;
                }
            }
        }
        inversions % 2 == 0
    }

    /// True iff cells read `1, 2, .., size-1` in row-major order with the
    /// empty cell last.
    pub fn has_won(&self) -> bool {
        let last = self.width * self.height - 1;
        let mut expected = 1u32;
        for (i, &value) in self.cells.iter().flatten().enumerate() {
            if i == last {
                return value == 0;
            }
            if value != expected {
                return false;
            }
            expected += 1;
        }
        true
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for (x, value) in row.iter().enumerate() {
                if x > 0 {
                    write!(f, " ")?;
                }
                if *value == 0 {
                    write!(f, "{:>3}", ".")?;
                } else {
                    write!(f, "{value:>3}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_codes_round_trip_through_wire_values() {
        for code in [
            MoveCode::Won,
            MoveCode::Up,
            MoveCode::Right,
            MoveCode::Down,
            MoveCode::Left,
        ] {
            assert_eq!(MoveCode::from_repr(code.code()), Some(code));
        }
        assert_eq!(MoveCode::from_repr(5), None);
    }

    #[test]
    fn inversion_parity_decides_solvability() {
        // 1 2 / 3 0 has zero inversions.
        let solved = Board::from_cells(vec![vec![1, 2], vec![3, 0]]).unwrap();
        assert!(solved.is_solvable());

        // Swapping 1 and 2 gives a single inversion.
        let odd = Board::from_cells(vec![vec![2, 1], vec![3, 0]]).unwrap();
        assert!(!odd.is_solvable());
    }
}
