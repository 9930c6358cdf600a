//! Core board vocabulary: sides, piece kinds, and squares.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the two armies. White always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The opposing side.
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// The row direction this side's pawns advance in.
    pub(crate) fn pawn_dir(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    /// The row this side's pawns start on.
    pub(crate) fn pawn_rank(self) -> u8 {
        match self {
            Self::White => 1,
            Self::Black => 6,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

/// What a piece is, independent of who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// A piece on the board: an explicit (side, kind) pair rather than an
/// encoded tag, so ownership checks are plain field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub side: Side,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(side: Side, kind: PieceKind) -> Self {
        Self { side, kind }
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A board cell index, 0..64, row-major from White's back rank.
///
/// Row 0 is White's home rank (rank 1 in algebraic terms), row 7 is
/// Black's. Column 0 is the a-file. So `Square(12)` is e2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Square(pub u8);

impl Square {
    /// Builds a square from (row, col). Returns `None` when either
    /// coordinate is off the board.
    pub fn from_coords(row: u8, col: u8) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Self(row * 8 + col))
        } else {
            None
        }
    }

    /// Whether this index actually names a cell.
    pub fn in_bounds(self) -> bool {
        self.0 < 64
    }

    /// Row (rank - 1), 0..8 for in-bounds squares.
    pub fn row(self) -> u8 {
        self.0 / 8
    }

    /// Column (file), 0..8 for in-bounds squares.
    pub fn col(self) -> u8 {
        self.0 % 8
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.in_bounds() {
            return write!(f, "#{}", self.0);
        }
        let file = (b'a' + self.col()) as char;
        write!(f, "{}{}", file, self.row() + 1)
    }
}

/// Error returned when parsing an algebraic square name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSquareError;

impl fmt::Display for ParseSquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a square like \"e2\"")
    }
}

impl std::error::Error for ParseSquareError {}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(file), Some(rank), None) =
            (chars.next(), chars.next(), chars.next())
        else {
            return Err(ParseSquareError);
        };
        let col = (file as u32).wrapping_sub('a' as u32);
        let row = (rank as u32).wrapping_sub('1' as u32);
        if col < 8 && row < 8 {
            Ok(Self((row * 8 + col) as u8))
        } else {
            Err(ParseSquareError)
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
