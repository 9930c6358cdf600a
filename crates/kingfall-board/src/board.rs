//! The board: a fixed sequence of 64 cells.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Piece, PieceKind, Side, Square};

/// An 8×8 piece layout: exactly 64 cells, each empty or holding one
/// [`Piece`]. Cells are addressed by [`Square`], row-major from White's
/// back rank.
///
/// The board is plain data — it performs no legality checks and does
/// not enforce piece counts (a side losing its King is detected by the
/// session layer at capture time, not here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Piece>; 64],
}

impl Board {
    /// An entirely empty board.
    pub fn empty() -> Self {
        Self { cells: [None; 64] }
    }

    /// The standard starting layout: White on rows 0–1, Black on rows 6–7.
    pub fn initial() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut board = Self::empty();
        for col in 0..8u8 {
            board.cells[col as usize] =
                Some(Piece::new(Side::White, BACK_RANK[col as usize]));
            board.cells[8 + col as usize] =
                Some(Piece::new(Side::White, PieceKind::Pawn));
            board.cells[48 + col as usize] =
                Some(Piece::new(Side::Black, PieceKind::Pawn));
            board.cells[56 + col as usize] =
                Some(Piece::new(Side::Black, BACK_RANK[col as usize]));
        }
        board
    }

    /// The piece at `square`, or `None` for an empty or out-of-bounds cell.
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells.get(square.0 as usize).copied().flatten()
    }

    /// Places (or clears) a cell. Out-of-bounds squares are ignored.
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        if let Some(cell) = self.cells.get_mut(square.0 as usize) {
            *cell = piece;
        }
    }

    /// Removes and returns the piece at `square`.
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        self.cells
            .get_mut(square.0 as usize)
            .and_then(|cell| cell.take())
    }

    /// Total occupied cells.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterates over occupied cells as `(Square, Piece)` pairs.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|p| (Square(i as u8), p)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

// Serde can't derive for a 64-element array, so the board serializes
// by hand as a flat 64-cell sequence. Deserialization enforces the
// exact length — a session document with a truncated board is corrupt.

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(64))?;
        for cell in &self.cells {
            seq.serialize_element(cell)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoardVisitor;

        impl<'de> Visitor<'de> for BoardVisitor {
            type Value = Board;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a sequence of exactly 64 cells")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Board, A::Error> {
                let mut cells = [None; 64];
                for (i, cell) in cells.iter_mut().enumerate() {
                    *cell = seq.next_element()?.ok_or_else(|| {
                        serde::de::Error::invalid_length(i, &self)
                    })?;
                }
                if seq.next_element::<Option<Piece>>()?.is_some() {
                    return Err(serde::de::Error::invalid_length(65, &self));
                }
                Ok(Board { cells })
            }
        }

        deserializer.deserialize_seq(BoardVisitor)
    }
}

// =========================================================================
// Tests
// =========================================================================
