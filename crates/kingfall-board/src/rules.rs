//! Move legality: a stateless shape check over a board snapshot.
//!
//! This is deliberately a reduced rule set. Sliding pieces (bishop,
//! rook, queen) are checked for direction shape only — there is NO
//! obstruction check along the path. There is no check, checkmate,
//! castling, en passant, or promotion logic anywhere; the King is an
//! ordinary capturable piece and capturing it ends the game upstream.

use crate::board::Board;
use crate::types::{PieceKind, Square};

/// Decides whether moving the piece on `from` to `to` is legal.
///
/// Pure, no side effects. The caller guarantees `from` holds a piece of
/// the side whose turn it is; turn ownership is not re-checked here.
/// Returns `false` for out-of-bounds squares, a vacant `from`, or
/// `from == to`.
pub fn legal_move(board: &Board, from: Square, to: Square) -> bool {
    if !from.in_bounds() || !to.in_bounds() || from == to {
        return false;
    }
    let Some(piece) = board.get(from) else {
        return false;
    };
    let target = board.get(to);

    // A side never captures its own piece.
    if target.is_some_and(|t| t.side == piece.side) {
        return false;
    }

    let d_row = to.row() as i8 - from.row() as i8;
    let d_col = to.col() as i8 - from.col() as i8;

    match piece.kind {
        PieceKind::Pawn => {
            let dir = piece.side.pawn_dir();
            if d_col == 0 && d_row == dir {
                // Single advance onto an empty cell.
                return target.is_none();
            }
            if d_col == 0 && d_row == 2 * dir {
                // Double advance: starting rank only, nothing in the way.
                let mid = Square::from_coords(
                    (from.row() as i8 + dir) as u8,
                    from.col(),
                );
                return from.row() == piece.side.pawn_rank()
                    && mid.is_some_and(|m| board.get(m).is_none())
                    && target.is_none();
            }
            if d_col.abs() == 1 && d_row == dir {
                // Diagonal step is a capture only.
                return target.is_some();
            }
            false
        }
        PieceKind::Knight => {
            matches!((d_row.abs(), d_col.abs()), (2, 1) | (1, 2))
        }
        PieceKind::Bishop => d_row.abs() == d_col.abs(),
        PieceKind::Rook => d_row == 0 || d_col == 0,
        PieceKind::Queen => {
            d_row.abs() == d_col.abs() || d_row == 0 || d_col == 0
        }
        PieceKind::King => d_row.abs() <= 1 && d_col.abs() <= 1,
    }
}

// =========================================================================
// Tests
// =========================================================================
