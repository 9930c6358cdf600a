//! Board model and move legality rules for Kingfall.
//!
//! Everything in this crate is pure data and pure functions — no I/O,
//! no clocks, no shared state. The session layer owns mutation; this
//! crate only answers questions about positions and move shapes.
//!
//! # Key types
//!
//! - [`Side`], [`PieceKind`], [`Piece`] — the cell vocabulary
//! - [`Square`] — a board index with coordinate math
//! - [`Board`] — 64 cells, row-major from White's back rank
//! - [`legal_move`] — the simplified legality predicate

mod board;
mod rules;
mod types;

pub use board::Board;
pub use rules::legal_move;
pub use types::{ParseSquareError, Piece, PieceKind, Side, Square};
