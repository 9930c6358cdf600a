//! Error types for session operations.
//!
//! Every variant is recoverable at the operation boundary and doubles
//! as the user-facing rejection reason via its `Display` form.

use kingfall_board::{Side, Square};
use kingfall_protocol::PlayerId;
use kingfall_store::StoreError;

/// Why a session operation was refused. The committed record is left
/// exactly as it was in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The player already holds a seat.
    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),

    /// Both seats are taken (or the game is in progress).
    #[error("game is full")]
    GameFull,

    /// The player holds neither seat.
    #[error("player {0} holds no seat")]
    NotSeated(PlayerId),

    /// Moves are only accepted while a game is in progress.
    #[error("no game in progress")]
    NotPlaying,

    /// It is the other side's turn.
    #[error("not your turn — {0} to move")]
    WrongTurn(Side),

    /// The source square holds no piece of the caller's side.
    #[error("no piece of yours on {0}")]
    NotYourPiece(Square),

    /// The move fails the legality rules.
    #[error("illegal move: {from} to {to}")]
    IllegalMove { from: Square, to: Square },

    /// The record changed between read and commit. Retryable: re-read
    /// and re-issue the intent against fresh state.
    #[error("session changed since it was read — retry")]
    Conflict,
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            // The session document is created at construction and never
            // deleted, so a missing record can only mean a racing
            // backend swap; surface it as a stale write.
            StoreError::NotFound => Self::Conflict,
        }
    }
}
