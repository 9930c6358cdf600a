//! Identity, the session document, and ledger records.

use std::fmt;

use kingfall_board::{Board, Side};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A stable player identity, supplied by the external auth layer.
///
/// Newtype over `u64`; `#[serde(transparent)]` keeps it a bare number
/// on the wire and in stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session document
// ---------------------------------------------------------------------------

/// Lifecycle state of the shared game session.
///
/// ```text
/// Waiting → Playing → Finished → (reset) → Waiting
/// ```
///
/// `Waiting → Waiting` is also reachable: a lone `leave` empties the
/// session back to its created state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Fewer than two seats taken; accepting joins.
    Waiting,
    /// Both seats taken; moves are accepted.
    Playing,
    /// A King was captured. Settlement and the scheduled reset follow.
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// The single shared game record: board, seats, turn, and outcome.
///
/// One instance is shared by all participants — there are no per-player
/// copies. Every mutation goes through a version-conditioned commit in
/// the store, and every committed value is fanned out to observers
/// as-is, so this struct is both the authoritative document and the
/// display snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub board: Board,
    /// The side currently permitted to move.
    pub turn: Side,
    pub seat_white: Option<PlayerId>,
    pub seat_black: Option<PlayerId>,
    pub status: Status,
    /// Set on the Finished transition; one of the two seat occupants.
    pub winner: Option<PlayerId>,
    /// Settlement marker: the winner whose payout was already applied.
    /// Guards the balance adjustment against double application when
    /// several observers react to the same Finished snapshot.
    pub settled_for: Option<PlayerId>,
}

impl GameSession {
    /// The created state: initial layout, empty seats, White to move.
    pub fn new() -> Self {
        Self {
            board: Board::initial(),
            turn: Side::White,
            seat_white: None,
            seat_black: None,
            status: Status::Waiting,
            winner: None,
            settled_for: None,
        }
    }

    /// The side `player` occupies, if any.
    pub fn seat_of(&self, player: PlayerId) -> Option<Side> {
        if self.seat_white == Some(player) {
            Some(Side::White)
        } else if self.seat_black == Some(player) {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// The occupant of `side`'s seat.
    pub fn occupant(&self, side: Side) -> Option<PlayerId> {
        match side {
            Side::White => self.seat_white,
            Side::Black => self.seat_black,
        }
    }

    pub fn set_seat(&mut self, side: Side, player: Option<PlayerId>) {
        match side {
            Side::White => self.seat_white = player,
            Side::Black => self.seat_black = player,
        }
    }

    /// Whether both seats are taken.
    pub fn is_full(&self) -> bool {
        self.seat_white.is_some() && self.seat_black.is_some()
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// A point-in-time view of one player's coin balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub player: PlayerId,
    pub coins: u64,
}

/// Lifecycle of an exchange request. The downstream transfer is
/// reconciled out of band, so the ledger only ever records submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeStatus {
    Submitted,
}

/// One append-only exchange audit entry, written alongside the coin
/// deduction it accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub player: PlayerId,
    /// Destination account in the external currency system.
    pub external_ref: String,
    /// Requested amount in external units.
    pub units: u64,
    /// Coins deducted for the request.
    pub cost: u64,
    /// Milliseconds since the Unix epoch at submission.
    pub requested_at_ms: u64,
    pub status: ExchangeStatus,
}

// =========================================================================
// Tests
// =========================================================================
