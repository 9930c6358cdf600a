//! JSON frames exchanged between clients and the gateway.
//!
//! Both enums are internally tagged (`#[serde(tag = "type")]`), so a
//! move intent reads `{ "type": "Move", "from": 12, "to": 28 }` — flat
//! objects that browser clients can build and match on directly.

use kingfall_board::Square;
use serde::{Deserialize, Serialize};

use crate::types::{GameSession, PlayerId};

/// Wire protocol version. Clients presenting a different version in
/// their `Hello` are rejected at handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Client → server frames.
///
/// The first frame on a connection must be `Hello`; everything after
/// it is an intent against the shared session or the caller's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Handshake. `player` is the identity issued by the external auth
    /// layer; the gateway trusts it as-is.
    Hello { version: u32, player: PlayerId },

    /// Take the first free seat.
    Join,

    /// Give up the held seat.
    Leave,

    /// Move the piece on `from` to `to`.
    Move { from: Square, to: Square },

    /// Administrative: restore the session to its created state.
    Reset,

    /// Convert coins to `units` of the external currency.
    Exchange { units: u64, external_ref: String },
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Handshake accepted.
    Welcome { player: PlayerId },

    /// The full committed session, pushed on every commit (and once
    /// right after `Welcome`). `version` is the store's commit stamp.
    Session { session: GameSession, version: u64 },

    /// The caller's coin balance after a settlement or exchange.
    Balance { player: PlayerId, coins: u64 },

    /// An intent failed a precondition or lost a write race. The reason
    /// is a display string; retry semantics are up to the client.
    Rejected { reason: String },

    /// Protocol-level failure (malformed frame, bad handshake).
    Error { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
