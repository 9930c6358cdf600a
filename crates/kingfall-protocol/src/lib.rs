//! Shared document and wire types for Kingfall.
//!
//! This crate is the vocabulary every layer speaks: player identity,
//! the session document that lives in the record store (and travels to
//! observers verbatim), ledger snapshots, and the JSON frames exchanged
//! with clients.

mod types;
mod wire;

pub use types::{
    Balance, ExchangeRecord, ExchangeStatus, GameSession, PlayerId, Status,
};
pub use wire::{ClientFrame, ServerFrame, PROTOCOL_VERSION};
