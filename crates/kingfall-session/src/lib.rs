//! Game session state machine for Kingfall.
//!
//! One shared [`GameSession`](kingfall_protocol::GameSession) record,
//! mutated by [`SessionMachine`] operations — join, leave, play,
//! reset — each expressed as a single atomic read-validate-commit
//! against the record store. Concurrent conflicting writes resolve to
//! exactly one committed result; losers observe a retryable
//! [`SessionError::Conflict`].

mod error;
mod machine;

pub use error::SessionError;
pub use machine::{MoveReceipt, SessionMachine, SettlementClaim};
