//! # Kingfall
//!
//! A two-player king-capture board game service with a coin ledger.
//!
//! One shared session record is mutated move-by-move under optimistic
//! concurrency, every committed value fans out to all connected
//! observers in real time, and a decided game settles both players'
//! balances exactly once before a scheduled reset re-arms the board.
//!
//! - [`GameService`] — the wired core: session machine, ledger,
//!   settlement hook, scheduled reset
//! - [`Gateway`] — WebSocket fan-out and intent ingestion
//!
//! Run the bundled server with `cargo run --bin kingfall-server`.

mod error;
mod gateway;
mod service;

pub use error::{GatewayError, ServiceError};
pub use gateway::Gateway;
pub use service::{GameService, ServiceConfig};

/// Common imports for embedding the service or talking to it.
pub mod prelude {
    pub use kingfall_board::{Board, Piece, PieceKind, Side, Square};
    pub use kingfall_ledger::{LedgerConfig, LedgerError};
    pub use kingfall_protocol::{
        Balance, ClientFrame, GameSession, PlayerId, ServerFrame, Status,
        PROTOCOL_VERSION,
    };
    pub use kingfall_session::SessionError;

    pub use crate::{GameService, Gateway, GatewayError, ServiceConfig, ServiceError};
}
