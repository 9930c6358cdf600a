//! Error types for the service facade and gateway.

use kingfall_ledger::LedgerError;
use kingfall_session::SessionError;

/// A failed intent against the service. Every variant's `Display` form
/// is the user-facing rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ServiceError {
    /// Whether re-issuing the same intent against fresh state can
    /// succeed (the write lost a race rather than failing validation).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::Conflict)
                | Self::Ledger(LedgerError::Conflict)
        )
    }
}

/// Transport-level failures in the observer gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    #[error("websocket transport: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("handshake rejected: {0}")]
    Handshake(String),
}
