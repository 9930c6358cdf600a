//! Error types for the record store.

/// Errors surfaced by conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Another write committed between the read and this commit.
    /// Safely retryable: re-read and re-issue the intent.
    #[error("record changed since it was read — retry against fresh state")]
    Conflict,

    /// The write named a record that was never created.
    #[error("record not found")]
    NotFound,
}
