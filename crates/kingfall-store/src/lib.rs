//! Versioned compare-and-swap record store for Kingfall.
//!
//! Every mutation in Kingfall is a single atomic conditional write:
//! read a version-stamped snapshot, compute the successor value, and
//! commit it only if the record is still at the version that was read.
//! A write that lost a race fails with [`StoreError::Conflict`] and
//! changes nothing; retry policy belongs to the caller.
//!
//! Two record shapes cover the whole system:
//!
//! - [`Document`] — a single shared record (the game session). Commits
//!   fan out to every subscriber via a `tokio::sync::watch` channel,
//!   which is the real-time sync primitive: observers always hold the
//!   latest committed value, possibly skipping intermediate ones.
//! - [`Table`] — keyed records created lazily (per-player balances),
//!   with a two-record commit for writes that must land together.
//!
//! [`MemoryDocument`], [`MemoryTable`], and [`MemoryLog`] are the
//! in-process implementations; the traits are the seam for a
//! persistent backend.

#![allow(async_fn_in_trait)]

mod error;
mod memory;
mod version;

use tokio::sync::watch;

pub use error::StoreError;
pub use memory::{MemoryDocument, MemoryLog, MemoryTable};
pub use version::{Expect, Version, Versioned};

/// A single shared record with version-conditioned writes and commit
/// fan-out.
pub trait Document<T>: Send + Sync {
    /// Returns the current committed value and its version.
    async fn read(&self) -> Versioned<T>;

    /// Commits `value` iff the record is still at `expected`.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] if another write committed since the
    /// snapshot at `expected` was read. The record is left untouched.
    async fn commit(
        &self,
        expected: Version,
        value: T,
    ) -> Result<Versioned<T>, StoreError>;

    /// Subscribes to commits. The receiver is seeded with the current
    /// committed value and sees every subsequent commit (coalesced to
    /// the latest under load).
    fn subscribe(&self) -> watch::Receiver<Versioned<T>>;
}

/// One conditional write against a [`Table`].
#[derive(Debug, Clone)]
pub struct TableWrite<K, V> {
    pub key: K,
    pub expected: Expect,
    pub value: V,
}

/// A keyed collection of versioned records.
///
/// Records are created by committing with [`Expect::Absent`] and are
/// never deleted.
pub trait Table<K, V>: Send + Sync {
    /// Returns the record under `key`, or `None` if it was never created.
    async fn read(&self, key: &K) -> Option<Versioned<V>>;

    /// Commits `value` under `key` iff the record matches `expected`.
    ///
    /// # Errors
    /// - [`StoreError::Conflict`] — the record exists but is not at the
    ///   expected version, or `Expect::Absent` found an existing record.
    /// - [`StoreError::NotFound`] — `Expect::At` named a record that was
    ///   never created.
    async fn commit(
        &self,
        key: K,
        expected: Expect,
        value: V,
    ) -> Result<Versioned<V>, StoreError>;

    /// Commits two writes atomically: both land or neither does.
    ///
    /// The two keys must be distinct; a same-key pair fails with
    /// [`StoreError::Conflict`].
    async fn commit_pair(
        &self,
        first: TableWrite<K, V>,
        second: TableWrite<K, V>,
    ) -> Result<(), StoreError>;
}
