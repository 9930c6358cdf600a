//! In-process store implementations over `tokio::sync` primitives.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::{Document, Expect, StoreError, Table, TableWrite, Version, Versioned};

// ---------------------------------------------------------------------------
// MemoryDocument
// ---------------------------------------------------------------------------

/// An in-memory [`Document`]: one record behind a mutex, with a watch
/// channel that carries every committed value to subscribers.
///
/// Handles are cheap to clone and share one record.
pub struct MemoryDocument<T> {
    inner: Arc<DocumentInner<T>>,
}

struct DocumentInner<T> {
    state: Mutex<Versioned<T>>,
    publisher: watch::Sender<Versioned<T>>,
}

impl<T: Clone> MemoryDocument<T> {
    /// Creates the record with `initial` at [`Version::INITIAL`].
    pub fn new(initial: T) -> Self {
        let seeded = Versioned::new(initial, Version::INITIAL);
        let (publisher, _) = watch::channel(seeded.clone());
        Self {
            inner: Arc::new(DocumentInner {
                state: Mutex::new(seeded),
                publisher,
            }),
        }
    }
}

impl<T> Clone for MemoryDocument<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync> Document<T> for MemoryDocument<T> {
    async fn read(&self) -> Versioned<T> {
        self.inner.state.lock().await.clone()
    }

    async fn commit(
        &self,
        expected: Version,
        value: T,
    ) -> Result<Versioned<T>, StoreError> {
        let mut state = self.inner.state.lock().await;
        if state.version != expected {
            tracing::debug!(
                expected = %expected,
                actual = %state.version,
                "document commit lost a race"
            );
            return Err(StoreError::Conflict);
        }
        *state = Versioned::new(value, state.version.next());
        // Subscribers may all be gone; the commit still stands.
        let _ = self.inner.publisher.send(state.clone());
        tracing::trace!(version = %state.version, "document committed");
        Ok(state.clone())
    }

    fn subscribe(&self) -> watch::Receiver<Versioned<T>> {
        self.inner.publisher.subscribe()
    }
}

// ---------------------------------------------------------------------------
// MemoryTable
// ---------------------------------------------------------------------------

/// An in-memory [`Table`]: keyed records behind one mutex, so a
/// two-record commit is atomic by construction.
pub struct MemoryTable<K, V> {
    records: Arc<Mutex<HashMap<K, Versioned<V>>>>,
}

impl<K, V> MemoryTable<K, V> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> Default for MemoryTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MemoryTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

/// Checks one write against the current map without mutating it,
/// returning the version the new record would carry.
fn check<K: Eq + Hash, V>(
    records: &HashMap<K, Versioned<V>>,
    key: &K,
    expected: Expect,
) -> Result<Version, StoreError> {
    match (records.get(key), expected) {
        (None, Expect::Absent) => Ok(Version::INITIAL),
        (None, Expect::At(_)) => Err(StoreError::NotFound),
        (Some(_), Expect::Absent) => Err(StoreError::Conflict),
        (Some(current), Expect::At(version)) => {
            if current.version == version {
                Ok(version.next())
            } else {
                Err(StoreError::Conflict)
            }
        }
    }
}

impl<K, V> Table<K, V> for MemoryTable<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn read(&self, key: &K) -> Option<Versioned<V>> {
        self.records.lock().await.get(key).cloned()
    }

    async fn commit(
        &self,
        key: K,
        expected: Expect,
        value: V,
    ) -> Result<Versioned<V>, StoreError> {
        let mut records = self.records.lock().await;
        let version = check(&records, &key, expected)?;
        let committed = Versioned::new(value, version);
        records.insert(key, committed.clone());
        Ok(committed)
    }

    async fn commit_pair(
        &self,
        first: TableWrite<K, V>,
        second: TableWrite<K, V>,
    ) -> Result<(), StoreError> {
        if first.key == second.key {
            return Err(StoreError::Conflict);
        }
        let mut records = self.records.lock().await;
        // Validate both before touching either.
        let first_version = check(&records, &first.key, first.expected)?;
        let second_version = check(&records, &second.key, second.expected)?;
        records.insert(first.key, Versioned::new(first.value, first_version));
        records.insert(second.key, Versioned::new(second.value, second_version));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryLog
// ---------------------------------------------------------------------------

/// An append-only list. Entries are write-once and never removed.
pub struct MemoryLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> MemoryLog<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends one entry. Infallible in this backend.
    pub async fn append(&self, entry: T) {
        self.entries.lock().await.push(entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<T: Clone> MemoryLog<T> {
    /// A copy of every entry in append order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.entries.lock().await.clone()
    }
}

impl<T> Default for MemoryLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoryLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
