//! Per-record lock registry.
//!
//! Compound operations must serialize their check-then-mutate sequence per
//! account (and per invoice). A fixed pool of mutexes is indexed by key
//! hash: every operation on the same record takes the same mutex, while
//! operations on different records almost always proceed in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sharded mutex pool keyed by record id bytes.
pub(crate) struct ShardedLocks {
    shards: Vec<Mutex<()>>,
}

impl ShardedLocks {
    /// Create a pool with `shards` mutexes.
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the shard owning `key`. The guard serializes every operation on
    /// the same key until dropped.
    pub(crate) fn lock(&self, key: &[u8]) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        hasher.write(key);
        #[allow(clippy::cast_possible_truncation)]
        let idx = (hasher.finish() % self.shards.len() as u64) as usize;
        // A poisoned shard only means another thread panicked while holding
        // it; the protected data lives in RocksDB, not the mutex.
        self.shards[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
