//! Storage Engine with TTL Support
//!
//! The engine composes the lock-striped map with the expiry index:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    StorageEngine                     │
//! │                                                      │
//! │  ┌────────────────────────────┐   ┌───────────────┐  │
//! │  │   ShardedMap<key, record>  │   │  ExpiryIndex  │  │
//! │  │  ┌──────┐┌──────┐┌──────┐  │   │   (min-heap)  │  │
//! │  │  │Shard ││Shard ││ ...  │  │   │               │  │
//! │  │  │RwLock││RwLock││      │  │   │     Mutex     │  │
//! │  │  └──────┘└──────┘└──────┘  │   └───────────────┘  │
//! │  └────────────────────────────┘                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The shard entry owns the payload and the authoritative `expires_at`;
//! the heap holds advisory copies for scheduling reclamation. Expired keys
//! are removed in two ways:
//!
//! 1. **Lazy**: a read of an expired key deletes it before reporting the
//!    key absent.
//! 2. **Eager**: [`StorageEngine::flush_expired`] drains due heap entries,
//!    re-checking the shard record against the popped entry so stale heap
//!    entries (key deleted, re-set later, or re-set without expiry) never
//!    delete live data.

use crate::error::Error;
use crate::storage::expiry::ExpiryIndex;
use crate::storage::sharded_map::ShardedMap;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::trace;

/// A stored value with its optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRecord {
    /// The payload bytes.
    pub payload: Bytes,
    /// When this record expires; `None` means it never does.
    pub expires_at: Option<Instant>,
}

impl ValueRecord {
    /// Creates a record without expiry.
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            expires_at: None,
        }
    }

    /// Creates a record expiring at `expires_at`.
    pub fn with_expiry(payload: Bytes, expires_at: Instant) -> Self {
        Self {
            payload,
            expires_at: Some(expires_at),
        }
    }

    /// Returns true if the record is expired as of `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// The in-memory key-value store shared by every session.
///
/// Designed to be wrapped in an `Arc` and handed to each connection task;
/// all operations take `&self`.
///
/// # Example
///
/// ```
/// use flintkv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("flint"), None);
/// assert_eq!(engine.get(&Bytes::from("name")).unwrap(), Bytes::from("flint"));
///
/// engine.set(
///     Bytes::from("session"),
///     Bytes::from("token"),
///     Some(Duration::from_secs(60)),
/// );
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    data: ShardedMap<Bytes, ValueRecord>,
    expiry: ExpiryIndex,
}

impl StorageEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            data: ShardedMap::new(),
            expiry: ExpiryIndex::new(),
        }
    }

    /// Stores a value, replacing any previous record for the key.
    ///
    /// A positive `ttl` schedules the key for reclamation at `now + ttl`;
    /// a `None` or zero `ttl` stores the key without expiry. The heap push
    /// and the shard write are not atomic with respect to each other - a
    /// concurrent `flush_expired` may see the heap entry before the record
    /// lands, and then no-ops on the shard re-check.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        let record = match ttl {
            Some(ttl) if !ttl.is_zero() => {
                let expires_at = Instant::now() + ttl;
                self.expiry.push(key.clone(), expires_at);
                ValueRecord::with_expiry(value, expires_at)
            }
            _ => ValueRecord::new(value),
        };

        self.data.set(key, record);
    }

    /// Retrieves the value for a key.
    ///
    /// A missing key is a first-class outcome reported as a storage-kind
    /// "key not found" error. A key whose expiry is in the past behaves as
    /// absent and is removed before returning (lazy expiry).
    pub fn get(&self, key: &Bytes) -> Result<Bytes, Error> {
        let record = match self.data.get(key) {
            Some(record) => record,
            None => return Err(Error::storage("key not found")),
        };

        if record.is_expired(Instant::now()) {
            // Best-effort removal; a concurrent re-set may race this delete.
            self.data.delete(key);
            trace!(key = ?key, "lazily expired key on read");
            return Err(Error::storage("key not found"));
        }

        Ok(record.payload)
    }

    /// Removes a key if present.
    pub fn delete(&self, key: &Bytes) {
        self.data.delete(key);
    }

    /// Drains every due entry from the expiry heap, reclaiming shard
    /// records that are still expired.
    ///
    /// A popped entry only deletes the shard record when the record exists
    /// and its own `expires_at` is at or before the popped one - a record
    /// re-set with a later expiry, or with none, is left alone. Stops at
    /// the first entry still in the future.
    ///
    /// Returns the number of records reclaimed. Idempotent when nothing is
    /// due.
    pub fn flush_expired(&self) -> usize {
        let now = Instant::now();
        let mut reclaimed = 0;

        while let Some(entry) = self.expiry.pop_due(now) {
            if let Some(record) = self.data.get(&entry.key) {
                match record.expires_at {
                    Some(at) if at <= entry.expires_at => {
                        self.data.delete(&entry.key);
                        reclaimed += 1;
                    }
                    // Stale heap entry: the key was re-set with a later
                    // expiry or without one.
                    _ => {}
                }
            }
        }

        reclaimed
    }

    /// Returns the number of records currently stored, expired-but-not-yet-
    /// reclaimed ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of entries queued in the expiry heap, stale ones included.
    #[cfg(test)]
    pub(crate) fn expiry_backlog(&self) -> usize {
        self.expiry.len()
    }
}
