//! Expiry Index and Background Sweeper
//!
//! Keys with a TTL are tracked in a min-heap ordered by absolute expiry
//! time, separate from the shard locks. The heap is advisory: the shard
//! entry is the single source of truth for a key's expiry, and heap
//! entries go stale whenever a key is deleted or re-set. Staleness is
//! resolved when an entry is popped, never eagerly, which keeps `SET`
//! overwrites O(log N) instead of paying a delete-by-key on every write.
//!
//! The [`ExpirySweeper`] is the eager half of expiry: a background task
//! draining the heap on a fixed cadence so that keys nobody reads again
//! still get reclaimed. The store stays correct without it because reads
//! enforce lazy expiry.

use crate::storage::StorageEngine;
use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

/// One scheduled reclamation: a key and the expiry time it was set with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryEntry {
    /// The key to reclaim.
    pub key: Bytes,
    /// Absolute expiry instant recorded when the entry was pushed.
    pub expires_at: Instant,
}

// BinaryHeap is a max-heap; the ordering is reversed so the earliest
// expiry surfaces first. Ties break on the key to stay consistent with Eq.
impl Ord for ExpiryEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expires_at
            .cmp(&self.expires_at)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for ExpiryEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A mutex-guarded min-heap of `(key, expires_at)` entries.
///
/// Duplicate and obsoleted entries are tolerated; callers re-check the
/// authoritative shard state before acting on a popped entry.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    heap: Mutex<BinaryHeap<ExpiryEntry>>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a key for reclamation at `expires_at`.
    pub fn push(&self, key: Bytes, expires_at: Instant) {
        let mut heap = self.heap.lock().unwrap();
        heap.push(ExpiryEntry { key, expires_at });
    }

    /// Removes and returns the entry with the earliest expiry.
    pub fn pop_earliest(&self) -> Option<ExpiryEntry> {
        let mut heap = self.heap.lock().unwrap();
        heap.pop()
    }

    /// Returns a copy of the entry with the earliest expiry.
    pub fn peek_earliest(&self) -> Option<ExpiryEntry> {
        let heap = self.heap.lock().unwrap();
        heap.peek().cloned()
    }

    /// Pops the earliest entry only if it is due at `now`.
    ///
    /// The check and the pop happen under one lock acquisition, so two
    /// concurrent reclaimers can never pop an entry that is still in the
    /// future.
    pub fn pop_due(&self, now: Instant) -> Option<ExpiryEntry> {
        let mut heap = self.heap.lock().unwrap();
        if heap.peek().is_some_and(|entry| entry.expires_at <= now) {
            heap.pop()
        } else {
            None
        }
    }

    /// Returns the number of scheduled entries, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    /// Returns true if no entries are scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.lock().unwrap().is_empty()
    }
}

/// Default interval between eager expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// A handle to the running background sweeper.
///
/// Dropping the handle stops the sweeper task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the sweeper as a background task calling
    /// [`StorageEngine::flush_expired`] every `interval`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = Arc::new(StorageEngine::new());
    /// let _sweeper = ExpirySweeper::start(Arc::clone(&engine), DEFAULT_SWEEP_INTERVAL);
    /// // Sweeper stops when the handle is dropped.
    /// ```
    pub fn start(engine: Arc<StorageEngine>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(engine, interval, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper task.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let reclaimed = engine.flush_expired();
        if reclaimed > 0 {
            debug!(reclaimed, keys_remaining = engine.len(), "reclaimed expired keys");
        }
    }
}
