//! Storage Engine Module
//!
//! The storage layer of flintkv: a lock-striped concurrent map
//! ([`sharded_map`]), a min-heap expiry index with its background sweeper
//! ([`expiry`]), and the engine composing the two ([`engine`]).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               StorageEngine                 │
//! │   ShardedMap (32 × RwLock<HashMap>)         │
//! │   ExpiryIndex (Mutex<BinaryHeap>)           │
//! └─────────────────────────────────────────────┘
//!                       ▲
//!                       │ flush_expired()
//!          ┌────────────┴────────────┐
//!          │      ExpirySweeper      │
//!          │  (background tokio task)│
//!          └─────────────────────────┘
//! ```
//!
//! Expired keys are reclaimed lazily on read and eagerly by the sweeper;
//! the heap never blocks shard traffic and shard locks are never held
//! while touching the heap.

pub mod engine;
pub mod expiry;
pub mod sharded_map;

pub use engine::{StorageEngine, ValueRecord};
pub use expiry::{ExpiryEntry, ExpiryIndex, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
pub use sharded_map::{ShardedMap, SHARD_COUNT};
