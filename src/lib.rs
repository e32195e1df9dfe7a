//! # flintkv - A Redis-Compatible In-Memory Key-Value Server
//!
//! flintkv speaks the RESP wire protocol and stores string values with
//! optional per-key time-to-live. Clients hold long-lived TCP sessions
//! and issue a stream of commands; each session is served by its own
//! async task over a shared storage engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            flintkv                             │
//! │                                                                │
//! │  ┌───────────┐    ┌───────────┐    ┌──────────┐                │
//! │  │  Server   │───>│  Session  │───>│ Registry │                │
//! │  │ (listener)│    │ (per conn)│    │ + handlers                │
//! │  └───────────┘    └─────┬─────┘    └────┬─────┘                │
//! │                         │               │                      │
//! │                   ┌─────▼─────┐   ┌─────▼──────────────────┐   │
//! │                   │   RESP    │   │     StorageEngine      │   │
//! │                   │  parser / │   │  32 × RwLock shards    │   │
//! │                   │  encoder  │   │  + expiry min-heap     │   │
//! │                   └───────────┘   └─────▲──────────────────┘   │
//! │                                         │                      │
//! │                            ┌────────────┴───────────┐          │
//! │                            │     ExpirySweeper      │          │
//! │                            │ (background tokio task)│          │
//! │                            └────────────────────────┘          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [EX seconds | PX milliseconds]`
//! - `GET key`
//! - `CONFIG GET pattern` / `CONFIG SET key value`
//!
//! Commands are case-insensitive; both framed RESP arrays and inline
//! (telnet-style) requests are accepted.
//!
//! ## Design Highlights
//!
//! ### Sharded storage
//!
//! The engine stripes keys over 32 independently locked shards, so
//! sessions touching different keys proceed without blocking each other.
//!
//! ### Lazy + eager expiry
//!
//! A key with a TTL is removed either when a read finds it expired or
//! when the background sweeper drains the expiry heap. Heap entries are
//! advisory - overwrites never prune the heap, and reclamation re-checks
//! the live record before deleting anything.
//!
//! ### Graceful shutdown
//!
//! SIGINT/SIGTERM stop the acceptor, signal every session through a
//! watch channel, and drain in-flight work within a five second deadline.

pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{register_default_commands, Command, Registry};
pub use config::ConfigStore;
pub use connection::{Session, SessionError};
pub use error::{Error, ErrorKind};
pub use protocol::{Frame, FrameParser, ParseError, Request};
pub use server::{Server, ShutdownHandle};
pub use storage::{ExpirySweeper, StorageEngine};

/// The default port flintkv listens on (same as Redis).
pub const DEFAULT_PORT: u16 = 6379;

/// The default host flintkv binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of flintkv.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
