//! Command Processing Layer
//!
//! Decoded requests flow through the [`Registry`], which maps uppercase
//! command names to [`Command`] handlers:
//!
//! ```text
//! Request (name, args)
//!        │
//!        ▼
//! ┌───────────────┐     ┌──────────────────┐
//! │   Registry    │────>│  Command handler │
//! │ (name lookup) │     │  PING / ECHO /   │
//! └───────────────┘     │  GET / SET /     │
//!                       │  CONFIG          │
//!                       └────────┬─────────┘
//!                                │
//!                     StorageEngine / ConfigStore
//! ```
//!
//! Every handler returns either a [`Frame`](crate::protocol::Frame) reply
//! or a kind-tagged error; the session loop decides what reaches the
//! client.

pub mod handler;
pub mod registry;

pub use handler::{register_default_commands, Config, Echo, Get, Ping, Set};
pub use registry::{Command, Registry};
