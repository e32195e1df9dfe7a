//! TCP Server Module
//!
//! The outermost layer of flintkv: the listener accepting connections,
//! the per-connection task fan-out, and the coordinated shutdown that
//! drains in-flight sessions before the process exits.
//!
//! ```text
//! ┌──────────────┐  accept   ┌─────────────┐
//! │   Server     │──────────>│  Session    │ × N tasks
//! │  (listener)  │           │  (per conn) │
//! └──────┬───────┘           └──────▲──────┘
//!        │    watch channel         │
//!        └──────── shutdown ────────┘
//! ```

pub mod listener;

pub use listener::{Server, ShutdownHandle, DRAIN_DEADLINE};
