//! Client Connection Handling
//!
//! Every accepted TCP connection runs as an independent [`Session`] task:
//! a serial decode → execute → reply loop over a resumable read buffer.
//! Sessions share the command registry and watch the server's shutdown
//! channel so a draining server can stop them between requests.

pub mod handler;

pub use handler::{Session, SessionError};
