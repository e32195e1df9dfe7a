//! Kind-Tagged Application Errors
//!
//! Every fallible operation in flintkv reports failures through a single
//! [`Error`] type carrying an [`ErrorKind`]. The kind decides how the error
//! surfaces to a client:
//!
//! - [`ErrorKind::Command`] - malformed arguments, unknown commands. Sent to
//!   the client verbatim as `-ERR <message>\r\n`; the session continues.
//! - [`ErrorKind::Storage`] - storage-level outcomes such as "key not found".
//!   Handlers reshape these into protocol replies (a missing key becomes a
//!   null bulk string, not a client-visible error).
//! - [`ErrorKind::Server`] - listener bind failures and socket I/O faults.
//!   A bind failure aborts startup; session I/O faults end that session.
//! - [`ErrorKind::Protocol`] - malformed RESP frames. The session is dropped.
//!
//! Errors optionally wrap a cause, preserved through `source()` so logs can
//! show the full chain while the wire message stays stable.

use std::error::Error as StdError;
use std::fmt;

/// Classifies an [`Error`] for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client-facing command errors (bad arity, unknown command, bad expiry).
    Command,
    /// Storage-level outcomes, currently only "key not found".
    Storage,
    /// Listener and socket failures.
    Server,
    /// Malformed RESP input.
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Command => write!(f, "command"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::Protocol => write!(f, "protocol"),
        }
    }
}

/// A kind-tagged error with an optional cause chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Wraps an existing error with additional context.
    pub fn wrap(
        kind: ErrorKind,
        message: impl Into<String>,
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Creates a command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Command, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the bare message, without the cause chain.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this is a command error.
    pub fn is_command(&self) -> bool {
        self.kind == ErrorKind::Command
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        self.kind == ErrorKind::Storage
    }

    /// Returns true if this is a server error.
    pub fn is_server(&self) -> bool {
        self.kind == ErrorKind::Server
    }

    /// Returns true if this is a protocol error.
    pub fn is_protocol(&self) -> bool {
        self.kind == ErrorKind::Protocol
    }
}

impl fmt::Display for Error {
    // Display carries only the message; the cause is reachable via source().
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn StdError + 'static))
    }
}
