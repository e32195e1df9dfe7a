//! Command Registry
//!
//! Commands are uniform: a name plus an `execute(args) -> Result<Frame>`
//! capability. The registry indexes handlers by uppercase name and is safe
//! for concurrent lookup from every session task.

use crate::error::Error;
use crate::protocol::Frame;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A single command implementation.
///
/// Handlers validate their own arity and argument shapes and report
/// failures through the kind-tagged [`Error`]; only command-kind errors
/// reach the client verbatim.
pub trait Command: Send + Sync {
    /// The command name, uppercase.
    fn name(&self) -> &'static str;

    /// Executes the command against its arguments.
    fn execute(&self, args: &[Bytes]) -> Result<Frame, Error>;
}

/// A thread-safe name-indexed table of command handlers.
///
/// Lookup is case-insensitive: names are uppercased at both registration
/// and execution time.
#[derive(Default)]
pub struct Registry {
    commands: RwLock<HashMap<String, Arc<dyn Command>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command handler.
    ///
    /// Registering a name twice is an error; the first registration stands.
    pub fn register(&self, command: Arc<dyn Command>) -> Result<(), Error> {
        let name = command.name().to_uppercase();
        let mut commands = self.commands.write().unwrap();

        if commands.contains_key(&name) {
            return Err(Error::command("command already registered"));
        }

        debug!(command = %name, "registered command");
        commands.insert(name, command);
        Ok(())
    }

    /// Looks up and executes a command by name.
    ///
    /// A missing handler is a command error carrying the client-facing
    /// `unknown command '<name>'` message.
    pub fn execute(&self, name: &str, args: &[Bytes]) -> Result<Frame, Error> {
        let command = {
            let commands = self.commands.read().unwrap();
            commands.get(&name.to_uppercase()).cloned()
        };

        match command {
            Some(command) => command.execute(args),
            None => Err(Error::command(format!("unknown command '{}'", name))),
        }
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().unwrap().len()
    }

    /// Returns true if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.read().unwrap().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReply {
        name: &'static str,
        reply: &'static str,
    }

    impl Command for FixedReply {
        fn name(&self) -> &'static str {
            self.name
        }

        fn execute(&self, _args: &[Bytes]) -> Result<Frame, Error> {
            Ok(Frame::simple(self.reply))
        }
    }

    #[test]
    fn test_register_and_execute() {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedReply {
                name: "TEST",
                reply: "done",
            }))
            .unwrap();

        let reply = registry.execute("TEST", &[]).unwrap();
        assert_eq!(reply, Frame::simple("done"));
    }

    #[test]
    fn test_execute_is_case_insensitive() {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedReply {
                name: "TEST",
                reply: "done",
            }))
            .unwrap();

        assert!(registry.execute("test", &[]).is_ok());
        assert!(registry.execute("TeSt", &[]).is_ok());
    }

    #[test]
    fn test_duplicate_registration_fails_first_stands() {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedReply {
                name: "TEST",
                reply: "first",
            }))
            .unwrap();

        let err = registry
            .register(Arc::new(FixedReply {
                name: "TEST",
                reply: "second",
            }))
            .unwrap_err();
        assert!(err.is_command());

        let reply = registry.execute("TEST", &[]).unwrap();
        assert_eq!(reply, Frame::simple("first"));
    }

    #[test]
    fn test_unknown_command() {
        let registry = Registry::new();
        let err = registry.execute("NOPE", &[]).unwrap_err();
        assert!(err.is_command());
        assert_eq!(err.to_string(), "unknown command 'NOPE'");
    }
}
