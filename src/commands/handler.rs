//! Command Handlers
//!
//! One handler struct per command, each implementing the [`Command`]
//! capability. Handlers own their dependencies explicitly - the storage
//! engine for `GET`/`SET`, the config store for `CONFIG` - rather than
//! reaching for process-wide state.
//!
//! ## Command Surface
//!
//! - `PING` - reply `+PONG`; arguments are ignored
//! - `ECHO message` - reply the message as a bulk string
//! - `SET key value [EX seconds | PX milliseconds]` - reply `+OK`
//! - `GET key` - reply the value as a bulk string, or a null bulk string
//!   for a missing or expired key
//! - `CONFIG GET pattern` / `CONFIG SET key value` - glob query or single
//!   write against the config store
//!
//! Arity and syntax failures are command-kind errors; the session loop
//! renders them as `-ERR <message>` without dropping the connection.

use crate::commands::registry::{Command, Registry};
use crate::config::ConfigStore;
use crate::error::Error;
use crate::protocol::Frame;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Registers the default command set against the given stores.
pub fn register_default_commands(
    registry: &Registry,
    storage: Arc<StorageEngine>,
    config: Arc<ConfigStore>,
) -> Result<(), Error> {
    registry.register(Arc::new(Ping))?;
    registry.register(Arc::new(Echo))?;
    registry.register(Arc::new(Set::new(Arc::clone(&storage))))?;
    registry.register(Arc::new(Get::new(storage)))?;
    registry.register(Arc::new(Config::new(config)))?;
    Ok(())
}

/// The PING command.
pub struct Ping;

impl Command for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    // Always PONG; any arguments are ignored.
    fn execute(&self, _args: &[Bytes]) -> Result<Frame, Error> {
        Ok(Frame::pong())
    }
}

/// The ECHO command.
pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "ECHO"
    }

    fn execute(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.len() != 1 {
            return Err(Error::command(
                "wrong number of arguments for 'echo' command",
            ));
        }
        Ok(Frame::bulk(args[0].clone()))
    }
}

/// The GET command.
pub struct Get {
    storage: Arc<StorageEngine>,
}

impl Get {
    /// Creates a GET handler over the given engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }
}

impl Command for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn execute(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.len() != 1 {
            return Err(Error::command(
                "wrong number of arguments for 'get' command",
            ));
        }

        // A missing or expired key is a null bulk string, not a client error.
        match self.storage.get(&args[0]) {
            Ok(payload) => Ok(Frame::bulk(payload)),
            Err(_) => Ok(Frame::null_bulk()),
        }
    }
}

/// The SET command.
pub struct Set {
    storage: Arc<StorageEngine>,
}

impl Set {
    /// Creates a SET handler over the given engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }
}

impl Command for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn execute(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.len() < 2 {
            return Err(Error::command(
                "wrong number of arguments for 'set' command",
            ));
        }

        let ttl = parse_expiry(&args[2..])?;
        self.storage.set(args[0].clone(), args[1].clone(), ttl);
        Ok(Frame::ok())
    }
}

/// Parses the optional `EX seconds` / `PX milliseconds` tail of SET.
///
/// A non-positive time value parses successfully and yields no expiry
/// (the key is stored as persistent). Fewer than two trailing arguments
/// also yield no expiry.
fn parse_expiry(args: &[Bytes]) -> Result<Option<Duration>, Error> {
    if args.len() < 2 {
        return Ok(None);
    }

    let value: i64 = std::str::from_utf8(&args[1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::command("invalid expire time in 'set' command"))?;

    let option = std::str::from_utf8(&args[0])
        .map(|s| s.to_uppercase())
        .unwrap_or_default();

    let millis = match option.as_str() {
        "EX" => value.saturating_mul(1000),
        "PX" => value,
        _ => {
            return Err(Error::command(
                "syntax error: invalid expire option, must be EX or PX",
            ));
        }
    };

    if millis > 0 {
        Ok(Some(Duration::from_millis(millis as u64)))
    } else {
        Ok(None)
    }
}

/// The CONFIG command with its GET and SET subcommands.
pub struct Config {
    config: Arc<ConfigStore>,
}

impl Config {
    /// Creates a CONFIG handler over the given store.
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }

    fn get(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.len() != 2 {
            return Err(Error::command(
                "wrong number of arguments for 'config get' command",
            ));
        }

        let pattern = String::from_utf8_lossy(&args[1]);
        let matches = self.config.get(&pattern);

        let mut frames = Vec::with_capacity(matches.len() * 2);
        for (name, value) in matches {
            frames.push(Frame::bulk(Bytes::from(name)));
            frames.push(Frame::bulk(Bytes::from(value)));
        }
        Ok(Frame::array(frames))
    }

    fn set(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.len() != 3 {
            return Err(Error::command(
                "wrong number of arguments for 'config set' command",
            ));
        }

        let name = String::from_utf8_lossy(&args[1]).into_owned();
        let value = String::from_utf8_lossy(&args[2]).into_owned();
        self.config.set(name, value);
        Ok(Frame::ok())
    }
}

impl Command for Config {
    fn name(&self) -> &'static str {
        "CONFIG"
    }

    fn execute(&self, args: &[Bytes]) -> Result<Frame, Error> {
        if args.is_empty() {
            return Err(Error::command(
                "wrong number of arguments for 'config' command",
            ));
        }

        match &args[0][..] {
            b"GET" => self.get(args),
            b"SET" => self.set(args),
            other => Err(Error::command(format!(
                "unknown subcommand 'config {}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn arg(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn set_get_pair() -> (Set, Get) {
        let storage = Arc::new(StorageEngine::new());
        (Set::new(Arc::clone(&storage)), Get::new(storage))
    }

    #[test]
    fn test_ping() {
        assert_eq!(Ping.execute(&[]).unwrap(), Frame::pong());
    }

    #[test]
    fn test_ping_ignores_arguments() {
        assert_eq!(Ping.execute(&[arg("hello")]).unwrap(), Frame::pong());
    }

    #[test]
    fn test_echo() {
        let reply = Echo.execute(&[arg("hello")]).unwrap();
        assert_eq!(reply, Frame::bulk(Bytes::from("hello")));
    }

    #[test]
    fn test_echo_arity() {
        let err = Echo.execute(&[]).unwrap_err();
        assert!(err.is_command());
        assert_eq!(err.to_string(), "wrong number of arguments for 'echo' command");

        assert!(Echo.execute(&[arg("a"), arg("b")]).is_err());
    }

    #[test]
    fn test_set_then_get() {
        let (set, get) = set_get_pair();

        assert_eq!(set.execute(&[arg("foo"), arg("bar")]).unwrap(), Frame::ok());
        assert_eq!(
            get.execute(&[arg("foo")]).unwrap(),
            Frame::bulk(Bytes::from("bar"))
        );
    }

    #[test]
    fn test_get_missing_is_null_bulk() {
        let (_, get) = set_get_pair();
        assert_eq!(get.execute(&[arg("missing")]).unwrap(), Frame::null_bulk());
    }

    #[test]
    fn test_get_arity() {
        let (_, get) = set_get_pair();
        assert!(get.execute(&[]).unwrap_err().is_command());
        assert!(get.execute(&[arg("a"), arg("b")]).unwrap_err().is_command());
    }

    #[test]
    fn test_set_arity() {
        let (set, _) = set_get_pair();
        let err = set.execute(&[arg("key")]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of arguments for 'set' command");
    }

    #[test]
    fn test_set_with_px_expires() {
        let (set, get) = set_get_pair();

        set.execute(&[arg("k"), arg("v"), arg("PX"), arg("30")])
            .unwrap();
        assert_eq!(get.execute(&[arg("k")]).unwrap(), Frame::bulk(Bytes::from("v")));

        thread::sleep(Duration::from_millis(80));
        assert_eq!(get.execute(&[arg("k")]).unwrap(), Frame::null_bulk());
    }

    #[test]
    fn test_set_expiry_option_is_case_insensitive() {
        let (set, _) = set_get_pair();
        assert!(set
            .execute(&[arg("k"), arg("v"), arg("px"), arg("100")])
            .is_ok());
        assert!(set
            .execute(&[arg("k"), arg("v"), arg("ex"), arg("10")])
            .is_ok());
    }

    #[test]
    fn test_set_invalid_expire_option() {
        let (set, _) = set_get_pair();
        let err = set
            .execute(&[arg("k"), arg("v"), arg("QQ"), arg("10")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: invalid expire option, must be EX or PX"
        );
    }

    #[test]
    fn test_set_invalid_expire_time() {
        let (set, _) = set_get_pair();
        let err = set
            .execute(&[arg("k"), arg("v"), arg("EX"), arg("notanumber")])
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid expire time in 'set' command");
    }

    #[test]
    fn test_set_negative_expiry_stores_without_expiry() {
        let (set, get) = set_get_pair();

        set.execute(&[arg("k"), arg("v"), arg("PX"), arg("-100")])
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(get.execute(&[arg("k")]).unwrap(), Frame::bulk(Bytes::from("v")));
    }

    #[test]
    fn test_config_set_and_get() {
        let config = Config::new(Arc::new(ConfigStore::new()));

        assert_eq!(
            config
                .execute(&[arg("SET"), arg("maxmemory"), arg("100mb")])
                .unwrap(),
            Frame::ok()
        );

        let reply = config.execute(&[arg("GET"), arg("maxmemory")]).unwrap();
        assert_eq!(
            reply,
            Frame::array(vec![
                Frame::bulk(Bytes::from("maxmemory")),
                Frame::bulk(Bytes::from("100mb")),
            ])
        );
    }

    #[test]
    fn test_config_get_no_match_is_empty_array() {
        let config = Config::new(Arc::new(ConfigStore::new()));
        let reply = config.execute(&[arg("GET"), arg("nothing*")]).unwrap();
        assert_eq!(reply, Frame::array(vec![]));
    }

    #[test]
    fn test_config_get_glob_returns_pairs() {
        let store = Arc::new(ConfigStore::new());
        store.set("a", "1");
        store.set("ab", "2");
        store.set("c", "3");
        let config = Config::new(store);

        let reply = config.execute(&[arg("GET"), arg("a*")]).unwrap();
        let frames = match reply {
            Frame::Array(Some(frames)) => frames,
            other => panic!("expected array, got {:?}", other),
        };
        assert_eq!(frames.len(), 4);

        // Pair ordering is unspecified; compare as a set.
        let pairs: std::collections::HashMap<_, _> = frames
            .chunks(2)
            .map(|pair| {
                (
                    pair[0].as_bytes().unwrap().to_vec(),
                    pair[1].as_bytes().unwrap().to_vec(),
                )
            })
            .collect();
        assert_eq!(pairs[&b"a"[..].to_vec()], b"1");
        assert_eq!(pairs[&b"ab"[..].to_vec()], b"2");
    }

    #[test]
    fn test_config_unknown_subcommand() {
        let config = Config::new(Arc::new(ConfigStore::new()));
        let err = config.execute(&[arg("RESETSTAT")]).unwrap_err();
        assert_eq!(err.to_string(), "unknown subcommand 'config RESETSTAT'");
    }

    #[test]
    fn test_config_arity() {
        let config = Config::new(Arc::new(ConfigStore::new()));

        assert_eq!(
            config.execute(&[]).unwrap_err().to_string(),
            "wrong number of arguments for 'config' command"
        );
        assert_eq!(
            config.execute(&[arg("GET")]).unwrap_err().to_string(),
            "wrong number of arguments for 'config get' command"
        );
        assert_eq!(
            config
                .execute(&[arg("SET"), arg("key")])
                .unwrap_err()
                .to_string(),
            "wrong number of arguments for 'config set' command"
        );
    }

    #[test]
    fn test_register_default_commands() {
        let registry = Registry::new();
        register_default_commands(
            &registry,
            Arc::new(StorageEngine::new()),
            Arc::new(ConfigStore::new()),
        )
        .unwrap();

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.execute("PING", &[]).unwrap(), Frame::pong());
    }
}
