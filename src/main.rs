//! flintkv server entry point: parses the command line, wires the
//! storage engine, config store, and command registry together, and runs
//! the TCP server until a shutdown signal.

use flintkv::commands::{register_default_commands, Registry};
use flintkv::config::ConfigStore;
use flintkv::storage::{ExpirySweeper, StorageEngine, DEFAULT_SWEEP_INTERVAL, SHARD_COUNT};
use flintkv::Server;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration.
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Interval between eager expiry sweeps
    sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: flintkv::DEFAULT_HOST.to_string(),
            port: flintkv::DEFAULT_PORT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Parses configuration from command-line arguments.
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = take_value(&args, i, "--host");
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = take_value(&args, i, "--port").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(2);
                    });
                    i += 2;
                }
                "--sweep-interval" => {
                    let millis: u64 =
                        take_value(&args, i, "--sweep-interval")
                            .parse()
                            .unwrap_or_else(|_| {
                                eprintln!("Error: invalid sweep interval");
                                std::process::exit(2);
                            });
                    config.sweep_interval = Duration::from_millis(millis);
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flintkv version {}", flintkv::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    print_help();
                    std::process::exit(2);
                }
            }
        }

        config
    }
}

/// Returns the value following a flag, exiting if it is missing.
fn take_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(2);
        }
    }
}

fn print_help() {
    println!(
        r#"
flintkv - A Redis-Compatible In-Memory Key-Value Server

USAGE:
    flintkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>            Port to listen on (default: 6379)
        --sweep-interval <MS>    Expiry sweep interval in milliseconds (default: 100)
    -v, --version                Print version information
        --help                   Print this help message

CONNECTING:
    Use redis-cli or any Redis client:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET greeting hello EX 60
    OK
    127.0.0.1:6379> GET greeting
    "hello"
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // The stores are constructed here, once, and threaded into the
    // handlers that need them.
    let storage = Arc::new(StorageEngine::new());
    let config_store = Arc::new(ConfigStore::new());
    info!(shards = SHARD_COUNT, "storage engine initialized");

    let registry = Arc::new(Registry::new());
    register_default_commands(&registry, Arc::clone(&storage), config_store)?;

    let _sweeper = ExpirySweeper::start(Arc::clone(&storage), config.sweep_interval);

    let server = Server::bind(&config.host, config.port, registry).await?;
    info!(host = %config.host, port = config.port, "listening for connections");

    server.run().await?;

    info!("server exited cleanly");
    Ok(())
}
