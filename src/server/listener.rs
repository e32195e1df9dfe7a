//! TCP Server and Graceful Shutdown
//!
//! The server owns the listener and the shutdown channel. Each accepted
//! connection becomes a [`Session`] task tracked two ways: a `JoinSet`
//! acting as the wait-group, and a set of live peer addresses for
//! shutdown accounting.
//!
//! ## Shutdown Sequence
//!
//! 1. A signal (SIGINT/SIGTERM, or a [`ShutdownHandle`]) flips the shared
//!    watch channel; sessions finish the request they are on and stop.
//! 2. The accept loop exits and the listener is dropped, so new
//!    connections are refused.
//! 3. The server waits for in-flight sessions to drain, bounded by
//!    [`DRAIN_DEADLINE`]. On expiry the remaining sessions are logged and
//!    dropped with the process.

use crate::commands::Registry;
use crate::connection::Session;
use crate::error::{Error, ErrorKind};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How long shutdown waits for in-flight sessions to finish.
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Triggers a graceful shutdown of the [`Server`] that produced it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Signals every session loop and the acceptor to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// The TCP front-end: listener, session tracking, shutdown coordination.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Binds the listener.
    ///
    /// A bind failure is a server-kind error; callers abort startup with a
    /// non-zero exit.
    pub async fn bind(host: &str, port: u16, registry: Arc<Registry>) -> Result<Server, Error> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            Error::wrap(
                ErrorKind::Server,
                format!("failed to bind to {}:{}", host, port),
                e,
            )
        })?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Server {
            listener,
            registry,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener
            .local_addr()
            .map_err(|e| Error::wrap(ErrorKind::Server, "failed to read listener address", e))
    }

    /// Returns a handle that triggers graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Runs the server until an OS signal arrives, then drains.
    pub async fn run(self) -> Result<(), Error> {
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("shutdown signal received, stopping server");
            handle.shutdown();
        });

        self.serve().await
    }

    /// Accepts connections until the shutdown channel fires, then drains
    /// in-flight sessions within [`DRAIN_DEADLINE`].
    pub async fn serve(self) -> Result<(), Error> {
        let Server {
            listener,
            registry,
            shutdown_tx,
        } = self;

        let mut shutdown_rx = shutdown_tx.subscribe();
        let mut sessions: JoinSet<()> = JoinSet::new();
        let live: Arc<Mutex<HashSet<SocketAddr>>> = Arc::new(Mutex::new(HashSet::new()));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            live.lock().unwrap().insert(peer);

                            let session = Session::new(
                                stream,
                                peer,
                                Arc::clone(&registry),
                                shutdown_tx.subscribe(),
                            );
                            let live = Arc::clone(&live);
                            sessions.spawn(async move {
                                let _ = session.run().await;
                                live.lock().unwrap().remove(&peer);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }

        // New connections are refused from here on.
        drop(listener);

        let drain = async {
            while sessions.join_next().await.is_some() {}
        };
        if tokio::time::timeout(DRAIN_DEADLINE, drain).await.is_err() {
            let remaining = live.lock().unwrap().len();
            warn!(
                sessions = remaining,
                "drain deadline expired, dropping remaining sessions"
            );
        } else {
            info!("server shutdown complete");
        }

        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}
