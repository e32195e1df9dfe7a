//! Per-Session Connection Handling
//!
//! Each accepted client runs a [`Session`] in its own task:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │            Session loop             │
//! │                                     │
//! │   read bytes ──> parse request      │
//! │        ▲              │             │
//! │        │              ▼             │
//! │   write reply <── execute command   │
//! └─────────────────────────────────────┘
//! ```
//!
//! TCP is a stream: a request may arrive in fragments, or several
//! pipelined requests in one read. Incoming bytes accumulate in a
//! `BytesMut` buffer and the parser consumes complete requests from its
//! front, so both cases fall out of the same loop. Commands within one
//! session run serially and replies are written whole, in request order.
//!
//! ## Error Policy
//!
//! - command-kind handler error - `-ERR <message>`, session continues
//! - storage/server-kind handler error - logged, client sees
//!   `-ERR internal server error`, session continues
//! - malformed RESP frame - session terminates without a reply
//! - EOF with an empty buffer - clean disconnect
//! - shutdown signal - the session stops after the request it is on

use crate::commands::Registry;
use crate::protocol::{Frame, FrameParser, ParseError, Request};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Growth cap for one session's read buffer: a full-size bulk string plus
/// framing headroom.
const MAX_BUFFER_SIZE: usize = crate::protocol::MAX_BULK_SIZE + 16 * 1024;

/// Initial read buffer capacity.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RESP input.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The peer closed the connection between requests.
    #[error("client disconnected")]
    Disconnected,

    /// The peer closed the connection mid-frame.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The read buffer outgrew its cap without a parseable request.
    #[error("read buffer limit exceeded")]
    BufferFull,
}

/// One client connection's state: socket, read buffer, parser, and the
/// shared command registry.
pub struct Session {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    parser: FrameParser,
    registry: Arc<Registry>,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    /// Creates a session over an accepted stream.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        registry: Arc<Registry>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: FrameParser::new(),
            registry,
            shutdown,
        }
    }

    /// Runs the session to completion, logging the outcome.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client session closed"),
            Err(SessionError::Disconnected) => {
                debug!(client = %self.addr, "client disconnected")
            }
            Err(SessionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "session terminated"),
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), SessionError> {
        let mut shutdown = self.shutdown.clone();

        loop {
            // Drain every complete request already buffered before touching
            // the socket again (pipelining).
            while let Some(request) = self.next_request()? {
                let reply = self.dispatch(&request);
                self.write_reply(&reply).await?;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(client = %self.addr, "session stopping for shutdown");
                    return Ok(());
                }
                result = read_into(&mut self.stream, &mut self.buffer) => {
                    let n = result?;
                    trace!(client = %self.addr, bytes = n, "read data");
                }
            }
        }
    }

    /// Attempts to parse one request from the front of the buffer.
    fn next_request(&mut self) -> Result<Option<Request>, SessionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse_request(&self.buffer) {
            Ok(Some((request, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    command = %request.name,
                    consumed,
                    remaining = self.buffer.len(),
                    "parsed request"
                );
                Ok(Some(request))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "malformed request");
                Err(SessionError::Protocol(e))
            }
        }
    }

    /// Executes a request and converts handler errors into reply frames.
    fn dispatch(&self, request: &Request) -> Frame {
        match self.registry.execute(&request.name, &request.args) {
            Ok(reply) => reply,
            Err(e) if e.is_command() => {
                debug!(client = %self.addr, command = %request.name, error = %e, "command error");
                Frame::error(format!("ERR {}", e))
            }
            Err(e) => {
                error!(client = %self.addr, command = %request.name, error = %e, "internal error");
                Frame::error("ERR internal server error")
            }
        }
    }

    async fn write_reply(&mut self, reply: &Frame) -> Result<(), SessionError> {
        let bytes = reply.encode();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        trace!(client = %self.addr, bytes = bytes.len(), "wrote reply");
        Ok(())
    }
}

/// Reads more data from the socket into the buffer.
async fn read_into(
    stream: &mut BufWriter<TcpStream>,
    buffer: &mut BytesMut,
) -> Result<usize, SessionError> {
    if buffer.len() >= MAX_BUFFER_SIZE {
        return Err(SessionError::BufferFull);
    }

    if buffer.capacity() - buffer.len() < 1024 {
        buffer.reserve(4096);
    }

    let n = stream.get_mut().read_buf(buffer).await?;
    if n == 0 {
        if buffer.is_empty() {
            return Err(SessionError::Disconnected);
        }
        return Err(SessionError::UnexpectedEof);
    }

    Ok(n)
}
