//! RESP (Redis Serialization Protocol) Frames
//!
//! This module defines the frame types used on the wire and their encoding.
//! RESP is a simple, binary-safe protocol; every frame starts with a type
//! prefix byte and is terminated with CRLF (`\r\n`).
//!
//! ## Frame Formats
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n` (null: `$-1\r\n`)
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n` (null: `*-1\r\n`, empty: `*0\r\n`)
//!
//! Bulk strings and arrays are nullable; the null forms are distinct from
//! the empty forms. All length fields count bytes, not characters.

use bytes::Bytes;

/// The CRLF terminator used by every RESP frame.
pub const CRLF: &[u8] = b"\r\n";

/// RESP type prefix bytes.
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP frame, used for both decoded input and encoded replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-binary-safe text; must not contain CR or LF.
    Simple(String),
    /// An error condition, rendered as `-<message>\r\n`.
    Error(String),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A length-prefixed byte string; `None` is the null bulk string.
    Bulk(Option<Bytes>),
    /// A sequence of frames; `None` is the null array.
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Creates a simple string frame.
    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    /// Creates an error frame.
    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    /// Creates an integer frame.
    pub fn integer(n: i64) -> Self {
        Frame::Integer(n)
    }

    /// Creates a bulk string frame.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// Creates the null bulk string frame (`$-1\r\n`).
    pub fn null_bulk() -> Self {
        Frame::Bulk(None)
    }

    /// Creates an array frame.
    pub fn array(frames: Vec<Frame>) -> Self {
        Frame::Array(Some(frames))
    }

    /// Creates the null array frame (`*-1\r\n`).
    pub fn null_array() -> Self {
        Frame::Array(None)
    }

    /// The `+OK\r\n` reply.
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    /// The `+PONG\r\n` reply.
    pub fn pong() -> Self {
        Frame::Simple("PONG".to_string())
    }

    /// Encodes the frame into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encodes the frame into an existing buffer.
    ///
    /// Replies are always written whole per command, so callers can batch
    /// several frames into one buffer before flushing.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(Some(data)) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(None) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Frame::Array(Some(frames)) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(frames.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for frame in frames {
                    frame.encode_into(buf);
                }
            }
            Frame::Array(None) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true if this frame is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Attempts to view this frame as raw bytes (bulk strings only).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Frame::Bulk(Some(b)) => Some(b),
            _ => None,
        }
    }
}
