//! RESP Protocol Implementation
//!
//! This module implements the Redis Serialization Protocol: the frame
//! model with its encoder ([`types`]) and the incremental parser with
//! request extraction ([`parser`]).
//!
//! ## Overview
//!
//! Requests arrive either as RESP arrays of bulk strings (the normal
//! form) or as inline whitespace-separated lines (the telnet-friendly
//! fallback). Replies are always framed RESP.
//!
//! ## Example
//!
//! ```
//! use flintkv::protocol::{Frame, FrameParser};
//! use bytes::Bytes;
//!
//! // Decoding an incoming request
//! let mut parser = FrameParser::new();
//! let (request, _consumed) = parser
//!     .parse_request(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(request.name, "GET");
//!
//! // Encoding a reply
//! let reply = Frame::bulk(Bytes::from("value"));
//! assert_eq!(reply.encode(), b"$5\r\nvalue\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{FrameParser, ParseError, ParseResult, Request, MAX_BULK_SIZE};
pub use types::Frame;
