//! Incremental RESP Parser
//!
//! The parser consumes from a byte buffer fed by the socket and never
//! assumes a frame arrives in one read. Each call returns:
//!
//! - `Ok(Some((value, consumed)))` - a full frame was parsed, `consumed`
//!   bytes of the buffer are done with
//! - `Ok(None)` - the buffer holds a prefix of a frame; read more bytes
//!   and call again
//! - `Err(ParseError)` - the input violates the protocol
//!
//! The caller appends incoming network data to a buffer, calls the parser,
//! advances the buffer by `consumed` on success, and waits for more data on
//! `Ok(None)`. A frame split across any number of socket reads therefore
//! decodes identically to the unsplit form.
//!
//! ## Request Decoding
//!
//! Client requests use a restricted subset of RESP: an array of bulk
//! strings where element 0 is the command name. If the first byte of a
//! frame is not `*`, the line is instead treated as an inline command
//! (a CRLF-terminated line split on ASCII whitespace) - the back-compat
//! path for telnet-style clients. [`FrameParser::parse_request`] handles
//! both forms and yields a [`Request`].

use crate::protocol::types::{prefix, Frame, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors produced while decoding RESP input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A length or integer field was not a valid decimal number.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A simple string, error, or inline line held invalid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length below -1.
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length below -1.
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// A bulk string larger than the protocol allows.
    #[error("bulk string too large: {size} bytes (max: {max})")]
    BulkTooLarge { size: usize, max: usize },

    /// Any other protocol violation (missing CRLF, bad element type, ...).
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth.
pub const MAX_NESTING_DEPTH: usize = 32;

/// One decoded client request: an uppercased command name plus its
/// arguments as raw byte-strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, uppercased at decode time.
    pub name: String,
    /// Arguments in wire order. A null bulk argument arrives as empty bytes.
    pub args: Vec<Bytes>,
}

impl Request {
    /// Builds a request from a decoded frame.
    ///
    /// The frame must be a non-empty array of bulk strings. Null bulk
    /// arguments are delivered as empty byte-strings; a null or empty
    /// array, a non-bulk element, or an empty command name is a protocol
    /// error.
    pub fn from_frame(frame: Frame) -> ParseResult<Request> {
        let elements = match frame {
            Frame::Array(Some(elements)) => elements,
            Frame::Array(None) => return Err(ParseError::Protocol("empty command".to_string())),
            _ => return Err(ParseError::Protocol("expected array".to_string())),
        };

        if elements.is_empty() {
            return Err(ParseError::Protocol("empty command".to_string()));
        }

        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Frame::Bulk(Some(data)) => parts.push(data),
                Frame::Bulk(None) => parts.push(Bytes::new()),
                _ => {
                    return Err(ParseError::Protocol("expected bulk string".to_string()));
                }
            }
        }

        let name = std::str::from_utf8(&parts[0])
            .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?
            .to_uppercase();
        if name.is_empty() {
            return Err(ParseError::Protocol("empty command".to_string()));
        }

        Ok(Request {
            name,
            args: parts.split_off(1),
        })
    }
}

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use flintkv::protocol::FrameParser;
///
/// let mut parser = FrameParser::new();
/// let buf = b"*1\r\n$4\r\nPING\r\n";
///
/// let (request, consumed) = parser.parse_request(buf).unwrap().unwrap();
/// assert_eq!(request.name, "PING");
/// assert_eq!(consumed, buf.len());
/// ```
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Current nesting depth during array parsing.
    depth: usize,
}

impl FrameParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one frame of any RESP type from the buffer.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        self.depth = 0;
        self.parse_frame(buf)
    }

    /// Attempts to parse one client request from the buffer.
    ///
    /// A frame starting with `*` is decoded as an array of bulk strings;
    /// anything else is decoded as an inline command line. The two forms
    /// are mutually exclusive per frame.
    pub fn parse_request(&mut self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if buf[0] == prefix::ARRAY {
            self.depth = 0;
            match self.parse_frame(buf)? {
                Some((frame, consumed)) => {
                    let request = Request::from_frame(frame)?;
                    Ok(Some((request, consumed)))
                }
                None => Ok(None),
            }
        } else {
            self.parse_inline(buf)
        }
    }

    fn parse_frame(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::Protocol(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => self.parse_simple_string(buf),
            prefix::ERROR => self.parse_error(buf),
            prefix::INTEGER => self.parse_integer(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::Protocol(format!(
                "unknown type prefix: {:#04x}",
                other
            ))),
        }
    }

    /// Parses a simple string: `+<text>\r\n`
    fn parse_simple_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let text = std::str::from_utf8(&buf[1..1 + pos])
                    .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
                Ok(Some((Frame::Simple(text.to_string()), 1 + pos + 2)))
            }
            None => Ok(None),
        }
    }

    /// Parses an error: `-<message>\r\n`
    fn parse_error(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let text = std::str::from_utf8(&buf[1..1 + pos])
                    .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
                Ok(Some((Frame::Error(text.to_string()), 1 + pos + 2)))
            }
            None => Ok(None),
        }
    }

    /// Parses an integer: `:<decimal>\r\n`
    fn parse_integer(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let n = parse_decimal(&buf[1..1 + pos])?;
                Ok(Some((Frame::Integer(n), 1 + pos + 2)))
            }
            None => Ok(None),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        let length_end = match find_crlf(&buf[1..]) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let length = parse_decimal(&buf[1..1 + length_end])?;

        if length == -1 {
            return Ok(Some((Frame::Bulk(None), 1 + length_end + 2)));
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > MAX_BULK_SIZE {
            return Err(ParseError::BulkTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let data_start = 1 + length_end + 2;
        let total = data_start + length + 2;
        if buf.len() < total {
            return Ok(None);
        }

        if &buf[data_start + length..total] != CRLF {
            return Err(ParseError::Protocol(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
        Ok(Some((Frame::Bulk(Some(data)), total)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        let count_end = match find_crlf(&buf[1..]) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let count = parse_decimal(&buf[1..1 + count_end])?;

        if count == -1 {
            return Ok(Some((Frame::Array(None), 1 + count_end + 2)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        let mut elements = Vec::with_capacity(count.min(64));
        let mut consumed = 1 + count_end + 2;

        self.depth += 1;
        for _ in 0..count {
            if consumed >= buf.len() {
                return Ok(None);
            }
            match self.parse_frame(&buf[consumed..])? {
                Some((frame, n)) => {
                    elements.push(frame);
                    consumed += n;
                }
                None => return Ok(None),
            }
        }
        self.depth -= 1;

        Ok(Some((Frame::Array(Some(elements)), consumed)))
    }

    /// Parses an inline command: a CRLF-terminated line split on ASCII
    /// whitespace. The first token becomes the command name.
    fn parse_inline(&mut self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        let crlf_pos = match find_crlf(buf) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let line = std::str::from_utf8(&buf[..crlf_pos])
            .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

        let mut tokens = line.split_ascii_whitespace();
        let name = match tokens.next() {
            Some(token) => token.to_uppercase(),
            None => return Err(ParseError::Protocol("empty command".to_string())),
        };
        let args = tokens
            .map(|token| Bytes::copy_from_slice(token.as_bytes()))
            .collect();

        Ok(Some((Request { name, args }, crlf_pos + 2)))
    }
}

/// Finds the position of the first CRLF pair in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == CRLF)
}

/// Parses a decimal integer field (lengths, `:` payloads).
fn parse_decimal(buf: &[u8]) -> ParseResult<i64> {
    let s = std::str::from_utf8(buf).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    s.parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        FrameParser::new().parse(buf)
    }

    fn parse_request(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        FrameParser::new().parse_request(buf)
    }

    #[test]
    fn test_parse_simple_string() {
        let (frame, consumed) = parse(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::Simple("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_error_frame() {
        let (frame, consumed) = parse(b"-ERR unknown command\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::Error("ERR unknown command".to_string()));
        assert_eq!(consumed, 22);
    }

    #[test]
    fn test_parse_integer() {
        let (frame, _) = parse(b":1000\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::Integer(1000));

        let (frame, _) = parse(b":-42\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::Integer(-42));
    }

    #[test]
    fn test_parse_bulk_string() {
        let (frame, consumed) = parse(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::bulk(Bytes::from("hello")));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let (frame, consumed) = parse(b"$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::bulk(Bytes::new()));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_null_bulk_string() {
        let (frame, consumed) = parse(b"$-1\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::null_bulk());
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_null_array() {
        let (frame, _) = parse(b"*-1\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::null_array());
    }

    #[test]
    fn test_parse_binary_safe_bulk_string() {
        let (frame, _) = parse(b"$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(frame, Frame::bulk(Bytes::from(&b"hel\x00o"[..])));
    }

    #[test]
    fn test_parse_incomplete_frames_need_more_data() {
        assert!(parse(b"+OK").unwrap().is_none());
        assert!(parse(b"$5\r\nhel").unwrap().is_none());
        assert!(parse(b"*2\r\n$3\r\nGET\r\n").unwrap().is_none());
        assert!(parse(b"").unwrap().is_none());
    }

    #[test]
    fn test_parse_mixed_array() {
        let (frame, _) = parse(b"*3\r\n+OK\r\n:100\r\n$5\r\nhello\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            frame,
            Frame::array(vec![
                Frame::simple("OK"),
                Frame::integer(100),
                Frame::bulk(Bytes::from("hello")),
            ])
        );
    }

    #[test]
    fn test_parse_invalid_integer() {
        assert!(matches!(
            parse(b":not_a_number\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(
            parse(b"*abc\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_parse_invalid_bulk_length() {
        assert!(matches!(
            parse(b"$-2\r\n"),
            Err(ParseError::InvalidBulkLength(-2))
        ));
    }

    #[test]
    fn test_parse_bulk_missing_trailing_crlf() {
        assert!(matches!(
            parse(b"$5\r\nhelloXX"),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn test_reply_roundtrip() {
        // Encode-then-decode must reproduce the frame and consume every byte.
        let replies = vec![
            Frame::ok(),
            Frame::pong(),
            Frame::error("ERR internal server error"),
            Frame::integer(-7),
            Frame::bulk(Bytes::from("payload")),
            Frame::bulk(Bytes::new()),
            Frame::null_bulk(),
            Frame::null_array(),
            Frame::array(vec![]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("a")),
                Frame::bulk(Bytes::from("1")),
                Frame::bulk(Bytes::from("ab")),
                Frame::bulk(Bytes::from("2")),
            ]),
        ];

        for reply in replies {
            let encoded = reply.encode();
            let (decoded, consumed) = parse(&encoded).unwrap().unwrap();
            assert_eq!(decoded, reply);
            assert_eq!(consumed, encoded.len());
            assert_eq!(decoded.encode(), encoded);
        }
    }

    #[test]
    fn test_request_ping() {
        let (request, consumed) = parse_request(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
        assert_eq!(request.name, "PING");
        assert!(request.args.is_empty());
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_request_uppercases_name() {
        let (request, _) = parse_request(b"*2\r\n$3\r\nget\r\n$3\r\nfoo\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(request.name, "GET");
        assert_eq!(request.args, vec![Bytes::from("foo")]);
    }

    #[test]
    fn test_request_set_command() {
        let (request, _) = parse_request(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(request.name, "SET");
        assert_eq!(request.args, vec![Bytes::from("foo"), Bytes::from("bar")]);
    }

    #[test]
    fn test_request_null_argument_becomes_empty() {
        let (request, _) = parse_request(b"*2\r\n$4\r\nECHO\r\n$-1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(request.name, "ECHO");
        assert_eq!(request.args, vec![Bytes::new()]);
    }

    #[test]
    fn test_request_empty_array_is_protocol_error() {
        assert!(matches!(
            parse_request(b"*0\r\n"),
            Err(ParseError::Protocol(_))
        ));
        assert!(matches!(
            parse_request(b"*-1\r\n"),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_null_command_name_is_protocol_error() {
        assert!(matches!(
            parse_request(b"*1\r\n$-1\r\n"),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_non_bulk_element_is_protocol_error() {
        assert!(matches!(
            parse_request(b"*1\r\n:5\r\n"),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_incomplete_resumes() {
        // Feed the frame in two chunks, as a fragmented socket read would.
        let full = b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n";
        let mut parser = FrameParser::new();

        assert!(parser.parse_request(&full[..9]).unwrap().is_none());
        let (request, consumed) = parser.parse_request(full).unwrap().unwrap();
        assert_eq!(request.name, "ECHO");
        assert_eq!(request.args, vec![Bytes::from("hello")]);
        assert_eq!(consumed, full.len());
    }

    #[test]
    fn test_inline_request() {
        let (request, consumed) = parse_request(b"PING\r\n").unwrap().unwrap();
        assert_eq!(request.name, "PING");
        assert!(request.args.is_empty());
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_inline_request_with_args() {
        let (request, _) = parse_request(b"set foo bar\r\n").unwrap().unwrap();
        assert_eq!(request.name, "SET");
        assert_eq!(request.args, vec![Bytes::from("foo"), Bytes::from("bar")]);
    }

    #[test]
    fn test_inline_splits_on_any_whitespace() {
        // Inline mode has no quoting; every run of whitespace separates
        // tokens, so multi-word arguments are not expressible.
        let (request, _) = parse_request(b"ECHO hello   world\r\n").unwrap().unwrap();
        assert_eq!(request.args, vec![Bytes::from("hello"), Bytes::from("world")]);
    }

    #[test]
    fn test_inline_incomplete_line() {
        assert!(parse_request(b"PING").unwrap().is_none());
    }

    #[test]
    fn test_inline_empty_line_is_protocol_error() {
        assert!(matches!(
            parse_request(b"\r\n"),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn test_pipelined_requests_consume_one_at_a_time() {
        let buf = b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
        let mut parser = FrameParser::new();

        let (first, consumed) = parser.parse_request(buf).unwrap().unwrap();
        assert_eq!(first.name, "PING");

        let (second, rest) = parser.parse_request(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(second.name, "ECHO");
        assert_eq!(consumed + rest, buf.len());
    }
}
