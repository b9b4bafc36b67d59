//! gRPC-Web unary framing.
//!
//! Request and response bodies are sequences of length-prefixed frames:
//!
//! ```text
//! [flags:1][length:4 big-endian][payload:length]
//! ```
//!
//! A unary request carries exactly one data frame. A unary response carries at
//! most one data frame followed by a trailer frame (flag bit `0x80`) whose
//! payload is a block of `name: value\r\n` lines holding `grpc-status` and
//! `grpc-message`.
//!
//! In text mode (`application/grpc-web-text`) the body is additionally base64
//! encoded; a response may be several independently padded base64 chunks.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Code, Status};

/// gRPC-Web frame flags.
pub mod frame_flags {
    /// Uncompressed data frame.
    pub const DATA: u8 = 0x00;
    /// Compressed data frame.
    pub const COMPRESSED: u8 = 0x01;
    /// Trailer frame.
    pub const TRAILERS: u8 = 0x80;
}

/// Frame header size (flags + length).
pub const FRAME_HEADER_SIZE: usize = 5;

/// Trailer carrying the numeric status code.
pub const GRPC_STATUS: &str = "grpc-status";
/// Trailer carrying the percent-encoded status message.
pub const GRPC_MESSAGE: &str = "grpc-message";
/// Trailer carrying a base64 `google.rpc.Status`.
pub const GRPC_STATUS_DETAILS: &str = "grpc-status-details-bin";

/// Errors raised while reading a gRPC-Web body.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("incomplete frame header: expected {expected} bytes, got {actual}")]
    IncompleteHeader { expected: usize, actual: usize },

    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid frame flags: 0x{0:02x}")]
    InvalidFlags(u8),

    #[error("compressed frames are not supported")]
    Compressed,

    #[error("unary response carried more than one message")]
    MultipleMessages,

    #[error("data frame after trailers")]
    DataAfterTrailers,

    #[error("invalid trailers: {0}")]
    InvalidTrailers(String),

    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),
}

/// Wrap a message in a single uncompressed data frame.
pub fn wrap_frame(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&[frame_flags::DATA]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Build a trailer frame from a header map.
pub fn wrap_trailers(trailers: &HeaderMap) -> Bytes {
    let mut block = Vec::new();
    for (name, value) in trailers {
        block.extend_from_slice(name.as_str().as_bytes());
        block.extend_from_slice(b": ");
        block.extend_from_slice(value.as_bytes());
        block.extend_from_slice(b"\r\n");
    }
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + block.len());
    frame.extend_from_slice(&[frame_flags::TRAILERS]);
    frame.extend_from_slice(&(block.len() as u32).to_be_bytes());
    frame.extend_from_slice(&block);
    frame.freeze()
}

/// Parse a frame header.
///
/// Returns `(flags, length)`.
pub fn parse_frame_header(data: &[u8]) -> Result<(u8, u32), FrameError> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(FrameError::IncompleteHeader {
            expected: FRAME_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let flags = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);

    Ok((flags, length))
}

/// A decoded unary response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnaryBody {
    /// Payload of the data frame, if the server sent one.
    pub message: Option<Bytes>,
    /// Parsed trailer frame, if present.
    pub trailers: Option<HeaderMap>,
}

/// Split a unary response body into its message and trailers.
pub fn decode_unary_body(mut body: Bytes) -> Result<UnaryBody, FrameError> {
    let mut out = UnaryBody::default();

    while !body.is_empty() {
        let (flags, length) = parse_frame_header(&body)?;
        let length = length as usize;
        let available = body.len() - FRAME_HEADER_SIZE;
        if available < length {
            return Err(FrameError::Truncated {
                expected: length,
                actual: available,
            });
        }

        let _ = body.split_to(FRAME_HEADER_SIZE);
        let payload = body.split_to(length);

        if flags & frame_flags::TRAILERS != 0 {
            out.trailers = Some(parse_trailers(&payload)?);
            continue;
        }
        if out.trailers.is_some() {
            return Err(FrameError::DataAfterTrailers);
        }
        match flags {
            frame_flags::DATA => {
                if out.message.is_some() {
                    return Err(FrameError::MultipleMessages);
                }
                out.message = Some(payload);
            }
            frame_flags::COMPRESSED => return Err(FrameError::Compressed),
            other => return Err(FrameError::InvalidFlags(other)),
        }
    }

    Ok(out)
}

/// Parse a trailer block of `name: value` lines.
pub fn parse_trailers(block: &[u8]) -> Result<HeaderMap, FrameError> {
    let text = std::str::from_utf8(block)
        .map_err(|e| FrameError::InvalidTrailers(format!("not utf-8: {e}")))?;

    let mut trailers = HeaderMap::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::InvalidTrailers(format!("missing ':' in {line:?}")))?;
        let name = HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| FrameError::InvalidTrailers(e.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| FrameError::InvalidTrailers(e.to_string()))?;
        trailers.append(name, value);
    }

    Ok(trailers)
}

/// Read the call status from headers or trailers.
///
/// Returns `Ok(None)` when no `grpc-status` is present.
pub fn status_from_trailers(trailers: &HeaderMap) -> Result<Option<Status>, FrameError> {
    let Some(raw) = trailers.get(GRPC_STATUS) else {
        return Ok(None);
    };

    let code = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .map(Code::from_i32)
        .ok_or_else(|| FrameError::InvalidTrailers(format!("invalid {GRPC_STATUS}: {raw:?}")))?;

    let mut status = match trailers.get(GRPC_MESSAGE) {
        Some(message) if !message.is_empty() => {
            Status::new(code, percent_decode(message.as_bytes()))
        }
        _ => Status::from_code(code),
    };

    if let Some(details) = trailers.get(GRPC_STATUS_DETAILS) {
        let decoded = STANDARD_NO_PAD
            .decode(details.as_bytes())
            .or_else(|_| STANDARD.decode(details.as_bytes()))
            .map_err(|e| FrameError::InvalidTrailers(format!("invalid {GRPC_STATUS_DETAILS}: {e}")))?;
        status = status.with_details(Bytes::from(decoded));
    }

    Ok(Some(status))
}

/// Decode a percent-encoded `grpc-message` value.
///
/// Malformed escapes are kept verbatim.
pub fn percent_decode(input: &[u8]) -> String {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' && i + 2 < input.len() {
            if let (Some(h), Some(l)) = (hex(input[i + 1]), hex(input[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Base64-encode a body for `application/grpc-web-text`.
pub fn encode_text(body: &[u8]) -> Bytes {
    Bytes::from(STANDARD.encode(body))
}

/// Decode an `application/grpc-web-text` body.
///
/// Accepts a concatenation of padded base64 chunks, as servers may flush the
/// message and the trailers separately.
pub fn decode_text(body: &[u8]) -> Result<Bytes, FrameError> {
    let clean: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let mut out = Vec::with_capacity(clean.len() / 4 * 3);
    let mut groups = clean.chunks_exact(4);
    for group in groups.by_ref() {
        let decoded = STANDARD
            .decode(group)
            .map_err(|e| FrameError::InvalidBase64(e.to_string()))?;
        out.extend_from_slice(&decoded);
    }
    let rest = groups.remainder();
    if !rest.is_empty() {
        let decoded = STANDARD_NO_PAD
            .decode(rest)
            .map_err(|e| FrameError::InvalidBase64(e.to_string()))?;
        out.extend_from_slice(&decoded);
    }

    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_trailers() -> HeaderMap {
        let mut trailers = HeaderMap::new();
        trailers.insert(GRPC_STATUS, HeaderValue::from_static("0"));
        trailers
    }

    #[test]
    fn test_wrap_frame() {
        let frame = wrap_frame(b"hello");

        assert_eq!(frame[0], frame_flags::DATA);
        assert_eq!(u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]), 5);
        assert_eq!(&frame[5..], b"hello");
    }

    #[test]
    fn test_parse_frame_header_incomplete() {
        let err = parse_frame_header(&[0x00, 0x00, 0x00]).unwrap_err();
        assert_eq!(
            err,
            FrameError::IncompleteHeader {
                expected: 5,
                actual: 3
            }
        );
    }

    #[test]
    fn test_decode_unary_body_message_and_trailers() {
        let mut body = BytesMut::new();
        body.extend_from_slice(&wrap_frame(b"payload"));
        body.extend_from_slice(&wrap_trailers(&ok_trailers()));

        let decoded = decode_unary_body(body.freeze()).unwrap();
        assert_eq!(decoded.message.as_deref(), Some(&b"payload"[..]));
        let trailers = decoded.trailers.unwrap();
        assert_eq!(trailers.get(GRPC_STATUS).unwrap(), "0");
    }

    #[test]
    fn test_decode_unary_body_empty_message() {
        let mut body = BytesMut::new();
        body.extend_from_slice(&wrap_frame(&[]));
        body.extend_from_slice(&wrap_trailers(&ok_trailers()));

        let decoded = decode_unary_body(body.freeze()).unwrap();
        assert_eq!(decoded.message, Some(Bytes::new()));
    }

    #[test]
    fn test_decode_unary_body_truncated() {
        let frame = wrap_frame(b"payload");
        let err = decode_unary_body(frame.slice(..8)).unwrap_err();
        assert_eq!(
            err,
            FrameError::Truncated {
                expected: 7,
                actual: 3
            }
        );
    }

    #[test]
    fn test_decode_unary_body_rejects_two_messages() {
        let mut body = BytesMut::new();
        body.extend_from_slice(&wrap_frame(b"a"));
        body.extend_from_slice(&wrap_frame(b"b"));

        assert_eq!(
            decode_unary_body(body.freeze()).unwrap_err(),
            FrameError::MultipleMessages
        );
    }

    #[test]
    fn test_decode_unary_body_rejects_compressed() {
        let mut frame = BytesMut::from(&wrap_frame(b"a")[..]);
        frame[0] = frame_flags::COMPRESSED;

        assert_eq!(
            decode_unary_body(frame.freeze()).unwrap_err(),
            FrameError::Compressed
        );
    }

    #[test]
    fn test_parse_trailers_mixed_case_and_bare_newlines() {
        let trailers = parse_trailers(b"Grpc-Status: 5\ngrpc-message: user%20not%20found\r\n").unwrap();
        assert_eq!(trailers.get("grpc-status").unwrap(), "5");
        assert_eq!(trailers.get("grpc-message").unwrap(), "user%20not%20found");
    }

    #[test]
    fn test_parse_trailers_rejects_missing_colon() {
        assert!(matches!(
            parse_trailers(b"grpc-status 0\r\n"),
            Err(FrameError::InvalidTrailers(_))
        ));
    }

    #[test]
    fn test_status_from_trailers() {
        let trailers = parse_trailers(b"grpc-status: 5\r\ngrpc-message: user%20not%20found\r\n").unwrap();
        let status = status_from_trailers(&trailers).unwrap().unwrap();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), Some("user not found"));

        assert_eq!(status_from_trailers(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_status_from_trailers_details() {
        let trailers = parse_trailers(b"grpc-status: 13\r\ngrpc-status-details-bin: CA0\r\n").unwrap();
        let status = status_from_trailers(&trailers).unwrap().unwrap();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.details().map(|d| d.as_ref()), Some(&[8u8, 13][..]));
    }

    #[test]
    fn test_status_from_trailers_invalid_code() {
        let trailers = parse_trailers(b"grpc-status: nope\r\n").unwrap();
        assert!(status_from_trailers(&trailers).is_err());
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode(b"plain"), "plain");
        assert_eq!(percent_decode(b"a%20b%3Ac"), "a b:c");
        assert_eq!(percent_decode(b"100%"), "100%");
        assert_eq!(percent_decode(b"%zz"), "%zz");
        assert_eq!(percent_decode(b"%E2%9C%93"), "\u{2713}");
    }

    #[test]
    fn test_text_concatenated_chunks() {
        let first = wrap_frame(b"hi");
        let second = wrap_trailers(&ok_trailers());

        let mut text = Vec::new();
        text.extend_from_slice(&encode_text(&first));
        text.extend_from_slice(&encode_text(&second));

        let decoded = decode_text(&text).unwrap();
        let mut expected = BytesMut::new();
        expected.extend_from_slice(&first);
        expected.extend_from_slice(&second);
        assert_eq!(decoded, expected.freeze());
    }

    #[test]
    fn test_text_rejects_garbage() {
        assert!(matches!(decode_text(b"!!!!"), Err(FrameError::InvalidBase64(_))));
    }
}
