//! Per-message codecs.
//!
//! A [`Codec`] pairs `encode` and `decode` for one message type. Codecs are
//! stateless values: the same instance is shared by every call that uses the
//! method descriptor holding it, across threads, without synchronization, and
//! cloned into in-flight calls that decode after the caller has returned.
//!
//! Law: for every message `m`, `decode(&encode(&m))` yields a value equal to `m`.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;

/// Codec trait for one message type.
///
/// `encode` is total for well-formed messages. `decode` fails with a
/// [`DecodeError`] when the bytes are not a valid encoding of
/// [`Codec::Message`].
///
/// # Example
///
/// ```ignore
/// use webrpc_core::{Codec, DecodeError};
/// use bytes::Bytes;
///
/// #[derive(Clone)]
/// struct Utf8Codec;
///
/// impl Codec for Utf8Codec {
///     type Message = String;
///
///     fn encode(&self, message: &String) -> Bytes {
///         Bytes::copy_from_slice(message.as_bytes())
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
///         String::from_utf8(bytes.to_vec())
///             .map_err(|e| DecodeError::new("String", e.to_string()))
///     }
/// }
/// ```
pub trait Codec: Clone + Send + Sync + 'static {
    /// The message type this codec reads and writes.
    type Message: Send + 'static;

    /// Encode a message into its binary form.
    fn encode(&self, message: &Self::Message) -> Bytes;

    /// Decode a message from its binary form.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Message, DecodeError>;
}

/// Bytes could not be decoded as the expected message type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to decode {type_name}: {reason}")]
pub struct DecodeError {
    type_name: &'static str,
    reason: String,
}

impl DecodeError {
    pub fn new<S: Into<String>>(type_name: &'static str, reason: S) -> Self {
        Self {
            type_name,
            reason: reason.into(),
        }
    }

    /// Name of the type that failed to decode.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Protobuf binary codec for any [`prost::Message`].
///
/// Zero-sized and `const`-constructible, so descriptor tables can be declared
/// as constants.
pub struct ProstCodec<T>(PhantomData<fn() -> T>);

impl<T> ProstCodec<T> {
    pub const fn new() -> Self {
        ProstCodec(PhantomData)
    }
}

impl<T> Clone for ProstCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ProstCodec<T> {}

impl<T> Default for ProstCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ProstCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProstCodec")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Codec for ProstCodec<T>
where
    T: prost::Message + Default + Send + 'static,
{
    type Message = T;

    fn encode(&self, message: &T) -> Bytes {
        Bytes::from(message.encode_to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        T::decode(bytes).map_err(|e| DecodeError::new(std::any::type_name::<T>(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Sample {
        #[prost(int64, tag = "1")]
        id: i64,
        #[prost(string, tag = "2")]
        name: String,
        #[prost(string, repeated, tag = "3")]
        tags: Vec<String>,
    }

    #[test]
    fn test_prost_codec_round_trip() {
        let codec = ProstCodec::<Sample>::new();
        let sample = Sample {
            id: 7,
            name: "Alice".to_string(),
            tags: vec!["admin".to_string(), "ops".to_string()],
        };

        let decoded = codec.decode(&codec.encode(&sample)).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_prost_codec_default_message_encodes_empty() {
        let codec = ProstCodec::<Sample>::new();
        assert!(codec.encode(&Sample::default()).is_empty());
        assert_eq!(codec.decode(&[]).unwrap(), Sample::default());
    }

    #[test]
    fn test_prost_codec_rejects_garbage() {
        let codec = ProstCodec::<Sample>::new();
        // field 1, wire type 2 (length-delimited) claiming 100 bytes that are not there
        let err = codec.decode(&[0x0a, 0x64, 0x01]).unwrap_err();
        assert!(err.type_name().ends_with("Sample"));
        assert!(!err.reason().is_empty());
    }

    #[test]
    fn test_prost_codec_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Copy>() {}
        assert_send_sync::<ProstCodec<Sample>>();
    }
}
