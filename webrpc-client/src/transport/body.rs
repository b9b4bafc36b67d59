//! Request body type for the hyper transport.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};

use crate::error::ClientError;

/// A request body for unary gRPC-Web calls.
///
/// Unary requests are always fully buffered: one framed (and, in text mode,
/// base64-encoded) message.
#[derive(Default)]
pub enum TransportBody {
    #[default]
    Empty,
    Full { data: Option<Bytes> },
}

impl TransportBody {
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    pub fn full(data: Bytes) -> Self {
        TransportBody::Full { data: Some(data) }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Empty => Poll::Ready(None),
            TransportBody::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            TransportBody::Empty | TransportBody::Full { data: None } => {
                http_body::SizeHint::with_exact(0)
            }
            TransportBody::Full { data: Some(d) } => http_body::SizeHint::with_exact(d.len() as u64),
        }
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_empty_body() {
        let body = TransportBody::empty();
        assert!(body.is_end_stream());

        let collected = body.collect().await.unwrap();
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_full_body() {
        let data = Bytes::from_static(b"\x00\x00\x00\x00\x02\x08\x01");
        let body = TransportBody::full(data.clone());
        assert_eq!(body.size_hint().exact(), Some(7));

        let collected = body.collect().await.unwrap();
        assert_eq!(collected.to_bytes(), data);
    }
}
