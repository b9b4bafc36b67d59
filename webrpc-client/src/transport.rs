//! Transport abstraction.
//!
//! A [`Transport`] performs the network exchange for one call: it receives the
//! full URL, the encoded request message and the call metadata, and returns the
//! encoded response message or a [`ClientError`]. It knows nothing about
//! message types.
//!
//! [`TransportExt`] layers the two completion models on top of any transport:
//!
//! - [`TransportExt::future_call`] returns a [`UnaryFuture`] that settles once
//! - [`TransportExt::callback_call`] spawns that same call and invokes a
//!   callback once, returning a [`CallHandle`] for cancellation
//!
//! Both decode the response with the descriptor's response codec before
//! delivery, so a decode failure is a [`ClientError::Protocol`] outcome.
//!
//! [`HyperTransport`] is the gRPC-Web implementation over hyper.
//!
//! # Feature Flags
//!
//! TLS support requires enabling the appropriate features:
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod hyper;

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use webrpc_core::{Codec, MethodDescriptor, MethodInfo};

use crate::call::{CallHandle, PendingCall, UnaryFuture, current_runtime, spawn_callback};
use crate::error::ClientError;
use crate::metadata::Metadata;
use crate::options::CallOptions;
use crate::response::UnaryResponse;

pub use body::TransportBody;
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub use connector::default_tls_config;
pub use connector::{
    DangerousAcceptAnyCertVerifier, build_https_connector, danger_accept_invalid_certs_config,
};
pub use hyper::{HyperTransport, HyperTransportBuilder, WireFormat};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

/// One call, as handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// `hostname + path`.
    pub url: String,
    /// Encoded request message, unframed.
    pub body: Bytes,
    pub metadata: Metadata,
    /// Deadline for the whole exchange.
    pub timeout: Option<Duration>,
    pub method: MethodInfo,
}

/// Raw outcome of a successful exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// Encoded response message, unframed.
    pub body: Bytes,
    /// Response headers and trailers.
    pub metadata: Metadata,
}

impl TransportResponse {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Performs the network exchange for one unary call.
///
/// Implementations must tolerate concurrent calls; each call's request and
/// response are owned by that call alone. A non-OK status returned by the peer
/// is reported as [`ClientError::Application`].
pub trait Transport: Send + Sync + 'static {
    /// Perform one exchange.
    fn call(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, ClientError>>;

    /// Encoding label used in tracing spans.
    fn encoding(&self) -> &'static str {
        "proto"
    }
}

/// Shared core of both call primitives: hand the encoded request to the
/// transport and decode the response with the descriptor's codec.
fn issue<T, Req, Res>(
    transport: &T,
    url: String,
    body: Bytes,
    descriptor: &MethodDescriptor<Req, Res>,
    options: CallOptions,
) -> PendingCall<UnaryResponse<Res::Message>>
where
    T: Transport + ?Sized,
    Req: Codec,
    Res: Codec,
{
    if !descriptor.method_type().is_unary() {
        return PendingCall::failed(ClientError::Protocol(format!(
            "unsupported method type {} for {}",
            descriptor.method_type().as_str(),
            descriptor.path()
        )));
    }

    let request = TransportRequest {
        url,
        body,
        metadata: options.metadata,
        timeout: options.timeout,
        method: descriptor.info(descriptor.method_name()),
    };

    #[cfg(feature = "tracing")]
    let span = tracing::info_span!(
        "rpc.call",
        rpc.method = %descriptor.path(),
        rpc.type = "unary",
        rpc.encoding = %transport.encoding(),
        otel.kind = "client",
    );

    #[cfg(feature = "tracing")]
    let exchange = {
        let _guard = span.enter();
        transport.call(request)
    };
    #[cfg(not(feature = "tracing"))]
    let exchange = transport.call(request);

    let codec = descriptor.response_codec().clone();
    let future = async move {
        let response = exchange.await?;
        let message = codec.decode(&response.body)?;
        Ok(UnaryResponse::new(message, response.metadata))
    };

    #[cfg(feature = "tracing")]
    let future = {
        use tracing::Instrument;
        async move {
            let outcome = future.await;
            match &outcome {
                Ok(_) => tracing::debug!("rpc call succeeded"),
                Err(err) => tracing::debug!(error = %err, "rpc call failed"),
            }
            outcome
        }
        .instrument(span)
    };

    PendingCall::new(future).sent()
}

/// The callback and future call primitives, available on every [`Transport`].
pub trait TransportExt: Transport {
    /// Issue a call and return a future that settles exactly once.
    ///
    /// No cancellation surface is exposed; dropping the future only stops
    /// waiting for the outcome.
    fn future_call<Req, Res>(
        &self,
        url: String,
        body: Bytes,
        descriptor: &MethodDescriptor<Req, Res>,
        options: CallOptions,
    ) -> UnaryFuture<UnaryResponse<Res::Message>>
    where
        Req: Codec,
        Res: Codec,
    {
        UnaryFuture::new(issue(self, url, body, descriptor, options))
    }

    /// Issue a call and invoke `callback` exactly once with its outcome.
    ///
    /// Returns a [`CallHandle`] for cancellation, or `None` when no tokio
    /// runtime is available (the callback has then already been invoked with
    /// a transport error).
    fn callback_call<Req, Res, F>(
        &self,
        url: String,
        body: Bytes,
        descriptor: &MethodDescriptor<Req, Res>,
        options: CallOptions,
        callback: F,
    ) -> Option<CallHandle>
    where
        Req: Codec,
        Res: Codec,
        F: FnOnce(Result<UnaryResponse<Res::Message>, ClientError>) + Send + 'static,
    {
        // Nothing may reach the transport if the outcome cannot be delivered.
        if let Err(err) = current_runtime() {
            callback(Err(err));
            return None;
        }
        spawn_callback(issue(self, url, body, descriptor, options), callback)
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use webrpc_core::{MethodType, ProstCodec, ProstMethodDescriptor, Status};

    #[derive(Clone, PartialEq, prost::Message)]
    struct Echo {
        #[prost(string, tag = "1")]
        text: String,
    }

    const ECHO: ProstMethodDescriptor<Echo, Echo> = MethodDescriptor::new(
        "/test.EchoService/Echo",
        MethodType::Unary,
        ProstCodec::new(),
        ProstCodec::new(),
    );

    const WATCH: ProstMethodDescriptor<Echo, Echo> = MethodDescriptor::new(
        "/test.EchoService/Watch",
        MethodType::ServerStreaming,
        ProstCodec::new(),
        ProstCodec::new(),
    );

    /// Returns the request body unchanged and records what it saw.
    #[derive(Default)]
    struct Loopback {
        seen: Mutex<Vec<TransportRequest>>,
        spans: Mutex<Vec<Option<&'static str>>>,
    }

    impl Transport for Loopback {
        fn call(
            &self,
            request: TransportRequest,
        ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
            let body = request.body.clone();
            self.seen.lock().unwrap().push(request);
            self.spans
                .lock()
                .unwrap()
                .push(tracing_span_name());
            Box::pin(async move { Ok(TransportResponse::new(body)) })
        }
    }

    struct Garbage;

    impl Transport for Garbage {
        fn call(
            &self,
            _request: TransportRequest,
        ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
            Box::pin(async { Ok(TransportResponse::new(vec![0x0a, 0x64, 0x01])) })
        }
    }

    struct Refuse;

    impl Transport for Refuse {
        fn call(
            &self,
            _request: TransportRequest,
        ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
            Box::pin(async { Err(Status::not_found("nothing here").into()) })
        }
    }

    #[cfg(feature = "tracing")]
    fn tracing_span_name() -> Option<&'static str> {
        tracing::Span::current().metadata().map(|m| m.name())
    }

    #[cfg(not(feature = "tracing"))]
    fn tracing_span_name() -> Option<&'static str> {
        None
    }

    fn encode(text: &str) -> Bytes {
        ECHO.request_codec().encode(&Echo { text: text.into() })
    }

    #[tokio::test]
    async fn test_future_call_decodes_response() {
        let transport = Loopback::default();
        let options = CallOptions::new()
            .insert("x-trace", "1")
            .timeout(Duration::from_secs(2));

        let response = transport
            .future_call(
                "http://localhost/test.EchoService/Echo".into(),
                encode("hello"),
                &ECHO,
                options,
            )
            .await
            .unwrap();
        assert_eq!(response.text, "hello");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://localhost/test.EchoService/Echo");
        assert_eq!(seen[0].metadata.get("x-trace"), Some("1"));
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(2)));
        assert_eq!(seen[0].method.name, "Echo");
    }

    #[tokio::test]
    async fn test_future_call_decode_failure_is_protocol_error() {
        let err = Garbage
            .future_call("http://h/x.Y/Z".into(), Bytes::new(), &ECHO, CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_future_call_application_error() {
        let err = Refuse
            .future_call("http://h/x.Y/Z".into(), Bytes::new(), &ECHO, CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), webrpc_core::Code::NotFound);
    }

    #[tokio::test]
    async fn test_streaming_descriptor_rejected_before_io() {
        let transport = Loopback::default();
        let err = transport
            .future_call("http://h/x".into(), encode("x"), &WATCH, CallOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Protocol(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_callback_call_through_dyn_transport() {
        let transport: Arc<dyn Transport> = Arc::new(Loopback::default());
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = transport.callback_call(
            "http://h/test.EchoService/Echo".into(),
            encode("cb"),
            &ECHO,
            CallOptions::new(),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        );

        assert!(handle.is_some());
        assert_eq!(rx.await.unwrap().unwrap().text, "cb");
    }
    #[tokio::test]
    async fn test_callback_call_decode_failure_is_protocol_error() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        Garbage.callback_call(
            "http://h/x.Y/Z".into(),
            Bytes::new(),
            &ECHO,
            CallOptions::new(),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        );

        assert!(matches!(rx.await.unwrap(), Err(ClientError::Protocol(_))));
    }

    #[test]
    fn test_callback_call_without_runtime_sends_nothing() {
        let transport = Loopback::default();
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let delivered = delivered.clone();
            transport.callback_call(
                "http://h/test.EchoService/Echo".into(),
                encode("lost"),
                &ECHO,
                CallOptions::new(),
                move |outcome| delivered.lock().unwrap().push(outcome),
            )
        };

        assert!(handle.is_none());
        assert!(transport.seen.lock().unwrap().is_empty());
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(matches!(delivered[0], Err(ClientError::Transport(_))));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_transport_called_inside_rpc_span() {
        let transport = Loopback::default();

        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let _call = transport.future_call(
                "http://h/test.EchoService/Echo".into(),
                encode("traced"),
                &ECHO,
                CallOptions::new(),
            );
        });

        assert_eq!(*transport.spans.lock().unwrap(), [Some("rpc.call")]);
    }
}
