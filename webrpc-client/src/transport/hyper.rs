//! gRPC-Web transport over hyper.
//!
//! [`HyperTransport`] frames each request as a single gRPC-Web data frame,
//! posts it with hyper_util's pooled client and reads the response frames and
//! trailers back into a [`TransportResponse`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower::ServiceExt;
use tower_service::Service;
use webrpc_core::{decode_text, decode_unary_body, encode_text, status_from_trailers, wrap_frame};

use super::body::TransportBody;
use super::connector::{build_https_connector, danger_accept_invalid_certs_config};
use super::{Transport, TransportRequest, TransportResponse};
use crate::error::{ClientBuildError, ClientError};
use crate::metadata::Metadata;
use crate::options::duration_to_grpc_timeout;

const GRPC_WEB_TEXT: &str = "application/grpc-web-text";
const GRPC_WEB_PROTO: &str = "application/grpc-web+proto";
const X_GRPC_WEB: &str = "x-grpc-web";
const X_USER_AGENT: &str = "x-user-agent";
const GRPC_TIMEOUT: &str = "grpc-timeout";
const DEFAULT_USER_AGENT: &str = concat!("webrpc-rust/", env!("CARGO_PKG_VERSION"));

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// Body encoding on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// `application/grpc-web-text`: frames are base64 encoded.
    #[default]
    Text,
    /// `application/grpc-web+proto`: frames are sent as raw bytes.
    Binary,
}

impl WireFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Text => GRPC_WEB_TEXT,
            WireFormat::Binary => GRPC_WEB_PROTO,
        }
    }

    /// Label used in tracing spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Text => "grpc-web-text",
            WireFormat::Binary => "grpc-web+proto",
        }
    }
}

/// gRPC-Web transport using hyper_util's legacy client.
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```ignore
/// use webrpc_client::transport::{HyperTransport, WireFormat};
///
/// let transport = HyperTransport::builder()
///     .wire_format(WireFormat::Binary)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    wire_format: WireFormat,
    user_agent: HeaderValue,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("wire_format", &self.wire_format)
            .field("user_agent", &self.user_agent)
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    fn build_request(
        &self,
        request: &TransportRequest,
    ) -> Result<http::Request<TransportBody>, ClientError> {
        let uri: http::Uri = request
            .url
            .parse()
            .map_err(|e| ClientError::Transport(format!("invalid url {:?}: {e}", request.url)))?;

        let mut headers = HeaderMap::new();
        request.metadata.write_headers(&mut headers)?;

        let content_type = HeaderValue::from_static(self.wire_format.content_type());
        headers.insert(CONTENT_TYPE, content_type.clone());
        headers.insert(ACCEPT, content_type);
        headers.insert(X_GRPC_WEB, HeaderValue::from_static("1"));
        headers.insert(X_USER_AGENT, self.user_agent.clone());

        if let Some(value) = request.timeout.and_then(duration_to_grpc_timeout) {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ClientError::Transport(format!("invalid grpc-timeout: {e}")))?;
            headers.insert(GRPC_TIMEOUT, value);
        }

        let frame = wrap_frame(&request.body);
        let body = match self.wire_format {
            WireFormat::Text => encode_text(&frame),
            WireFormat::Binary => frame,
        };

        let mut http_request = http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(TransportBody::full(body))
            .map_err(|e| ClientError::Transport(format!("failed to build request: {e}")))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    async fn exchange(self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        let http_request = self.build_request(&request)?;

        let response = self.oneshot(http_request).await?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read response body: {e}")))?
            .to_bytes();

        read_response(parts.status, &parts.headers, body)
    }
}

/// Interpret a complete gRPC-Web response.
///
/// Status is taken from the trailer frame, or from the headers for a
/// trailers-only response. An HTTP error without `grpc-status` is a
/// [`ClientError::HttpStatus`].
pub(crate) fn read_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<TransportResponse, ClientError> {
    let mut metadata = Metadata::from_headers(headers);
    let header_status = status_from_trailers(headers)?;

    if status != StatusCode::OK {
        // Without a grpc-status the error came from something other than the peer.
        return Err(match header_status {
            Some(s) if !s.is_ok() => ClientError::Application(s),
            _ => ClientError::HttpStatus(status),
        });
    }
    if let Some(s) = header_status.as_ref().filter(|s| !s.is_ok()) {
        return Err(ClientError::Application(s.clone()));
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let body = if content_type.starts_with(GRPC_WEB_TEXT) {
        decode_text(&body)?
    } else if content_type.starts_with("application/grpc-web") || content_type.is_empty() {
        body
    } else {
        return Err(ClientError::Protocol(format!(
            "unexpected content-type {content_type:?}"
        )));
    };

    let frames = decode_unary_body(body)?;

    let trailer_status = match &frames.trailers {
        Some(trailers) => {
            metadata.append_headers(trailers);
            status_from_trailers(trailers)?
        }
        None => None,
    };

    let status = trailer_status
        .or(header_status)
        .ok_or_else(|| ClientError::Protocol("response carried no grpc-status".to_string()))?;
    if !status.is_ok() {
        return Err(ClientError::Application(status));
    }

    let message = frames
        .message
        .ok_or_else(|| ClientError::Protocol("response carried no message".to_string()))?;

    Ok(TransportResponse {
        body: message,
        metadata,
    })
}

impl Transport for HyperTransport {
    fn call(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
        let transport = self.clone();
        Box::pin(async move {
            match request.timeout {
                Some(timeout) => tokio::time::timeout(timeout, transport.exchange(request))
                    .await
                    .map_err(|_| ClientError::Timeout(timeout))?,
                None => transport.exchange(request).await,
            }
        })
    }

    fn encoding(&self) -> &'static str {
        self.wire_format.as_str()
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use webrpc_client::transport::HyperTransportBuilder;
/// use std::time::Duration;
///
/// let transport = HyperTransportBuilder::new()
///     .text_format(false)
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HyperTransportBuilder {
    tls_config: Option<ClientConfig>,
    wire_format: WireFormat,
    user_agent: Option<String>,
    /// Force HTTP/2 without ALPN or upgrade (h2c).
    http2_only: bool,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
    h2_keep_alive_interval: Option<Duration>,
    h2_keep_alive_timeout: Option<Duration>,
    danger_accept_invalid_certs: bool,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            wire_format: WireFormat::Text,
            user_agent: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
            h2_keep_alive_interval: None,
            h2_keep_alive_timeout: None,
            danger_accept_invalid_certs: false,
        }
    }

    /// Set a custom TLS configuration (private roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    /// Use `application/grpc-web-text` (true, the default) or
    /// `application/grpc-web+proto` (false).
    pub fn text_format(self, enabled: bool) -> Self {
        self.wire_format(if enabled {
            WireFormat::Text
        } else {
            WireFormat::Binary
        })
    }

    /// Value of the `x-user-agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Speak HTTP/2 directly without negotiation.
    ///
    /// gRPC-Web proxies usually accept HTTP/1.1, so this is rarely needed.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Close pooled connections idle for longer than this. Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    pub fn h2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.h2_keep_alive_interval = Some(interval);
        self
    }

    /// Only effective if `h2_keep_alive_interval` is also set.
    pub fn h2_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.h2_keep_alive_timeout = Some(timeout);
        self
    }

    /// Accept any server certificate.
    ///
    /// # Warning
    ///
    /// Makes the connection open to man-in-the-middle attacks. Development only.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.danger_accept_invalid_certs = true;
        self
    }

    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let tls_config = if self.danger_accept_invalid_certs {
            Some(danger_accept_invalid_certs_config()?)
        } else {
            self.tls_config
        };
        let https_connector = build_https_connector(tls_config)?;

        let user_agent = match self.user_agent {
            Some(ua) => HeaderValue::from_str(&ua)
                .map_err(|_| ClientBuildError::InvalidUserAgent(ua.clone()))?,
            None => HeaderValue::from_static(DEFAULT_USER_AGENT),
        };

        let mut builder = Client::builder(TokioExecutor::new());

        // pool_idle_timeout needs a timer
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        if self.http2_only {
            builder.http2_only(true);
        }
        if let Some(interval) = self.h2_keep_alive_interval {
            builder.timer(TokioTimer::new());
            builder.http2_keep_alive_interval(interval);
        }
        if let Some(timeout) = self.h2_keep_alive_timeout {
            builder.http2_keep_alive_timeout(timeout);
        }

        Ok(HyperTransport {
            client: builder.build(https_connector),
            wire_format: self.wire_format,
            user_agent,
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("wire_format", &self.wire_format)
            .field("user_agent", &self.user_agent)
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("h2_keep_alive_interval", &self.h2_keep_alive_interval)
            .field("h2_keep_alive_timeout", &self.h2_keep_alive_timeout)
            .field("danger_accept_invalid_certs", &self.danger_accept_invalid_certs)
            .finish()
    }
}

impl Service<http::Request<TransportBody>> for HyperTransport {
    type Response = http::Response<Incoming>;
    type Error = ClientError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // hyper_util legacy::Client is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<TransportBody>) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            client
                .request(req)
                .await
                .map_err(|e| ClientError::Transport(format!("request failed: {e}")))
        })
    }
}
