//! Descriptor-driven service clients.
//!
//! [`CallbackClient`] and [`PromiseClient`] hold a hostname and a shared
//! [`Transport`]. Each call builds `hostname + descriptor.path`, encodes the
//! request with the descriptor's request codec and hands it to the transport.
//! The two clients differ only in how the outcome is delivered.
//!
//! Typed per-service wrappers with one method per RPC are declared with
//! [`unary_service!`](crate::unary_service).

use std::sync::Arc;
use std::time::Duration;

use webrpc_core::{Codec, MethodDescriptor};

use crate::builder::ClientBuilder;
use crate::call::{CallHandle, PendingCall, UnaryFuture, spawn_callback};
use crate::error::{ClientBuildError, ClientError};
use crate::options::CallOptions;
use crate::response::UnaryResponse;
use crate::transport::{Transport, TransportExt};

/// State shared by both client flavours.
#[derive(Clone)]
pub(crate) struct ClientCore {
    hostname: Arc<str>,
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
}

impl ClientCore {
    pub(crate) fn new(
        hostname: &str,
        transport: Arc<dyn Transport>,
        default_timeout: Option<Duration>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            hostname: normalize_hostname(hostname)?.into(),
            transport,
            default_timeout,
        })
    }

    fn url_for(&self, path: &str) -> Result<String, ClientError> {
        if !path.starts_with('/') || path.starts_with("//") {
            return Err(ClientError::Protocol(format!(
                "method path {path:?} must start with a single '/'"
            )));
        }
        Ok(format!("{}{}", self.hostname, path))
    }

    fn prepare<Req, Res>(
        &self,
        descriptor: &MethodDescriptor<Req, Res>,
        request: &Req::Message,
        mut options: CallOptions,
    ) -> Result<(String, bytes::Bytes, CallOptions), ClientError>
    where
        Req: Codec,
        Res: Codec,
    {
        let url = self.url_for(descriptor.path())?;
        let body = descriptor.request_codec().encode(request);
        if options.timeout.is_none() {
            options.timeout = self.default_timeout;
        }
        Ok((url, body, options))
    }
}

impl std::fmt::Debug for ClientCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCore")
            .field("hostname", &self.hostname)
            .field("encoding", &self.transport.encoding())
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Validate a hostname and strip a single trailing `/`.
///
/// The hostname must carry an `http://` or `https://` scheme and a host, so
/// that appending a `/{service}/{method}` path yields a well-formed URL.
pub(crate) fn normalize_hostname(hostname: &str) -> Result<&str, ClientBuildError> {
    let invalid = |reason| ClientBuildError::InvalidHostname {
        hostname: hostname.to_string(),
        reason,
    };

    let rest = hostname
        .strip_prefix("http://")
        .or_else(|| hostname.strip_prefix("https://"))
        .ok_or_else(|| invalid("must start with http:// or https://"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("missing host"));
    }

    let trimmed = hostname.strip_suffix('/').unwrap_or(hostname);
    if trimmed.ends_with('/') {
        return Err(invalid("must not end with more than one '/'"));
    }
    Ok(trimmed)
}

/// Client that delivers each outcome to a callback.
///
/// # Example
///
/// ```ignore
/// let client = ClientBuilder::new("http://localhost:8080").build_callback()?;
///
/// let handle = client.unary(&GET_USER, &UserId { id: 1 }, CallOptions::new(), |outcome| {
///     match outcome {
///         Ok(user) => println!("{}", user.name),
///         Err(err) => eprintln!("{err}"),
///     }
/// });
/// ```
#[derive(Clone, Debug)]
pub struct CallbackClient {
    core: ClientCore,
}

impl CallbackClient {
    /// Create a client over `transport`.
    pub fn new(
        hostname: impl AsRef<str>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            core: ClientCore::new(hostname.as_ref(), transport, None)?,
        })
    }

    pub fn builder(hostname: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(hostname)
    }

    pub(crate) fn from_core(core: ClientCore) -> Self {
        Self { core }
    }

    /// Normalized hostname (no trailing `/`).
    pub fn hostname(&self) -> &str {
        &self.core.hostname
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.core.transport
    }

    /// Issue a unary call and invoke `callback` exactly once with its outcome.
    ///
    /// Returns the transport's cancellation handle, or `None` when no tokio
    /// runtime is available.
    pub fn unary<Req, Res, F>(
        &self,
        descriptor: &MethodDescriptor<Req, Res>,
        request: &Req::Message,
        options: CallOptions,
        callback: F,
    ) -> Option<CallHandle>
    where
        Req: Codec,
        Res: Codec,
        F: FnOnce(Result<UnaryResponse<Res::Message>, ClientError>) + Send + 'static,
    {
        match self.core.prepare(descriptor, request, options) {
            Ok((url, body, options)) => {
                self.core
                    .transport
                    .callback_call(url, body, descriptor, options, callback)
            }
            Err(err) => spawn_callback(PendingCall::failed(err), callback),
        }
    }
}

/// Client that returns a future for each call.
///
/// The future settles exactly once. It cannot be cancelled, only dropped.
///
/// # Example
///
/// ```ignore
/// let client = ClientBuilder::new("http://localhost:8080").build_promise()?;
///
/// let user = client.unary(&GET_USER, &UserId { id: 1 }, CallOptions::new()).await?;
/// println!("{}", user.name);
/// ```
#[derive(Clone, Debug)]
pub struct PromiseClient {
    core: ClientCore,
}

impl PromiseClient {
    pub fn new(
        hostname: impl AsRef<str>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            core: ClientCore::new(hostname.as_ref(), transport, None)?,
        })
    }

    pub fn builder(hostname: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(hostname)
    }

    pub(crate) fn from_core(core: ClientCore) -> Self {
        Self { core }
    }

    pub fn hostname(&self) -> &str {
        &self.core.hostname
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.core.transport
    }

    /// Issue a unary call.
    pub fn unary<Req, Res>(
        &self,
        descriptor: &MethodDescriptor<Req, Res>,
        request: &Req::Message,
        options: CallOptions,
    ) -> UnaryFuture<UnaryResponse<Res::Message>>
    where
        Req: Codec,
        Res: Codec,
    {
        match self.core.prepare(descriptor, request, options) {
            Ok((url, body, options)) => {
                self.core
                    .transport
                    .future_call(url, body, descriptor, options)
            }
            Err(err) => UnaryFuture::new(PendingCall::failed(err)),
        }
    }
}
