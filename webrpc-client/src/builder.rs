//! Client builder.
//!
//! Provides a fluent API for assembling a [`CallbackClient`] or a
//! [`PromiseClient`].

use std::sync::Arc;
use std::time::Duration;

use crate::client::{CallbackClient, ClientCore, PromiseClient};
use crate::error::ClientBuildError;
use crate::transport::{HyperTransport, Transport};

/// Builder for the service clients.
///
/// Without an explicit transport a [`HyperTransport`] with default settings is
/// created.
///
/// # Example
///
/// ```ignore
/// use webrpc_client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new("http://localhost:8080")
///     .timeout(Duration::from_secs(10))
///     .build_promise()?;
/// ```
pub struct ClientBuilder {
    hostname: String,
    transport: Option<Arc<dyn Transport>>,
    /// Applied to calls whose options carry no timeout.
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("hostname", &self.hostname)
            .field("transport", &self.transport.as_ref().map(|t| t.encoding()))
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ClientBuilder {
    /// Start a builder for `hostname`, e.g. `http://localhost:8080`.
    ///
    /// A single trailing `/` is stripped when the client is built.
    pub fn new<S: Into<String>>(hostname: S) -> Self {
        Self {
            hostname: hostname.into(),
            transport: None,
            default_timeout: None,
        }
    }

    /// Share an existing transport (and its connection pool).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_transport<T: Transport>(self, transport: T) -> Self {
        self.transport(Arc::new(transport))
    }

    /// Default timeout for calls that do not set one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    fn build_core(self) -> Result<ClientCore, ClientBuildError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };
        ClientCore::new(&self.hostname, transport, self.default_timeout)
    }

    pub fn build_callback(self) -> Result<CallbackClient, ClientBuildError> {
        self.build_core().map(CallbackClient::from_core)
    }

    pub fn build_promise(self) -> Result<PromiseClient, ClientBuildError> {
        self.build_core().map(PromiseClient::from_core)
    }
}
