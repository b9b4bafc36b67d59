//! Descriptor-driven gRPC-Web unary client.
//!
//! A service is declared as data: a table of [`MethodDescriptor`]s, each
//! holding a method path and the codecs for its request and response. A client
//! holds a hostname and a shared [`Transport`] and dispatches any descriptor in
//! the table through one of two calling conventions:
//!
//! - [`CallbackClient`]: the outcome is delivered to a callback exactly once,
//!   and the call can be cancelled through the returned [`CallHandle`]
//! - [`PromiseClient`]: the outcome is a [`UnaryFuture`] that settles exactly
//!   once and cannot be cancelled
//!
//! Both are built on the same settle-once [`PendingCall`] primitive.
//!
//! ## Example
//!
//! ```ignore
//! use webrpc_client::{CallOptions, ClientBuilder};
//!
//! webrpc_client::unary_service! {
//!     service "example.UserService" {
//!         descriptors: user_service;
//!         callback: UserServiceClient;
//!         promise: UserServicePromiseClient;
//!
//!         rpc GetUser(UserId) returns (User) => get_user;
//!     }
//! }
//!
//! let client = UserServicePromiseClient::connect("http://localhost:8080")?;
//! let user = client.get_user(&UserId { id: 1 }, CallOptions::new()).await?;
//! println!("{}", user.name);
//! ```
//!
//! ## Cancellation
//!
//! ```ignore
//! let client = UserServiceClient::connect("http://localhost:8080")?;
//!
//! let handle = client.get_user(&UserId { id: 1 }, CallOptions::new(), |outcome| {
//!     // Invoked once: with the user, with an error, or with ClientError::Cancelled.
//! });
//!
//! if let Some(handle) = handle {
//!     handle.cancel();
//! }
//! ```
//!
//! Cancellation is best-effort: a call whose response already arrived settles
//! with that response and `cancel` returns false.
//!
//! ## Errors
//!
//! Every failure is a [`ClientError`]; [`ClientError::kind`] separates
//! transport failures, protocol violations (including responses that fail to
//! decode), application errors carrying the peer's [`Status`], and
//! cancellation.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificates |
//! | `tracing` (default) | Tracing spans for RPC calls |
//!
//! When `tracing` is enabled, each call runs in an `rpc.call` span with:
//! - `rpc.method`: Full method path (e.g., "/example.UserService/GetUser")
//! - `rpc.type`: "unary"
//! - `rpc.encoding`: Wire encoding ("grpc-web-text" or "grpc-web+proto")
//! - `otel.kind`: "client"

mod builder;
mod call;
mod client;
mod error;
mod macros;
mod metadata;
mod options;
mod response;
pub mod transport;

pub use builder::ClientBuilder;
pub use call::{CallHandle, CallState, PendingCall, UnaryFuture, spawn_callback};
pub use client::{CallbackClient, PromiseClient};
pub use error::{ClientBuildError, ClientError, ErrorKind};
pub use metadata::Metadata;
pub use options::CallOptions;
pub use response::UnaryResponse;
pub use transport::{
    HyperTransport, HyperTransportBuilder, Transport, TransportExt, TransportRequest,
    TransportResponse, WireFormat,
};

// Re-export core types
pub use webrpc_core::{
    Code, Codec, DecodeError, MethodDescriptor, MethodInfo, MethodType, ProstCodec,
    ProstMethodDescriptor, ServiceDescriptor, Status,
};
