//! Method and service descriptor tables.
//!
//! A [`MethodDescriptor`] declares one RPC method as data: its path, call type
//! and the codecs for its request and response. It holds no hostname and no
//! reference to any client, so one table is shared read-only by every client
//! instance and every in-flight call.
//!
//! A [`ServiceDescriptor`] is the type-erased view of a whole table, used to
//! check path uniqueness and to look methods up by name.

use crate::codec::{Codec, ProstCodec};

/// How many messages flow in each direction.
///
/// Only [`MethodType::Unary`] is dispatched by the client runtime; the other
/// variants exist so that tables generated from a full schema can still be
/// declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MethodType {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodType::Unary => "unary",
            MethodType::ServerStreaming => "server_stream",
            MethodType::ClientStreaming => "client_stream",
            MethodType::BidiStreaming => "bidi_stream",
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, MethodType::Unary)
    }
}

/// Errors found while validating descriptor tables.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Path is not of the form `/{service}/{method}`.
    #[error("invalid method path {0:?}: expected /{{service}}/{{method}}")]
    InvalidPath(String),

    /// Two methods of one service share a path.
    #[error("duplicate method path {0:?}")]
    DuplicatePath(String),

    /// A method path names a different service than its table.
    #[error("method path {path:?} does not belong to service {service:?}")]
    ServiceMismatch { path: String, service: String },
}

/// Returns true if `path` is `/{service}/{method}` with both segments non-empty.
pub const fn is_valid_method_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.len() < 4 || bytes[0] != b'/' {
        return false;
    }
    let mut slashes = 0;
    let mut separator = 0;
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'/' {
            slashes += 1;
            separator = i;
        }
        i += 1;
    }
    slashes == 1 && separator > 1 && separator < bytes.len() - 1
}

/// Immutable description of one RPC method.
///
/// `Req` and `Res` are the request and response [`Codec`]s.
///
/// # Example
///
/// ```ignore
/// use webrpc_core::{MethodDescriptor, MethodType, ProstCodec};
///
/// pub const GET_USER: MethodDescriptor<ProstCodec<UserId>, ProstCodec<User>> =
///     MethodDescriptor::new(
///         "/example.UserService/GetUser",
///         MethodType::Unary,
///         ProstCodec::new(),
///         ProstCodec::new(),
///     );
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MethodDescriptor<Req, Res> {
    path: &'static str,
    method_type: MethodType,
    request_codec: Req,
    response_codec: Res,
}

/// Descriptor whose codecs are both [`ProstCodec`].
pub type ProstMethodDescriptor<Req, Res> = MethodDescriptor<ProstCodec<Req>, ProstCodec<Res>>;

impl<Req, Res> MethodDescriptor<Req, Res>
where
    Req: Codec,
    Res: Codec,
{
    /// Create a descriptor.
    ///
    /// The path is not checked here so that tables can be `const`; use
    /// [`ServiceDescriptor::validate`] or [`MethodDescriptor::try_new`].
    pub const fn new(
        path: &'static str,
        method_type: MethodType,
        request_codec: Req,
        response_codec: Res,
    ) -> Self {
        Self {
            path,
            method_type,
            request_codec,
            response_codec,
        }
    }

    /// Create a descriptor, reporting a malformed path as an error.
    pub fn try_new(
        path: &'static str,
        method_type: MethodType,
        request_codec: Req,
        response_codec: Res,
    ) -> Result<Self, DescriptorError> {
        if !is_valid_method_path(path) {
            return Err(DescriptorError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            path,
            method_type,
            request_codec,
            response_codec,
        })
    }

    /// Full method path, e.g. `/example.UserService/GetUser`.
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn method_type(&self) -> MethodType {
        self.method_type
    }

    pub fn request_codec(&self) -> &Req {
        &self.request_codec
    }

    pub fn response_codec(&self) -> &Res {
        &self.response_codec
    }

    /// Fully-qualified service name, e.g. `example.UserService`.
    pub fn service_name(&self) -> &'static str {
        split_path(self.path).0
    }

    /// Method name, e.g. `GetUser`.
    pub fn method_name(&self) -> &'static str {
        split_path(self.path).1
    }

    /// Type-erased entry for a [`ServiceDescriptor`] table.
    pub const fn info(&self, name: &'static str) -> MethodInfo {
        MethodInfo {
            name,
            path: self.path,
            method_type: self.method_type,
        }
    }
}

fn split_path(path: &'static str) -> (&'static str, &'static str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split_once('/').unwrap_or((trimmed, ""))
}

/// Codec-free description of one method, as listed in a [`ServiceDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: &'static str,
    pub path: &'static str,
    pub method_type: MethodType,
}

/// The method table of one service.
///
/// Built once (usually as a `static`) and never mutated.
#[derive(Clone, Copy, Debug)]
pub struct ServiceDescriptor {
    name: &'static str,
    methods: &'static [MethodInfo],
}

impl ServiceDescriptor {
    pub const fn new(name: &'static str, methods: &'static [MethodInfo]) -> Self {
        Self { name, methods }
    }

    /// Fully-qualified service name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn methods(&self) -> &'static [MethodInfo] {
        self.methods
    }

    /// Look up a method by its name (e.g. `GetUser`).
    pub fn get(&self, method: &str) -> Option<&'static MethodInfo> {
        self.methods.iter().find(|m| m.name == method)
    }

    /// Look up a method by its full path.
    pub fn by_path(&self, path: &str) -> Option<&'static MethodInfo> {
        self.methods.iter().find(|m| m.path == path)
    }

    /// Check that every path is well-formed, belongs to this service and is
    /// unique within the table.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        for (i, method) in self.methods.iter().enumerate() {
            if !is_valid_method_path(method.path) {
                return Err(DescriptorError::InvalidPath(method.path.to_string()));
            }
            if split_path(method.path).0 != self.name {
                return Err(DescriptorError::ServiceMismatch {
                    path: method.path.to_string(),
                    service: self.name.to_string(),
                });
            }
            if self.methods[..i].iter().any(|m| m.path == method.path) {
                return Err(DescriptorError::DuplicatePath(method.path.to_string()));
            }
        }
        Ok(())
    }
}
