//! Client-side error taxonomy.
//!
//! Every failure delivered to a caller, through either calling convention, is a
//! [`ClientError`]. Callers branch on [`ClientError::kind`] to tell "the server
//! said no" apart from "the server could not be reached".

use std::time::Duration;

use http::StatusCode;
use webrpc_core::{Code, DecodeError, FrameError, Status};

/// Coarse classification of a [`ClientError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The exchange could not be completed.
    Transport,
    /// The peer answered, but not with a valid response for this method.
    Protocol,
    /// The peer answered with a non-OK status.
    Application,
    /// The caller cancelled the call before it settled.
    Cancelled,
}

/// Error delivered for a call that did not succeed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection failure, unreadable body or missing runtime.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not settle within its deadline.
    #[error("transport error: deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// An HTTP error response without `grpc-status`, usually from a proxy.
    #[error("transport error: unexpected HTTP status {0}")]
    HttpStatus(StatusCode),

    /// Malformed frames, missing message or a response that fails to decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A well-formed error status returned by the peer.
    #[error("application error: {0}")]
    Application(Status),

    /// Cancelled through its [`CallHandle`](crate::CallHandle).
    #[error("call cancelled")]
    Cancelled,
}

impl ClientError {
    /// Create an application error with a code and message.
    pub fn application<S: Into<String>>(code: Code, message: S) -> Self {
        ClientError::Application(Status::new(code, message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::HttpStatus(_) => {
                ErrorKind::Transport
            }
            ClientError::Protocol(_) => ErrorKind::Protocol,
            ClientError::Application(_) => ErrorKind::Application,
            ClientError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Get the status code.
    ///
    /// For variants that carry no peer status:
    /// - Transport: `Unavailable`
    /// - Timeout: `DeadlineExceeded`
    /// - HttpStatus: mapped with [`Code::from_http_status`]
    /// - Protocol: `Internal`
    /// - Cancelled: `Canceled`
    pub fn code(&self) -> Code {
        match self {
            ClientError::Application(status) => status.code(),
            ClientError::Transport(_) => Code::Unavailable,
            ClientError::Timeout(_) => Code::DeadlineExceeded,
            ClientError::HttpStatus(status) => Code::from_http_status(*status),
            ClientError::Protocol(_) => Code::Internal,
            ClientError::Cancelled => Code::Canceled,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> Option<&str> {
        match self {
            ClientError::Application(status) => status.message(),
            ClientError::Transport(msg) | ClientError::Protocol(msg) => Some(msg),
            ClientError::Timeout(_) | ClientError::HttpStatus(_) | ClientError::Cancelled => None,
        }
    }

    /// The peer status, for application errors.
    pub fn status(&self) -> Option<&Status> {
        match self {
            ClientError::Application(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        ClientError::Application(status)
    }
}

impl From<DecodeError> for ClientError {
    fn from(err: DecodeError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

/// Error raised while assembling a client or transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid hostname {hostname:?}: {reason}")]
    InvalidHostname { hostname: String, reason: &'static str },

    #[error("invalid user agent: {0}")]
    InvalidUserAgent(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),
}
