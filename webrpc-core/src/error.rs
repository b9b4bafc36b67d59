//! gRPC status codes and the status carried by application errors.
//!
//! - [`Code`]: Canonical status codes as sent in the `grpc-status` trailer
//! - [`Status`]: Code, message and opaque details returned by the remote peer

use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize, Serializer};

/// Canonical RPC status codes, numbered as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Ok = 0,
    Canceled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// Map a numeric `grpc-status` value to a code.
    ///
    /// Values outside the canonical range become [`Code::Unknown`].
    pub fn from_i32(value: i32) -> Code {
        match value {
            0 => Code::Ok,
            1 => Code::Canceled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::Unknown,
        }
    }

    /// The numeric value sent in the `grpc-status` trailer.
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Map an HTTP status to a code, for responses that carry no `grpc-status`.
    ///
    /// Follows the gRPC HTTP-to-status mapping used by gRPC-Web proxies.
    pub fn from_http_status(status: http::StatusCode) -> Code {
        match status.as_u16() {
            200 => Code::Ok,
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`Code`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseCodeError(());

impl std::fmt::Display for ParseCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown status code")
    }
}

impl std::error::Error for ParseCodeError {}

impl FromStr for Code {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Code::Ok),
            "canceled" | "cancelled" => Ok(Code::Canceled),
            "unknown" => Ok(Code::Unknown),
            "invalid_argument" => Ok(Code::InvalidArgument),
            "deadline_exceeded" => Ok(Code::DeadlineExceeded),
            "not_found" => Ok(Code::NotFound),
            "already_exists" => Ok(Code::AlreadyExists),
            "permission_denied" => Ok(Code::PermissionDenied),
            "resource_exhausted" => Ok(Code::ResourceExhausted),
            "failed_precondition" => Ok(Code::FailedPrecondition),
            "aborted" => Ok(Code::Aborted),
            "out_of_range" => Ok(Code::OutOfRange),
            "unimplemented" => Ok(Code::Unimplemented),
            "internal" => Ok(Code::Internal),
            "unavailable" => Ok(Code::Unavailable),
            "data_loss" => Ok(Code::DataLoss),
            "unauthenticated" => Ok(Code::Unauthenticated),
            _ => Err(ParseCodeError(())),
        }
    }
}

/// Status returned by the remote peer for a call that did not succeed.
///
/// The `details` are the raw bytes of `grpc-status-details-bin` (an encoded
/// `google.rpc.Status`), left undecoded.
///
/// # Example
///
/// ```
/// use webrpc_core::{Code, Status};
///
/// let status = Status::not_found("user 42 does not exist");
/// assert_eq!(status.code(), Code::NotFound);
/// assert_eq!(status.message(), Some("user 42 does not exist"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    code: Code,
    message: Option<String>,
    details: Option<Bytes>,
}

impl Status {
    /// Create a new status with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code,
            message: Some(message.into()),
            details: None,
        }
    }

    /// Create a new status with just a code.
    pub fn from_code(code: Code) -> Self {
        Self {
            code,
            message: None,
            details: None,
        }
    }

    /// Attach the raw `grpc-status-details-bin` payload.
    pub fn with_details(mut self, details: Bytes) -> Self {
        self.details = Some(details);
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn details(&self) -> Option<&Bytes> {
        self.details.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    /// Create a not found status.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// Create an invalid argument status.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Create an internal status.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Create an unavailable status.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Unavailable, message)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(msg) = &self.message {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for Status {}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("Status", 2)?;
        s.serialize_field("code", &self.code)?;
        s.serialize_field("message", &self.message)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::Ok.as_str(), "ok");
        assert_eq!(Code::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(Code::Unauthenticated.as_str(), "unauthenticated");
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!("ok".parse(), Ok(Code::Ok));
        assert_eq!("not_found".parse(), Ok(Code::NotFound));
        assert_eq!("cancelled".parse(), Ok(Code::Canceled));
        assert_eq!("bogus".parse::<Code>(), Err(ParseCodeError(())));
    }

    #[test]
    fn test_code_numeric_round_trip() {
        for n in 0..=16 {
            assert_eq!(Code::from_i32(n).as_i32(), n);
        }
        assert_eq!(Code::from_i32(17), Code::Unknown);
        assert_eq!(Code::from_i32(-1), Code::Unknown);
    }

    #[test]
    fn test_code_from_http_status() {
        use http::StatusCode;

        assert_eq!(Code::from_http_status(StatusCode::OK), Code::Ok);
        assert_eq!(Code::from_http_status(StatusCode::BAD_REQUEST), Code::Internal);
        assert_eq!(
            Code::from_http_status(StatusCode::UNAUTHORIZED),
            Code::Unauthenticated
        );
        assert_eq!(
            Code::from_http_status(StatusCode::FORBIDDEN),
            Code::PermissionDenied
        );
        assert_eq!(Code::from_http_status(StatusCode::NOT_FOUND), Code::Unimplemented);
        assert_eq!(
            Code::from_http_status(StatusCode::SERVICE_UNAVAILABLE),
            Code::Unavailable
        );
        assert_eq!(Code::from_http_status(StatusCode::IM_A_TEAPOT), Code::Unknown);
    }

    #[test]
    fn test_code_serde() {
        let json = serde_json::to_string(&Code::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
        let code: Code = serde_json::from_str("\"deadline_exceeded\"").unwrap();
        assert_eq!(code, Code::DeadlineExceeded);
    }

    #[test]
    fn test_status_display() {
        let status = Status::not_found("resource missing");
        assert_eq!(status.to_string(), "not_found: resource missing");

        let status = Status::from_code(Code::Internal);
        assert_eq!(status.to_string(), "internal");
    }

    #[test]
    fn test_status_details() {
        let status = Status::internal("boom").with_details(Bytes::from_static(&[8, 13]));
        assert_eq!(status.details().map(|d| d.as_ref()), Some(&[8u8, 13][..]));
        assert!(!status.is_ok());
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_value(Status::not_found("gone")).unwrap();
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["message"], "gone");
    }
}
