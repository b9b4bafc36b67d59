//! Call options for per-request configuration.
//!
//! [`CallOptions`] carries the metadata and timeout of one call. The client
//! never interprets either: both are forwarded to the [`Transport`](crate::Transport).

use std::time::Duration;

use crate::metadata::Metadata;

/// Options for configuring individual RPC calls.
///
/// # Example
///
/// ```ignore
/// use webrpc_client::CallOptions;
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .insert("authorization", "Bearer token123");
///
/// let user = client.get_user(&UserId { id: 1 }, options).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Overrides the client's default timeout when set.
    pub(crate) timeout: Option<Duration>,
    pub(crate) metadata: Metadata,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call.
    ///
    /// Sent to the peer as `grpc-timeout` and enforced locally by the
    /// transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Replace all metadata for this call.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata entry.
    ///
    /// Keys beginning with `grpc-` are reserved for the protocol. Applications
    /// may read them but should not write them.
    pub fn insert<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.insert(key, value);
        self
    }

    pub fn get_metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl From<Metadata> for CallOptions {
    fn from(metadata: Metadata) -> Self {
        CallOptions::new().metadata(metadata)
    }
}

/// Largest value representable in a `grpc-timeout` header (8 digits).
const MAX_TIMEOUT_DIGITS: u128 = 99_999_999;

/// Encode a duration as a `grpc-timeout` header value.
///
/// Uses the finest unit whose value fits in eight digits. Returns `None` for a
/// zero duration or one too large for any unit.
pub(crate) fn duration_to_grpc_timeout(duration: Duration) -> Option<String> {
    if duration.is_zero() {
        return None;
    }

    let nanos = duration.as_nanos();
    let units: [(u128, char); 6] = [
        (1, 'n'),
        (1_000, 'u'),
        (1_000_000, 'm'),
        (1_000_000_000, 'S'),
        (60_000_000_000, 'M'),
        (3_600_000_000_000, 'H'),
    ];

    units.iter().find_map(|&(per_unit, suffix)| {
        let value = nanos.div_ceil(per_unit);
        (value <= MAX_TIMEOUT_DIGITS).then(|| format!("{value}{suffix}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_default() {
        let options = CallOptions::new();
        assert!(options.timeout.is_none());
        assert!(options.metadata.is_empty());
    }

    #[test]
    fn test_call_options_combined() {
        let options = CallOptions::new()
            .timeout(Duration::from_secs(30))
            .insert("authorization", "Bearer token");

        assert_eq!(options.get_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            options.get_metadata().get("authorization"),
            Some("Bearer token")
        );
    }

    #[test]
    fn test_call_options_metadata_replaces() {
        let metadata: Metadata = [("x-a", "1")].into_iter().collect();
        let options = CallOptions::new().insert("x-b", "2").metadata(metadata);

        assert!(options.get_metadata().contains("x-a"));
        assert!(!options.get_metadata().contains("x-b"));
    }

    #[test]
    fn test_duration_to_grpc_timeout() {
        assert_eq!(
            duration_to_grpc_timeout(Duration::from_millis(1)),
            Some("1000000n".to_string())
        );
        assert_eq!(
            duration_to_grpc_timeout(Duration::from_secs(30)),
            Some("30000000u".to_string())
        );
        assert_eq!(
            duration_to_grpc_timeout(Duration::from_secs(100)),
            Some("100000m".to_string())
        );
        assert_eq!(
            duration_to_grpc_timeout(Duration::from_secs(1_000_000)),
            Some("1000000S".to_string())
        );
        assert_eq!(duration_to_grpc_timeout(Duration::ZERO), None);
    }
}
