//! Per-call metadata.
//!
//! [`Metadata`] is a string-to-string map. On requests it becomes HTTP headers;
//! on responses it collects the headers and trailers the peer sent back. Keys
//! are stored lowercase, as HTTP header names are case-insensitive.

use std::collections::BTreeMap;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// String-keyed call metadata.
///
/// # Example
///
/// ```
/// use webrpc_client::Metadata;
///
/// let mut metadata = Metadata::new();
/// metadata.insert("Authorization", "Bearer token123");
/// assert_eq!(metadata.get("authorization"), Some("Bearer token123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the previous value for the key.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .insert(key.into().to_ascii_lowercase(), value.into())
    }

    /// Get a value by key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&key.to_ascii_lowercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy entries from `other`, overwriting keys present in both.
    pub fn extend(&mut self, other: &Metadata) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Collect headers into metadata.
    ///
    /// Values that are not visible ASCII are skipped; repeated headers are
    /// joined with `", "`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut metadata = Self::new();
        metadata.append_headers(headers);
        metadata
    }

    pub(crate) fn append_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            let Ok(value) = value.to_str() else {
                continue;
            };
            self.entries
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    /// Write every entry into `headers`.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), ClientError> {
        for (key, value) in &self.entries {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ClientError::Transport(format!("invalid metadata key {key:?}")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ClientError::Transport(format!("invalid metadata value for {key:?}"))
            })?;
            headers.insert(name, value);
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_case_insensitive() {
        let mut metadata = Metadata::new();
        assert_eq!(metadata.insert("X-Request-Id", "abc"), None);
        assert_eq!(metadata.insert("x-request-id", "def"), Some("abc".to_string()));

        assert_eq!(metadata.get("X-REQUEST-ID"), Some("def"));
        assert!(metadata.contains("x-request-id"));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_metadata_from_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("content-type", HeaderValue::from_static("application/grpc-web+proto"));

        let metadata = Metadata::from_headers(&headers);
        assert_eq!(metadata.get("x-tag"), Some("a, b"));
        assert_eq!(metadata.get("content-type"), Some("application/grpc-web+proto"));
    }

    #[test]
    fn test_metadata_write_headers() {
        let metadata: Metadata = [("authorization", "Bearer t"), ("x-trace", "1")]
            .into_iter()
            .collect();

        let mut headers = HeaderMap::new();
        metadata.write_headers(&mut headers).unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer t");
        assert_eq!(headers.get("x-trace").unwrap(), "1");
    }

    #[test]
    fn test_metadata_write_headers_rejects_invalid_key() {
        let metadata: Metadata = [("bad key", "v")].into_iter().collect();
        let err = metadata.write_headers(&mut HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn test_metadata_serde() {
        let metadata: Metadata = [("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"a":"1"}"#);
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
