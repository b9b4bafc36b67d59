//! Response wrapper for unary calls.

use std::ops::Deref;

use crate::metadata::Metadata;

/// A decoded response message together with the metadata the peer returned.
///
/// Derefs to the message, so fields can be read directly.
///
/// # Example
///
/// ```ignore
/// let response = client.get_user(&UserId { id: 1 }, CallOptions::new()).await?;
///
/// println!("name: {}", response.name);
/// let server = response.metadata().get("server");
/// let user = response.into_inner();
/// ```
#[derive(Debug, Clone)]
pub struct UnaryResponse<T> {
    inner: T,
    metadata: Metadata,
}

impl<T> UnaryResponse<T> {
    pub fn new(inner: T, metadata: Metadata) -> Self {
        Self { inner, metadata }
    }

    /// Consume the response, returning the message.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Response headers and trailers.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Transform the message, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> UnaryResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        UnaryResponse {
            inner: f(self.inner),
            metadata: self.metadata,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_parts(self) -> (T, Metadata) {
        (self.inner, self.metadata)
    }
}

impl<T> Deref for UnaryResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> AsRef<T> for UnaryResponse<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_response_deref_and_into_inner() {
        let response = UnaryResponse::new(String::from("Alice"), Metadata::new());
        assert_eq!(response.len(), 5);
        assert_eq!(response.into_inner(), "Alice");
    }

    #[test]
    fn test_unary_response_map_keeps_metadata() {
        let metadata: Metadata = [("server", "envoy")].into_iter().collect();
        let response = UnaryResponse::new(21_i64, metadata).map(|n| n * 2);

        let (value, metadata) = response.into_parts();
        assert_eq!(value, 42);
        assert_eq!(metadata.get("server"), Some("envoy"));
    }
}
