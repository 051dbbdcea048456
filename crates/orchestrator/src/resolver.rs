//! Blob URL resolution seam.
//!
//! The surrounding application keeps documents in blob storage and
//! resolves opaque locators to time-limited read-only URLs. The
//! orchestrator only consumes the seam; presigning itself stays a
//! collaborator concern.

use std::time::Duration;

use async_trait::async_trait;
use redline_core::error::ResolveError;

/// Resolves a document locator to a fetchable URL.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolve `document_ref` to a read-only URL valid for at least
    /// `ttl`. [`ResolveError::Unavailable`] if the object is missing.
    async fn resolve(&self, document_ref: &str, ttl: Duration) -> Result<String, ResolveError>;
}

/// Resolver for deployments whose document refs already are URLs the
/// remote service can fetch.
pub struct PassthroughResolver;

#[async_trait]
impl UrlResolver for PassthroughResolver {
    async fn resolve(&self, document_ref: &str, _ttl: Duration) -> Result<String, ResolveError> {
        if document_ref.starts_with("http://") || document_ref.starts_with("https://") {
            Ok(document_ref.to_string())
        } else {
            Err(ResolveError::Unavailable(document_ref.to_string()))
        }
    }
}
