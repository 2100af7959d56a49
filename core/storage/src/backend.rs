//! Provider primitive trait.
//!
//! An `ObjectBackend` is the thin layer over one provider's API. It speaks
//! in full object keys and plain `Result`s; naming, validation, retries and
//! result normalization live in the drivers built on top of it.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use unistore_common::{Error, ObjectInfo, ObjectKey, ObjectPage, Result, UploadOptions};

/// How much a provider's signed upload URL can enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningSupport {
    /// Content type and length are part of the signature; mismatching
    /// writes are rejected by the provider.
    Enforcing,
    /// The signature grants write permission only. Uploaded objects must
    /// be validated afterwards.
    NonEnforcing,
    /// The backend cannot produce signed URLs at all.
    Unsupported,
}

impl SigningSupport {
    /// Whether uploads through a signed URL need a validation call.
    pub fn requires_validation(&self) -> bool {
        matches!(self, SigningSupport::NonEnforcing)
    }
}

/// Constraints to bind into a signed upload URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadConstraints {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Storage backend trait for different providers.
///
/// Implementations must handle their own authentication. Transient
/// failures should surface as `Error::Network`, `Error::Throttled` or a
/// 5xx `Error::Provider` so drivers can retry them.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Get the backend name (e.g., "s3", "azure", "local").
    fn name(&self) -> &str;

    /// What signed upload URLs from this backend can enforce.
    fn signing_support(&self) -> SigningSupport;

    /// Fail if this backend was built without material to sign URLs.
    ///
    /// Presigned drivers call this once at construction.
    fn check_signing(&self) -> Result<()> {
        match self.signing_support() {
            SigningSupport::Unsupported => Err(Error::Configuration(format!(
                "The {} backend cannot generate signed URLs",
                self.name()
            ))),
            _ => Ok(()),
        }
    }

    /// Store an object, replacing any existing one.
    async fn put_object(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<()>;

    /// Remove an object.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn delete_object(&self, key: &ObjectKey) -> Result<()>;

    /// Fetch stored metadata for an object.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn head_object(&self, key: &ObjectKey) -> Result<ObjectInfo>;

    /// List objects whose key starts with `prefix`.
    ///
    /// `prefix` is a full key prefix (already including any configured
    /// path prefix).
    async fn list_objects(
        &self,
        prefix: &str,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage>;

    /// Durable (unsigned) URL of an object.
    fn object_url(&self, key: &ObjectKey) -> String;

    /// Signed URL allowing a single `PUT` of `key`.
    async fn presign_upload(
        &self,
        key: &ObjectKey,
        constraints: &UploadConstraints,
        expires_in: Duration,
    ) -> Result<String>;

    /// Signed URL allowing `GET` of `key`.
    async fn presign_view(&self, key: &ObjectKey, expires_in: Duration) -> Result<String>;
}
