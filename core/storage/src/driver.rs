//! The driver contract every storage backend satisfies.
//!
//! Callers only ever see `StorageDriver`. Every operation returns a
//! normalized outcome value; nothing here returns a provider error.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use unistore_common::config::DEFAULT_BATCH_CONCURRENCY;
use unistore_common::{
    DeleteOutcome, ListOutcome, PresignedGrant, UploadOptions, UploadResult, UploadTarget,
    ValidationOutcome, ValidationRequest,
};

/// One entry of a batch upload-grant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    /// Caller's original file name; a stored name is derived from it.
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl GrantRequest {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            file_size: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }
}

/// Storage driver trait.
///
/// Batch operations fan out over the single-item primitive with at most
/// `batch_concurrency()` items in flight. Results are positionally matched
/// to the input and one item's failure never aborts its siblings.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name as used in configuration (e.g. "s3-presigned").
    fn name(&self) -> &str;

    /// Whether this driver issues signed upload URLs.
    fn is_presigned(&self) -> bool {
        false
    }

    /// Whether signed uploads must be followed by `validate_and_confirm`.
    fn requires_validation(&self) -> bool {
        false
    }

    /// Maximum batch items in flight.
    fn batch_concurrency(&self) -> usize {
        DEFAULT_BATCH_CONCURRENCY
    }

    /// Validate and store one file under a freshly generated name.
    async fn upload(&self, target: UploadTarget, options: &UploadOptions) -> UploadResult;

    /// Delete one stored object, reporting why it failed.
    async fn delete_file(&self, stored_name: &str) -> DeleteOutcome;

    /// Delete one stored object. `false` when it did not exist or could
    /// not be removed.
    async fn delete(&self, stored_name: &str) -> bool {
        self.delete_file(stored_name).await.success
    }

    /// Whether a stored object currently exists.
    async fn exists(&self, stored_name: &str) -> bool;

    /// Issue a write URL for a new object derived from `file_name`.
    async fn generate_upload_grant(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        file_size: Option<u64>,
    ) -> PresignedGrant;

    /// Issue a read URL for an existing stored object.
    async fn generate_view_grant(&self, stored_name: &str) -> PresignedGrant;

    /// One page of objects, optionally narrowed by `prefix` (relative to
    /// the configured path prefix).
    async fn list_objects(
        &self,
        prefix: Option<&str>,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> ListOutcome;

    /// Confirm an object uploaded through a signed URL.
    ///
    /// The default suits drivers whose signature already enforced type and
    /// size at write time: it only checks that a view URL can be issued and
    /// that the object exists. Drivers whose signature cannot enforce
    /// constraints must override this and compare stored metadata.
    async fn validate_and_confirm(
        &self,
        stored_name: &str,
        _request: &ValidationRequest,
    ) -> ValidationOutcome {
        confirm_by_existence(self, stored_name).await
    }

    /// Upload several files.
    async fn upload_multiple(
        &self,
        targets: Vec<UploadTarget>,
        options: &UploadOptions,
    ) -> Vec<UploadResult> {
        let limit = self.batch_concurrency().max(1);
        stream::iter(targets)
            .map(|target| self.upload(target, options))
            .buffered(limit)
            .collect()
            .await
    }

    /// Delete several objects. Never stops at the first failure.
    async fn delete_multiple(&self, stored_names: &[String]) -> Vec<DeleteOutcome> {
        let limit = self.batch_concurrency().max(1);
        stream::iter(stored_names.to_vec())
            .map(|name| async move { self.delete_file(&name).await })
            .buffered(limit)
            .collect()
            .await
    }

    /// Issue several write URLs.
    async fn generate_multiple_upload_grants(
        &self,
        requests: &[GrantRequest],
    ) -> Vec<PresignedGrant> {
        let limit = self.batch_concurrency().max(1);
        stream::iter(requests.to_vec())
            .map(|req| async move {
                self.generate_upload_grant(
                    &req.file_name,
                    req.content_type.as_deref(),
                    req.file_size,
                )
                .await
            })
            .buffered(limit)
            .collect()
            .await
    }

    /// Issue several read URLs.
    async fn generate_multiple_view_grants(&self, stored_names: &[String]) -> Vec<PresignedGrant> {
        let limit = self.batch_concurrency().max(1);
        stream::iter(stored_names.to_vec())
            .map(|name| async move { self.generate_view_grant(&name).await })
            .buffered(limit)
            .collect()
            .await
    }
}

/// Confirm a stored object by issuing a view URL and checking it exists.
///
/// Nothing about the stored object is compared; use this only where the
/// signed upload URL already pinned content type and length.
pub async fn confirm_by_existence<D>(driver: &D, stored_name: &str) -> ValidationOutcome
where
    D: StorageDriver + ?Sized,
{
    let grant = driver.generate_view_grant(stored_name).await;
    if !grant.success {
        let error = grant
            .error
            .unwrap_or_else(|| "Failed to generate view URL".to_string());
        return ValidationOutcome::failed(stored_name, error);
    }

    if !driver.exists(stored_name).await {
        return ValidationOutcome::failed(stored_name, format!("File not found: {}", stored_name));
    }

    ValidationOutcome::confirmed(stored_name, grant.view_url, grant.expires_in)
}
