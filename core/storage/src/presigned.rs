//! Presigned-URL driver.
//!
//! Wraps a `StandardDriver` and adds signed upload and view grants. Whether
//! uploads through a grant need validation afterwards depends on what the
//! backend's signature can enforce.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{SigningSupport, UploadConstraints};
use crate::driver::{confirm_by_existence, StorageDriver};
use crate::standard::{mime_essence, StandardDriver};
use unistore_common::{
    DeleteOutcome, Error, ListOutcome, ObjectInfo, PresignedGrant, Result, UploadOptions,
    UploadResult, UploadTarget, ValidationOutcome, ValidationRequest,
};

/// Driver issuing signed URLs for client-side uploads.
pub struct PresignedDriver {
    inner: StandardDriver,
    signing: SigningSupport,
}

impl PresignedDriver {
    /// Wrap `inner`.
    ///
    /// # Errors
    /// - `Error::Configuration` if the backend cannot sign URLs with the
    ///   credentials it was built with
    pub fn new(inner: StandardDriver) -> Result<Self> {
        inner.backend().check_signing()?;
        let signing = inner.backend().signing_support();
        Ok(Self { inner, signing })
    }

    pub fn signing_support(&self) -> SigningSupport {
        self.signing
    }

    fn expiry(&self) -> Duration {
        Duration::from_secs(self.inner.presigned_url_expiry())
    }

    async fn upload_grant(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        file_size: Option<u64>,
    ) -> Result<PresignedGrant> {
        self.inner
            .check_grant_request(file_name, content_type, file_size)?;
        let (stored_name, key) = self.inner.new_key(file_name)?;

        let constraints = UploadConstraints {
            content_type: content_type.map(String::from),
            content_length: file_size,
        };
        let url = self
            .inner
            .backend()
            .presign_upload(&key, &constraints, self.expiry())
            .await?;

        debug!("Issued upload grant for {}", key);
        Ok(PresignedGrant::upload(
            stored_name,
            key.as_key(),
            url,
            self.inner.presigned_url_expiry(),
            self.signing.requires_validation(),
        )
        .with_constraints(constraints.content_type, constraints.content_length))
    }

    async fn view_grant(&self, stored_name: &str) -> Result<PresignedGrant> {
        let key = self.inner.key_for(stored_name)?;
        let url = self
            .inner
            .backend()
            .presign_view(&key, self.expiry())
            .await?;
        Ok(PresignedGrant::view(
            stored_name,
            key.as_key(),
            url,
            self.inner.presigned_url_expiry(),
        ))
    }

    /// Compare stored metadata with what the caller expected.
    async fn validate_metadata(
        &self,
        stored_name: &str,
        request: &ValidationRequest,
    ) -> ValidationOutcome {
        let key = match self.inner.key_for(stored_name) {
            Ok(key) => key,
            Err(err) => return ValidationOutcome::failed(stored_name, err.to_string()),
        };

        let info = match self.inner.head(&key).await {
            Ok(info) => info,
            Err(Error::NotFound(_)) => {
                return ValidationOutcome::failed(
                    stored_name,
                    format!("File not found: {}", stored_name),
                )
            }
            Err(err) => {
                return ValidationOutcome::failed(
                    stored_name,
                    format!("Failed to read object metadata: {}", err),
                )
            }
        };

        let mismatches = mismatches(&info, request);
        if !mismatches.is_empty() {
            let reason = mismatches.join("; ");
            warn!("Validation of {} failed: {}", key, reason);

            if request.delete_on_failure {
                match self.inner.remove(&key).await {
                    Ok(()) => warn!("Deleted {} after failed validation", key),
                    Err(err) => warn!("Could not delete {} after failed validation: {}", key, err),
                }
            }

            return ValidationOutcome::failed(stored_name, format!("Validation failed: {}", reason))
                .with_observed(info.content_type, Some(info.size));
        }

        let view_url = match self.view_grant(stored_name).await {
            Ok(grant) => grant.view_url,
            Err(err) => {
                debug!("No view URL for validated {}: {}", key, err);
                None
            }
        };

        info!("Validated {}", key);
        ValidationOutcome::confirmed(stored_name, view_url, Some(self.inner.presigned_url_expiry()))
            .with_observed(info.content_type, Some(info.size))
    }
}

fn mismatches(info: &ObjectInfo, request: &ValidationRequest) -> Vec<String> {
    let mut problems = Vec::new();

    if let Some(expected) = &request.expected_content_type {
        let actual = info.content_type.as_deref().unwrap_or("");
        if mime_essence(expected) != mime_essence(actual) {
            problems.push(format!(
                "content type mismatch (expected {}, got {})",
                expected,
                if actual.is_empty() { "none" } else { actual }
            ));
        }
    }

    if let Some(expected) = request.expected_file_size {
        if expected != info.size {
            problems.push(format!(
                "file size mismatch (expected {}, got {})",
                expected, info.size
            ));
        }
    }

    problems
}

#[async_trait]
impl StorageDriver for PresignedDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_presigned(&self) -> bool {
        true
    }

    fn requires_validation(&self) -> bool {
        self.signing.requires_validation()
    }

    fn batch_concurrency(&self) -> usize {
        self.inner.batch_concurrency()
    }

    async fn upload(&self, target: UploadTarget, options: &UploadOptions) -> UploadResult {
        self.inner.upload(target, options).await
    }

    async fn delete_file(&self, stored_name: &str) -> DeleteOutcome {
        self.inner.delete_file(stored_name).await
    }

    async fn exists(&self, stored_name: &str) -> bool {
        self.inner.exists(stored_name).await
    }

    async fn generate_upload_grant(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        file_size: Option<u64>,
    ) -> PresignedGrant {
        self.upload_grant(file_name, content_type, file_size)
            .await
            .unwrap_or_else(|err| {
                debug!("Upload grant for {:?} refused: {}", file_name, err);
                PresignedGrant::from_error(&err)
            })
    }

    async fn generate_view_grant(&self, stored_name: &str) -> PresignedGrant {
        self.view_grant(stored_name)
            .await
            .unwrap_or_else(|err| PresignedGrant::from_error(&err))
    }

    async fn list_objects(
        &self,
        prefix: Option<&str>,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> ListOutcome {
        self.inner
            .list_objects(prefix, max_results, continuation_token)
            .await
    }

    async fn validate_and_confirm(
        &self,
        stored_name: &str,
        request: &ValidationRequest,
    ) -> ValidationOutcome {
        match self.signing {
            SigningSupport::NonEnforcing => self.validate_metadata(stored_name, request).await,
            _ => confirm_by_existence(self, stored_name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::retry::RetryPolicy;
    use bytes::Bytes;
    use std::sync::Arc;
    use unistore_common::{DriverKind, StorageConfig};

    fn driver(signing: SigningSupport) -> (Arc<MemoryBackend>, PresignedDriver) {
        let config = StorageConfig::new(DriverKind::S3Presigned)
            .with_bucket("bucket")
            .with_path_prefix("incoming")
            .with_presigned_url_expiry(120);
        let backend = Arc::new(MemoryBackend::new("bucket").with_signing(signing));
        let inner = StandardDriver::new("memory-presigned", backend.clone(), &config)
            .with_retry_policy(RetryPolicy::none());
        (backend, PresignedDriver::new(inner).unwrap())
    }

    #[test]
    fn test_construction_requires_signing() {
        let config = StorageConfig::new(DriverKind::S3Presigned).with_bucket("bucket");
        let backend =
            Arc::new(MemoryBackend::new("bucket").with_signing(SigningSupport::Unsupported));
        let inner = StandardDriver::new("x", backend, &config);
        assert!(matches!(PresignedDriver::new(inner), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_upload_grant_fields() {
        let (_, driver) = driver(SigningSupport::Enforcing);

        let grant = driver
            .generate_upload_grant("My Photo.png", Some("image/png"), Some(4))
            .await;

        assert!(grant.success, "{:?}", grant.error);
        let stored = grant.file_name.clone().unwrap();
        assert!(stored.ends_with("_My_Photo.png"));
        assert_eq!(grant.reference.as_deref(), Some(stored.as_str()));
        assert_eq!(grant.file_path, Some(format!("incoming/{}", stored)));
        assert_eq!(grant.expires_in, Some(120));
        assert_eq!(grant.requires_validation, Some(false));
        assert_eq!(grant.content_type.as_deref(), Some("image/png"));
        assert_eq!(grant.file_size, Some(4));
        assert!(grant.upload_url.unwrap().starts_with("memory://bucket/incoming/"));
    }

    #[tokio::test]
    async fn test_grant_rejects_bad_requests() {
        let (_, driver) = driver(SigningSupport::Enforcing);
        assert!(!driver.generate_upload_grant("", None, None).await.success);
        assert!(!driver.generate_upload_grant("a.txt", Some(""), None).await.success);
        assert!(!driver.generate_upload_grant("a.txt", None, Some(0)).await.success);
        assert!(
            !driver
                .generate_upload_grant("a.txt", None, Some(u64::MAX))
                .await
                .success
        );
    }

    #[tokio::test]
    async fn test_enforcing_round_trip() {
        let (backend, driver) = driver(SigningSupport::Enforcing);
        let grant = driver
            .generate_upload_grant("a.png", Some("image/png"), Some(4))
            .await;
        let url = grant.upload_url.clone().unwrap();
        let reference = grant.reference.clone().unwrap();

        backend
            .simulate_signed_put(&url, Bytes::from_static(b"\x89PNG"), "image/png")
            .unwrap();

        let outcome = driver
            .validate_and_confirm(
                &reference,
                &ValidationRequest::new().with_content_type("image/png").with_file_size(4),
            )
            .await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert!(outcome.view_url.is_some());
        assert!(!driver.requires_validation());
    }

    #[tokio::test]
    async fn test_non_enforcing_round_trip() {
        let (backend, driver) = driver(SigningSupport::NonEnforcing);
        assert!(driver.requires_validation());

        let grant = driver
            .generate_upload_grant("doc.pdf", Some("application/pdf"), Some(5))
            .await;
        assert_eq!(grant.requires_validation, Some(true));
        let reference = grant.reference.clone().unwrap();

        backend
            .simulate_signed_put(
                &grant.upload_url.unwrap(),
                Bytes::from_static(b"%PDF-"),
                "application/pdf",
            )
            .unwrap();

        let outcome = driver
            .validate_and_confirm(
                &reference,
                &ValidationRequest::new()
                    .with_content_type("application/pdf")
                    .with_file_size(5),
            )
            .await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.actual_file_size, Some(5));
        assert_eq!(outcome.actual_content_type.as_deref(), Some("application/pdf"));
        assert_eq!(backend.head_calls(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_deletes_by_default() {
        let (backend, driver) = driver(SigningSupport::NonEnforcing);
        let grant = driver
            .generate_upload_grant("doc.pdf", Some("application/pdf"), Some(5))
            .await;
        let reference = grant.reference.clone().unwrap();
        backend
            .simulate_signed_put(
                &grant.upload_url.unwrap(),
                Bytes::from_static(b"<html>evil"),
                "text/html",
            )
            .unwrap();

        let outcome = driver
            .validate_and_confirm(
                &reference,
                &ValidationRequest::new()
                    .with_content_type("application/pdf")
                    .with_file_size(5),
            )
            .await;

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("content type mismatch"));
        assert!(error.contains("file size mismatch"));
        assert_eq!(outcome.actual_file_size, Some(10));
        assert!(!driver.exists(&reference).await);
        assert!(!driver.delete(&reference).await);
    }

    #[tokio::test]
    async fn test_mismatch_kept_when_requested() {
        let (backend, driver) = driver(SigningSupport::NonEnforcing);
        let grant = driver.generate_upload_grant("a.txt", None, None).await;
        let reference = grant.reference.clone().unwrap();
        backend
            .simulate_signed_put(
                &grant.upload_url.unwrap(),
                Bytes::from_static(b"abc"),
                "text/plain",
            )
            .unwrap();

        let outcome = driver
            .validate_and_confirm(
                &reference,
                &ValidationRequest::new().with_file_size(99).keep_on_failure(),
            )
            .await;

        assert!(!outcome.success);
        assert!(driver.exists(&reference).await);
    }

    #[tokio::test]
    async fn test_validate_missing_object() {
        let (_, driver) = driver(SigningSupport::NonEnforcing);
        let outcome = driver
            .validate_and_confirm("1_abc_never.txt", &ValidationRequest::new())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("File not found"));
    }

    #[tokio::test]
    async fn test_view_grant() {
        let (_, driver) = driver(SigningSupport::Enforcing);
        let grant = driver.generate_view_grant("1_abc_a.txt").await;
        assert!(grant.success);
        assert_eq!(grant.file_path.as_deref(), Some("incoming/1_abc_a.txt"));
        assert!(grant.view_url.unwrap().contains("op=get"));
        assert!(grant.upload_url.is_none());
    }
}
