//! Direct-upload driver over any `ObjectBackend`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::ObjectBackend;
use crate::driver::StorageDriver;
use crate::retry::{RetryExecutor, RetryPolicy};
use unistore_common::naming::{generate_stored_name_with, DefaultSanitizer, FileNameSanitizer};
use unistore_common::{
    DeleteOutcome, Error, ListOutcome, ObjectInfo, ObjectKey, PresignedGrant, Result,
    StorageConfig, UploadOptions, UploadResult, UploadTarget,
};

/// Driver that uploads through the process and wraps provider calls in
/// the retry executor.
///
/// Structural checks run before any provider call; a rejected upload
/// never reaches the backend.
pub struct StandardDriver {
    name: String,
    backend: Arc<dyn ObjectBackend>,
    prefix: Option<String>,
    max_file_size: u64,
    allowed_mime_types: Vec<String>,
    presigned_url_expiry: u64,
    batch_concurrency: usize,
    retry: RetryExecutor,
    sanitizer: Arc<dyn FileNameSanitizer>,
}

impl StandardDriver {
    /// Create a driver named `name` over `backend`, taking limits from
    /// `config`.
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn ObjectBackend>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            prefix: config.normalized_prefix().map(String::from),
            max_file_size: config.max_file_size,
            allowed_mime_types: config
                .allowed_mime_types
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .collect(),
            presigned_url_expiry: config.presigned_url_expiry,
            batch_concurrency: config.batch_concurrency.max(1),
            retry: RetryExecutor::new(RetryPolicy::from(&config.retry)),
            sanitizer: Arc::new(DefaultSanitizer),
        }
    }

    /// Replace the file name sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn FileNameSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.backend
    }

    /// Lifetime of signed URLs in seconds.
    pub fn presigned_url_expiry(&self) -> u64 {
        self.presigned_url_expiry
    }

    /// Full object key for a stored name.
    pub fn key_for(&self, stored_name: &str) -> Result<ObjectKey> {
        if stored_name.trim().is_empty() {
            return Err(Error::InvalidInput("File name is required".to_string()));
        }
        ObjectKey::new(self.prefix.as_deref(), stored_name)
    }

    /// Generate a fresh stored name and its key.
    pub(crate) fn new_key(&self, original_name: &str) -> Result<(String, ObjectKey)> {
        let stored_name = generate_stored_name_with(self.sanitizer.as_ref(), original_name);
        let key = ObjectKey::new(self.prefix.as_deref(), &stored_name)?;
        Ok((stored_name, key))
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::InvalidInput(format!(
                "File size {} exceeds maximum of {} bytes",
                size, self.max_file_size
            )));
        }
        Ok(())
    }

    fn check_mime_type(&self, mime_type: &str) -> Result<()> {
        if mime_type.trim().is_empty() {
            return Err(Error::InvalidInput("MIME type is required".to_string()));
        }
        if !self.allowed_mime_types.is_empty()
            && !self.allowed_mime_types.contains(&mime_essence(mime_type))
        {
            return Err(Error::InvalidInput(format!(
                "MIME type {} is not allowed",
                mime_type
            )));
        }
        Ok(())
    }

    /// Structural checks for a direct upload.
    pub(crate) fn check_target(&self, target: &UploadTarget) -> Result<()> {
        if target.original_name.trim().is_empty() {
            return Err(Error::InvalidInput("File name is required".to_string()));
        }
        self.check_mime_type(&target.mime_type)?;
        if target.content.is_empty() {
            return Err(Error::InvalidInput("File is empty".to_string()));
        }
        self.check_size(target.declared_size)?;
        self.check_size(target.content.len() as u64)
    }

    /// Structural checks for an upload grant. Type and size are optional.
    pub(crate) fn check_grant_request(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        file_size: Option<u64>,
    ) -> Result<()> {
        if file_name.trim().is_empty() {
            return Err(Error::InvalidInput("File name is required".to_string()));
        }
        if let Some(content_type) = content_type {
            self.check_mime_type(content_type)?;
        }
        match file_size {
            Some(0) => Err(Error::InvalidInput("File is empty".to_string())),
            Some(size) => self.check_size(size),
            None => Ok(()),
        }
    }

    /// Fetch object metadata with retries.
    pub(crate) async fn head(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        self.retry
            .execute_with_condition(|| self.backend.head_object(key), Error::is_transient)
            .await
    }

    /// Delete an object with retries.
    pub(crate) async fn remove(&self, key: &ObjectKey) -> Result<()> {
        self.retry
            .execute_with_condition(|| self.backend.delete_object(key), Error::is_transient)
            .await
    }

    fn list_prefix(&self, prefix: Option<&str>) -> String {
        let caller = prefix.map(|p| p.trim_start_matches('/')).unwrap_or("");
        match &self.prefix {
            Some(base) => format!("{}/{}", base, caller),
            None => caller.to_string(),
        }
    }
}

/// MIME type without parameters, lowercased.
pub(crate) fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase()
}

#[async_trait]
impl StorageDriver for StandardDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    async fn upload(&self, target: UploadTarget, options: &UploadOptions) -> UploadResult {
        if let Err(err) = self.check_target(&target) {
            debug!("Rejected upload of {:?}: {}", target.original_name, err);
            return UploadResult::from_error(&err);
        }

        let (stored_name, key) = match self.new_key(&target.original_name) {
            Ok(pair) => pair,
            Err(err) => return UploadResult::from_error(&err),
        };

        let result = self
            .retry
            .execute_with_condition(
                || {
                    self.backend
                        .put_object(&key, target.content.clone(), &target.mime_type, options)
                },
                Error::is_transient,
            )
            .await;

        match result {
            Ok(()) => {
                info!("Uploaded {} ({} bytes) via {}", key, target.content.len(), self.name);
                UploadResult::ok(stored_name, self.backend.object_url(&key))
            }
            Err(err) => {
                warn!("Upload of {} via {} failed: {}", key, self.name, err);
                UploadResult::failed(format!("Upload failed: {}", err))
            }
        }
    }

    async fn delete_file(&self, stored_name: &str) -> DeleteOutcome {
        let key = match self.key_for(stored_name) {
            Ok(key) => key,
            Err(err) => return DeleteOutcome::failed(stored_name, err.to_string()),
        };

        match self.remove(&key).await {
            Ok(()) => {
                info!("Deleted {} via {}", key, self.name);
                DeleteOutcome::ok(stored_name)
            }
            Err(Error::NotFound(_)) => {
                debug!("Delete of missing object {}", key);
                DeleteOutcome::failed(stored_name, format!("File not found: {}", stored_name))
            }
            Err(err) => {
                warn!("Delete of {} via {} failed: {}", key, self.name, err);
                DeleteOutcome::failed(stored_name, format!("Delete failed: {}", err))
            }
        }
    }

    async fn exists(&self, stored_name: &str) -> bool {
        let Ok(key) = self.key_for(stored_name) else {
            return false;
        };
        match self.head(&key).await {
            Ok(_) => true,
            Err(Error::NotFound(_)) => false,
            Err(err) => {
                warn!("Existence check for {} failed: {}", key, err);
                false
            }
        }
    }

    async fn generate_upload_grant(
        &self,
        _file_name: &str,
        _content_type: Option<&str>,
        _file_size: Option<u64>,
    ) -> PresignedGrant {
        PresignedGrant::failed(format!(
            "Presigned URLs are not supported by driver {}",
            self.name
        ))
    }

    async fn generate_view_grant(&self, _stored_name: &str) -> PresignedGrant {
        PresignedGrant::failed(format!(
            "Presigned URLs are not supported by driver {}",
            self.name
        ))
    }

    async fn list_objects(
        &self,
        prefix: Option<&str>,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> ListOutcome {
        if max_results == 0 {
            return ListOutcome::failed("max_results must be greater than zero");
        }

        let full_prefix = self.list_prefix(prefix);
        let result = self
            .retry
            .execute_with_condition(
                || {
                    self.backend
                        .list_objects(&full_prefix, max_results, continuation_token)
                },
                Error::is_transient,
            )
            .await;

        match result {
            Ok(page) => ListOutcome::ok(page.objects, page.next_token),
            Err(err) => {
                warn!("Listing {:?} via {} failed: {}", full_prefix, self.name, err);
                ListOutcome::failed(format!("List failed: {}", err))
            }
        }
    }
}
