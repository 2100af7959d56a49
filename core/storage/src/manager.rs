//! Storage manager: the single entry point applications hold.

use std::sync::Arc;
use tracing::info;

use crate::driver::{GrantRequest, StorageDriver};
use crate::registry::{create_default_registry, DriverRegistry};
use unistore_common::{
    DeleteOutcome, ListOutcome, PresignedGrant, Result, StorageConfig, UploadOptions,
    UploadResult, UploadTarget, ValidationOutcome, ValidationRequest,
};

/// Facade over one configured driver.
///
/// The driver is fixed for the manager's lifetime; switching backends
/// means building a new manager.
pub struct StorageManager {
    config: StorageConfig,
    driver: Arc<dyn StorageDriver>,
}

impl StorageManager {
    /// Validate `config` and build its driver with the built-in registry.
    ///
    /// # Errors
    /// - `Error::Configuration` if validation fails or the driver cannot be
    ///   built with the supplied credentials
    pub fn new(config: StorageConfig) -> Result<Self> {
        Self::with_registry(config, &create_default_registry())
    }

    /// Like `new`, resolving the driver through `registry`.
    pub fn with_registry(config: StorageConfig, registry: &DriverRegistry) -> Result<Self> {
        config.validate()?;
        let driver = registry.resolve(&config)?;
        info!("Storage manager using driver {}", driver.name());
        Ok(Self { config, driver })
    }

    /// Use a prebuilt driver. The configuration is kept for reference only.
    pub fn with_driver(config: StorageConfig, driver: Arc<dyn StorageDriver>) -> Self {
        Self { config, driver }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }

    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// Whether the driver issues signed upload URLs.
    pub fn is_presigned_supported(&self) -> bool {
        self.driver.is_presigned()
    }

    /// Whether signed uploads need `validate_and_confirm` afterwards.
    pub fn requires_validation(&self) -> bool {
        self.driver.requires_validation()
    }

    pub async fn upload(&self, target: UploadTarget, options: &UploadOptions) -> UploadResult {
        self.driver.upload(target, options).await
    }

    pub async fn upload_multiple(
        &self,
        targets: Vec<UploadTarget>,
        options: &UploadOptions,
    ) -> Vec<UploadResult> {
        self.driver.upload_multiple(targets, options).await
    }

    pub async fn delete(&self, stored_name: &str) -> bool {
        self.driver.delete(stored_name).await
    }

    pub async fn delete_file(&self, stored_name: &str) -> DeleteOutcome {
        self.driver.delete_file(stored_name).await
    }

    pub async fn delete_multiple(&self, stored_names: &[String]) -> Vec<DeleteOutcome> {
        self.driver.delete_multiple(stored_names).await
    }

    pub async fn exists(&self, stored_name: &str) -> bool {
        self.driver.exists(stored_name).await
    }

    pub async fn generate_upload_grant(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        file_size: Option<u64>,
    ) -> PresignedGrant {
        self.driver
            .generate_upload_grant(file_name, content_type, file_size)
            .await
    }

    pub async fn generate_multiple_upload_grants(
        &self,
        requests: &[GrantRequest],
    ) -> Vec<PresignedGrant> {
        self.driver.generate_multiple_upload_grants(requests).await
    }

    pub async fn generate_view_grant(&self, stored_name: &str) -> PresignedGrant {
        self.driver.generate_view_grant(stored_name).await
    }

    pub async fn generate_multiple_view_grants(
        &self,
        stored_names: &[String],
    ) -> Vec<PresignedGrant> {
        self.driver.generate_multiple_view_grants(stored_names).await
    }

    pub async fn validate_and_confirm(
        &self,
        stored_name: &str,
        request: &ValidationRequest,
    ) -> ValidationOutcome {
        self.driver.validate_and_confirm(stored_name, request).await
    }

    pub async fn list_objects(
        &self,
        prefix: Option<&str>,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> ListOutcome {
        self.driver
            .list_objects(prefix, max_results, continuation_token)
            .await
    }
}
