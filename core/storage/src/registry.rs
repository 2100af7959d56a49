//! Driver registry for resolving a configured driver kind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::azure::AzureBackend;
use crate::backend::ObjectBackend;
use crate::driver::StorageDriver;
use crate::local::LocalBackend;
use crate::presigned::PresignedDriver;
use crate::s3::S3Backend;
use crate::standard::StandardDriver;
use unistore_common::{DriverKind, Error, Result, StorageConfig};

/// Factory function type for creating drivers.
pub type DriverFactory =
    Box<dyn Fn(&StorageConfig) -> Result<Arc<dyn StorageDriver>> + Send + Sync>;

/// Registry of driver factories keyed by driver kind.
pub struct DriverRegistry {
    factories: HashMap<DriverKind, DriverFactory>,
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if the kind is already registered
    pub fn register(&mut self, kind: DriverKind, factory: DriverFactory) -> Result<()> {
        if self.factories.contains_key(&kind) {
            return Err(Error::AlreadyExists(format!(
                "Driver '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Build the driver for `config.driver`.
    ///
    /// # Errors
    /// - `Error::NotFound` if no factory is registered for the kind
    /// - Whatever the factory reports, typically `Error::Configuration`
    pub fn resolve(&self, config: &StorageConfig) -> Result<Arc<dyn StorageDriver>> {
        let factory = self.factories.get(&config.driver).ok_or_else(|| {
            Error::NotFound(format!("Driver '{}' is not registered", config.driver))
        })?;
        factory(config)
    }

    /// Registered driver kinds.
    pub fn drivers(&self) -> Vec<DriverKind> {
        self.factories.keys().copied().collect()
    }

    pub fn has_driver(&self, kind: DriverKind) -> bool {
        self.factories.contains_key(&kind)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a backend in the driver variant `kind` asks for.
fn wrap(
    kind: DriverKind,
    backend: Arc<dyn ObjectBackend>,
    config: &StorageConfig,
) -> Result<Arc<dyn StorageDriver>> {
    let standard = StandardDriver::new(kind.as_str(), backend, config);
    if kind.is_presigned() {
        Ok(Arc::new(PresignedDriver::new(standard)?))
    } else {
        Ok(Arc::new(standard))
    }
}

fn s3_driver(config: &StorageConfig) -> Result<Arc<dyn StorageDriver>> {
    let aws = config.aws.as_ref().ok_or_else(|| {
        Error::Configuration(format!("aws settings are required for the {} driver", config.driver))
    })?;
    let backend = S3Backend::new(config.require_bucket()?, aws)?;
    wrap(config.driver, Arc::new(backend), config)
}

fn gcs_driver(config: &StorageConfig) -> Result<Arc<dyn StorageDriver>> {
    let gcs = config.gcs.as_ref().ok_or_else(|| {
        Error::Configuration(format!("gcs settings are required for the {} driver", config.driver))
    })?;
    let backend = S3Backend::for_gcs(config.require_bucket()?, gcs)?;
    wrap(config.driver, Arc::new(backend), config)
}

fn azure_driver(config: &StorageConfig) -> Result<Arc<dyn StorageDriver>> {
    let azure = config.azure.as_ref().ok_or_else(|| {
        Error::Configuration(format!(
            "azure settings are required for the {} driver",
            config.driver
        ))
    })?;
    let backend = AzureBackend::new(config.require_bucket()?, azure)?;
    wrap(config.driver, Arc::new(backend), config)
}

fn local_driver(config: &StorageConfig) -> Result<Arc<dyn StorageDriver>> {
    let backend = LocalBackend::new(&config.local_path, config.local_base_url.clone())?;
    wrap(config.driver, Arc::new(backend), config)
}

/// Create a registry with every built-in driver.
pub fn create_default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();

    for kind in DriverKind::ALL {
        let factory: DriverFactory = match kind {
            DriverKind::S3 | DriverKind::S3Presigned => Box::new(s3_driver),
            DriverKind::Gcs | DriverKind::GcsPresigned => Box::new(gcs_driver),
            DriverKind::Azure | DriverKind::AzurePresigned => Box::new(azure_driver),
            DriverKind::Local => Box::new(local_driver),
        };
        registry.factories.insert(kind, factory);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use tempfile::TempDir;
    use unistore_common::{AwsSettings, AzureSettings, GcsSettings};

    fn memory_factory() -> DriverFactory {
        Box::new(|config| {
            let standard =
                StandardDriver::new("memory", Arc::new(MemoryBackend::default()), config);
            Ok(Arc::new(standard))
        })
    }

    fn aws() -> AwsSettings {
        AwsSettings {
            region: Some("us-east-1".to_string()),
            access_key_id: Some("AKID".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = DriverRegistry::new();
        registry.register(DriverKind::S3, memory_factory()).unwrap();

        let config = StorageConfig::new(DriverKind::S3).with_bucket("b");
        let driver = registry.resolve(&config).unwrap();
        assert_eq!(driver.name(), "memory");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = DriverRegistry::new();
        registry.register(DriverKind::Local, memory_factory()).unwrap();
        let result = registry.register(DriverKind::Local, memory_factory());
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = DriverRegistry::new();
        let result = registry.resolve(&StorageConfig::new(DriverKind::Gcs));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_default_registry_covers_all_kinds() {
        let registry = create_default_registry();
        for kind in DriverKind::ALL {
            assert!(registry.has_driver(kind), "{} missing", kind);
        }
        assert_eq!(registry.drivers().len(), DriverKind::ALL.len());
    }

    #[test]
    fn test_default_registry_builds_variants() {
        let registry = create_default_registry();

        let direct = registry
            .resolve(&StorageConfig::new(DriverKind::S3).with_bucket("b").with_aws(aws()))
            .unwrap();
        assert_eq!(direct.name(), "s3");
        assert!(!direct.is_presigned());

        let presigned = registry
            .resolve(&StorageConfig::new(DriverKind::S3Presigned).with_bucket("b").with_aws(aws()))
            .unwrap();
        assert_eq!(presigned.name(), "s3-presigned");
        assert!(presigned.is_presigned());
        assert!(!presigned.requires_validation());

        let gcs = registry
            .resolve(
                &StorageConfig::new(DriverKind::GcsPresigned)
                    .with_bucket("b")
                    .with_gcs(GcsSettings {
                        access_key_id: Some("GOOG1".to_string()),
                        secret_access_key: Some("secret".to_string()),
                        endpoint: None,
                    }),
            )
            .unwrap();
        assert!(gcs.is_presigned());

        let temp = TempDir::new().unwrap();
        let local = registry
            .resolve(&StorageConfig::local(temp.path().to_string_lossy()))
            .unwrap();
        assert_eq!(local.name(), "local");
    }

    #[test]
    fn test_missing_sections_are_configuration_errors() {
        let registry = create_default_registry();
        let result = registry.resolve(&StorageConfig::new(DriverKind::S3).with_bucket("b"));
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = registry.resolve(&StorageConfig::new(DriverKind::S3).with_aws(aws()));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_azure_presigned_needs_account_key() {
        let registry = create_default_registry();
        let token_only = AzureSettings {
            account_name: Some("acct".to_string()),
            sas_token: Some("sv=2022-11-02&sig=abc".to_string()),
            ..Default::default()
        };

        let direct = registry.resolve(
            &StorageConfig::new(DriverKind::Azure)
                .with_bucket("c")
                .with_azure(token_only.clone()),
        );
        assert!(direct.is_ok());

        let presigned = registry.resolve(
            &StorageConfig::new(DriverKind::AzurePresigned)
                .with_bucket("c")
                .with_azure(token_only),
        );
        assert!(matches!(presigned, Err(Error::Configuration(_))));
    }
}
