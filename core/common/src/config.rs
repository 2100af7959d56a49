//! Storage configuration and validation.
//!
//! A `StorageConfig` describes exactly one active backend. Loading it from
//! the environment or a file is the embedding application's job; this
//! module only deserializes, defaults and validates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{Error, Result};

/// Default lifetime of signed URLs, in seconds.
pub const DEFAULT_PRESIGNED_URL_EXPIRY: u64 = 600;
/// Longest lifetime a signed URL may have (seven days).
pub const MAX_PRESIGNED_URL_EXPIRY: u64 = 604_800;
/// Default upload limit (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Largest object any supported provider accepts (5 TiB).
pub const MAX_FILE_SIZE_LIMIT: u64 = 5 * (1 << 40);
/// Default parallelism for batch operations.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// Which backend a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    S3,
    S3Presigned,
    Azure,
    AzurePresigned,
    Gcs,
    GcsPresigned,
    Local,
}

impl DriverKind {
    pub const ALL: [DriverKind; 7] = [
        DriverKind::S3,
        DriverKind::S3Presigned,
        DriverKind::Azure,
        DriverKind::AzurePresigned,
        DriverKind::Gcs,
        DriverKind::GcsPresigned,
        DriverKind::Local,
    ];

    /// Configuration name of this driver.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::S3 => "s3",
            DriverKind::S3Presigned => "s3-presigned",
            DriverKind::Azure => "azure",
            DriverKind::AzurePresigned => "azure-presigned",
            DriverKind::Gcs => "gcs",
            DriverKind::GcsPresigned => "gcs-presigned",
            DriverKind::Local => "local",
        }
    }

    /// Whether this driver hands out signed upload URLs.
    pub fn is_presigned(&self) -> bool {
        matches!(
            self,
            DriverKind::S3Presigned | DriverKind::AzurePresigned | DriverKind::GcsPresigned
        )
    }

    /// Whether this driver talks to a remote bucket or container.
    pub fn is_cloud(&self) -> bool {
        !matches!(self, DriverKind::Local)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry tunables for provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_backoff: bool,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            exponential_backoff: true,
            jitter: false,
        }
    }
}

/// Credentials for S3.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsSettings {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials.
    #[serde(default)]
    pub session_token: Option<String>,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    #[serde(default)]
    pub force_path_style: bool,
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Credentials for Azure Blob Storage.
///
/// Either an account key (directly or inside a connection string) or a
/// pre-issued SAS token, such as a user delegation SAS handed out by an
/// identity provider. Only the key can sign new SAS URLs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSettings {
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_key: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Pre-issued shared access signature for key-less access.
    #[serde(default)]
    pub sas_token: Option<String>,
    /// Custom blob endpoint (e.g. an emulator).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AzureSettings {
    fn connection_parts(&self) -> HashMap<String, String> {
        self.connection_string
            .as_deref()
            .map(parse_connection_string)
            .unwrap_or_default()
    }

    /// Account name, from the explicit field or the connection string.
    pub fn resolved_account_name(&self) -> Option<String> {
        non_empty(&self.account_name)
            .map(String::from)
            .or_else(|| self.connection_parts().remove("AccountName"))
            .filter(|s| !s.is_empty())
    }

    /// Account key, from the explicit field or the connection string.
    pub fn resolved_account_key(&self) -> Option<String> {
        non_empty(&self.account_key)
            .map(String::from)
            .or_else(|| self.connection_parts().remove("AccountKey"))
            .filter(|s| !s.is_empty())
    }

    /// Blob endpoint, from the explicit field or the connection string.
    ///
    /// A connection string without `BlobEndpoint` still yields an endpoint
    /// when it names a protocol other than the https default or a non-public
    /// endpoint suffix.
    pub fn resolved_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = non_empty(&self.endpoint) {
            return Some(endpoint.to_string());
        }

        let mut parts = self.connection_parts();
        if let Some(endpoint) = parts.remove("BlobEndpoint").filter(|s| !s.is_empty()) {
            return Some(endpoint);
        }

        let protocol = parts.remove("DefaultEndpointsProtocol");
        let suffix = parts.remove("EndpointSuffix");
        if protocol.is_none() && suffix.is_none() {
            return None;
        }
        let account = self.resolved_account_name()?;
        Some(format!(
            "{}://{}.blob.{}",
            protocol.as_deref().unwrap_or("https"),
            account,
            suffix.as_deref().unwrap_or("core.windows.net")
        ))
    }
}

impl fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureSettings")
            .field("account_name", &self.account_name)
            .field("account_key", &redacted(&self.account_key))
            .field("connection_string", &redacted(&self.connection_string))
            .field("sas_token", &redacted(&self.sas_token))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// HMAC interoperability credentials for Google Cloud Storage.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsSettings {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl fmt::Debug for GcsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "[REDACTED]"
    } else {
        "None"
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Split an Azure connection string into its `Key=Value` parts.
pub fn parse_connection_string(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Resolved settings for one storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub driver: DriverKind,
    /// Bucket (S3, GCS) or container (Azure) name.
    #[serde(default, alias = "container")]
    pub bucket: Option<String>,
    /// Key prefix prepended to every stored name.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Signed URL lifetime in seconds.
    #[serde(default = "default_presigned_url_expiry")]
    pub presigned_url_expiry: u64,
    /// Upload limit in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Accepted MIME types; empty accepts everything.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
    /// Parallelism of batch operations.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Root directory of the local driver.
    #[serde(default = "default_local_path")]
    pub local_path: String,
    /// URL prefix under which the local directory is served.
    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,
    #[serde(default)]
    pub aws: Option<AwsSettings>,
    #[serde(default)]
    pub azure: Option<AzureSettings>,
    #[serde(default)]
    pub gcs: Option<GcsSettings>,
}

fn default_presigned_url_expiry() -> u64 {
    DEFAULT_PRESIGNED_URL_EXPIRY
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}

fn default_local_path() -> String {
    "uploads".to_string()
}

fn default_local_base_url() -> String {
    "/uploads".to_string()
}

impl StorageConfig {
    /// Configuration with defaults for the given driver.
    pub fn new(driver: DriverKind) -> Self {
        Self {
            driver,
            bucket: None,
            path_prefix: None,
            presigned_url_expiry: DEFAULT_PRESIGNED_URL_EXPIRY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: Vec::new(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            retry: RetrySettings::default(),
            local_path: default_local_path(),
            local_base_url: default_local_base_url(),
            aws: None,
            azure: None,
            gcs: None,
        }
    }

    /// Local driver rooted at `path`.
    pub fn local(path: impl Into<String>) -> Self {
        let mut config = Self::new(DriverKind::Local);
        config.local_path = path.into();
        config
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn with_presigned_url_expiry(mut self, seconds: u64) -> Self {
        self.presigned_url_expiry = seconds;
        self
    }

    pub fn with_aws(mut self, aws: AwsSettings) -> Self {
        self.aws = Some(aws);
        self
    }

    pub fn with_azure(mut self, azure: AzureSettings) -> Self {
        self.azure = Some(azure);
        self
    }

    pub fn with_gcs(mut self, gcs: GcsSettings) -> Self {
        self.gcs = Some(gcs);
        self
    }

    /// Prefix with surrounding slashes removed, `None` when blank.
    pub fn normalized_prefix(&self) -> Option<&str> {
        self.path_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Bucket name, or a configuration error naming the field.
    pub fn require_bucket(&self) -> Result<&str> {
        non_empty(&self.bucket).ok_or_else(|| {
            Error::Configuration(format!("bucket is required for the {} driver", self.driver))
        })
    }

    /// Validate, returning every problem in one error.
    pub fn validate(&self) -> Result<()> {
        let validation = validate_storage_config(self);
        if validation.is_valid {
            Ok(())
        } else {
            Err(Error::Configuration(validation.errors.join("; ")))
        }
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Result of `validate_storage_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Check a configuration and collect every problem found.
///
/// Credentials are required in full for every cloud driver; ambient
/// credentials (instance roles and the like) are not discovered here. The
/// Azure check is structural only: whether the credential can sign URLs is
/// decided when the presigned driver is built.
pub fn validate_storage_config(config: &StorageConfig) -> ConfigValidation {
    let mut errors = Vec::new();

    if config.presigned_url_expiry < 1 || config.presigned_url_expiry > MAX_PRESIGNED_URL_EXPIRY {
        errors.push(format!(
            "presignedUrlExpiry must be between 1 and {} seconds, got {}",
            MAX_PRESIGNED_URL_EXPIRY, config.presigned_url_expiry
        ));
    }

    if config.max_file_size == 0 || config.max_file_size > MAX_FILE_SIZE_LIMIT {
        errors.push(format!(
            "maxFileSize must be greater than 0 and at most {} bytes, got {}",
            MAX_FILE_SIZE_LIMIT, config.max_file_size
        ));
    }

    if config.batch_concurrency == 0 {
        errors.push("batchConcurrency must be at least 1".to_string());
    }

    if config.retry.max_attempts == 0 {
        errors.push("retry.maxAttempts must be at least 1".to_string());
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push("retry.baseDelayMs must not exceed retry.maxDelayMs".to_string());
    }

    if let Some(prefix) = config.normalized_prefix() {
        if prefix.split('/').any(|c| c == ".." || c == "." || c.is_empty()) {
            errors.push(format!("pathPrefix is not a valid key prefix: {}", prefix));
        }
    }

    if config.driver.is_cloud() && non_empty(&config.bucket).is_none() {
        errors.push(format!("bucket is required for the {} driver", config.driver));
    }

    match config.driver {
        DriverKind::Local => {
            if config.local_path.trim().is_empty() {
                errors.push("localPath is required for the local driver".to_string());
            }
        }
        DriverKind::S3 | DriverKind::S3Presigned => match &config.aws {
            None => errors.push(format!(
                "aws settings are required for the {} driver",
                config.driver
            )),
            Some(aws) => {
                if non_empty(&aws.region).is_none() {
                    errors.push("aws.region is required".to_string());
                }
                if non_empty(&aws.access_key_id).is_none() {
                    errors.push("aws.accessKeyId is required".to_string());
                }
                if non_empty(&aws.secret_access_key).is_none() {
                    errors.push("aws.secretAccessKey is required".to_string());
                }
            }
        },
        DriverKind::Gcs | DriverKind::GcsPresigned => match &config.gcs {
            None => errors.push(format!(
                "gcs settings are required for the {} driver",
                config.driver
            )),
            Some(gcs) => {
                if non_empty(&gcs.access_key_id).is_none() {
                    errors.push("gcs.accessKeyId is required".to_string());
                }
                if non_empty(&gcs.secret_access_key).is_none() {
                    errors.push("gcs.secretAccessKey is required".to_string());
                }
            }
        },
        DriverKind::Azure | DriverKind::AzurePresigned => match &config.azure {
            None => errors.push(format!(
                "azure settings are required for the {} driver",
                config.driver
            )),
            Some(azure) => {
                if azure.resolved_account_name().is_none() {
                    errors.push("azure.accountName is required".to_string());
                }
                if azure.resolved_account_key().is_none() && non_empty(&azure.sas_token).is_none() {
                    errors.push(
                        "azure.accountKey, azure.connectionString or azure.sasToken is required"
                            .to_string(),
                    );
                }
            }
        },
    }

    ConfigValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws() -> AwsSettings {
        AwsSettings {
            region: Some("us-east-1".into()),
            access_key_id: Some("AKIDEXAMPLE".into()),
            secret_access_key: Some("secret".into()),
            ..AwsSettings::default()
        }
    }

    fn azure() -> AzureSettings {
        AzureSettings {
            account_name: Some("acct".into()),
            account_key: Some("a2V5".into()),
            ..AzureSettings::default()
        }
    }

    fn gcs() -> GcsSettings {
        GcsSettings {
            access_key_id: Some("GOOG1EXAMPLE".into()),
            secret_access_key: Some("secret".into()),
            endpoint: None,
        }
    }

    fn valid_config(kind: DriverKind) -> StorageConfig {
        let config = StorageConfig::new(kind);
        match kind {
            DriverKind::Local => config,
            DriverKind::S3 | DriverKind::S3Presigned => config.with_bucket("b").with_aws(aws()),
            DriverKind::Azure | DriverKind::AzurePresigned => {
                config.with_bucket("c").with_azure(azure())
            }
            DriverKind::Gcs | DriverKind::GcsPresigned => config.with_bucket("b").with_gcs(gcs()),
        }
    }

    fn assert_invalid_naming(config: &StorageConfig, field: &str) {
        let validation = validate_storage_config(config);
        assert!(!validation.is_valid, "expected invalid for missing {}", field);
        assert!(
            validation.errors.iter().any(|e| e.contains(field)),
            "no error names {}: {:?}",
            field,
            validation.errors
        );
    }

    #[test]
    fn test_every_kind_accepts_valid_config() {
        for kind in DriverKind::ALL {
            let validation = validate_storage_config(&valid_config(kind));
            assert!(validation.is_valid, "{}: {:?}", kind, validation.errors);
        }
    }

    #[test]
    fn test_missing_bucket_named() {
        for kind in DriverKind::ALL.into_iter().filter(DriverKind::is_cloud) {
            let mut config = valid_config(kind);
            config.bucket = None;
            assert_invalid_naming(&config, "bucket");
        }
    }

    #[test]
    fn test_missing_aws_fields_named() {
        let mut settings = aws();
        settings.region = None;
        assert_invalid_naming(&valid_config(DriverKind::S3).with_aws(settings), "aws.region");

        let mut settings = aws();
        settings.access_key_id = None;
        assert_invalid_naming(&valid_config(DriverKind::S3).with_aws(settings), "aws.accessKeyId");

        let mut settings = aws();
        settings.secret_access_key = Some(String::new());
        assert_invalid_naming(
            &valid_config(DriverKind::S3).with_aws(settings),
            "aws.secretAccessKey",
        );

        let mut config = valid_config(DriverKind::S3Presigned);
        config.aws = None;
        assert_invalid_naming(&config, "aws");
    }

    #[test]
    fn test_missing_gcs_fields_named() {
        let mut settings = gcs();
        settings.access_key_id = None;
        assert_invalid_naming(&valid_config(DriverKind::Gcs).with_gcs(settings), "gcs.accessKeyId");

        let mut settings = gcs();
        settings.secret_access_key = Some("  ".into());
        assert_invalid_naming(
            &valid_config(DriverKind::GcsPresigned).with_gcs(settings),
            "gcs.secretAccessKey",
        );
    }

    #[test]
    fn test_azure_credentials() {
        let mut settings = azure();
        settings.account_name = None;
        assert_invalid_naming(
            &valid_config(DriverKind::Azure).with_azure(settings),
            "azure.accountName",
        );

        let mut settings = azure();
        settings.account_key = None;
        assert_invalid_naming(
            &valid_config(DriverKind::Azure).with_azure(settings),
            "azure.accountKey",
        );

        let token_only = AzureSettings {
            account_name: Some("acct".into()),
            sas_token: Some("sv=2020-12-06&sig=abc".into()),
            ..AzureSettings::default()
        };
        let config = valid_config(DriverKind::Azure).with_azure(token_only);
        assert!(validate_storage_config(&config).is_valid);
    }

    #[test]
    fn test_connection_string_resolution() {
        let settings = AzureSettings {
            connection_string: Some(
                concat!(
                    "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=a2V5PT0=;",
                    "EndpointSuffix=core.windows.net"
                )
                .into(),
            ),
            ..AzureSettings::default()
        };
        assert_eq!(settings.resolved_account_name().as_deref(), Some("acct"));
        assert_eq!(settings.resolved_account_key().as_deref(), Some("a2V5PT0="));
        assert_eq!(
            settings.resolved_endpoint().as_deref(),
            Some("https://acct.blob.core.windows.net")
        );
    }

    #[test]
    fn test_emulator_endpoint_keeps_http() {
        let explicit = AzureSettings {
            connection_string: Some(
                concat!(
                    "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;",
                    "AccountKey=a2V5PT0=;",
                    "BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;"
                )
                .into(),
            ),
            ..AzureSettings::default()
        };
        assert_eq!(
            explicit.resolved_endpoint().as_deref(),
            Some("http://127.0.0.1:10000/devstoreaccount1")
        );

        let derived = AzureSettings {
            connection_string: Some(
                "DefaultEndpointsProtocol=http;AccountName=acct;AccountKey=a2V5PT0=".into(),
            ),
            ..AzureSettings::default()
        };
        assert_eq!(
            derived.resolved_endpoint().as_deref(),
            Some("http://acct.blob.core.windows.net")
        );

        assert_eq!(AzureSettings::default().resolved_endpoint(), None);
    }

    #[test]
    fn test_bounds() {
        let config = valid_config(DriverKind::Local).with_presigned_url_expiry(0);
        assert_invalid_naming(&config, "presignedUrlExpiry");

        let config = valid_config(DriverKind::Local)
            .with_presigned_url_expiry(MAX_PRESIGNED_URL_EXPIRY + 1);
        assert_invalid_naming(&config, "presignedUrlExpiry");

        let config = valid_config(DriverKind::Local).with_max_file_size(0);
        assert_invalid_naming(&config, "maxFileSize");

        let config = valid_config(DriverKind::Local).with_max_file_size(MAX_FILE_SIZE_LIMIT);
        assert!(validate_storage_config(&config).is_valid);

        let config = valid_config(DriverKind::Local).with_max_file_size(MAX_FILE_SIZE_LIMIT + 1);
        assert_invalid_naming(&config, "maxFileSize");
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let config = valid_config(DriverKind::Local).with_path_prefix("a/../b");
        assert_invalid_naming(&config, "pathPrefix");
    }

    #[test]
    fn test_validate_joins_errors() {
        let config = StorageConfig::new(DriverKind::S3);
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bucket"));
        assert!(msg.contains("aws settings"));
    }

    #[test]
    fn test_from_json_defaults() {
        let config = StorageConfig::from_json(
            r#"{"driver":"local","localPath":"uploads","maxFileSize":1048576}"#,
        )
        .unwrap();
        assert_eq!(config.driver, DriverKind::Local);
        assert_eq!(config.local_path, "uploads");
        assert_eq!(config.max_file_size, 1_048_576);
        assert_eq!(config.presigned_url_expiry, DEFAULT_PRESIGNED_URL_EXPIRY);
        assert_eq!(config.retry, RetrySettings::default());

        let config =
            StorageConfig::from_json(r#"{"driver":"azure-presigned","container":"c"}"#).unwrap();
        assert_eq!(config.driver, DriverKind::AzurePresigned);
        assert_eq!(config.bucket.as_deref(), Some("c"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", aws());
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("[REDACTED]"));
    }
}
