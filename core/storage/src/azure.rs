//! Azure Blob Storage backend built on OpenDAL.
//!
//! With an account key the operator signs requests with Shared Key and can
//! issue SAS URLs. A SAS only grants permissions; it cannot pin content type
//! or length, so uploads through it must be validated after the fact. With a
//! pre-issued SAS token requests are authorized but no new URLs can be
//! signed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::TryStreamExt;
use opendal::{services, ErrorKind, Metadata, Operator};
use std::time::Duration;
use tracing::debug;

use crate::backend::{ObjectBackend, SigningSupport, UploadConstraints};
use crate::http;
use unistore_common::config::MAX_PRESIGNED_URL_EXPIRY;
use unistore_common::{
    AzureSettings, Error, ObjectInfo, ObjectKey, ObjectPage, Result, UploadOptions,
};

enum AzureCredential {
    AccountKey(String),
    SasToken(String),
}

/// Azure blob container backend.
pub struct AzureBackend {
    operator: Operator,
    container_url: String,
    can_sign: bool,
}

impl AzureBackend {
    /// Create a backend for `container`.
    ///
    /// # Errors
    /// - `Error::Configuration` if the account name is missing, no key or
    ///   SAS token is available, or the key is not base64
    pub fn new(container: impl Into<String>, settings: &AzureSettings) -> Result<Self> {
        let container = container.into();
        let account = settings
            .resolved_account_name()
            .ok_or_else(|| Error::Configuration("azure.accountName is required".to_string()))?;

        let sas_token = settings
            .sas_token
            .as_deref()
            .map(|t| t.trim().trim_start_matches('?'))
            .filter(|t| !t.is_empty());
        let credential = match (settings.resolved_account_key(), sas_token) {
            (Some(key), _) => {
                BASE64.decode(key.as_bytes()).map_err(|e| {
                    Error::Configuration(format!("azure.accountKey is not valid base64: {}", e))
                })?;
                AzureCredential::AccountKey(key)
            }
            (None, Some(token)) => AzureCredential::SasToken(token.to_string()),
            (None, None) => {
                return Err(Error::Configuration(
                    "azure.accountKey, azure.connectionString or azure.sasToken is required"
                        .to_string(),
                ))
            }
        };

        let endpoint = settings
            .resolved_endpoint()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", account));
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let builder = services::Azblob::default()
            .container(&container)
            .endpoint(&endpoint)
            .account_name(&account);
        let builder = match &credential {
            AzureCredential::AccountKey(key) => builder.account_key(key),
            AzureCredential::SasToken(token) => builder.sas_token(token),
        };
        let operator = Operator::new(builder)
            .map_err(|e| Error::Configuration(format!("Failed to create Azure client: {}", e)))?
            .finish();

        Ok(Self {
            operator,
            container_url: format!("{}/{}", endpoint, container),
            can_sign: matches!(credential, AzureCredential::AccountKey(_)),
        })
    }

    fn lifetime(expires_in: Duration) -> Duration {
        expires_in.min(Duration::from_secs(MAX_PRESIGNED_URL_EXPIRY))
    }

    fn ensure_can_sign(&self) -> Result<()> {
        if self.can_sign {
            Ok(())
        } else {
            Err(Error::NotSupported(
                "Azure SAS tokens cannot sign new URLs".to_string(),
            ))
        }
    }

    fn info(key: &str, meta: &Metadata) -> ObjectInfo {
        ObjectInfo {
            name: key.rsplit('/').next().unwrap_or(key).to_string(),
            key: key.to_string(),
            size: meta.content_length(),
            content_type: meta
                .content_type()
                .filter(|t| !t.is_empty())
                .map(String::from),
            last_modified: meta
                .last_modified()
                .and_then(|t| parse_timestamp(&t.to_string())),
            etag: meta.etag().map(|e| e.trim_matches('"').to_string()),
        }
    }
}

#[async_trait]
impl ObjectBackend for AzureBackend {
    fn name(&self) -> &str {
        "azure"
    }

    fn signing_support(&self) -> SigningSupport {
        if self.can_sign {
            SigningSupport::NonEnforcing
        } else {
            SigningSupport::Unsupported
        }
    }

    fn check_signing(&self) -> Result<()> {
        if self.can_sign {
            Ok(())
        } else {
            Err(Error::Configuration(
                "Azure presigned URLs need an account key; a SAS token cannot sign new URLs"
                    .to_string(),
            ))
        }
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);
        let path = key.as_key();
        let mut write = self
            .operator
            .write_with(&path, data)
            .content_type(content_type);
        if let Some(cache_control) = &options.cache_control {
            write = write.cache_control(cache_control);
        }
        if !options.metadata.is_empty() {
            write = write.user_metadata(options.metadata.clone());
        }
        write
            .await
            .map_err(|e| opendal_error("Azure upload failed", e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        // OpenDAL treats deleting a missing blob as success.
        self.head_object(key).await?;

        self.operator
            .delete(&key.as_key())
            .await
            .map_err(|e| opendal_error("Azure delete failed", e))?;
        debug!("Deleted {}", key);
        Ok(())
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        let raw = key.as_key();
        let meta = self
            .operator
            .stat(&raw)
            .await
            .map_err(|e| opendal_error("Azure metadata request failed", e))?;
        Ok(Self::info(&raw, &meta))
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        // List the enclosing directory and narrow to the prefix here.
        let dir = match prefix.rfind('/') {
            Some(idx) => &prefix[..=idx],
            None => "/",
        };
        let mut lister = self
            .operator
            .lister_with(dir)
            .recursive(true)
            .await
            .map_err(|e| opendal_error("Azure list failed", e))?;

        let mut objects = Vec::new();
        let mut has_more = false;
        while let Some(entry) = lister
            .try_next()
            .await
            .map_err(|e| opendal_error("Azure list failed", e))?
        {
            let path = entry.path();
            if path.ends_with('/') || !path.starts_with(prefix) {
                continue;
            }
            if continuation_token.is_some_and(|token| path <= token) {
                continue;
            }
            if objects.len() == max_results {
                has_more = true;
                break;
            }
            objects.push(Self::info(path, entry.metadata()));
        }

        let next_token = if has_more {
            objects.last().map(|o: &ObjectInfo| o.key.clone())
        } else {
            None
        };
        Ok(ObjectPage { objects, next_token })
    }

    fn object_url(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.container_url, http::encode_key(&key.as_key()))
    }

    async fn presign_upload(
        &self,
        key: &ObjectKey,
        _constraints: &UploadConstraints,
        expires_in: Duration,
    ) -> Result<String> {
        self.ensure_can_sign()?;
        let signed = self
            .operator
            .presign_write(&key.as_key(), Self::lifetime(expires_in))
            .await
            .map_err(|e| opendal_error("Failed to sign upload URL", e))?;
        Ok(signed.uri().to_string())
    }

    async fn presign_view(&self, key: &ObjectKey, expires_in: Duration) -> Result<String> {
        self.ensure_can_sign()?;
        let signed = self
            .operator
            .presign_read(&key.as_key(), Self::lifetime(expires_in))
            .await
            .map_err(|e| opendal_error("Failed to sign view URL", e))?;
        Ok(signed.uri().to_string())
    }
}

/// Map an OpenDAL failure to the crate error.
fn opendal_error(context: &str, err: opendal::Error) -> Error {
    let detail = format!("{}: {}", context, err);
    match err.kind() {
        ErrorKind::NotFound => Error::NotFound(detail),
        ErrorKind::PermissionDenied => Error::PermissionDenied(detail),
        ErrorKind::RateLimited => Error::Throttled(detail),
        ErrorKind::ConfigInvalid => Error::Configuration(detail),
        ErrorKind::Unsupported => Error::NotSupported(detail),
        _ if err.is_temporary() => Error::Network(detail),
        // OpenDAL does not expose the response status.
        _ => Error::Provider {
            status: 0,
            message: detail,
        },
    }
}

/// Parse a provider timestamp rendered either as RFC 3339 or as
/// `2024-01-02 03:04:05 UTC`.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f UTC").map(|d| d.and_utc())
        })
        .ok()
}
