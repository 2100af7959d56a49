//! S3 backend built on `rust-s3`.
//!
//! Upload URLs carry `content-type` and `content-length` as signed headers,
//! so S3 itself rejects writes that do not match them.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::Region;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::backend::{ObjectBackend, SigningSupport, UploadConstraints};
use crate::http;
use unistore_common::config::MAX_PRESIGNED_URL_EXPIRY;
use unistore_common::{
    AwsSettings, Error, ObjectInfo, ObjectKey, ObjectPage, Result, UploadOptions,
};

/// Largest page S3 returns for one list call.
const MAX_LIST_KEYS: usize = 1000;

/// S3 (or S3-compatible) bucket backend.
pub struct S3Backend {
    name: &'static str,
    bucket: Box<Bucket>,
    base_url: String,
}

impl S3Backend {
    /// Create a backend for `bucket`.
    ///
    /// # Errors
    /// - `Error::Configuration` if region or keys are missing, or the
    ///   endpoint is not a URL
    pub fn new(bucket: impl Into<String>, settings: &AwsSettings) -> Result<Self> {
        let region = required(&settings.region, "aws.region")?;
        let credentials = Credentials::new(
            Some(&required(&settings.access_key_id, "aws.accessKeyId")?),
            Some(&required(&settings.secret_access_key, "aws.secretAccessKey")?),
            settings.session_token.as_deref().filter(|t| !t.is_empty()),
            None,
            None,
        )
        .map_err(|e| Error::Configuration(format!("Invalid AWS credentials: {}", e)))?;

        let endpoint = match settings.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => format!("https://s3.{}.amazonaws.com", region),
        };

        Self::from_parts(
            "s3",
            bucket.into(),
            region,
            &endpoint,
            credentials,
            settings.force_path_style,
        )
    }

    /// Assemble a backend for any S3-compatible endpoint.
    pub(crate) fn from_parts(
        name: &'static str,
        bucket: String,
        region: String,
        endpoint: &str,
        credentials: Credentials,
        path_style: bool,
    ) -> Result<Self> {
        let (scheme, host) = split_endpoint(endpoint)?;
        let base_url = if path_style {
            format!("{}://{}/{}", scheme, host, bucket)
        } else {
            format!("{}://{}.{}", scheme, bucket, host)
        };

        let region = Region::Custom {
            region,
            endpoint: format!("{}://{}", scheme, host),
        };
        let handle = Bucket::new(&bucket, region, credentials).map_err(|e| {
            Error::Configuration(format!("Failed to create S3 bucket handle: {}", e))
        })?;
        let handle = if path_style {
            handle.with_path_style()
        } else {
            handle
        };

        Ok(Self {
            name,
            bucket: handle,
            base_url,
        })
    }

    fn expiry_secs(expires_in: Duration) -> u32 {
        expires_in.as_secs().clamp(1, MAX_PRESIGNED_URL_EXPIRY) as u32
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    fn name(&self) -> &str {
        self.name
    }

    fn signing_support(&self) -> SigningSupport {
        SigningSupport::Enforcing
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<()> {
        let path = key.as_key();
        debug!("Uploading {} bytes to {}", data.len(), key);

        if options.cache_control.is_none() && options.metadata.is_empty() {
            self.bucket
                .put_object_with_content_type(&path, &data, content_type)
                .await
                .map_err(|e| s3_error("S3 upload failed", e))?;
            return Ok(());
        }

        let mut bucket = (*self.bucket).clone();
        if let Some(cache_control) = &options.cache_control {
            bucket.add_header("cache-control", cache_control);
        }
        for (name, value) in &options.metadata {
            bucket.add_header(&format!("x-amz-meta-{}", name.to_ascii_lowercase()), value);
        }
        bucket
            .put_object_with_content_type(&path, &data, content_type)
            .await
            .map_err(|e| s3_error("S3 upload failed", e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        // DELETE succeeds for missing keys, so check first.
        self.head_object(key).await?;

        self.bucket
            .delete_object(key.as_key())
            .await
            .map_err(|e| s3_error("S3 delete failed", e))?;
        debug!("Deleted {}", key);
        Ok(())
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        let (head, _) = self
            .bucket
            .head_object(key.as_key())
            .await
            .map_err(|e| s3_error("S3 head failed", e))?;

        Ok(ObjectInfo {
            name: key.name().to_string(),
            key: key.as_key(),
            size: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head.content_type,
            last_modified: head
                .last_modified
                .as_deref()
                .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                .map(|d| d.with_timezone(&Utc)),
            etag: head.e_tag.map(|e| e.trim_matches('"').to_string()),
        })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        let (result, _) = self
            .bucket
            .list_page(
                prefix.to_string(),
                None,
                continuation_token.map(String::from),
                None,
                Some(max_results.clamp(1, MAX_LIST_KEYS)),
            )
            .await
            .map_err(|e| s3_error("S3 list failed", e))?;

        let objects = result
            .contents
            .into_iter()
            .filter(|object| !object.key.ends_with('/'))
            .map(|object| ObjectInfo {
                name: object
                    .key
                    .rsplit('/')
                    .next()
                    .unwrap_or(&object.key)
                    .to_string(),
                size: object.size,
                content_type: None,
                last_modified: DateTime::parse_from_rfc3339(&object.last_modified)
                    .ok()
                    .map(|d| d.with_timezone(&Utc)),
                etag: object.e_tag.map(|e| e.trim_matches('"').to_string()),
                key: object.key,
            })
            .collect();

        let next_token = if result.is_truncated {
            result.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage { objects, next_token })
    }

    fn object_url(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.base_url, http::encode_key(&key.as_key()))
    }

    async fn presign_upload(
        &self,
        key: &ObjectKey,
        constraints: &UploadConstraints,
        expires_in: Duration,
    ) -> Result<String> {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = &constraints.content_type {
            let value = HeaderValue::from_str(content_type).map_err(|_| {
                Error::InvalidInput(format!("Invalid content type: {}", content_type))
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        if let Some(length) = constraints.content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        }

        self.bucket
            .presign_put(key.as_key(), Self::expiry_secs(expires_in), Some(headers), None)
            .await
            .map_err(|e| s3_error("Failed to sign upload URL", e))
    }

    async fn presign_view(&self, key: &ObjectKey, expires_in: Duration) -> Result<String> {
        self.bucket
            .presign_get(key.as_key(), Self::expiry_secs(expires_in), None)
            .await
            .map_err(|e| s3_error("Failed to sign view URL", e))
    }
}

/// Map a `rust-s3` failure to the crate error.
fn s3_error(context: &str, err: S3Error) -> Error {
    match err {
        S3Error::HttpFailWithBody(status, body) => match http::status_error(status, &body) {
            Error::NotFound(detail) => Error::NotFound(format!("{}: {}", context, detail)),
            other => other,
        },
        S3Error::Credentials(e) => Error::PermissionDenied(format!("{}: {}", context, e)),
        other => Error::Network(format!("{}: {}", context, other)),
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::Configuration(format!("{} is required", field)))
}

/// Split an endpoint into URL scheme and `host[:port]`.
fn split_endpoint(endpoint: &str) -> Result<(String, String)> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| Error::Configuration(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Configuration(format!("Endpoint has no host: {}", endpoint)))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Ok((url.scheme().to_string(), host))
}
