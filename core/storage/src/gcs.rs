//! Google Cloud Storage through its XML interoperability API.
//!
//! GCS accepts S3 SigV4 requests signed with HMAC interoperability keys, so
//! the S3 backend is reused with path-style addressing on
//! `storage.googleapis.com`.

use s3::creds::Credentials;

use crate::s3::S3Backend;
use unistore_common::{Error, GcsSettings, Result};

/// Default XML API endpoint.
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// GCS ignores the signing region; `auto` is accepted everywhere.
const GCS_SIGNING_REGION: &str = "auto";

impl S3Backend {
    /// Create a backend for a GCS bucket.
    ///
    /// # Errors
    /// - `Error::Configuration` if the HMAC key pair is missing
    pub fn for_gcs(bucket: impl Into<String>, settings: &GcsSettings) -> Result<Self> {
        let access_key_id = settings
            .access_key_id
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("gcs.accessKeyId is required".to_string()))?;
        let secret_access_key = settings
            .secret_access_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("gcs.secretAccessKey is required".to_string()))?;

        let credentials = Credentials::new(
            Some(access_key_id),
            Some(secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| Error::Configuration(format!("Invalid GCS credentials: {}", e)))?;

        let endpoint = settings
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(GCS_ENDPOINT);

        S3Backend::from_parts(
            "gcs",
            bucket.into(),
            GCS_SIGNING_REGION.to_string(),
            endpoint,
            credentials,
            true,
        )
    }
}
