//! In-memory backend for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::backend::{ObjectBackend, SigningSupport, UploadConstraints};
use unistore_common::{Error, ObjectInfo, ObjectKey, ObjectPage, Result, UploadOptions};

/// In-memory object.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    modified: DateTime<Utc>,
    etag: String,
}

/// In-memory backend.
///
/// Useful for testing and development. All data is lost on drop. The
/// signing family is configurable so both presigned protocols can be
/// exercised, and transient failures can be injected to drive retries.
pub struct MemoryBackend {
    bucket: String,
    signing: SigningSupport,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    head_calls: AtomicUsize,
    pending_failures: AtomicU32,
}

impl MemoryBackend {
    /// Create an empty backend whose signed URLs enforce constraints.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            signing: SigningSupport::Enforcing,
            objects: RwLock::new(BTreeMap::new()),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            pending_failures: AtomicU32::new(0),
        }
    }

    /// Choose the signing family.
    pub fn with_signing(mut self, signing: SigningSupport) -> Self {
        self.signing = signing;
        self
    }

    /// Make the next `count` provider calls fail with a network error.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of `put_object` calls, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_object` calls, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `head_object` calls, including failed ones.
    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    /// Whether an object with this full key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Stored bytes for a full key.
    pub fn object_data(&self, key: &str) -> Option<Bytes> {
        self.read().get(key).map(|o| o.data.clone())
    }

    /// Act as a client `PUT` against a URL issued by `presign_upload`.
    ///
    /// Behaves like the provider would: expired or foreign URLs are
    /// rejected, and with `Enforcing` signing a content type or length that
    /// differs from the signed one is rejected too.
    pub fn simulate_signed_put(
        &self,
        signed_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let url = Url::parse(signed_url)
            .map_err(|e| Error::InvalidInput(format!("Malformed signed URL: {}", e)))?;

        if url.scheme() != "memory" || url.host_str() != Some(self.bucket.as_str()) {
            return Err(Error::PermissionDenied("URL was not issued for this bucket".to_string()));
        }

        let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        if params.get("op").map(String::as_str) != Some("put") {
            return Err(Error::PermissionDenied("URL does not grant write access".to_string()));
        }

        let expires: i64 = params
            .get("expires")
            .and_then(|e| e.parse().ok())
            .ok_or_else(|| Error::PermissionDenied("URL has no expiry".to_string()))?;
        if Utc::now().timestamp() > expires {
            return Err(Error::PermissionDenied("Signed URL has expired".to_string()));
        }

        if self.signing == SigningSupport::Enforcing {
            if let Some(signed_type) = params.get("contentType") {
                if signed_type != content_type {
                    return Err(Error::PermissionDenied(
                        "Content type does not match signature".to_string(),
                    ));
                }
            }
            if let Some(signed_len) = params.get("contentLength") {
                if signed_len != &data.len().to_string() {
                    return Err(Error::PermissionDenied(
                        "Content length does not match signature".to_string(),
                    ));
                }
            }
        }

        let key = url.path().trim_start_matches('/').to_string();
        self.store(key, data, content_type);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, key: String, data: Bytes, content_type: &str) {
        let object = StoredObject {
            data,
            content_type: content_type.to_string(),
            modified: Utc::now(),
            etag: Uuid::new_v4().to_string(),
        };
        self.write().insert(key, object);
    }

    fn take_failure(&self) -> Result<()> {
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(Error::Network("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }

    fn info(key: &str, object: &StoredObject) -> ObjectInfo {
        ObjectInfo {
            name: key.rsplit('/').next().unwrap_or(key).to_string(),
            key: key.to_string(),
            size: object.data.len() as u64,
            content_type: Some(object.content_type.clone()),
            last_modified: Some(object.modified),
            etag: Some(object.etag.clone()),
        }
    }

    fn signed_url(&self, key: &ObjectKey, op: &str, expires_in: Duration) -> Result<String> {
        if self.signing == SigningSupport::Unsupported {
            return Err(Error::NotSupported(
                "Signing is disabled for this memory backend".to_string(),
            ));
        }

        let mut url = Url::parse(&format!("memory://{}/", self.bucket))
            .map_err(|e| Error::Configuration(format!("Invalid bucket name: {}", e)))?;
        url.set_path(&key.as_key());
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        url.query_pairs_mut()
            .append_pair("op", op)
            .append_pair("expires", &expires.to_string());
        Ok(url.to_string())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn signing_support(&self) -> SigningSupport {
        self.signing
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
        _options: &UploadOptions,
    ) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.store(key.as_key(), data, content_type);
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        match self.write().remove(&key.as_key()) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("File not found: {}", key))),
        }
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let raw = key.as_key();
        self.read()
            .get(&raw)
            .map(|object| Self::info(&raw, object))
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", key)))
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        self.take_failure()?;
        let objects = self.read();
        let mut matching = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| continuation_token.map_or(true, |token| k.as_str() > token))
            .peekable();

        let mut page = Vec::new();
        while page.len() < max_results {
            match matching.next() {
                Some((k, object)) => page.push(Self::info(k, object)),
                None => break,
            }
        }

        let next_token = match matching.peek() {
            Some(_) => page.last().map(|o| o.key.clone()),
            None => None,
        };

        Ok(ObjectPage {
            objects: page,
            next_token,
        })
    }

    fn object_url(&self, key: &ObjectKey) -> String {
        format!("memory://{}/{}", self.bucket, key.as_key())
    }

    async fn presign_upload(
        &self,
        key: &ObjectKey,
        constraints: &UploadConstraints,
        expires_in: Duration,
    ) -> Result<String> {
        let signed = self.signed_url(key, "put", expires_in)?;
        let mut url = Url::parse(&signed)
            .map_err(|e| Error::Serialization(format!("Invalid signed URL: {}", e)))?;
        if self.signing == SigningSupport::Enforcing {
            let mut query = url.query_pairs_mut();
            if let Some(content_type) = &constraints.content_type {
                query.append_pair("contentType", content_type);
            }
            if let Some(length) = constraints.content_length {
                query.append_pair("contentLength", &length.to_string());
            }
        }
        Ok(url.to_string())
    }

    async fn presign_view(&self, key: &ObjectKey, expires_in: Duration) -> Result<String> {
        self.signed_url(key, "get", expires_in)
    }
}
