//! Local filesystem backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::trace;

use crate::backend::{ObjectBackend, SigningSupport, UploadConstraints};
use unistore_common::{Error, ObjectInfo, ObjectKey, ObjectPage, Result, UploadOptions};

/// Local filesystem backend.
///
/// Objects are files under `root`; key components map onto directories.
/// Concurrent uploads never share a key because stored names are unique,
/// so no locking is done here.
pub struct LocalBackend {
    root: PathBuf,
    base_url: String,
}

impl LocalBackend {
    /// Create a new local backend rooted at `root`.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Root exists but is not a directory
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        } else if !root.is_dir() {
            return Err(Error::Configuration(format!(
                "Local storage path is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    /// Convert an ObjectKey to a filesystem path.
    fn to_fs_path(&self, key: &ObjectKey) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in key.components() {
            fs_path.push(component);
        }
        fs_path
    }

    /// Create object info from filesystem metadata.
    fn create_info(&self, key: &ObjectKey, fs_meta: &std::fs::Metadata) -> ObjectInfo {
        let modified: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        ObjectInfo {
            name: key.name().to_string(),
            key: key.as_key(),
            size: fs_meta.len(),
            content_type: mime_guess::from_path(key.name())
                .first_raw()
                .map(String::from),
            last_modified: Some(modified),
            etag: Some(format!("{}-{}", modified.timestamp(), fs_meta.len())),
        }
    }

    /// Every file key under the root, sorted.
    async fn all_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(String::from) else {
                    continue;
                };
                let child_rel = if rel.is_empty() {
                    name
                } else {
                    format!("{}/{}", rel, name)
                };

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), child_rel));
                } else if file_type.is_file() {
                    keys.push(child_rel);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn signing_support(&self) -> SigningSupport {
        SigningSupport::Unsupported
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<()> {
        let fs_path = self.to_fs_path(key);

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if !options.metadata.is_empty() || options.cache_control.is_some() {
            trace!("Local backend ignores upload options for {}", key);
        }

        fs::write(&fs_path, &data).await?;
        trace!("Wrote {} bytes ({}) to {}", data.len(), content_type, fs_path.display());
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        let fs_path = self.to_fs_path(key);

        if fs_path.is_dir() {
            return Err(Error::InvalidInput(format!("Not a file: {}", key)));
        }

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("File not found: {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        let fs_path = self.to_fs_path(key);

        let fs_meta = match fs::metadata(&fs_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("File not found: {}", key)));
            }
            Err(e) => return Err(e.into()),
        };

        if !fs_meta.is_file() {
            return Err(Error::NotFound(format!("File not found: {}", key)));
        }

        Ok(self.create_info(key, &fs_meta))
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_results: usize,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        let mut matching = self
            .all_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| continuation_token.map_or(true, |token| k.as_str() > token))
            .peekable();

        let mut objects = Vec::new();
        while objects.len() < max_results {
            let Some(raw) = matching.next() else {
                break;
            };
            let key = ObjectKey::parse(&raw)?;
            let fs_meta = fs::metadata(self.to_fs_path(&key)).await?;
            objects.push(self.create_info(&key, &fs_meta));
        }

        let next_token = if matching.peek().is_some() {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage { objects, next_token })
    }

    fn object_url(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key.as_key())
    }

    async fn presign_upload(
        &self,
        _key: &ObjectKey,
        _constraints: &UploadConstraints,
        _expires_in: Duration,
    ) -> Result<String> {
        Err(Error::NotSupported(
            "The local backend cannot generate signed URLs".to_string(),
        ))
    }

    async fn presign_view(&self, _key: &ObjectKey, _expires_in: Duration) -> Result<String> {
        Err(Error::NotSupported(
            "The local backend cannot generate signed URLs".to_string(),
        ))
    }
}
