//! Common types used throughout Unistore.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Full object key inside a bucket or container.
///
/// A key is an optional path prefix followed by a stored name, joined by
/// `/`. Components are validated so a key can never escape its namespace
/// when mapped onto a filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    components: Vec<String>,
}

impl ObjectKey {
    /// Build a key from an optional prefix and a stored name.
    ///
    /// # Errors
    /// - Name is empty or contains a separator
    /// - Any component is `.`, `..` or contains control characters
    pub fn new(prefix: Option<&str>, name: &str) -> crate::Result<Self> {
        if name.contains('/') || name.contains('\\') {
            return Err(crate::Error::InvalidInput(format!(
                "File name cannot contain path separators: {}",
                name
            )));
        }

        let mut components = Vec::new();
        if let Some(prefix) = prefix {
            components.extend(
                prefix
                    .split('/')
                    .filter(|c| !c.is_empty())
                    .map(String::from),
            );
        }
        components.push(name.to_string());
        Self::from_components(components)
    }

    /// Parse a `/`-separated key as returned by a provider listing.
    pub fn parse(key: &str) -> crate::Result<Self> {
        let trimmed = key.trim_matches('/');
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Object key cannot be empty".to_string(),
            ));
        }
        Self::from_components(trimmed.split('/').map(String::from).collect())
    }

    fn from_components(components: Vec<String>) -> crate::Result<Self> {
        for comp in &components {
            if comp.is_empty() {
                return Err(crate::Error::InvalidInput(
                    "Key component cannot be empty".to_string(),
                ));
            }
            if comp == "." || comp == ".." {
                return Err(crate::Error::InvalidInput(format!(
                    "Key component not allowed: {}",
                    comp
                )));
            }
            if comp.contains('\\') || comp.chars().any(char::is_control) {
                return Err(crate::Error::InvalidInput(format!(
                    "Key component contains invalid characters: {}",
                    comp.escape_default()
                )));
            }
        }
        Ok(Self { components })
    }

    /// Last component: the stored name.
    pub fn name(&self) -> &str {
        self.components.last().map(|s| s.as_str()).unwrap_or_default()
    }

    /// Get the key components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Key as sent to a provider (`prefix/name`).
    pub fn as_key(&self) -> String {
        self.components.join("/")
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Logical input to an upload.
///
/// The driver owns `content` for the duration of the call. `declared_size`
/// is checked against the configured limit but never trusted as the stored
/// size.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    /// Raw payload.
    pub content: Bytes,
    /// Name supplied by the caller; only used to derive the stored name.
    pub original_name: String,
    /// MIME type supplied by the caller.
    pub mime_type: String,
    /// Size supplied by the caller.
    pub declared_size: u64,
}

impl UploadTarget {
    /// Create a target whose declared size is the payload length.
    pub fn new(
        content: impl Into<Bytes>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let declared_size = content.len() as u64;
        Self {
            content,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            declared_size,
        }
    }

    /// Override the declared size.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }
}

/// Per-upload knobs passed through to the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    /// `Cache-Control` value stored with the object.
    #[serde(default)]
    pub cache_control: Option<String>,
    /// User metadata stored with the object.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl UploadOptions {
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

/// Metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// Stored name (last key component).
    pub name: String,
    /// Full provider key including any prefix.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type as recorded by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag or revision marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_with_prefix() {
        let key = ObjectKey::new(Some("media/avatars/"), "1_abc_a.png").unwrap();
        assert_eq!(key.as_key(), "media/avatars/1_abc_a.png");
        assert_eq!(key.name(), "1_abc_a.png");
        assert_eq!(key.components().len(), 3);
    }

    #[test]
    fn test_key_without_prefix() {
        let key = ObjectKey::new(None, "file.txt").unwrap();
        assert_eq!(key.as_key(), "file.txt");
    }

    #[test]
    fn test_key_rejects_traversal() {
        assert!(ObjectKey::new(None, "..").is_err());
        assert!(ObjectKey::new(None, "../etc/passwd").is_err());
        assert!(ObjectKey::new(Some("a/../b"), "x").is_err());
        assert!(ObjectKey::new(None, "a\\b").is_err());
        assert!(ObjectKey::new(None, "").is_err());
    }

    #[test]
    fn test_key_parse() {
        let key = ObjectKey::parse("/uploads/x.bin").unwrap();
        assert_eq!(key.components(), &["uploads", "x.bin"]);
        assert!(ObjectKey::parse("/").is_err());
    }

    #[test]
    fn test_upload_target_declared_size() {
        let target = UploadTarget::new(b"hello".to_vec(), "a.txt", "text/plain");
        assert_eq!(target.declared_size, 5);

        let target = target.with_declared_size(42);
        assert_eq!(target.declared_size, 42);
    }
}
