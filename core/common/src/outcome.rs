//! Normalized result values returned by every public storage operation.
//!
//! Provider responses never leak past the driver boundary: each operation
//! folds its outcome into one of these values. Exactly one of the payload
//! fields or `error` is meaningful, depending on `success`.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::ObjectInfo;

/// Outcome of a single upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    /// Generated stored name, never the caller's original name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    pub fn ok(file_name: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            success: true,
            file_name: Some(file_name.into()),
            file_url: Some(file_url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            file_name: None,
            file_url: None,
            error: Some(error.into()),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::failed(err.to_string())
    }
}

/// Outcome of a signed URL request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedGrant {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Full provider key, including any path prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Value to hand back to `validate_and_confirm`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
    /// Content type bound into the signature, when the provider supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size bound into the signature, when the provider supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Seconds from issuance until the URL stops working.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// True when the caller must call `validate_and_confirm` after uploading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PresignedGrant {
    /// Grant for a write URL.
    pub fn upload(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        upload_url: impl Into<String>,
        expires_in: u64,
        requires_validation: bool,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            success: true,
            reference: Some(file_name.clone()),
            file_name: Some(file_name),
            file_path: Some(file_path.into()),
            upload_url: Some(upload_url.into()),
            expires_in: Some(expires_in),
            requires_validation: Some(requires_validation),
            ..Self::default()
        }
    }

    /// Grant for a read URL.
    pub fn view(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        view_url: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            success: true,
            reference: Some(file_name.clone()),
            file_name: Some(file_name),
            file_path: Some(file_path.into()),
            view_url: Some(view_url.into()),
            expires_in: Some(expires_in),
            ..Self::default()
        }
    }

    /// Record the constraints encoded into the signature.
    pub fn with_constraints(
        mut self,
        content_type: Option<String>,
        file_size: Option<u64>,
    ) -> Self {
        self.content_type = content_type;
        self.file_size = file_size;
        self
    }

    pub fn with_view_url(mut self, view_url: impl Into<String>) -> Self {
        self.view_url = Some(view_url.into());
        self
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::failed(err.to_string())
    }
}

/// What `validate_and_confirm` should check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    #[serde(default)]
    pub expected_content_type: Option<String>,
    #[serde(default)]
    pub expected_file_size: Option<u64>,
    /// Remove the object when it does not match.
    #[serde(default = "default_delete_on_failure")]
    pub delete_on_failure: bool,
}

fn default_delete_on_failure() -> bool {
    true
}

impl ValidationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.expected_content_type = Some(content_type.into());
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.expected_file_size = Some(size);
        self
    }

    pub fn keep_on_failure(mut self) -> Self {
        self.delete_on_failure = false;
        self
    }
}

impl Default for ValidationRequest {
    fn default() -> Self {
        Self {
            expected_content_type: None,
            expected_file_size: None,
            delete_on_failure: default_delete_on_failure(),
        }
    }
}

/// Result of checking an uploaded object against expected constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn confirmed(
        reference: impl Into<String>,
        view_url: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            success: true,
            reference: Some(reference.into()),
            view_url,
            expires_in,
            ..Self::default()
        }
    }

    pub fn with_observed(mut self, content_type: Option<String>, size: Option<u64>) -> Self {
        self.actual_content_type = content_type;
        self.actual_file_size = size;
        self
    }

    pub fn failed(reference: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            reference: Some(reference.into()),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Per-name deletion result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    /// Exactly the name that was requested.
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteOutcome {
    pub fn ok(file_name: impl Into<String>) -> Self {
        Self {
            success: true,
            file_name: file_name.into(),
            error: None,
        }
    }

    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            file_name: file_name.into(),
            error: Some(error.into()),
        }
    }
}

/// One page of a listing, normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOutcome {
    pub success: bool,
    pub objects: Vec<ObjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListOutcome {
    pub fn ok(objects: Vec<ObjectInfo>, next_token: Option<String>) -> Self {
        Self {
            success: true,
            objects,
            next_token,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
