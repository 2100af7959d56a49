//! Common types shared across Unistore crates.
//!
//! This crate holds the pieces every driver agrees on: the error type,
//! configuration and its validation, stored-name generation, and the
//! normalized outcome values returned to callers.

pub mod config;
pub mod error;
pub mod naming;
pub mod outcome;
pub mod types;

pub use config::{
    validate_storage_config, AwsSettings, AzureSettings, ConfigValidation, DriverKind,
    GcsSettings, RetrySettings, StorageConfig,
};
pub use error::{Error, Result};
pub use naming::{generate_stored_name, DefaultSanitizer, FileNameSanitizer, SanitizedName};
pub use outcome::{
    DeleteOutcome, ListOutcome, PresignedGrant, UploadResult, ValidationOutcome,
    ValidationRequest,
};
pub use types::{ObjectInfo, ObjectKey, ObjectPage, UploadOptions, UploadTarget};
