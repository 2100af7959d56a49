//! Unified file storage over cloud object stores and the local disk.
//!
//! Applications hold a [`StorageManager`] built from a [`StorageConfig`].
//! The manager forwards to one [`StorageDriver`], which normalizes every
//! provider outcome into a result value and retries transient failures.
//!
//! # Layers
//! - [`ObjectBackend`]: thin, `Result`-returning provider primitives
//!   (S3, GCS, Azure Blob, local disk, in-memory)
//! - [`StandardDriver`]: validation, stored-name generation, retries and
//!   direct uploads over any backend
//! - [`PresignedDriver`]: signed upload and view URLs on top of a
//!   standard driver, with post-upload validation where the signature
//!   cannot pin content type and size
//!
//! [`StorageConfig`]: unistore_common::StorageConfig

pub mod azure;
pub mod backend;
pub mod driver;
pub mod gcs;
mod http;
pub mod local;
pub mod manager;
pub mod memory;
pub mod presigned;
pub mod registry;
pub mod retry;
pub mod s3;
pub mod standard;
#[cfg(test)]
mod stub;

pub use azure::AzureBackend;
pub use backend::{ObjectBackend, SigningSupport, UploadConstraints};
pub use driver::{confirm_by_existence, GrantRequest, StorageDriver};
pub use local::LocalBackend;
pub use manager::StorageManager;
pub use memory::MemoryBackend;
pub use presigned::PresignedDriver;
pub use registry::{create_default_registry, DriverFactory, DriverRegistry};
pub use retry::{retry_with_policy, RetryExecutor, RetryPolicy};
pub use crate::s3::S3Backend;
pub use standard::StandardDriver;
