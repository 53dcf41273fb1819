//! Metadata store: flat CSV tables kept consistent with the filesystem.
//!
//! Two stores share the `record_table` primitive: the bucket catalog
//! (one `buckets.csv` at the storage root) and the per-bucket object index
//! (`objects.csv` inside each bucket directory). All access to a backing
//! file goes through its `FileLocks` mutex.

pub mod bucket_catalog;
pub mod locks;
pub mod object_index;
pub mod record_table;
pub mod validate;

use std::io;
use thiserror::Error;

/// Everything that can go wrong in the metadata store. Each variant maps to
/// one HTTP status category at the handler boundary; failures are terminal
/// for the current request, never retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket name `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{0}` is not empty")]
    BucketNotEmpty(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("corrupt metadata in {path} at line {line}")]
    CorruptStore { path: String, line: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
