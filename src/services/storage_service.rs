//! StorageService — core S3-like operations backed by flat CSV metadata
//! and local disk for object payloads. Payloads live at
//! `base_path/{bucket}/{key}` (keys may contain `/`, producing nested
//! directories); metadata lives in `buckets.csv` at the root and one
//! `objects.csv` per bucket.
//!
//! Cross-file consistency rules enforced here:
//! - a metadata record is never removed before the corresponding payload
//!   file is confirmed gone;
//! - a metadata record is never written for a filesystem change that did
//!   not happen;
//! - every object mutation updates the owning bucket's status and
//!   last-modified time before the operation reports success.

use crate::models::bucket::{Bucket, BucketStatus};
use crate::models::object::ObjectRecord;
use crate::store::bucket_catalog::{self, BucketCatalog};
use crate::store::locks::FileLocks;
use crate::store::object_index::{INDEX_FILE, ObjectIndex};
use crate::store::validate;
use crate::store::{StorageError, StorageResult};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct StorageService {
    /// Storage root holding `buckets.csv` and one directory per bucket.
    pub base_path: PathBuf,
    catalog: BucketCatalog,
    index: ObjectIndex,
}

impl StorageService {
    /// Create a service rooted at `base_path`. The catalog and every bucket
    /// index share one lock registry so all access to a given file is
    /// serialized.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let locks = Arc::new(FileLocks::new());
        Self {
            catalog: BucketCatalog::new(base_path.clone(), Arc::clone(&locks)),
            index: ObjectIndex::new(base_path.clone(), locks),
            base_path,
        }
    }

    pub async fn create_bucket(&self, name: &str) -> StorageResult<Bucket> {
        self.catalog.create(name).await
    }

    pub async fn list_buckets(&self) -> StorageResult<Vec<Bucket>> {
        self.catalog.list().await
    }

    pub async fn get_bucket(&self, name: &str) -> StorageResult<Bucket> {
        self.catalog.get(name).await
    }

    pub async fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        self.catalog.delete(name).await
    }

    /// Store a payload and upsert its index record, then mark the bucket
    /// active. The payload is written to a temp file and renamed into place
    /// so a failed upload never leaves a partial object behind.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        data: Bytes,
    ) -> StorageResult<ObjectRecord> {
        ensure_key_safe(key)?;
        self.catalog.get(bucket).await?;

        let file_path = self.object_path(bucket, key);
        let parent = file_path
            .parent()
            .ok_or_else(|| StorageError::Io(ErrorKind::InvalidInput.into()))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = fs::write(&tmp_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        match self
            .index
            .put(bucket, key, data.len() as u64, content_type)
            .await
        {
            Ok(record) => {
                self.catalog
                    .update_status(bucket, BucketStatus::Active)
                    .await?;
                self.catalog.touch_last_modified(bucket).await?;
                debug!(bucket, key, size = record.size, "object stored");
                Ok(record)
            }
            Err(err) => {
                // The index rewrite failed; a payload with no record would
                // break the record-iff-payload invariant, so take it back out.
                let _ = fs::remove_file(&file_path).await;
                Err(err)
            }
        }
    }

    /// Read a payload. The index record gates the read; the resolved
    /// content type comes from stored metadata first, then the file
    /// extension, then a sniff of the leading bytes.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(ObjectRecord, Vec<u8>, String)> {
        ensure_key_safe(key)?;
        self.catalog.get(bucket).await?;
        let record = self.index.get(bucket, key).await?;

        let file_path = self.object_path(bucket, key);
        let data = fs::read(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        let content_type = match &record.content_type {
            Some(stored) => stored.clone(),
            None => resolve_content_type(&file_path, &data),
        };
        Ok((record, data, content_type))
    }

    /// Remove a payload and its index record, then re-derive the bucket's
    /// status from the directory contents.
    ///
    /// The payload goes first: if its removal fails the record stays, so
    /// metadata is never deleted for a file that still exists. A payload
    /// that is already missing counts as confirmed gone and the stale
    /// record is cleaned up.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        ensure_key_safe(key)?;
        self.catalog.get(bucket).await?;
        self.index.get(bucket, key).await?;

        let file_path = self.object_path(bucket, key);
        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(bucket, key, "payload already missing, removing stale record");
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(bucket);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        self.index.delete(bucket, key).await?;

        let status = match bucket_catalog::is_bucket_empty(&self.bucket_root(bucket)).await {
            Ok(true) => BucketStatus::Inactive,
            Ok(false) => BucketStatus::Active,
            Err(err) if err.kind() == ErrorKind::NotFound => BucketStatus::Inactive,
            Err(err) => return Err(StorageError::Io(err)),
        };
        self.catalog.update_status(bucket, status).await?;
        debug!(bucket, key, "object deleted");
        Ok(())
    }

    /// Remove empty directories left behind by a nested key, walking up
    /// towards (but never including) the bucket root. Stops at the first
    /// non-empty or missing directory. Without this, deleting the last
    /// `a/b/c` key would leave `a/b` behind and the bucket would never
    /// read as empty again.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(()) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!(dir = %current.display(), error = %err, "failed to prune directory");
                    break;
                }
            }
        }
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.base_path.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.bucket_root(bucket);
        path.push(key);
        path
    }
}

/// Key validation for the service layer: the charset/length rules plus the
/// reserved index file name and a path traversal guard (no empty, `.` or
/// `..` segments, which also rejects leading and trailing slashes).
fn ensure_key_safe(key: &str) -> StorageResult<()> {
    if !validate::is_valid_object_key(key) {
        return Err(StorageError::InvalidObjectKey);
    }
    if key == INDEX_FILE {
        return Err(StorageError::InvalidObjectKey);
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidObjectKey);
        }
    }
    Ok(())
}

/// Map a file extension to a MIME type, else sniff the payload.
fn resolve_content_type(path: &Path, data: &[u8]) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| mime_for_extension(&ext.to_ascii_lowercase()))
        .unwrap_or_else(|| sniff_content_type(data))
        .to_string()
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "txt" | "log" => "text/plain; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wasm" => "application/wasm",
        _ => return None,
    })
}

/// Magic-number heuristic over the first bytes of the payload. Falls back
/// to `text/plain` for valid UTF-8 and `application/octet-stream` otherwise.
fn sniff_content_type(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"OggS", "application/ogg"),
    ];
    for (magic, mime) in SIGNATURES {
        if data.starts_with(magic) {
            return mime;
        }
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    let head = &data[..data.len().min(512)];
    if std::str::from_utf8(head).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
