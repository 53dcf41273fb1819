//! Bucket catalog: one CSV row per bucket, persisted in `buckets.csv` at
//! the storage root.
//!
//! Stored status is advisory. Read paths recompute it from a directory scan
//! and repair the row when it has drifted, so a crash between an index
//! update and a catalog update heals on the next access.

use crate::models::bucket::{Bucket, BucketStatus};
use crate::store::locks::FileLocks;
use crate::store::object_index::INDEX_FILE;
use crate::store::record_table::{self, Record};
use crate::store::validate;
use crate::store::{StorageError, StorageResult};
use chrono::{SubsecRound, Utc};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Catalog file name under the storage root.
pub const CATALOG_FILE: &str = "buckets.csv";

#[derive(Clone, Debug)]
pub struct BucketCatalog {
    root: PathBuf,
    locks: Arc<FileLocks>,
}

impl BucketCatalog {
    pub fn new(root: impl Into<PathBuf>, locks: Arc<FileLocks>) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create a bucket: insert a catalog row and make its directory.
    ///
    /// The directory is created before the catalog is touched; if mkdir
    /// fails the catalog is left unwritten, and if the catalog rewrite fails
    /// the fresh directory is removed again so the bucket is not half-born.
    pub async fn create(&self, name: &str) -> StorageResult<Bucket> {
        if let Some(reason) = validate::bucket_name_violation(name) {
            return Err(StorageError::InvalidBucketName {
                name: name.to_string(),
                reason: reason.to_string(),
            });
        }

        let path = self.catalog_path();
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, Bucket::FIELDS, true).await?;
        if record_table::find_by_key(&table, name).is_some() {
            return Err(StorageError::BucketAlreadyExists(name.to_string()));
        }

        let dir = self.bucket_dir(name);
        match fs::create_dir(&dir).await {
            Ok(()) => {}
            // A stray directory with no catalog row still means the name is taken.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::BucketAlreadyExists(name.to_string()));
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        // Second precision, so the value handed back equals what a reload
        // of the RFC 3339 row would produce.
        let now = Utc::now().trunc_subsecs(0);
        let bucket = Bucket {
            name: name.to_string(),
            creation_date: now,
            status: BucketStatus::Inactive,
            last_modified: now,
        };
        record_table::upsert(&mut table, bucket.to_record());
        if let Err(err) = record_table::rewrite_all(&path, &table).await {
            let _ = fs::remove_dir(&dir).await;
            return Err(err);
        }
        debug!(bucket = name, "bucket created");
        Ok(bucket)
    }

    /// All buckets in file order, with self-healed status.
    pub async fn list(&self) -> StorageResult<Vec<Bucket>> {
        let path = self.catalog_path();
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, Bucket::FIELDS, true).await?;

        let mut buckets = Vec::with_capacity(table.len());
        let mut dirty = false;
        for (idx, record) in table.iter_mut().enumerate() {
            let mut bucket = decode(&path, idx, record)?;
            let derived = self.derived_status(&bucket.name).await?;
            if bucket.status != derived {
                warn!(
                    bucket = %bucket.name,
                    stored = bucket.status.as_str(),
                    derived = derived.as_str(),
                    "repairing stale bucket status"
                );
                bucket.status = derived;
                *record = bucket.to_record();
                dirty = true;
            }
            buckets.push(bucket);
        }
        if dirty {
            record_table::rewrite_all(&path, &table).await?;
        }
        Ok(buckets)
    }

    /// Look up one bucket, self-healing its status like `list`.
    pub async fn get(&self, name: &str) -> StorageResult<Bucket> {
        let path = self.catalog_path();
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, Bucket::FIELDS, true).await?;
        let idx = position(&table, name)
            .ok_or_else(|| StorageError::BucketNotFound(name.to_string()))?;
        let mut bucket = decode(&path, idx, &table[idx])?;
        let derived = self.derived_status(name).await?;
        if bucket.status != derived {
            bucket.status = derived;
            table[idx] = bucket.to_record();
            record_table::rewrite_all(&path, &table).await?;
        }
        Ok(bucket)
    }

    /// Delete an empty bucket: directory tree first, catalog row second.
    /// A failed directory removal leaves the row in place so no live
    /// directory is ever orphaned without metadata.
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.catalog_path();
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, Bucket::FIELDS, true).await?;
        if record_table::find_by_key(&table, name).is_none() {
            return Err(StorageError::BucketNotFound(name.to_string()));
        }

        let dir = self.bucket_dir(name);
        match is_bucket_empty(&dir).await {
            Ok(true) => {}
            Ok(false) => return Err(StorageError::BucketNotEmpty(name.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::Io(err)),
        }

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::Io(err)),
        }

        record_table::delete_by_key(&mut table, name);
        record_table::rewrite_all(&path, &table).await?;
        debug!(bucket = name, "bucket deleted");
        Ok(())
    }

    /// Set a bucket's status and refresh its last-modified timestamp,
    /// preserving the creation date.
    pub async fn update_status(&self, name: &str, status: BucketStatus) -> StorageResult<()> {
        self.modify(name, |bucket| {
            bucket.status = status;
            bucket.last_modified = Utc::now().trunc_subsecs(0);
        })
        .await
    }

    /// Refresh only the last-modified timestamp.
    pub async fn touch_last_modified(&self, name: &str) -> StorageResult<()> {
        self.modify(name, |bucket| {
            bucket.last_modified = Utc::now().trunc_subsecs(0);
        })
        .await
    }

    async fn modify(&self, name: &str, apply: impl FnOnce(&mut Bucket)) -> StorageResult<()> {
        let path = self.catalog_path();
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, Bucket::FIELDS, true).await?;
        let idx = position(&table, name)
            .ok_or_else(|| StorageError::BucketNotFound(name.to_string()))?;
        let mut bucket = decode(&path, idx, &table[idx])?;
        apply(&mut bucket);
        table[idx] = bucket.to_record();
        record_table::rewrite_all(&path, &table).await
    }

    /// Status a bucket should have right now, from its directory contents.
    /// A missing directory counts as empty so a half-deleted bucket still
    /// reads as inactive instead of failing every catalog scan.
    async fn derived_status(&self, name: &str) -> StorageResult<BucketStatus> {
        match is_bucket_empty(&self.bucket_dir(name)).await {
            Ok(true) => Ok(BucketStatus::Inactive),
            Ok(false) => Ok(BucketStatus::Active),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BucketStatus::Inactive),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// A bucket directory is empty iff it holds nothing but its own index
/// file. Any stray entry placed there by external means counts as an
/// object for this purpose.
pub async fn is_bucket_empty(dir: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() != INDEX_FILE {
            return Ok(false);
        }
    }
    Ok(true)
}

fn position(table: &[Record], key: &str) -> Option<usize> {
    table
        .iter()
        .position(|record| record.first().map(String::as_str) == Some(key))
}

fn decode(path: &Path, idx: usize, record: &Record) -> StorageResult<Bucket> {
    Bucket::from_record(record).ok_or_else(|| StorageError::CorruptStore {
        path: path.display().to_string(),
        line: idx + 1,
    })
}
