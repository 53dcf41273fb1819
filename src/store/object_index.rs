//! Per-bucket object index: one CSV row per object key, persisted in the
//! bucket directory next to the payload files it describes.

use crate::models::bucket::parse_timestamp;
use crate::models::object::ObjectRecord;
use crate::store::bucket_catalog::is_bucket_empty;
use crate::store::locks::FileLocks;
use crate::store::record_table::{self, Record};
use crate::store::{StorageError, StorageResult};
use chrono::{SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Index file name inside each bucket directory.
pub const INDEX_FILE: &str = "objects.csv";

#[derive(Clone, Debug)]
pub struct ObjectIndex {
    root: PathBuf,
    locks: Arc<FileLocks>,
}

impl ObjectIndex {
    pub fn new(root: impl Into<PathBuf>, locks: Arc<FileLocks>) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    fn index_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket).join(INDEX_FILE)
    }

    /// Insert or overwrite the record for `key`. An overwrite keeps the
    /// original creation timestamp and refreshes everything else.
    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        size: u64,
        content_type: Option<String>,
    ) -> StorageResult<ObjectRecord> {
        let path = self.index_path(bucket);
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, ObjectRecord::FIELDS, true).await?;

        let now = Utc::now().trunc_subsecs(0);
        let created_at = record_table::find_by_key(&table, key)
            .and_then(|existing| parse_timestamp(existing.get(1)?))
            .unwrap_or(now);

        let record = ObjectRecord {
            key: key.to_string(),
            created_at,
            size,
            content_type,
            last_modified: now,
        };
        record_table::upsert(&mut table, record.to_record());
        record_table::rewrite_all(&path, &table).await?;
        Ok(record)
    }

    /// Look up the record for `key`. Gates every payload read and delete:
    /// callers must not touch the payload file unless this succeeds.
    pub async fn get(&self, bucket: &str, key: &str) -> StorageResult<ObjectRecord> {
        let path = self.index_path(bucket);
        let _guard = self.locks.lock(&path).await;
        let table = record_table::load_all(&path, ObjectRecord::FIELDS, true).await?;
        let idx = table
            .iter()
            .position(|record| record.first().map(String::as_str) == Some(key))
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        decode(&path, idx, &table[idx])
    }

    /// Remove the record for `key`. The caller confirms the payload file is
    /// gone before calling this. When the last record goes and the bucket
    /// directory holds nothing else, the index file itself is pruned.
    pub async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.index_path(bucket);
        let _guard = self.locks.lock(&path).await;
        let mut table = record_table::load_all(&path, ObjectRecord::FIELDS, true).await?;
        if record_table::find_by_key(&table, key).is_none() {
            return Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        record_table::delete_by_key(&mut table, key);
        record_table::rewrite_all(&path, &table).await?;

        if table.is_empty() {
            if let Some(dir) = path.parent() {
                if matches!(is_bucket_empty(dir).await, Ok(true)) {
                    if let Err(err) = fs::remove_file(&path).await {
                        debug!(bucket, error = %err, "could not prune empty object index");
                    }
                }
            }
        }
        Ok(())
    }
}

fn decode(path: &Path, idx: usize, record: &Record) -> StorageResult<ObjectRecord> {
    ObjectRecord::from_record(record).ok_or_else(|| StorageError::CorruptStore {
        path: path.display().to_string(),
        line: idx + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index(dir: &TempDir, bucket: &str) -> ObjectIndex {
        std::fs::create_dir(dir.path().join(bucket)).unwrap();
        ObjectIndex::new(dir.path(), Arc::new(FileLocks::new()))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        index
            .put("my-bucket", "file.txt", 5, Some("text/plain".into()))
            .await
            .unwrap();

        let record = index.get("my-bucket", "file.txt").await.unwrap();
        assert_eq!(record.size, 5);
        assert_eq!(record.content_type.as_deref(), Some("text/plain"));
        assert_eq!(record.created_at, record.last_modified);
    }

    #[tokio::test]
    async fn overwrite_preserves_creation_timestamp() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        let first = index
            .put("my-bucket", "file.txt", 5, Some("text/plain".into()))
            .await
            .unwrap();
        let second = index
            .put("my-bucket", "file.txt", 11, Some("text/html".into()))
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.size, 11);
        assert_eq!(second.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn get_of_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        let err = index.get("my-bucket", "ghost").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        let err = index.delete("my-bucket", "ghost").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn index_file_is_pruned_when_bucket_clears() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        index.put("my-bucket", "a.txt", 1, None).await.unwrap();
        index.put("my-bucket", "b.txt", 1, None).await.unwrap();
        let index_path = dir.path().join("my-bucket").join(INDEX_FILE);

        index.delete("my-bucket", "a.txt").await.unwrap();
        assert!(index_path.is_file());

        index.delete("my-bucket", "b.txt").await.unwrap();
        assert!(!index_path.exists());
    }

    #[tokio::test]
    async fn index_survives_when_stray_file_remains() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir, "my-bucket");
        index.put("my-bucket", "a.txt", 1, None).await.unwrap();
        fs::write(dir.path().join("my-bucket/stray"), b"x")
            .await
            .unwrap();

        index.delete("my-bucket", "a.txt").await.unwrap();
        assert!(dir.path().join("my-bucket").join(INDEX_FILE).is_file());
    }
}
