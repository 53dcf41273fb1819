//! Represents an object (file) stored in a bucket.

use crate::models::bucket::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a bucket's object index (`objects.csv`).
///
/// Columns: `key,createdAt,size,contentType,lastModified`. The key is
/// unique within its bucket; `created_at` survives overwrites while size,
/// content type and `last_modified` are refreshed on every put.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ObjectRecord {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// When the key was first written.
    pub created_at: DateTime<Utc>,

    /// Payload length in bytes at last write.
    pub size: u64,

    /// MIME type supplied at put time, if any.
    pub content_type: Option<String>,

    /// Timestamp of the last write to this key.
    pub last_modified: DateTime<Utc>,
}

impl ObjectRecord {
    /// Number of CSV columns in an index row.
    pub const FIELDS: usize = 5;

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            format_timestamp(self.created_at),
            self.size.to_string(),
            self.content_type.clone().unwrap_or_default(),
            format_timestamp(self.last_modified),
        ]
    }

    pub fn from_record(record: &[String]) -> Option<Self> {
        let content_type = record.get(3)?;
        Some(Self {
            key: record.first()?.clone(),
            created_at: parse_timestamp(record.get(1)?)?,
            size: record.get(2)?.parse().ok()?,
            content_type: if content_type.is_empty() {
                None
            } else {
                Some(content_type.clone())
            },
            last_modified: parse_timestamp(record.get(4)?)?,
        })
    }
}
