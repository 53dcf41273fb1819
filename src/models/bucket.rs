//! Represents a logical bucket — a top-level container for objects.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Whether a bucket currently holds any objects. Derived state: `Active`
/// iff the bucket directory contains at least one non-index entry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BucketStatus {
    Active,
    Inactive,
}

impl BucketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BucketStatus::Active => "active",
            BucketStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BucketStatus::Active),
            "inactive" => Some(BucketStatus::Inactive),
            _ => None,
        }
    }
}

/// One row of the bucket catalog (`buckets.csv`).
///
/// `creation_date` is set once and never changes; `last_modified` is
/// refreshed on every object mutation inside the bucket.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bucket {
    /// Globally unique bucket name (DNS-style naming rules).
    pub name: String,

    /// When this bucket was created.
    pub creation_date: DateTime<Utc>,

    /// Active while the bucket holds objects, inactive when empty.
    pub status: BucketStatus,

    /// Last object mutation in this bucket.
    pub last_modified: DateTime<Utc>,
}

impl Bucket {
    /// Number of CSV columns in a catalog row.
    pub const FIELDS: usize = 4;

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            format_timestamp(self.creation_date),
            self.status.as_str().to_string(),
            format_timestamp(self.last_modified),
        ]
    }

    /// Decode a catalog row. `None` means the row is malformed (bad
    /// timestamp or unknown status); callers surface that as `CorruptStore`.
    pub fn from_record(record: &[String]) -> Option<Self> {
        Some(Self {
            name: record.first()?.clone(),
            creation_date: parse_timestamp(record.get(1)?)?,
            status: BucketStatus::parse(record.get(2)?)?,
            last_modified: parse_timestamp(record.get(3)?)?,
        })
    }
}

/// RFC 3339 with second precision, UTC designator `Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() {
        let bucket = Bucket {
            name: "my-bucket".into(),
            creation_date: parse_timestamp("2024-05-01T10:00:00Z").unwrap(),
            status: BucketStatus::Inactive,
            last_modified: parse_timestamp("2024-05-02T11:30:00Z").unwrap(),
        };
        let record = bucket.to_record();
        assert_eq!(
            record,
            vec![
                "my-bucket",
                "2024-05-01T10:00:00Z",
                "inactive",
                "2024-05-02T11:30:00Z"
            ]
        );
        let decoded = Bucket::from_record(&record).unwrap();
        assert_eq!(decoded.name, bucket.name);
        assert_eq!(decoded.status, bucket.status);
        assert_eq!(decoded.creation_date, bucket.creation_date);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let mut record = vec![
            "b".to_string(),
            "2024-05-01T10:00:00Z".to_string(),
            "dormant".to_string(),
            "2024-05-01T10:00:00Z".to_string(),
        ];
        assert!(Bucket::from_record(&record).is_none());
        record[2] = "active".into();
        record[1] = "yesterday".into();
        assert!(Bucket::from_record(&record).is_none());
    }
}
