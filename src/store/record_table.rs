//! Flat-file record table: an ordered collection of fixed-schema CSV
//! records persisted to a single file, keyed by each record's first field.
//!
//! The rewrite path is truncate-then-write-from-start. It is intentionally
//! not crash-atomic; callers serialize access per file (see `locks`) so that
//! a full load -> mutate -> rewrite cycle never interleaves with another.

use crate::store::{StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// One row of a table. Field count is checked against the caller's schema.
pub type Record = Vec<String>;

/// Load every record from `path`.
///
/// A missing file is an empty table when `create_if_missing` is set,
/// otherwise the I/O error propagates. Rows with fewer than `min_fields`
/// fields fail with `CorruptStore`.
pub async fn load_all(
    path: &Path,
    min_fields: usize,
    create_if_missing: bool,
) -> StorageResult<Vec<Record>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound && create_if_missing => {
            return Ok(Vec::new());
        }
        Err(err) => return Err(StorageError::Io(err)),
    };

    let mut records = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let fields = split_fields(line).ok_or_else(|| StorageError::CorruptStore {
            path: path.display().to_string(),
            line: idx + 1,
        })?;
        if fields.len() < min_fields {
            return Err(StorageError::CorruptStore {
                path: path.display().to_string(),
                line: idx + 1,
            });
        }
        records.push(fields);
    }
    Ok(records)
}

/// Find the first record whose key (first field) matches exactly.
/// Comparison is byte-wise and case-sensitive.
pub fn find_by_key<'a>(table: &'a [Record], key: &str) -> Option<&'a Record> {
    table
        .iter()
        .find(|record| record.first().map(String::as_str) == Some(key))
}

/// Replace the first record matching `record`'s key, else append.
pub fn upsert(table: &mut Vec<Record>, record: Record) {
    let key = record.first().cloned().unwrap_or_default();
    match table
        .iter_mut()
        .find(|existing| existing.first().map(String::as_str) == Some(key.as_str()))
    {
        Some(existing) => *existing = record,
        None => table.push(record),
    }
}

/// Remove all records matching `key`. No-op when absent.
pub fn delete_by_key(table: &mut Vec<Record>, key: &str) {
    table.retain(|record| record.first().map(String::as_str) != Some(key));
}

/// Overwrite the file's entire contents with the current table.
pub async fn rewrite_all(path: &Path, table: &[Record]) -> StorageResult<()> {
    let mut out = String::new();
    for record in table {
        encode_record(&mut out, record);
    }
    fs::write(path, out).await?;
    Ok(())
}

fn encode_record(out: &mut String, record: &Record) {
    for (i, field) in record.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains(['"', ',', '\n', '\r']) {
            out.push('"');
            for c in field.chars() {
                if c == '"' {
                    out.push('"');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Split one CSV line into fields, honoring quoted fields with doubled
/// quotes. Returns None on a malformed line (unterminated quote, trailing
/// garbage after a closing quote).
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    loop {
        match chars.peek() {
            Some('"') => {
                chars.next();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                current.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => current.push(c),
                        None => return None,
                    }
                }
                match chars.next() {
                    Some(',') => {
                        fields.push(std::mem::take(&mut current));
                    }
                    None => {
                        fields.push(std::mem::take(&mut current));
                        return Some(fields);
                    }
                    Some(_) => return None,
                }
            }
            _ => {
                loop {
                    match chars.next() {
                        Some(',') => {
                            fields.push(std::mem::take(&mut current));
                            break;
                        }
                        Some(c) => current.push(c),
                        None => {
                            fields.push(std::mem::take(&mut current));
                            return Some(fields);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rec(fields: &[&str]) -> Record {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_file_is_empty_table_with_create_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let table = load_all(&path, 4, true).await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn missing_file_errors_without_create_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let err = load_all(&path, 4, false).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn rewrite_then_load_round_trips_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let table = vec![rec(&["b", "1"]), rec(&["a", "2"]), rec(&["c", "3"])];
        rewrite_all(&path, &table).await.unwrap();
        let loaded = load_all(&path, 2, false).await.unwrap();
        assert_eq!(loaded, table);
    }

    #[tokio::test]
    async fn short_row_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        tokio::fs::write(&path, "only-one-field\n").await.unwrap();
        let err = load_all(&path, 4, true).await.unwrap_err();
        assert!(matches!(err, StorageError::CorruptStore { line: 1, .. }));
    }

    #[tokio::test]
    async fn quoted_fields_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let table = vec![rec(&["key", "a,b", "say \"hi\""])];
        rewrite_all(&path, &table).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "key,\"a,b\",\"say \"\"hi\"\"\"\n");
        let loaded = load_all(&path, 3, false).await.unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn upsert_replaces_in_place_and_appends() {
        let mut table = vec![rec(&["a", "1"]), rec(&["b", "2"])];
        upsert(&mut table, rec(&["a", "9"]));
        assert_eq!(table, vec![rec(&["a", "9"]), rec(&["b", "2"])]);
        upsert(&mut table, rec(&["c", "3"]));
        assert_eq!(table.len(), 3);
        assert_eq!(table[2], rec(&["c", "3"]));
    }

    #[test]
    fn find_is_exact_and_case_sensitive() {
        let table = vec![rec(&["Key", "1"]), rec(&["key", "2"])];
        assert_eq!(find_by_key(&table, "key").unwrap()[1], "2");
        assert_eq!(find_by_key(&table, "Key").unwrap()[1], "1");
        assert!(find_by_key(&table, "KEY").is_none());
    }

    #[test]
    fn delete_by_key_removes_all_matches_and_tolerates_absence() {
        let mut table = vec![rec(&["a", "1"]), rec(&["b", "2"]), rec(&["a", "3"])];
        delete_by_key(&mut table, "a");
        assert_eq!(table, vec![rec(&["b", "2"])]);
        delete_by_key(&mut table, "missing");
        assert_eq!(table.len(), 1);
    }
}
