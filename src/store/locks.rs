//! Per-file mutual exclusion for the flat-file tables.
//!
//! The catalog and each bucket index get one async mutex apiece, keyed by
//! the backing file's path. A lock is held for the whole
//! load -> mutate -> rewrite span so concurrent writers cannot discard each
//! other's updates. Entries are never removed; the registry is bounded by
//! the number of live buckets plus one.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct FileLocks {
    inner: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Acquire the mutex guarding `path`, creating it on first use.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(
            self.inner
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn same_path_serializes_holders() {
        let locks = Arc::new(FileLocks::new());
        let path = PathBuf::from("a.csv");
        let guard = locks.lock(&path).await;
        let second = {
            let locks = Arc::clone(&locks);
            let path = path.clone();
            tokio::spawn(async move {
                let _g = locks.lock(&path).await;
            })
        };
        assert!(!second.is_finished());
        drop(guard);
        second.await.unwrap();
    }

    #[tokio::test]
    async fn distinct_paths_do_not_contend() {
        let locks = FileLocks::new();
        let _a = locks.lock(Path::new("a.csv")).await;
        let _b = locks.lock(Path::new("b.csv")).await;
    }
}
