//! File-backed key-value store.
//!
//! Each key maps to one file in the store directory. Writes go through a
//! temp file that is synced and then renamed over the target, so a reader
//! never observes a half-written value. Every write gets its own temp file,
//! and writes to the same key are serialized so the last writer wins.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::traits::KeyValueStore;
use crate::error::{CompanionError, Result};
use crate::sync::lock;

pub struct FileStore {
    dir: PathBuf,
    /// Per-file write locks, held across write and rename.
    write_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    temp_counter: AtomicU64,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_locks: Mutex::new(HashMap::new()),
            temp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so keys such as
    /// `@app_config` map to portable file names.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    fn write_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = lock(&self.write_locks);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Unique temp path next to `path`.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}.{}.tmp", process::id(), seq))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CompanionError::io_with_path(e, path)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CompanionError::io_with_path(e, &self.dir))?;

        let path = self.path_for(key);
        let write_lock = self.write_lock(&path);
        let _guard = write_lock.lock().await;
        let temp_path = self.temp_path(&path);

        let written = async {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| CompanionError::io_with_path(e, &temp_path))?;
            file.write_all(value.as_bytes())
                .await
                .map_err(|e| CompanionError::io_with_path(e, &temp_path))?;
            file.sync_all()
                .await
                .map_err(|e| CompanionError::io_with_path(e, &temp_path))
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CompanionError::io_with_path(e, path));
        }

        debug!("Atomically wrote {}", path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CompanionError::io_with_path(e, path)),
        }
    }
}
