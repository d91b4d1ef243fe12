//! Storage port for named JSON documents
//!
//! The engine never touches the filesystem for its documents directly; it
//! goes through [`Storage`]. Two adapters ship with the crate:
//! - [`FsStorage`] writes through a temp file and renames into place
//! - [`MemoryStorage`] keeps documents in a map, for tests and dry runs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tracing::debug;

use crate::{Error, Result};

/// Read/write/exists over named documents
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a document. Reading a missing document is an error; check
    /// [`Storage::exists`] first when absence is meaningful.
    async fn read(&self, path: &Path) -> Result<String>;

    /// Replace a document's contents.
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;

    async fn exists(&self, path: &Path) -> bool;
}

/// Filesystem-backed storage
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| Error::Storage(format!("read {}: {}", path.display(), e)))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("create {}: {}", parent.display(), e)))?;
        }

        // Write atomically via temp file
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| Error::Storage(format!("write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| Error::Storage(format!("rename into {}: {}", path.display(), e)))?;

        debug!("Wrote {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<PathBuf, String>>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full disk would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Seed a document without going through the trait.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.documents.lock().insert(path.into(), contents.into());
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.documents.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, path: &Path) -> Result<String> {
        self.get(path)
            .ok_or_else(|| Error::Storage(format!("read {}: not found", path.display())))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!(
                "write {}: storage is read-only",
                path.display()
            )));
        }
        self.insert(path, contents);
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.documents.lock().contains_key(path)
    }
}
