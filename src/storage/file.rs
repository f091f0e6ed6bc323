//! File-backed durable storage
//!
//! Keeps all entries of one storage area in a single JSON object on disk,
//! rewriting the file on every change. A missing file is an empty store; a
//! corrupt file is logged and treated as empty so the view still loads.

use crate::core::error::{StorageError, ViewError, ViewResult};
use crate::storage::DurableStorage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Durable storage persisted as a JSON file
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl FileStorage {
    /// Open the store at `path`, loading existing entries
    pub fn open(path: impl AsRef<Path>) -> ViewResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring corrupt storage file: {}", e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_error(&path, e)),
        };

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ViewResult<()> {
        let content = serde_json::to_string_pretty(entries).map_err(|e| {
            ViewError::Internal(format!("Failed to serialize storage entries: {}", e))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(&self.path, e))?;
        }
        std::fs::write(&self.path, content).map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ViewError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> ViewResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> ViewResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            // Keep memory and disk consistent when the write fails
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> ViewResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(previous) = entries.remove(key) {
            if let Err(e) = self.persist(&entries) {
                entries.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }
}
