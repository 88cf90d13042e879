//! Key-value storage backends for persisted notification lists.
//!
//! The storage hook talks to a [`StorageBackend`] only, so it can be backed by
//! files on disk, a process-wide session map, or a plain in-memory map.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, session_storage};

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// A string key-value store.
pub trait StorageBackend: Send + Sync {
    /// Value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Where and under which key the notification list is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(alias = "storageKey")]
    pub storage_key: String,
    /// Use the process-wide session map instead of persistent storage.
    #[serde(alias = "useSessionStorage")]
    pub use_session_storage: bool,
    /// Directory for file-backed storage.
    pub storage_dir: Option<PathBuf>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            storage_key: "notifications".to_string(),
            use_session_storage: false,
            storage_dir: None,
        }
    }
}

/// Pick the backend described by `options`.
///
/// Without a session flag or a storage directory, an in-memory map is used so
/// the hook still works, only without surviving the process.
pub fn resolve_backend(options: &StorageOptions) -> Arc<dyn StorageBackend> {
    if options.use_session_storage {
        return Arc::new(session_storage());
    }

    match &options.storage_dir {
        Some(dir) => Arc::new(FileStorage::new(dir)),
        None => {
            debug!("No persistent storage configured, using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    }
}
