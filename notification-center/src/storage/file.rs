use std::fmt::Write as _;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::StorageBackend;
use crate::{Error, Result};

/// One JSON file per key under a directory.
///
/// Each write goes to its own temporary file in the same directory and is
/// renamed into place, so a reader never observes a half-written value and
/// concurrent writers of one key do not share a scratch file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`. Distinct keys map to distinct files.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Convert an IO error into a storage error with operation + path context.
fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::storage(format!("{} {}: {}", op, path.display(), source))
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]`.
///
/// `%` itself is encoded, so the mapping is injective. The empty key becomes
/// a lone `%`, which no other key produces.
fn encode_key(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }

    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    encoded
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("reading", &path, e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| io_error("creating directory", &self.dir, e))?;

        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| io_error("creating temp file in", &self.dir, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| io_error("writing", tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| io_error("renaming into", &path, e.error))?;

        debug!(path = %path.display(), bytes = value.len(), "Wrote storage item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("removing", &path, e)),
        }
    }
}
