//! JSON file slot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::chat::core::errors::ChatResult;
use crate::chat::storage::{SessionStorage, StorageFuture};

/// Slot stored as a single JSON document on disk.
///
/// Saves go through a sibling temp file and a rename, so a crash mid-write
/// leaves the previous document intact.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Create a storage targeting `path`. Nothing is touched until the first save.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStorage for JsonFileStorage {
    fn load(&self) -> StorageFuture<'_, ChatResult<Option<String>>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(payload) => Ok(Some(payload)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn save(&self, payload: String) -> StorageFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let temp = self.temp_path();
            tokio::fs::write(&temp, payload.as_bytes()).await?;
            tokio::fs::rename(&temp, &self.path).await?;
            Ok(())
        })
    }
}
