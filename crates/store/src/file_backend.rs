//! File-based persistence gateway — one JSON document on disk.
//!
//! The path comes from configuration (`~/.labeler/state.json` by default). Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous document intact. Saves through one gateway are
//! serialized; the temp path is shared between them.

use async_trait::async_trait;
use labeler_core::error::PersistenceError;
use labeler_core::persistence::{PersistedState, PersistenceGateway};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// A persistence gateway backed by a single JSON file.
pub struct FileGateway {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileGateway {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let state = PersistedState::from_json(&content)?;
        debug!(path = %self.path.display(), users = state.users.len(), "State file loaded");
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PersistenceError::Unavailable(format!("Failed to create state directory: {e}"))
                })?;
            }
        }

        let json = state.to_json()?;
        let tmp = self.path.with_extension("json.tmp");

        // Held across write and rename
        let _guard = self.write_lock.lock().await;
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            PersistenceError::Unavailable(format!("Failed to write state file: {e}"))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            PersistenceError::Unavailable(format!("Failed to replace state file: {e}"))
        })?;

        debug!(path = %self.path.display(), "State file written");
        Ok(())
    }
}
