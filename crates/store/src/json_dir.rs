//! JSON directory store: one human-editable file per user.
//!
//! Layout: `<dir>/<user_id>.json`, each file a serialized `UserSnapshot`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stride_core::{ContextStore, StoreError, UserSnapshot};
use tracing::debug;

/// Reads user snapshots from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonDirContextStore {
    dir: PathBuf,
}

impl JsonDirContextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        crate::check_user_id(user_id)?;
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    /// Write a snapshot, creating the directory if needed.
    pub async fn save(&self, user_id: &str, snapshot: &UserSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create store directory: {e}")))?;

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize snapshot: {e}")))?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write {}: {e}", path.display())))?;
        debug!(user_id, path = %path.display(), "Snapshot saved");
        Ok(())
    }
}

#[async_trait]
impl ContextStore for JsonDirContextStore {
    fn name(&self) -> &str {
        "json_dir"
    }

    async fn load(&self, user_id: &str) -> Result<UserSnapshot, StoreError> {
        let path = self.path_for(user_id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(user_id, "No snapshot on disk, using empty context");
                return Ok(UserSnapshot::default());
            }
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            user_id: user_id.to_string(),
            reason: e.to_string(),
        })
    }
}
