//! File Fallback Module
//!
//! Second read tier: one JSON snapshot per record at `{root}/{kind}/{id}.json`.
//! Only consulted for point lookups when the store has nothing to return.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::models::Entity;

#[derive(Debug, Clone)]
pub struct FileFallbackStore {
    root: PathBuf,
}

impl FileFallbackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot for `id`. Ids that could escape the kind
    /// directory are rejected.
    pub fn path_for<E: Entity>(&self, id: &str) -> Result<PathBuf, StoreError> {
        let unsafe_id = id.is_empty()
            || id == "."
            || id.contains("..")
            || id.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
        if unsafe_id {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(self.root.join(E::KIND).join(format!("{id}.json")))
    }

    /// Reads the snapshot of `id`; a missing file is a miss.
    pub async fn read<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        let path = self.path_for::<E>(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces the snapshot of `entity` as a whole (write temp file, rename).
    pub async fn write<E: Entity>(&self, entity: &E) -> Result<(), StoreError> {
        let path = self.path_for::<E>(entity.id())?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let bytes = serde_json::to_vec(entity)?;
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(path = %path.display(), "Wrote fallback snapshot");
        Ok(())
    }

    /// Removes the snapshot of `id`. Removing a missing snapshot is a no-op.
    pub async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for::<E>(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
