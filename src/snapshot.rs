//! Whole-store snapshots on disk.
//!
//! The image is bitcode-encoded and written to a sibling temp file first, then
//! renamed over the target, so a crash mid-write never leaves a torn file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::model::{InMemoryModelStore, ModelError, StoreImage};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub fn save(store: &InMemoryModelStore, path: &Path) -> Result<(), SnapshotError> {
    let image = store.image()?;
    let bytes = bitcode::serialize(&image).map_err(|e| SnapshotError::Encoding(e.to_string()))?;

    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), documents = image.entries.len(), "snapshot saved");
    Ok(())
}

/// Load a store from `path`. A missing file yields `None`.
pub fn load(path: &Path) -> Result<Option<InMemoryModelStore>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let image: StoreImage =
        bitcode::deserialize(&bytes).map_err(|e| SnapshotError::Encoding(e.to_string()))?;
    info!(path = %path.display(), documents = image.entries.len(), "snapshot loaded");
    Ok(Some(InMemoryModelStore::from_image(image)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}
