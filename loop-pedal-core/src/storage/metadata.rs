use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::LoopError;
use crate::models::take::TakeMetadata;

/// Path of the JSON sidecar for a persisted take: `{take_path}.metadata.json`.
pub fn metadata_path(take_path: &Path) -> PathBuf {
    let mut name = take_path.as_os_str().to_owned();
    name.push(".metadata.json");
    PathBuf::from(name)
}

/// Write take metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &TakeMetadata, take_path: &Path) -> Result<(), LoopError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| LoopError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(take_path), json)
        .map_err(|e| LoopError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read take metadata from a JSON sidecar file.
pub fn read_metadata(take_path: &Path) -> Result<TakeMetadata, LoopError> {
    let json = fs::read_to_string(metadata_path(take_path))
        .map_err(|e| LoopError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: TakeMetadata = serde_json::from_str(&json)
        .map_err(|e| LoopError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}
