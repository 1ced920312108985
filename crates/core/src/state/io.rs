//! # IO Utilities
//!
//! Runtime directory resolution and crash-safe file writes.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const RUNTIME_DIR_NAME: &str = ".teamflow";

/// Get the runtime directory path (`.teamflow`)
///
/// Holds `config.json`, `.env`, `teamflow.db` and the `outputs/` archive.
pub fn get_runtime_path() -> PathBuf {
    if let Ok(path) = std::env::var("TEAMFLOW_RUNTIME_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(RUNTIME_DIR_NAME)
}

/// Ensure the runtime directory exists
pub async fn ensure_runtime_dir() -> Result<PathBuf> {
    let path = get_runtime_path();
    fs::create_dir_all(&path)
        .await
        .with_context(|| format!("Failed to create runtime directory: {:?}", path))?;
    Ok(path)
}

/// Write via a sibling temp file and rename, so readers never observe a
/// partially written file
pub async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file path: {:?}", path))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, content)
        .await
        .with_context(|| format!("Failed to write file: {:?}", tmp))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {:?} into place", tmp))
}

/// List file names in a directory; a missing directory is empty
pub async fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Ok(file_type) = entry.file_type().await {
            if file_type.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    files.push(name);
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

/// List subdirectory names in a directory; a missing directory is empty
pub async fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Ok(file_type) = entry.file_type().await {
            if file_type.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    dirs.push(name);
                }
            }
        }
    }
    Ok(dirs)
}
