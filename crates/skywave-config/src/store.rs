use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("io error while reading config: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error while writing config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads a configuration document from `path`.
pub fn read_config(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Writes a configuration document to `path` as pretty-printed JSON.
///
/// The document is written to a sibling temporary file and renamed into
/// place, so a failed write never leaves a truncated file where a valid one
/// used to be. Missing parent directories are created.
pub fn write_config(path: &Path, doc: &Value) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(doc)?;
    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path)?;
    file.write_all(&json)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
