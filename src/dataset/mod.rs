mod models;

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use models::{Dataset, Edition, Platform, Version}; // Re-export the model types to callers.

// ---- Public API ----

/// Read and validate the dataset at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    from_json_str(&data)
}

/// Parse and validate a dataset document.
pub fn from_json_str(json: &str) -> Result<Dataset, DatasetError> {
    let dataset: Dataset = serde_json::from_str(json)?;
    validate(&dataset)?;
    Ok(dataset)
}

/// Serialize the way the file is kept on disk: tab indentation plus a
/// trailing newline.
pub fn to_json_bytes(dataset: &Dataset) -> Result<Vec<u8>, DatasetError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    dataset.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Rewrite the whole file.
pub fn save(path: impl AsRef<Path>, dataset: &Dataset) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let bytes = to_json_bytes(dataset)?;
    fs::write(path, bytes).map_err(|source| DatasetError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn validate(dataset: &Dataset) -> Result<(), DatasetError> {
    for edition in Edition::ALL {
        let mut seen = HashSet::new();
        for version in dataset.versions(edition) {
            if !seen.insert(version.name()) {
                return Err(DatasetError::DuplicateVersion {
                    edition,
                    name: version.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write dataset {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate version '{name}' in {edition}")]
    DuplicateVersion { edition: Edition, name: String },
}
