use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Course, Instructor, RecordStore, Student};

pub const SNAPSHOT_FORMAT_V1: &str = "schoold-snapshot-v1";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("corrupt data file: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    format: String,
    version: u32,
    app_version: String,
    saved_at: String,
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    courses: Vec<Course>,
}

/// Serializes the full store state to `path`. The snapshot is written to a
/// sibling temp file and renamed into place, so a failure part-way through
/// never clobbers a previously saved file.
pub fn save_snapshot(store: &RecordStore, path: &Path) -> Result<(), PersistError> {
    let snapshot = Snapshot {
        format: SNAPSHOT_FORMAT_V1.to_string(),
        version: SNAPSHOT_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        saved_at: Utc::now().to_rfc3339(),
        students: store.students().to_vec(),
        instructors: store.instructors().to_vec(),
        courses: store.courses().to_vec(),
    };
    let text = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| PersistError::Corrupt(format!("failed to serialize snapshot: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, text)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Reads a snapshot back into a fresh store. Malformed JSON, an unknown
/// format or version, duplicate ids, and dangling association references
/// all surface as `Corrupt`; the caller swaps its live store only on
/// success.
pub fn load_snapshot(path: &Path) -> Result<RecordStore, PersistError> {
    let text = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&text)
        .map_err(|e| PersistError::Corrupt(format!("invalid snapshot JSON: {e}")))?;
    if snapshot.format != SNAPSHOT_FORMAT_V1 {
        return Err(PersistError::Corrupt(format!(
            "unsupported snapshot format: {}",
            snapshot.format
        )));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(PersistError::Corrupt(format!(
            "unsupported snapshot version: {}",
            snapshot.version
        )));
    }
    RecordStore::from_records(snapshot.students, snapshot.instructors, snapshot.courses)
        .map_err(|e| PersistError::Corrupt(e.to_string()))
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "snapshot".to_string());
    name.push_str(".saving");
    path.with_file_name(name)
}
