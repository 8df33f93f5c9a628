//! Atomic JSON writes and timestamped backups.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use permacal_core::to_pretty_string;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

/// Suffix timestamp of backup files.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Serialize `value` and replace `path` with it atomically.
///
/// The JSON goes to a temporary file in the destination directory, which is
/// then renamed over `path`; an interrupted run never leaves a truncated file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = to_pretty_string(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(StoreError::io(dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
    tmp.write_all(text.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(StoreError::io(tmp.path()))?;
    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    info!(path = %path.display(), bytes = text.len(), "wrote file");
    Ok(())
}

/// `<file>.backup.<YYYYmmddTHHMMSSZ>` next to `path`.
pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".backup.{}", now.format(BACKUP_STAMP_FORMAT)));
    path.with_file_name(name)
}

/// Copy `path` to its backup location before it is overwritten.
///
/// Returns `None` when there is nothing to back up.
pub fn backup_file(path: &Path, now: DateTime<Utc>) -> Result<Option<PathBuf>, StoreError> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = backup_path(path, now);
    fs::copy(path, &backup).map_err(StoreError::io(&backup))?;
    info!(from = %path.display(), to = %backup.display(), "backed up file");
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap()
    }

    #[test]
    fn writes_pretty_json_with_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("plants_merged.json");
        write_json_atomic(&path, &json!({"commonName": "Épinard"})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"commonName\": \"Épinard\"\n}\n");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plants.json");
        fs::write(&path, "old").unwrap();
        write_json_atomic(&path, &json!([])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn backup_copies_with_timestamp_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plants.json");
        fs::write(&path, "[1]").unwrap();

        let backup = backup_file(&path, now()).unwrap().unwrap();
        assert_eq!(
            backup.file_name().unwrap(),
            "plants.json.backup.20240301T080509Z"
        );
        assert_eq!(fs::read_to_string(&backup).unwrap(), "[1]");
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1]");
    }

    #[test]
    fn backup_of_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(backup_file(&dir.path().join("absent.json"), now()).unwrap().is_none());
    }
}
