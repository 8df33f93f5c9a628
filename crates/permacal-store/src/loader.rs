//! Directory loading.

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use permacal_core::{Anomaly, AnomalyKind, SourceDocument};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::StoreError;

pub const DEFAULT_PATTERN: &str = "*.json";

/// Documents that loaded, plus one anomaly per file that did not.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// In file-name order.
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<Anomaly>,
}

/// Load every regular file in `dir` whose name matches `pattern`.
///
/// Files are visited in lexicographic name order. Paths in `exclude` (the
/// run's own output, typically) are skipped. A file that fails to parse is
/// recorded in [`LoadOutcome::failures`]; only an unreadable directory or a
/// bad pattern is an error.
pub fn load_dir(dir: &Path, pattern: &str, exclude: &[PathBuf]) -> Result<LoadOutcome, StoreError> {
    let matcher = Glob::new(pattern)?.compile_matcher();
    let excluded: Vec<PathBuf> = exclude.iter().map(|p| canonical(p)).collect();

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let path = entry.map_err(StoreError::io(dir))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        if excluded.contains(&canonical(&path)) {
            debug!(path = %path.display(), "skipping excluded file");
            continue;
        }
        paths.push(path);
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut outcome = LoadOutcome::default();
    for path in paths {
        match load_document(&path) {
            Ok(doc) => {
                debug!(
                    path = %path.display(),
                    records = doc.records.len(),
                    "loaded document"
                );
                outcome.documents.push(doc);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                outcome.failures.push(
                    Anomaly::new(AnomalyKind::LoadFailure, e.to_string()).from_source(path),
                );
            }
        }
    }

    info!(
        dir = %dir.display(),
        loaded = outcome.documents.len(),
        failed = outcome.failures.len(),
        "scanned input directory"
    );
    Ok(outcome)
}

/// Parse one plant file.
pub fn load_document(path: &Path) -> Result<SourceDocument, StoreError> {
    let value = read_json(path)?;
    SourceDocument::from_value(path, value).map_err(|source| StoreError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON file, tolerating a UTF-8 byte-order mark.
pub fn read_json(path: &Path) -> Result<Value, StoreError> {
    let text = fs::read_to_string(path).map_err(StoreError::io(path))?;
    serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
