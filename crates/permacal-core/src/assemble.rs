//! Output document assembly and serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::PlantRecord;

pub const SCHEMA_VERSION: &str = "2.2.0";

/// Format of `metadata.generated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub generated_at: String,
    pub total_plants: usize,
    pub source: String,
    /// Input file names in discovery order.
    pub sources: Vec<String>,
    /// Month-map overrides in effect, when any were configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_map: Option<Map<String, Value>>,
}

/// The merged plant file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub schema_version: String,
    pub metadata: OutputMetadata,
    pub plants: Vec<PlantRecord>,
}

/// Sort records and wrap them with metadata stamped at `now`.
pub fn assemble(mut plants: Vec<PlantRecord>, sources: Vec<String>, now: DateTime<Utc>) -> OutputDocument {
    sort_plants(&mut plants);
    let source = match sources.len() {
        1 => format!("merge of {}", sources[0]),
        n => format!("merge of {n} source files"),
    };
    OutputDocument {
        schema_version: SCHEMA_VERSION.to_string(),
        metadata: OutputMetadata {
            generated_at: format_timestamp(now),
            total_plants: plants.len(),
            source,
            sources,
            month_map: None,
        },
        plants,
    }
}

/// By `id`, then display name.
pub fn sort_plants(plants: &mut [PlantRecord]) {
    plants.sort_by_cached_key(|p| {
        (
            p.id().unwrap_or_default(),
            p.display_name().unwrap_or_default().to_string(),
        )
    });
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Two-space indented JSON with non-ASCII text unescaped and a trailing newline.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}
