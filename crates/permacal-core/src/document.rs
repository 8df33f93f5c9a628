//! Source documents and per-plant candidate groups.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::CoreError;
use crate::record::PlantRecord;
use crate::report::{Anomaly, AnomalyKind};

/// Layout of a plant file on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// `[ {...}, {...} ]`
    List,
    /// `{"plants": [...], "metadata": {...}, ...}`.
    Container {
        /// Top-level keys other than `plants` and `metadata`.
        extra: Map<String, Value>,
        /// Every top-level key, in file order.
        layout: Vec<String>,
    },
    /// `{"artichoke": {...}, "leek": {...}}`, as in the per-locale files.
    /// `keys[i]` is the key `records[i]` was read under.
    Keyed { keys: Vec<String> },
}

/// Top-level keys that mark a document as something other than a keyed plant file.
const RESERVED_KEYS: &[&str] = &["metadata", "schema_version"];

/// A keyed entry must carry at least one of these to count as a plant.
const PLANT_MARKERS: &[&str] = &[
    "id",
    "commonName",
    "name",
    "scientificName",
    "description",
    "sowingMonths",
    "sowingMonths3",
    "plantingMonths",
    "plantingMonths3",
    "harvestMonths",
    "harvestMonths3",
    "companionPlanting",
];

/// One parsed input file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub shape: DocumentShape,
    pub records: Vec<PlantRecord>,
    pub metadata: Option<Map<String, Value>>,
    /// Entries that were not objects, as found.
    pub rejected: Vec<Value>,
}

impl SourceDocument {
    /// Interpret a parsed JSON value as a plant document.
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self, CoreError> {
        let path = path.into();
        match value {
            Value::Array(items) => {
                let (records, rejected) = split_objects(items);
                Ok(Self {
                    path,
                    shape: DocumentShape::List,
                    records,
                    metadata: None,
                    rejected,
                })
            }
            Value::Object(map) if map.contains_key("plants") => container(path, map),
            Value::Object(map) => keyed(path, map),
            Value::Null => Err(CoreError::UnsupportedShape("null")),
            Value::Bool(_) => Err(CoreError::UnsupportedShape("boolean")),
            Value::Number(_) => Err(CoreError::UnsupportedShape("number")),
            Value::String(_) => Err(CoreError::UnsupportedShape("string")),
        }
    }

    /// Rebuild the JSON value in the document's original shape.
    pub fn to_value(&self) -> Value {
        let plants = || {
            Value::Array(
                self.records
                    .iter()
                    .cloned()
                    .map(PlantRecord::into_value)
                    .collect(),
            )
        };
        match &self.shape {
            DocumentShape::List => plants(),
            DocumentShape::Container { extra, layout } => {
                let metadata = self.metadata.clone().map(Value::Object);
                let had_metadata = layout.iter().any(|k| k == "metadata");
                let mut out = Map::new();
                for key in layout {
                    let value = match key.as_str() {
                        "plants" => {
                            // A metadata block added since loading goes just before the plants.
                            if let Some(meta) = metadata.as_ref().filter(|_| !had_metadata) {
                                out.insert("metadata".to_string(), meta.clone());
                            }
                            Some(plants())
                        }
                        "metadata" => metadata.clone().or_else(|| extra.get(key).cloned()),
                        _ => extra.get(key).cloned(),
                    };
                    if let Some(value) = value {
                        out.insert(key.clone(), value);
                    }
                }
                for (key, value) in extra {
                    if !out.contains_key(key) {
                        out.insert(key.clone(), value.clone());
                    }
                }
                if let Some(meta) = metadata
                    && !out.contains_key("metadata")
                {
                    out.insert("metadata".to_string(), meta);
                }
                if !out.contains_key("plants") {
                    out.insert("plants".to_string(), plants());
                }
                Value::Object(out)
            }
            DocumentShape::Keyed { keys } => {
                let mut out = Map::new();
                for (index, record) in self.records.iter().enumerate() {
                    let key = keys
                        .get(index)
                        .cloned()
                        .or_else(|| record.identity())
                        .unwrap_or_else(|| index.to_string());
                    out.insert(key, record.clone().into_value());
                }
                Value::Object(out)
            }
        }
    }

    /// Identity used for grouping. In a keyed file the key stands in for a
    /// missing `id`, ahead of the display name.
    pub fn identity_of(&self, index: usize) -> Option<String> {
        let record = self.records.get(index)?;
        let key = match &self.shape {
            DocumentShape::Keyed { keys } => keys
                .get(index)
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            _ => None,
        };
        record
            .id()
            .or(key)
            .or_else(|| record.display_name().map(str::to_string))
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

fn container(path: PathBuf, mut map: Map<String, Value>) -> Result<SourceDocument, CoreError> {
    let layout: Vec<String> = map.keys().cloned().collect();
    let Some(Value::Array(items)) = map.shift_remove("plants") else {
        return Err(CoreError::UnsupportedShape(
            "object whose `plants` is not an array",
        ));
    };
    let metadata = match map.shift_remove("metadata") {
        Some(Value::Object(meta)) => Some(meta),
        Some(other) => {
            // Keep a non-object metadata value rather than lose it.
            map.insert("metadata".to_string(), other);
            None
        }
        None => None,
    };
    let (records, rejected) = split_objects(items);
    Ok(SourceDocument {
        path,
        shape: DocumentShape::Container { extra: map, layout },
        records,
        metadata,
        rejected,
    })
}

fn keyed(path: PathBuf, map: Map<String, Value>) -> Result<SourceDocument, CoreError> {
    if map.is_empty() {
        return Err(CoreError::UnsupportedShape("empty object"));
    }
    if RESERVED_KEYS.iter().any(|key| map.contains_key(*key)) {
        return Err(CoreError::UnsupportedShape(
            "document metadata without a `plants` array",
        ));
    }
    let mut keys = Vec::with_capacity(map.len());
    let mut records = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Object(fields) if PLANT_MARKERS.iter().any(|m| fields.contains_key(*m)) => {
                keys.push(key);
                records.push(PlantRecord::from_map(fields));
            }
            _ => {
                return Err(CoreError::UnsupportedShape(
                    "object without a `plants` array whose entries are not plant records",
                ));
            }
        }
    }
    Ok(SourceDocument {
        path,
        shape: DocumentShape::Keyed { keys },
        records,
        metadata: None,
        rejected: Vec::new(),
    })
}

fn split_objects(items: Vec<Value>) -> (Vec<PlantRecord>, Vec<Value>) {
    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match item {
            Value::Object(map) => records.push(PlantRecord::from_map(map)),
            other => rejected.push(other),
        }
    }
    (records, rejected)
}

/// Where a candidate record came from.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub path: Arc<Path>,
    /// Position of the file in discovery order.
    pub file_index: usize,
    /// Whether the file is the distinguished canonical source.
    pub is_primary: bool,
    pub metadata: Option<Arc<Map<String, Value>>>,
}

/// A record contributed by one source.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: PlantRecord,
    pub provenance: Provenance,
}

/// Every contribution for one plant identity.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub identity: String,
    pub candidates: Vec<Candidate>,
}

/// Result of grouping loaded documents by plant identity.
#[derive(Debug, Default)]
pub struct Grouping {
    /// Groups in first-discovery order.
    pub groups: Vec<CandidateGroup>,
    pub processed: usize,
    pub dropped: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Collect candidates per identity across documents, in discovery order.
///
/// `primary_file` is compared against each document's file name.
pub fn group_candidates(documents: Vec<SourceDocument>, primary_file: &str) -> Grouping {
    let mut by_identity: IndexMap<String, Vec<Candidate>> = IndexMap::new();
    let mut grouping = Grouping::default();

    for (file_index, doc) in documents.into_iter().enumerate() {
        let identities: Vec<Option<String>> =
            (0..doc.records.len()).map(|i| doc.identity_of(i)).collect();
        let is_primary = !primary_file.is_empty() && doc.file_name() == primary_file;
        let path: Arc<Path> = Arc::from(doc.path.as_path());
        let metadata = doc.metadata.map(Arc::new);

        grouping.processed += doc.records.len() + doc.rejected.len();
        for value in &doc.rejected {
            grouping.dropped += 1;
            grouping.anomalies.push(
                Anomaly::new(
                    AnomalyKind::NonObjectRecord,
                    format!("plant entry is not an object: {value}"),
                )
                .from_source(path.to_path_buf()),
            );
        }

        for (record, identity) in doc.records.into_iter().zip(identities) {
            let Some(identity) = identity else {
                grouping.dropped += 1;
                grouping.anomalies.push(
                    Anomaly::new(
                        AnomalyKind::MissingIdentity,
                        "record has no `id`, `commonName` or `name`",
                    )
                    .from_source(path.to_path_buf()),
                );
                continue;
            };
            by_identity.entry(identity).or_default().push(Candidate {
                record,
                provenance: Provenance {
                    path: Arc::clone(&path),
                    file_index,
                    is_primary,
                    metadata: metadata.clone(),
                },
            });
        }
    }

    grouping.groups = by_identity
        .into_iter()
        .map(|(identity, candidates)| CandidateGroup {
            identity,
            candidates,
        })
        .collect();
    grouping
}
