//! Plant records: untyped, insertion-ordered JSON objects with a stable id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields tried, in order, when a record has no `id`.
pub const NAME_FIELDS: &[&str] = &["commonName", "name"];

/// One plant entry.
///
/// Only the fields the pipeline knows about are inspected; everything else is
/// carried through untouched and in its original key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantRecord(Map<String, Value>);

impl PlantRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The `id` field rendered as a string, if present and usable.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First non-empty human-readable name.
    pub fn display_name(&self) -> Option<&str> {
        NAME_FIELDS.iter().find_map(|field| match self.0.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        })
    }

    /// Identity used to group candidates: `id`, falling back to the display name.
    pub fn identity(&self) -> Option<String> {
        self.id().or_else(|| self.display_name().map(str::to_string))
    }

    /// Number of top-level fields holding a non-empty value.
    pub fn populated_fields(&self) -> usize {
        self.0.values().filter(|v| !is_empty_value(v)).count()
    }
}

impl From<Map<String, Value>> for PlantRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// `null`, `""` and `[]` count as "no value" for merging and ranking.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
