//! Field-wise merge of ranked candidate records.
//!
//! The merge is a fold over candidates in ranked order, highest first, so a
//! lower-ranked source only ever fills gaps: the first non-empty scalar wins,
//! mappings merge recursively, lists union in first-seen order.

use serde_json::{Map, Value};

use crate::coerce::split_delimited;
use crate::document::CandidateGroup;
use crate::record::{PlantRecord, is_empty_value};
use crate::report::{Anomaly, AnomalyKind};

/// A key whose two values could not be reconciled; the accumulator kept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConflict {
    /// Dotted path from the record root.
    pub path: String,
    pub kept: &'static str,
    pub incoming: &'static str,
}

/// Merge `next` into `acc`, returning the new accumulator.
pub fn merge_records(acc: PlantRecord, next: &PlantRecord) -> (PlantRecord, Vec<FieldConflict>) {
    let mut conflicts = Vec::new();
    let merged = merge_maps(acc.into_map(), next.as_map(), "", &mut conflicts);
    (PlantRecord::from_map(merged), conflicts)
}

fn merge_maps(
    mut acc: Map<String, Value>,
    next: &Map<String, Value>,
    prefix: &str,
    conflicts: &mut Vec<FieldConflict>,
) -> Map<String, Value> {
    for (key, incoming) in next {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match acc.get_mut(key) {
            Some(slot) => *slot = merge_value(&path, slot.take(), incoming, conflicts),
            None => {
                acc.insert(key.clone(), incoming.clone());
            }
        }
    }
    acc
}

fn merge_value(
    path: &str,
    acc: Value,
    incoming: &Value,
    conflicts: &mut Vec<FieldConflict>,
) -> Value {
    if is_empty_value(incoming) {
        return acc;
    }
    if is_empty_value(&acc) {
        return incoming.clone();
    }
    match (acc, incoming) {
        (Value::Object(acc), Value::Object(next)) => {
            Value::Object(merge_maps(acc, next, path, conflicts))
        }
        (Value::Array(acc), Value::Array(next)) => union(acc, next.iter().cloned()),
        (Value::Array(acc), Value::String(text)) => union(acc, split_strings(text)),
        (Value::String(text), Value::Array(next)) => {
            union(split_strings(&text), next.iter().cloned())
        }
        (acc @ (Value::String(_) | Value::Number(_) | Value::Bool(_)), next)
            if is_scalar(next) =>
        {
            acc
        }
        (acc, next) => {
            conflicts.push(FieldConflict {
                path: path.to_string(),
                kept: type_name(&acc),
                incoming: type_name(next),
            });
            acc
        }
    }
}

fn union(mut acc: Vec<Value>, incoming: impl IntoIterator<Item = Value>) -> Value {
    for item in incoming {
        if !acc.contains(&item) {
            acc.push(item);
        }
    }
    Value::Array(acc)
}

fn split_strings(text: &str) -> Vec<Value> {
    split_delimited(text).into_iter().map(Value::String).collect()
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Fold an already-ranked group into one record.
///
/// The result always carries an `id`, defaulting to the group identity.
pub fn merge_group(group: &CandidateGroup) -> (PlantRecord, Vec<Anomaly>) {
    let mut anomalies = Vec::new();
    let mut acc = PlantRecord::new();
    for candidate in &group.candidates {
        let (merged, conflicts) = merge_records(acc, &candidate.record);
        acc = merged;
        anomalies.extend(conflicts.into_iter().map(|c| {
            Anomaly::new(
                AnomalyKind::MergeConflict,
                format!(
                    "`{}`: kept {} from a higher-ranked source, ignored {}",
                    c.path, c.kept, c.incoming
                ),
            )
            .for_plant(group.identity.clone())
            .from_source(candidate.provenance.path.to_path_buf())
        }));
    }
    if acc.id().is_none() {
        acc.insert("id", Value::String(group.identity.clone()));
    }
    (acc, anomalies)
}
