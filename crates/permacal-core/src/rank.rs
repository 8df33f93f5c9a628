//! Source ranking within a candidate group.
//!
//! Highest priority first: the primary file, then the richer record, then the
//! more recently updated document. Ties keep discovery order.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::document::Candidate;

/// Metadata keys probed for a document timestamp, in order.
pub const RECENCY_KEYS: &[&str] = &[
    "updated_at",
    "updatedAt",
    "last_updated",
    "lastUpdated",
    "generated_at",
    "timestamp",
];

// Larger epoch values are taken as milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Seconds since the epoch from document metadata; 0 when absent or unparseable.
pub fn recency_score(metadata: Option<&Map<String, Value>>) -> i64 {
    let Some(metadata) = metadata else {
        return 0;
    };
    RECENCY_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(parse_timestamp)
        .unwrap_or(0)
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .map(from_epoch),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().map(from_epoch);
    }
    if is_decimal_epoch(s) {
        return s.parse::<f64>().ok().map(|f| from_epoch(f.trunc() as i64));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// `1709251200.5`: digits with a single fractional part.
fn is_decimal_epoch(s: &str) -> bool {
    s.split_once('.').is_some_and(|(whole, frac)| {
        !whole.is_empty()
            && !frac.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && frac.chars().all(|c| c.is_ascii_digit())
    })
}

fn from_epoch(n: i64) -> i64 {
    if n >= EPOCH_MILLIS_THRESHOLD { n / 1000 } else { n }
}

/// Order candidates highest priority first. Never drops a candidate.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    // Stable: equal keys keep discovery order.
    candidates.sort_by_cached_key(|c| {
        (
            Reverse(c.provenance.is_primary),
            Reverse(c.record.populated_fields()),
            Reverse(recency_score(c.provenance.metadata.as_deref())),
        )
    });
    candidates
}
