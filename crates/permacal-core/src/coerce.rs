//! Coercion of loosely-typed field values: free text to lists, strings to numbers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

/// Top-level fields holding a quantity.
pub const NUMERIC_FIELDS: &[&str] = &[
    "daysToMaturity",
    "daysToGermination",
    "spacing",
    "rowSpacing",
    "sowingDepth",
    "depth",
    "height",
    "yieldPerPlant",
];

/// Mappings whose every leaf is a quantity.
pub const NUMERIC_MAPS: &[&str] = &["nutritionPer100g"];

// Spaced hyphen only: "chou-fleur" is one plant.
static DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:[,;/\u{2013}\u{2014}]|\s-\s)\s*").unwrap());

static TRAILING_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").unwrap());

/// A field expected to hold a list, as actually found in the data.
#[derive(Debug, Clone, PartialEq)]
pub enum ListField {
    Missing,
    Items(Vec<Value>),
    FreeText(String),
}

impl ListField {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => Self::Items(items.clone()),
            Some(Value::String(s)) => Self::FreeText(s.clone()),
            Some(other) => Self::Items(vec![other.clone()]),
        }
    }

    /// Flatten into list items, splitting free text on delimiters.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Missing => Vec::new(),
            Self::Items(items) => items,
            Self::FreeText(text) => split_delimited(&text)
                .into_iter()
                .map(Value::String)
                .collect(),
        }
    }
}

/// Split free text on commas, semicolons, slashes, dashes and spaced hyphens.
///
/// Each part is trimmed and loses a trailing parenthesized annotation; empty
/// parts are dropped.
pub fn split_delimited(text: &str) -> Vec<String> {
    DELIMITERS
        .split(text)
        .map(strip_annotation)
        .filter(|part| !part.is_empty())
        .collect()
}

/// `"tomate (cerise)"` -> `"tomate"`.
pub fn strip_annotation(part: &str) -> String {
    let mut current = part.trim().to_string();
    while let Some(m) = TRAILING_ANNOTATION.find(&current) {
        if m.start() == 0 {
            // Entirely parenthesized; keep the text rather than erase it.
            break;
        }
        current.truncate(m.start());
    }
    current.trim().to_string()
}

/// Convert a numeric-looking string to a JSON number.
///
/// Integers first, then floats with either decimal separator. Anything else
/// (including non-strings) is returned unchanged.
pub fn coerce_number(value: Value) -> Value {
    let Value::String(s) = &value else {
        return value;
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return value;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Number(n.into());
    }
    let dotted = trimmed.replace(',', ".");
    if looks_decimal(&dotted)
        && let Ok(f) = dotted.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    value
}

// Rejects "inf", "NaN" and exponent forms that `f64::from_str` would accept.
fn looks_decimal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}

/// Recursively coerce every string leaf of a mapping or list.
pub fn coerce_leaves(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, coerce_leaves(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_leaves).collect()),
        other => coerce_number(other),
    }
}
