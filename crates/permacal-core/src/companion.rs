//! Companion-planting lists: negation phrases and name-list hygiene.
//!
//! Hand-written `beneficial` lists sometimes carry advice such as
//! `"éviter le fenouil et l'aneth"` ("avoid fennel and dill"). Such phrases do
//! not belong in `beneficial`: the plant names are moved to `avoid` and the
//! phrase itself is kept in `notes`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::coerce::{ListField, strip_annotation};

/// Accent- and case-insensitive "avoid" marker.
static NEGATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[ée]viter").unwrap());

/// Marker, optional article, then the object up to the first `(`, `,` or `;`.
static NEGATION_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ée]viter\s+(?:(?:les|la|le|des|du|de)\s+|[ld]['\u{2019}]\s*)?([^(,;]+)")
        .unwrap()
});

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:,|/|;|\bet\b|\band\b|\bavec\b|\bplus\b)\s*").unwrap());

static LEADING_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:les|la|le|des|du|de|the)\s+|[ld]['\u{2019}]\s*)").unwrap()
});

/// Ordering applied to normalized name lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Alphabetical, as written by the merge pipeline.
    #[default]
    Sorted,
    /// Order of first appearance.
    FirstSeen,
}

/// Whether a phrase contains the "avoid" marker.
pub fn is_negation(phrase: &str) -> bool {
    NEGATION.is_match(phrase)
}

/// Plant names extracted from a negation phrase, plus the phrase to keep as a note.
#[derive(Debug, Clone, PartialEq)]
pub struct NegationSplit {
    pub names: Vec<String>,
    pub note: String,
}

/// Extract the lowercase plant names a negation phrase warns against.
///
/// Best effort: `names` is empty when nothing recognisable follows the marker.
pub fn split_negation(phrase: &str) -> NegationSplit {
    let note = phrase.trim().to_string();
    let names = NEGATION_OBJECT
        .captures(&note)
        .and_then(|caps| caps.get(1))
        .map(|object| split_names(object.as_str()))
        .unwrap_or_default();
    NegationSplit { names, note }
}

fn split_names(text: &str) -> Vec<String> {
    NAME_SEPARATORS
        .split(text)
        .map(|part| {
            let part = strip_annotation(part);
            let part = LEADING_ARTICLE.replace(&part, "");
            part.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Lowercase, trim, drop empties, de-duplicate, then order.
///
/// Non-string entries are returned separately so the caller can report them.
pub fn normalize_names(items: Vec<Value>, order: ListOrder) -> (Vec<String>, Vec<Value>) {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut rejected = Vec::new();
    for item in items {
        match item {
            Value::String(s) => {
                let name = s.trim().to_lowercase();
                if !name.is_empty() && seen.insert(name.clone()) {
                    names.push(name);
                }
            }
            Value::Null => {}
            other => rejected.push(other),
        }
    }
    if order == ListOrder::Sorted {
        names.sort();
    }
    (names, rejected)
}

/// Changes made while cleaning one companion-planting block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanionCleanup {
    /// Negation phrases moved out of `beneficial`, with the names they yielded.
    pub moved: Vec<NegationSplit>,
    /// Names that were in both lists and were removed from `beneficial`.
    pub overlap: Vec<String>,
    pub rejected: Vec<Value>,
}

/// Clean a `companionPlanting` object in place.
///
/// Negation phrases leave `beneficial` (their names join `avoid`, the phrase
/// joins `notes`), both lists are normalized, and any name left in both lists
/// is dropped from `beneficial`.
pub fn clean_companion_block(block: &mut Map<String, Value>, order: ListOrder) -> CompanionCleanup {
    let mut cleanup = CompanionCleanup::default();

    let beneficial = ListField::from_value(block.get("beneficial")).into_items();
    let mut avoid = ListField::from_value(block.get("avoid")).into_items();
    let mut notes: Vec<Value> = match block.get("notes") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::Null) | None => Vec::new(),
        // Any other value is kept as the first note.
        Some(other) => vec![other.clone()],
    };

    let mut kept = Vec::with_capacity(beneficial.len());
    for item in beneficial {
        match &item {
            Value::String(phrase) if is_negation(phrase) => {
                let split = split_negation(phrase);
                for name in &split.names {
                    let value = Value::String(name.clone());
                    if !avoid.contains(&value) {
                        avoid.push(value);
                    }
                }
                let note = Value::String(split.note.clone());
                if !notes.contains(&note) {
                    notes.push(note);
                }
                cleanup.moved.push(split);
            }
            _ => kept.push(item),
        }
    }

    let (avoid, rejected_avoid) = normalize_names(avoid, order);
    let (mut beneficial, rejected_beneficial) = normalize_names(kept, order);
    cleanup.rejected.extend(rejected_beneficial);
    cleanup.rejected.extend(rejected_avoid);

    let avoid_set: HashSet<&str> = avoid.iter().map(String::as_str).collect();
    beneficial.retain(|name| {
        if avoid_set.contains(name.as_str()) {
            cleanup.overlap.push(name.clone());
            false
        } else {
            true
        }
    });

    block.insert("beneficial".to_string(), strings_value(beneficial));
    block.insert("avoid".to_string(), strings_value(avoid));
    let notes_is_text = matches!(block.get("notes"), Some(Value::Array(_) | Value::String(_)));
    if !notes.is_empty() && (notes_is_text || !cleanup.moved.is_empty()) {
        block.insert("notes".to_string(), Value::Array(notes));
    }
    cleanup
}

/// Normalize a plain name list field (no negation handling).
pub fn clean_name_list(value: Option<&Value>, order: ListOrder) -> (Value, Vec<Value>) {
    let (names, rejected) = normalize_names(ListField::from_value(value).into_items(), order);
    (strings_value(names), rejected)
}

fn strings_value(names: Vec<String>) -> Value {
    Value::Array(names.into_iter().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn detects_marker_with_and_without_accent() {
        assert!(is_negation("éviter le fenouil"));
        assert!(is_negation("Eviter les choux"));
        assert!(is_negation("À ÉVITER : ail"));
        assert!(!is_negation("carotte"));
    }

    #[test]
    fn extracts_names_after_article() {
        let split = split_negation("éviter le fenouil et l'aneth");
        assert_eq!(split.names, vec!["fenouil", "aneth"]);
        assert_eq!(split.note, "éviter le fenouil et l'aneth");

        assert_eq!(
            split_negation("Eviter les haricots, pois").names,
            vec!["haricots"]
        );
        assert_eq!(
            split_negation("éviter la proximité avec les choux (concurrence)").names,
            vec!["proximité", "choux"]
        );
        assert_eq!(split_negation("éviter l’ail").names, vec!["ail"]);
    }

    #[test]
    fn unextractable_phrase_yields_no_names() {
        let split = split_negation("à éviter");
        assert!(split.names.is_empty());
        assert_eq!(split.note, "à éviter");
    }

    #[test]
    fn moves_negation_phrase_to_avoid_and_notes() {
        let mut cp = block(json!({
            "beneficial": ["pois", "éviter le fenouil et l'aneth", "carotte"]
        }));
        let cleanup = clean_companion_block(&mut cp, ListOrder::FirstSeen);

        assert_eq!(cp["beneficial"], json!(["pois", "carotte"]));
        assert_eq!(cp["avoid"], json!(["fenouil", "aneth"]));
        assert_eq!(cp["notes"], json!(["éviter le fenouil et l'aneth"]));
        assert_eq!(cleanup.moved.len(), 1);
    }

    #[test]
    fn structured_notes_survive_a_move() {
        let mut cp = block(json!({
            "beneficial": ["éviter l'ail"],
            "notes": {"source": "grand-mère"}
        }));
        clean_companion_block(&mut cp, ListOrder::FirstSeen);
        assert_eq!(cp["notes"], json!([{"source": "grand-mère"}, "éviter l'ail"]));

        let mut cp = block(json!({"beneficial": ["pois"], "notes": 7}));
        clean_companion_block(&mut cp, ListOrder::FirstSeen);
        assert_eq!(cp["notes"], json!(7));
    }

    #[test]
    fn unextractable_phrase_still_leaves_beneficial() {
        let mut cp = block(json!({"beneficial": ["ail", "à éviter"], "avoid": ["chou"]}));
        let cleanup = clean_companion_block(&mut cp, ListOrder::Sorted);
        assert_eq!(cp["beneficial"], json!(["ail"]));
        assert_eq!(cp["avoid"], json!(["chou"]));
        assert_eq!(cp["notes"], json!(["à éviter"]));
        assert!(cleanup.moved[0].names.is_empty());
    }

    #[test]
    fn lists_are_disjoint_and_deduplicated() {
        let mut cp = block(json!({
            "beneficial": ["Tomate", " tomate ", "Basilic", "", "Fenouil", 3],
            "avoid": "fenouil, Chou-fleur"
        }));
        let cleanup = clean_companion_block(&mut cp, ListOrder::Sorted);
        assert_eq!(cp["beneficial"], json!(["basilic", "tomate"]));
        assert_eq!(cp["avoid"], json!(["chou-fleur", "fenouil"]));
        assert_eq!(cleanup.overlap, vec!["fenouil"]);
        assert_eq!(cleanup.rejected, vec![json!(3)]);
        assert!(!cp.contains_key("notes"));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut cp = block(json!({
            "beneficial": ["Pois", "éviter le fenouil et l'aneth", "carotte", "aneth"],
            "avoid": ["Chou"]
        }));
        for order in [ListOrder::Sorted, ListOrder::FirstSeen] {
            let mut once = cp.clone();
            clean_companion_block(&mut once, order);
            let mut twice = once.clone();
            let cleanup = clean_companion_block(&mut twice, order);
            assert_eq!(once, twice);
            assert!(cleanup.moved.is_empty());
        }
        clean_companion_block(&mut cp, ListOrder::Sorted);
        let beneficial = cp["beneficial"].as_array().unwrap();
        assert!(beneficial.iter().all(|v| !is_negation(v.as_str().unwrap())));
    }

    #[test]
    fn plain_name_list_from_free_text() {
        let (value, rejected) =
            clean_name_list(Some(&json!("Coccinelles, Syrphes; coccinelles")), ListOrder::FirstSeen);
        assert_eq!(value, json!(["coccinelles", "syrphes"]));
        assert!(rejected.is_empty());
    }
}
