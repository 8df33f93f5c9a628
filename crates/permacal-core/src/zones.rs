//! Reference-profile migration.
//!
//! Calendar months are authored for temperate Europe. Records gain a
//! `referenceProfile` holding those months per phase, and `zoneProfiles`
//! describing how other zones derive from it. Legacy month fields stay at the
//! top level for older app versions.

use serde_json::{Map, Value, json};

pub const REFERENCE_ID: &str = "NH_temperate_europe";

/// Phase name, canonical field, legacy field.
const PHASES: [(&str, &str, &str); 3] = [
    ("sowing", "sowingMonths3", "sowingMonths"),
    ("planting", "plantingMonths3", "plantingMonths"),
    ("harvest", "harvestMonths3", "harvestMonths"),
];

fn default_zone_profiles() -> Value {
    json!({
        "NH_temperate_na": {"preferRelativeRules": true},
        "SH_temperate": {"monthShift": 6}
    })
}

/// Add `referenceProfile` and `zoneProfiles` to a record.
///
/// Returns `false` (record untouched) when it already has a reference profile
/// or carries no month data at all.
pub fn migrate_reference_profile(record: &mut Map<String, Value>) -> bool {
    if record.contains_key("referenceProfile") {
        return false;
    }

    let mut phases = Map::new();
    for (phase, canonical, legacy) in PHASES {
        let months = [canonical, legacy]
            .iter()
            .filter_map(|field| record.get(*field))
            .find(|value| value.as_array().is_some_and(|items| !items.is_empty()));
        if let Some(months) = months {
            phases.insert(
                phase.to_string(),
                json!({"type": "months", "months": months.clone()}),
            );
        }
    }
    if phases.is_empty() {
        return false;
    }

    record.insert(
        "referenceProfile".to_string(),
        json!({"referenceId": REFERENCE_ID, "phases": phases}),
    );
    if !record.contains_key("zoneProfiles") {
        record.insert("zoneProfiles".to_string(), default_zone_profiles());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn builds_phases_from_canonical_months() {
        let mut record = map(json!({
            "id": "carrot",
            "sowingMonths": ["M", "A"],
            "sowingMonths3": ["Mar", "Apr"],
            "harvestMonths": ["J", "J"]
        }));
        assert!(migrate_reference_profile(&mut record));

        let profile = &record["referenceProfile"];
        assert_eq!(profile["referenceId"], json!(REFERENCE_ID));
        assert_eq!(
            profile["phases"]["sowing"],
            json!({"type": "months", "months": ["Mar", "Apr"]})
        );
        assert_eq!(profile["phases"]["harvest"]["months"], json!(["J", "J"]));
        assert!(profile["phases"].get("planting").is_none());
        assert_eq!(record["zoneProfiles"]["SH_temperate"]["monthShift"], json!(6));
        assert_eq!(record["sowingMonths"], json!(["M", "A"]));
    }

    #[test]
    fn skips_records_without_months() {
        let mut record = map(json!({"id": "mint", "sowingMonths3": []}));
        assert!(!migrate_reference_profile(&mut record));
        assert!(!record.contains_key("referenceProfile"));
        assert!(!record.contains_key("zoneProfiles"));
    }

    #[test]
    fn migration_is_idempotent() {
        let mut record = map(json!({"id": "leek", "plantingMonths3": ["Jun"]}));
        assert!(migrate_reference_profile(&mut record));
        let once = record.clone();
        assert!(!migrate_reference_profile(&mut record));
        assert_eq!(record, once);
    }

    #[test]
    fn keeps_existing_zone_profiles() {
        let mut record = map(json!({
            "id": "leek",
            "harvestMonths3": ["Oct"],
            "zoneProfiles": {"SH_temperate": {"monthShift": 5}}
        }));
        migrate_reference_profile(&mut record);
        assert_eq!(record["zoneProfiles"]["SH_temperate"]["monthShift"], json!(5));
    }
}
