//! Notification settings skeleton.
//!
//! The app expects every plant to carry all five notification kinds. Missing
//! kinds get a disabled default; existing ones gain any missing `enabled` or
//! `message` key.

use serde_json::{Map, Value, json};

use crate::coerce::coerce_number;

pub const WATERING: &str = "watering";
pub const THINNING: &str = "thinning";
pub const BIOLOGICAL_CONTROL: &str = "biological_control";
pub const HARVEST: &str = "harvest";
pub const TEMPERATURE_ALERT: &str = "temperature_alert";

pub const KINDS: [&str; 5] = [
    WATERING,
    THINNING,
    BIOLOGICAL_CONTROL,
    HARVEST,
    TEMPERATURE_ALERT,
];

/// Harvest offset used when the record has no days-to-maturity.
pub const DEFAULT_HARVEST_DAYS: i64 = 90;
pub const DEFAULT_THINNING_DAYS: i64 = 21;

const MATURITY_FIELDS: &[&str] = &["daysToMaturity", "days_to_maturity", "maturityDays"];

/// What [`ensure_skeleton`] had to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonChanges {
    pub inserted: Vec<&'static str>,
    /// Kinds whose settings were not an object and were rebuilt.
    pub repaired: Vec<String>,
}

/// Days to maturity from the record, as an integer or float JSON number.
pub fn days_to_maturity(record: &Map<String, Value>) -> Option<Value> {
    MATURITY_FIELDS.iter().find_map(|field| {
        let value = coerce_number(record.get(*field)?.clone());
        value.is_number().then_some(value)
    })
}

/// Default settings for one kind.
pub fn default_settings(kind: &str, record: &Map<String, Value>) -> Value {
    match kind {
        WATERING => json!({"enabled": false, "message": "", "frequency": "weekly"}),
        THINNING => json!({
            "enabled": false,
            "message": "",
            "daysAfterPlanting": DEFAULT_THINNING_DAYS
        }),
        BIOLOGICAL_CONTROL => json!({"enabled": false, "message": "", "conditions": []}),
        HARVEST => json!({
            "enabled": false,
            "message": "",
            "daysAfterPlanting": days_to_maturity(record).unwrap_or(json!(DEFAULT_HARVEST_DAYS))
        }),
        TEMPERATURE_ALERT => json!({
            "enabled": false,
            "message": "",
            "cold_alert": {"enabled": false, "message": ""},
            "germination_optimal": {"enabled": false, "message": ""}
        }),
        _ => json!({"enabled": false, "message": ""}),
    }
}

/// Make `notificationSettings` structurally complete.
pub fn ensure_skeleton(record: &mut Map<String, Value>) -> SkeletonChanges {
    let mut changes = SkeletonChanges::default();

    // take() leaves the key in place so the field keeps its position.
    let existing = record.get_mut("notificationSettings").map(Value::take);
    let mut settings = match existing {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            changes.repaired.push("notificationSettings".to_string());
            Map::new()
        }
    };

    for (kind, value) in settings.iter_mut() {
        match value {
            Value::Object(entry) => {
                if !entry.contains_key("enabled") {
                    entry.insert("enabled".to_string(), Value::Bool(false));
                }
                if !entry.contains_key("message") {
                    entry.insert("message".to_string(), Value::String(String::new()));
                }
                if let Some(days) = entry.get_mut("daysAfterPlanting") {
                    *days = coerce_number(days.take());
                }
            }
            Value::Bool(enabled) => {
                // `"watering": true` shorthand
                let enabled = *enabled;
                let mut rebuilt = default_settings(kind, record);
                rebuilt["enabled"] = Value::Bool(enabled);
                *value = rebuilt;
                changes.repaired.push(kind.clone());
            }
            _ => {
                *value = default_settings(kind, record);
                changes.repaired.push(kind.clone());
            }
        }
    }

    for kind in KINDS {
        if !settings.contains_key(kind) {
            settings.insert(kind.to_string(), default_settings(kind, record));
            changes.inserted.push(kind);
        }
    }

    record.insert("notificationSettings".to_string(), Value::Object(settings));
    changes
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
    fn inserts_all_kinds_when_absent() {
        let mut record = map(json!({"id": "leek", "daysToMaturity": "120"}));
        let changes = ensure_skeleton(&mut record);
        assert_eq!(changes.inserted.len(), 5);

        let ns = &record["notificationSettings"];
        for kind in KINDS {
            assert_eq!(ns[kind]["enabled"], json!(false), "{kind}");
            assert_eq!(ns[kind]["message"], json!(""), "{kind}");
        }
        assert_eq!(ns[HARVEST]["daysAfterPlanting"], json!(120));
        assert_eq!(ns[WATERING]["frequency"], json!("weekly"));
    }

    #[test]
    fn harvest_falls_back_without_maturity() {
        let mut record = map(json!({"id": "leek"}));
        ensure_skeleton(&mut record);
        assert_eq!(
            record["notificationSettings"][HARVEST]["daysAfterPlanting"],
            json!(DEFAULT_HARVEST_DAYS)
        );
    }

    #[test]
    fn keeps_existing_settings() {
        let mut record = map(json!({
            "id": "leek",
            "notificationSettings": {
                "watering": {"enabled": true, "message": "Arroser", "frequency": "2x/semaine"},
                "harvest": {"daysAfterPlanting": "75"},
                "custom": {"enabled": true, "message": "x"}
            }
        }));
        let changes = ensure_skeleton(&mut record);
        let ns = &record["notificationSettings"];
        assert_eq!(ns[WATERING]["message"], json!("Arroser"));
        assert_eq!(ns[HARVEST]["daysAfterPlanting"], json!(75));
        assert_eq!(ns[HARVEST]["enabled"], json!(false));
        assert_eq!(ns["custom"]["enabled"], json!(true));
        assert_eq!(changes.inserted, vec![THINNING, BIOLOGICAL_CONTROL, TEMPERATURE_ALERT]);
    }

    #[test]
    fn repairs_malformed_entries() {
        let mut record = map(json!({
            "id": "leek",
            "notificationSettings": {"watering": true, "thinning": "soon"}
        }));
        let changes = ensure_skeleton(&mut record);
        let ns = &record["notificationSettings"];
        assert_eq!(ns[WATERING]["enabled"], json!(true));
        assert_eq!(ns[THINNING]["daysAfterPlanting"], json!(DEFAULT_THINNING_DAYS));
        assert_eq!(changes.repaired, vec!["watering", "thinning"]);

        let mut record = map(json!({"id": "leek", "notificationSettings": "none"}));
        let changes = ensure_skeleton(&mut record);
        assert_eq!(changes.repaired, vec!["notificationSettings"]);
        assert_eq!(changes.inserted.len(), 5);
    }

    #[test]
    fn skeleton_is_idempotent() {
        let mut record = map(json!({"id": "leek", "notificationSettings": {"watering": true}}));
        ensure_skeleton(&mut record);
        let once = record.clone();
        let changes = ensure_skeleton(&mut record);
        assert_eq!(record, once);
        assert_eq!(changes, SkeletonChanges::default());
    }
}
