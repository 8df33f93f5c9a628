//! Per-record field normalization.
//!
//! Every rule here is idempotent: normalizing an already-normalized record
//! returns it unchanged.

use serde_json::{Map, Value};

use crate::coerce::{ListField, NUMERIC_FIELDS, NUMERIC_MAPS, coerce_leaves, coerce_number};
use crate::companion::{ListOrder, clean_companion_block, clean_name_list};
use crate::months::{MonthField, MonthPolicy};
use crate::notifications::ensure_skeleton;
use crate::record::{PlantRecord, is_empty_value};
use crate::report::{Anomaly, AnomalyKind};
use crate::vocab::{SCALAR_VOCABULARIES, SEASON_FIELDS, SEASONS, Tokenized, UNKNOWN_TOKEN, Vocabulary};
use crate::zones::migrate_reference_profile;

/// Canonical month field and the legacy single-letter field it supersedes.
pub const MONTH_FIELDS: [(&str, &str); 3] = [
    ("sowingMonths3", "sowingMonths"),
    ("harvestMonths3", "harvestMonths"),
    ("plantingMonths3", "plantingMonths"),
];

const BIOLOGICAL_CONTROL_LISTS: &[&str] = &["companionPlants", "beneficialInsects"];

/// What happens to legacy month fields once the canonical list is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegacyMonths {
    /// Leave them as found.
    #[default]
    Keep,
    /// Rewrite as single-letter initials of the canonical months.
    Letters,
    /// Overwrite with the canonical codes.
    Replace,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub list_order: ListOrder,
    pub month_policy: MonthPolicy,
    pub legacy_months: LegacyMonths,
    pub tokenize_enums: bool,
    pub reference_profiles: bool,
}

/// Normalize one record, returning it with the anomalies found on the way.
pub fn normalize_record(record: PlantRecord, options: &NormalizeOptions) -> (PlantRecord, Vec<Anomaly>) {
    let plant = record.identity();
    let mut map = record.into_map();
    let mut findings = Vec::new();

    coerce_numbers(&mut map);
    normalize_companions(&mut map, options.list_order, &mut findings);
    normalize_biological_control(&mut map, options.list_order, &mut findings);
    normalize_months(&mut map, options, &mut findings);
    if options.tokenize_enums {
        tokenize_enums(&mut map, &mut findings);
    }
    for kind in ensure_skeleton(&mut map).repaired {
        findings.push(Finding::new(
            AnomalyKind::NotificationRepaired,
            format!("`notificationSettings.{kind}` was not an object; rebuilt from defaults"),
        ));
    }
    if options.reference_profiles {
        migrate_reference_profile(&mut map);
    }

    let anomalies = findings
        .into_iter()
        .map(|f| {
            let anomaly = Anomaly::new(f.kind, f.detail);
            match &plant {
                Some(plant) => anomaly.for_plant(plant.clone()),
                None => anomaly,
            }
        })
        .collect();
    (PlantRecord::from_map(map), anomalies)
}

struct Finding {
    kind: AnomalyKind,
    detail: String,
}

impl Finding {
    fn new(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

fn coerce_numbers(map: &mut Map<String, Value>) {
    for field in NUMERIC_FIELDS {
        if let Some(value) = map.get_mut(*field) {
            *value = coerce_number(value.take());
        }
    }
    for field in NUMERIC_MAPS {
        if let Some(value) = map.get_mut(*field) {
            *value = coerce_leaves(value.take());
        }
    }
}

fn normalize_companions(map: &mut Map<String, Value>, order: ListOrder, findings: &mut Vec<Finding>) {
    let Some(Value::Object(block)) = map.get_mut("companionPlanting") else {
        return;
    };
    let cleanup = clean_companion_block(block, order);

    for split in cleanup.moved {
        if split.names.is_empty() {
            findings.push(Finding::new(
                AnomalyKind::NegationUnextracted,
                format!("no plant name found in \"{}\"; kept as a note", split.note),
            ));
        } else {
            findings.push(Finding::new(
                AnomalyKind::NegationMoved,
                format!("\"{}\" moved to avoid: {}", split.note, split.names.join(", ")),
            ));
        }
    }
    for name in cleanup.overlap {
        findings.push(Finding::new(
            AnomalyKind::CompanionOverlap,
            format!("\"{name}\" listed as both beneficial and avoid; kept in avoid"),
        ));
    }
    for value in cleanup.rejected {
        findings.push(Finding::new(
            AnomalyKind::NonStringName,
            format!("dropped non-string companion entry {value}"),
        ));
    }
}

fn normalize_biological_control(
    map: &mut Map<String, Value>,
    order: ListOrder,
    findings: &mut Vec<Finding>,
) {
    let Some(Value::Object(block)) = map.get_mut("biologicalControl") else {
        return;
    };
    for field in BIOLOGICAL_CONTROL_LISTS {
        if !block.contains_key(*field) {
            continue;
        }
        let (value, rejected) = clean_name_list(block.get(*field), order);
        block.insert(field.to_string(), value);
        for value in rejected {
            findings.push(Finding::new(
                AnomalyKind::NonStringName,
                format!("dropped non-string `biologicalControl.{field}` entry {value}"),
            ));
        }
    }
}

fn normalize_months(map: &mut Map<String, Value>, options: &NormalizeOptions, findings: &mut Vec<Finding>) {
    for (canonical, legacy) in MONTH_FIELDS {
        // A canonical list, even an empty one, supersedes the legacy field.
        let source = if map.get(canonical).is_some_and(|v| !v.is_null()) {
            canonical
        } else {
            legacy
        };
        let field = MonthField::from_value(map.get(source));
        if field.is_missing() {
            continue;
        }

        let resolution = options.month_policy.resolve(&field);
        for token in &resolution.unknown {
            findings.push(Finding::new(
                AnomalyKind::UnknownMonth,
                format!("`{source}`: dropped unrecognised month \"{token}\""),
            ));
        }
        for (token, month) in &resolution.ambiguous {
            findings.push(Finding::new(
                AnomalyKind::AmbiguousMonth,
                format!("`{source}`: \"{token}\" read as {month}"),
            ));
        }

        let months = resolution.months;
        map.insert(canonical.to_string(), months.to_value());
        match options.legacy_months {
            LegacyMonths::Keep => {}
            LegacyMonths::Letters => {
                let letters = months
                    .legacy_letters()
                    .into_iter()
                    .map(|l| Value::String(l.to_string()))
                    .collect();
                map.insert(legacy.to_string(), Value::Array(letters));
            }
            LegacyMonths::Replace => {
                map.insert(legacy.to_string(), months.to_value());
            }
        }
    }
}

fn tokenize_enums(map: &mut Map<String, Value>, findings: &mut Vec<Finding>) {
    for vocab in SCALAR_VOCABULARIES {
        let Some(Value::String(raw)) = map.get(vocab.field) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }
        let token = tokenize_one(&vocab, vocab.field, raw, findings);
        map.insert(vocab.field.to_string(), Value::String(token));
    }

    for field in SEASON_FIELDS {
        let value = map.get(*field);
        if value.is_none_or(is_empty_value) {
            continue;
        }
        let mut tokens: Vec<Value> = Vec::new();
        for item in ListField::from_value(value).into_items() {
            let raw = match item {
                Value::String(raw) => raw,
                other => {
                    findings.push(Finding::new(
                        AnomalyKind::UnknownToken,
                        format!("`{field}`: dropped non-string entry {other}"),
                    ));
                    continue;
                }
            };
            let token = Value::String(tokenize_one(&SEASONS, field, &raw, findings));
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        map.insert(field.to_string(), Value::Array(tokens));
    }
}

fn tokenize_one(vocab: &Vocabulary, field: &str, raw: &str, findings: &mut Vec<Finding>) -> String {
    match vocab.tokenize(raw) {
        Tokenized::Exact(token) => token,
        Tokenized::Approximate(token) => {
            findings.push(Finding::new(
                AnomalyKind::ApproximateToken,
                format!("`{field}`: \"{raw}\" approximated as {token}"),
            ));
            token
        }
        Tokenized::Unknown => {
            findings.push(Finding::new(
                AnomalyKind::UnknownToken,
                format!("`{field}`: \"{raw}\" matches no known value"),
            ));
            UNKNOWN_TOKEN.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::companion::is_negation;

    fn record(value: Value) -> PlantRecord {
        match value {
            Value::Object(map) => PlantRecord::from_map(map),
            other => panic!("not an object: {other}"),
        }
    }

    fn normalize(value: Value, options: &NormalizeOptions) -> (Value, Vec<Anomaly>) {
        let (record, anomalies) = normalize_record(record(value), options);
        (record.into_value(), anomalies)
    }

    fn all_rules() -> NormalizeOptions {
        NormalizeOptions {
            tokenize_enums: true,
            reference_profiles: true,
            ..Default::default()
        }
    }

    fn messy() -> Value {
        json!({
            "id": "carrot",
            "commonName": "Carotte",
            "daysToMaturity": "75",
            "spacing": "4,5",
            "nutritionPer100g": {"calories": "41", "fibre": "2,8"},
            "sowingMonths": ["F", "M", "A"],
            "harvestMonths3": "jun-août",
            "plantingMonths": "Q",
            "sunExposure": "Plein soleil",
            "waterNeeds": "Modéré à élevé",
            "plantingSeason": "Printemps, été, printemps",
            "companionPlanting": {
                "beneficial": ["Pois", "éviter le fenouil et l'aneth", "Poireau", "aneth"],
                "avoid": "Persil"
            },
            "biologicalControl": {
                "companionPlants": "Poireau, oignon",
                "beneficialInsects": ["Syrphes", 7]
            },
            "notificationSettings": {"watering": true}
        })
    }

    #[test]
    fn applies_every_rule() {
        let (value, anomalies) = normalize(messy(), &all_rules());

        assert_eq!(value["daysToMaturity"], json!(75));
        assert_eq!(value["spacing"], json!(4.5));
        assert_eq!(value["nutritionPer100g"], json!({"calories": 41, "fibre": 2.8}));
        assert_eq!(value["sowingMonths3"], json!(["Feb", "Mar", "Apr"]));
        assert_eq!(value["sowingMonths"], json!(["F", "M", "A"]));
        assert_eq!(value["harvestMonths3"], json!(["Jun", "Jul", "Aug"]));
        assert_eq!(value["plantingMonths3"], json!([]));
        assert_eq!(value["sunExposure"], json!("SUN_FULL"));
        assert_eq!(value["waterNeeds"], json!("WATER_MEDIUM_HIGH"));
        assert_eq!(value["plantingSeason"], json!(["SPRING", "SUMMER"]));
        assert_eq!(
            value["companionPlanting"],
            json!({
                "beneficial": ["poireau", "pois"],
                "avoid": ["aneth", "fenouil", "persil"],
                "notes": ["éviter le fenouil et l'aneth"]
            })
        );
        assert_eq!(
            value["biologicalControl"],
            json!({"companionPlants": ["oignon", "poireau"], "beneficialInsects": ["syrphes"]})
        );
        assert_eq!(value["notificationSettings"]["watering"]["enabled"], json!(true));
        assert_eq!(
            value["notificationSettings"]["harvest"]["daysAfterPlanting"],
            json!(75)
        );
        assert_eq!(
            value["referenceProfile"]["phases"]["sowing"]["months"],
            json!(["Feb", "Mar", "Apr"])
        );

        let kinds: Vec<AnomalyKind> = anomalies.iter().map(|a| a.kind).collect();
        for kind in [
            AnomalyKind::AmbiguousMonth,
            AnomalyKind::UnknownMonth,
            AnomalyKind::ApproximateToken,
            AnomalyKind::NegationMoved,
            AnomalyKind::CompanionOverlap,
            AnomalyKind::NonStringName,
            AnomalyKind::NotificationRepaired,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?}");
        }
        assert!(anomalies.iter().all(|a| a.plant.as_deref() == Some("carrot")));
    }

    #[test]
    fn normalization_is_idempotent() {
        for options in [
            NormalizeOptions::default(),
            all_rules(),
            NormalizeOptions {
                list_order: ListOrder::FirstSeen,
                legacy_months: LegacyMonths::Letters,
                ..all_rules()
            },
            NormalizeOptions {
                legacy_months: LegacyMonths::Replace,
                ..Default::default()
            },
        ] {
            let (once, _) = normalize(messy(), &options);
            let (twice, anomalies) = normalize(once.clone(), &options);
            assert_eq!(once, twice);
            assert!(anomalies.is_empty(), "{anomalies:?}");
        }
    }

    #[test]
    fn first_seen_order_keeps_source_order() {
        let options = NormalizeOptions {
            list_order: ListOrder::FirstSeen,
            ..Default::default()
        };
        let (value, _) = normalize(
            json!({"id": "pea", "companionPlanting": {"beneficial": ["pois", "éviter le fenouil et l'aneth", "carotte"]}}),
            &options,
        );
        assert_eq!(value["companionPlanting"]["beneficial"], json!(["pois", "carotte"]));
        assert_eq!(value["companionPlanting"]["avoid"], json!(["fenouil", "aneth"]));
    }

    #[test]
    fn companion_invariants_hold() {
        let (value, _) = normalize(messy(), &NormalizeOptions::default());
        let cp = &value["companionPlanting"];
        let beneficial: Vec<&str> = cp["beneficial"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        let avoid: Vec<&str> = cp["avoid"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(beneficial.iter().all(|b| !avoid.contains(b)));
        assert!(beneficial.iter().all(|b| !is_negation(b)));
    }

    #[test]
    fn canonical_months_are_authoritative() {
        let (value, _) = normalize(
            json!({"id": "leek", "sowingMonths": ["J"], "sowingMonths3": ["Mar", "Feb", "Mar"]}),
            &NormalizeOptions::default(),
        );
        assert_eq!(value["sowingMonths3"], json!(["Feb", "Mar"]));
        assert_eq!(value["sowingMonths"], json!(["J"]));
    }

    #[test]
    fn legacy_modes_rewrite_legacy_field() {
        let input = json!({"id": "leek", "sowingMonths3": ["Mar", "May", "Aug"]});
        let letters = NormalizeOptions {
            legacy_months: LegacyMonths::Letters,
            ..Default::default()
        };
        let (value, _) = normalize(input.clone(), &letters);
        assert_eq!(value["sowingMonths"], json!(["M", "M", "A"]));

        let replace = NormalizeOptions {
            legacy_months: LegacyMonths::Replace,
            ..Default::default()
        };
        let (value, _) = normalize(input, &replace);
        assert_eq!(value["sowingMonths"], json!(["Mar", "May", "Aug"]));
    }

    #[test]
    fn enums_untouched_unless_enabled() {
        let (value, anomalies) = normalize(
            json!({"id": "leek", "waterNeeds": "Modéré à élevé"}),
            &NormalizeOptions::default(),
        );
        assert_eq!(value["waterNeeds"], json!("Modéré à élevé"));
        assert!(anomalies.is_empty());
    }

    #[test]
    fn water_range_yields_deterministic_token() {
        let options = all_rules();
        let input = json!({"id": "leek", "waterNeeds": "Modéré à élevé", "sunExposure": "quelque part"});
        let (a, anomalies) = normalize(input.clone(), &options);
        let (b, _) = normalize(input, &options);
        assert_eq!(a["waterNeeds"], json!("WATER_MEDIUM_HIGH"));
        assert_eq!(a, b);
        assert_eq!(a["sunExposure"], json!(UNKNOWN_TOKEN));
        assert!(anomalies.iter().any(|x| x.kind == AnomalyKind::ApproximateToken));
        assert!(anomalies.iter().any(|x| x.kind == AnomalyKind::UnknownToken));
    }

    #[test]
    fn unknown_fields_pass_through_in_order() {
        let (value, _) = normalize(
            json!({"id": "leek", "zeta": 1, "alpha": {"nested": "x"}}),
            &NormalizeOptions::default(),
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id", "zeta", "alpha", "notificationSettings"]);
    }
}
