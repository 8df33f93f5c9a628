//! End-to-end runs over already-loaded documents.
//!
//! Group by identity, rank each group, fold it into one record, normalize,
//! then assemble. No I/O happens here; the caller supplies documents and the
//! clock.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::assemble::{OutputDocument, assemble};
use crate::document::{CandidateGroup, DocumentShape, SourceDocument, group_candidates};
use crate::merge::merge_group;
use crate::normalize::{NormalizeOptions, normalize_record};
use crate::rank::rank_candidates;
use crate::report::{Anomaly, AnomalyKind, RunReport};

pub const DEFAULT_PRIMARY_FILE: &str = "plants.json";

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// File name treated as the canonical source.
    pub primary_file: String,
    pub normalize: NormalizeOptions,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            primary_file: DEFAULT_PRIMARY_FILE.to_string(),
            normalize: NormalizeOptions::default(),
        }
    }
}

/// Merge every document into one output document.
pub fn run_merge(
    documents: Vec<SourceDocument>,
    options: &MergeOptions,
    now: DateTime<Utc>,
) -> (OutputDocument, RunReport) {
    let mut report = RunReport {
        files_loaded: documents.len(),
        ..Default::default()
    };
    let sources: Vec<String> = documents.iter().map(|d| d.file_name().to_string()).collect();

    let grouping = group_candidates(documents, &options.primary_file);
    report.processed = grouping.processed;
    report.dropped = grouping.dropped;
    report.extend(grouping.anomalies);
    info!(
        records = report.processed,
        plants = grouping.groups.len(),
        dropped = report.dropped,
        "grouped candidates"
    );

    let mut plants = Vec::with_capacity(grouping.groups.len());
    for group in grouping.groups {
        let group = CandidateGroup {
            identity: group.identity,
            candidates: rank_candidates(group.candidates),
        };
        let (merged, anomalies) = merge_group(&group);
        report.extend(anomalies);

        let (normalized, anomalies) = normalize_record(merged.clone(), &options.normalize);
        report.extend(anomalies);
        if normalized != merged {
            report.modified += 1;
        }
        plants.push(normalized);
    }
    report.merged = plants.len();

    let mut output = assemble(plants, sources, now);
    let policy = &options.normalize.month_policy;
    if !policy.overrides().is_empty() {
        output.metadata.month_map = Some(policy.to_month_map());
    }
    info!(
        plants = output.metadata.total_plants,
        modified = report.modified,
        anomalies = report.anomalies.len(),
        "merge complete"
    );
    (output, report)
}

/// Normalize one document in place, keeping its shape and record order.
///
/// With `record_month_map`, the effective month policy is written to
/// `metadata.month_map` (container documents only).
pub fn normalize_document(
    mut document: SourceDocument,
    options: &NormalizeOptions,
    record_month_map: bool,
) -> (SourceDocument, RunReport) {
    let mut report = RunReport {
        files_loaded: 1,
        processed: document.records.len() + document.rejected.len(),
        ..Default::default()
    };

    for value in std::mem::take(&mut document.rejected) {
        report.dropped += 1;
        report.record(
            Anomaly::new(
                AnomalyKind::NonObjectRecord,
                format!("plant entry is not an object: {value}"),
            )
            .from_source(document.path.clone()),
        );
    }

    let records = std::mem::take(&mut document.records);
    for record in records {
        let (normalized, anomalies) = normalize_record(record.clone(), options);
        report.extend(anomalies);
        if normalized != record {
            report.modified += 1;
        }
        document.records.push(normalized);
    }
    report.merged = document.records.len();

    if record_month_map {
        if matches!(document.shape, DocumentShape::Container { .. }) {
            let month_map = Value::Object(options.month_policy.to_month_map());
            document
                .metadata
                .get_or_insert_with(Map::new)
                .insert("month_map".to_string(), month_map);
        } else {
            warn!(
                path = %document.path.display(),
                "month map not recorded: document has no metadata block"
            );
        }
    }

    info!(
        path = %document.path.display(),
        records = report.merged,
        modified = report.modified,
        "normalized document"
    );
    (document, report)
}
