//! Non-fatal findings collected during a run.
//!
//! Plant data is hand-edited free text, so nearly every stage degrades instead
//! of failing. Each degradation becomes an [`Anomaly`] that the CLI prints in
//! an end-of-run summary for a human to audit.

use std::path::PathBuf;

use tracing::debug;

/// Category of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyKind {
    /// A source file could not be read or parsed and was skipped.
    LoadFailure,
    /// A plant entry was not a JSON object.
    NonObjectRecord,
    /// A record had neither `id` nor a display name.
    MissingIdentity,
    /// Two sources disagreed on the type of a field; the higher-ranked kept it.
    MergeConflict,
    /// A month token matched nothing in the month alphabet.
    UnknownMonth,
    /// A single-letter month was resolved among several candidates.
    AmbiguousMonth,
    /// A negation phrase was moved out of `beneficial`.
    NegationMoved,
    /// A negation phrase yielded no plant name.
    NegationUnextracted,
    /// A name appeared in both `beneficial` and `avoid`.
    CompanionOverlap,
    /// A companion list held a non-string entry.
    NonStringName,
    /// A vocabulary value was approximated from a range phrase.
    ApproximateToken,
    /// A vocabulary value matched nothing and became `UNKNOWN`.
    UnknownToken,
    /// A notification settings entry was malformed and rebuilt.
    NotificationRepaired,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadFailure => "load failure",
            Self::NonObjectRecord => "non-object record",
            Self::MissingIdentity => "missing identity",
            Self::MergeConflict => "merge conflict",
            Self::UnknownMonth => "unknown month",
            Self::AmbiguousMonth => "ambiguous month",
            Self::NegationMoved => "negation moved",
            Self::NegationUnextracted => "negation unextracted",
            Self::CompanionOverlap => "companion overlap",
            Self::NonStringName => "non-string name",
            Self::ApproximateToken => "approximate token",
            Self::UnknownToken => "unknown token",
            Self::NotificationRepaired => "notification repaired",
        }
    }
}

/// One non-fatal finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub plant: Option<String>,
    pub source: Option<PathBuf>,
    pub detail: String,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            plant: None,
            source: None,
            detail: detail.into(),
        }
    }

    pub fn for_plant(mut self, plant: impl Into<String>) -> Self {
        self.plant = Some(plant.into());
        self
    }

    pub fn from_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Counts and findings for one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    /// Source documents that loaded.
    pub files_loaded: usize,
    /// Plant entries seen across all documents.
    pub processed: usize,
    /// Records in the output after grouping by identity.
    pub merged: usize,
    /// Records changed by normalization.
    pub modified: usize,
    /// Entries dropped (non-objects, missing identity).
    pub dropped: usize,
    pub anomalies: Vec<Anomaly>,
}

impl RunReport {
    pub fn record(&mut self, anomaly: Anomaly) {
        debug!(
            kind = anomaly.kind.as_str(),
            plant = anomaly.plant.as_deref().unwrap_or("-"),
            detail = %anomaly.detail,
            "anomaly"
        );
        self.anomalies.push(anomaly);
    }

    pub fn extend(&mut self, anomalies: impl IntoIterator<Item = Anomaly>) {
        for anomaly in anomalies {
            self.record(anomaly);
        }
    }

    /// Anomalies grouped by kind, in [`AnomalyKind`] declaration order.
    pub fn by_kind(&self) -> Vec<(AnomalyKind, Vec<&Anomaly>)> {
        let mut groups: std::collections::BTreeMap<AnomalyKind, Vec<&Anomaly>> =
            std::collections::BTreeMap::new();
        for anomaly in &self.anomalies {
            groups.entry(anomaly.kind).or_default().push(anomaly);
        }
        groups.into_iter().collect()
    }

    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }
}
