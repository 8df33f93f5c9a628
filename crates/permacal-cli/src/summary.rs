//! End-of-run summary.
//!
//! Renders a [`RunReport`] as labelled sections: counts first, then the
//! anomalies grouped by kind so a human can audit what the run guessed at.

use std::fmt::Write;
use std::path::Path;

use permacal_core::{Anomaly, RunReport};

const MAX_LIST_ITEMS: usize = 10;

pub fn print_summary(command: &str, report: &RunReport, written: &Path, verbose: bool) {
    print!("{}", render(command, report, written, verbose));
}

pub fn render(command: &str, report: &RunReport, written: &Path, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== permacal {command} ===");
    let _ = writeln!(out);

    section(
        &mut out,
        "Records",
        &[
            ("files loaded", report.files_loaded.to_string()),
            ("entries processed", report.processed.to_string()),
            ("plants written", report.merged.to_string()),
            ("modified by normalization", report.modified.to_string()),
            ("dropped", report.dropped.to_string()),
            ("written to", written.display().to_string()),
        ],
    );

    let groups = report.by_kind();
    if groups.is_empty() {
        let _ = writeln!(out, "No anomalies.");
        return out;
    }
    let counts: Vec<(&str, String)> = groups
        .iter()
        .map(|(kind, items)| (kind.as_str(), items.len().to_string()))
        .collect();
    section(&mut out, "Anomalies", &counts);

    for (kind, items) in &groups {
        let _ = writeln!(out, "{}", capitalize(kind.as_str()));
        let shown = if verbose { items.len() } else { MAX_LIST_ITEMS };
        for anomaly in items.iter().take(shown) {
            let _ = writeln!(out, "  {:<26} {}", subject(anomaly), anomaly.detail);
        }
        if items.len() > shown {
            let _ = writeln!(out, "  ... and {} more (use --verbose)", items.len() - shown);
        }
        let _ = writeln!(out);
    }
    out
}

fn section(out: &mut String, header: &str, rows: &[(&str, String)]) {
    let _ = writeln!(out, "{header}");
    for (label, value) in rows {
        let _ = writeln!(out, "  {label:<26} {value}");
    }
    let _ = writeln!(out);
}

/// Plant id, else the source file name, else a dash.
fn subject(anomaly: &Anomaly) -> String {
    if let Some(plant) = &anomaly.plant {
        return plant.clone();
    }
    anomaly
        .source
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "-".to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use permacal_core::AnomalyKind;

    use super::*;

    fn report(unknown_months: usize) -> RunReport {
        let mut report = RunReport {
            files_loaded: 2,
            processed: 12,
            merged: 10,
            modified: 4,
            dropped: 1,
            ..Default::default()
        };
        for i in 0..unknown_months {
            report.record(
                Anomaly::new(AnomalyKind::UnknownMonth, format!("token {i}")).for_plant("leek"),
            );
        }
        report.record(
            Anomaly::new(AnomalyKind::LoadFailure, "bad json").from_source("data/broken.json"),
        );
        report
    }

    #[test]
    fn renders_counts_and_grouped_anomalies() {
        let text = render("merge", &report(2), Path::new("plants_merged.json"), false);
        assert!(text.starts_with("=== permacal merge ===\n"));
        assert!(text.contains("  files loaded               2\n"));
        assert!(text.contains("  unknown month              2\n"));
        assert!(text.contains("Load failure\n  broken.json                bad json\n"));
        assert!(text.contains("  leek                       token 1\n"));
        // Load failures sort before month findings.
        assert!(text.find("Load failure").unwrap() < text.find("Unknown month").unwrap());
    }

    #[test]
    fn truncates_long_lists_unless_verbose() {
        let text = render("merge", &report(15), Path::new("out.json"), false);
        assert!(text.contains("... and 5 more (use --verbose)"));
        assert!(!text.contains("token 12"));

        let text = render("merge", &report(15), Path::new("out.json"), true);
        assert!(text.contains("token 14"));
        assert!(!text.contains("more (use --verbose)"));
    }

    #[test]
    fn clean_run_says_so() {
        let text = render("normalize", &RunReport::default(), Path::new("p.json"), false);
        assert!(text.ends_with("No anomalies.\n"));
    }
}
