//! Text summary builder for CLI output.
//!
//! Formats a finished batch report into human-readable lines for text mode.

use crate::model::{BatchReport, Outcome};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a batch report.
pub(crate) fn build_text_summary(report: &BatchReport) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!(
        "Folders: {} selected, {} succeeded, {} failed",
        report.selected,
        report.succeeded(),
        report.failed()
    ));

    for entry in &report.folders {
        let status = match entry.outcome {
            Outcome::Succeeded => "ok".to_string(),
            Outcome::Failed => match (entry.exit_code, entry.error.as_deref()) {
                (Some(code), _) => format!("failed (code {code})"),
                (None, Some(err)) => format!("failed ({err})"),
                (None, None) => "failed".to_string(),
            },
            Outcome::Interrupted => "interrupted".to_string(),
        };
        lines.push(format!(
            "  {:<12} {} [{}]",
            status,
            entry.folder.display(),
            humantime::format_duration(round_secs(entry.duration))
        ));
    }

    if report.interrupted {
        let skipped = report.selected.saturating_sub(report.folders.len());
        lines.push(format!("Interrupted: {skipped} folder(s) not started"));
    }

    TextSummary { lines }
}

fn round_secs(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(d.as_secs())
}
