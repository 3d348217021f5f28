use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Fully resolved settings for one batch invocation.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub root: PathBuf,
    pub launch: PathBuf,
    pub tool: String,
    pub selection: Selection,
    pub autorun: bool,
    pub extra_args: Vec<String>,
    pub sleep_after: Duration,
    pub interrupt_grace: Duration,
    pub terminate_grace: Duration,
    pub dry_run: bool,
}

/// Which folders to pick up under the root.
#[derive(Debug, Clone)]
pub struct Selection {
    pub only: TimeOfDay,
    pub sources: Sources,
    pub day_pattern: String,
    pub night_pattern: String,
    pub unpublished_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TimeOfDay {
    All,
    Day,
    Night,
}

impl TimeOfDay {
    pub fn wants_day(self) -> bool {
        matches!(self, TimeOfDay::All | TimeOfDay::Day)
    }

    pub fn wants_night(self) -> bool {
        matches!(self, TimeOfDay::All | TimeOfDay::Night)
    }
}

/// Published/unpublished inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sources {
    pub published: bool,
    pub unpublished: bool,
}

impl Sources {
    /// Resolve the two `--*-only` flags. A single flag restricts to that source,
    /// none or both select everything.
    pub fn from_flags(published_only: bool, unpublished_only: bool) -> Self {
        if published_only == unpublished_only {
            Self {
                published: true,
                unpublished: true,
            }
        } else {
            Self {
                published: published_only,
                unpublished: unpublished_only,
            }
        }
    }
}

/// One folder paired with its invocation parameters.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub folder: PathBuf,
    pub autorun: bool,
    pub extra_args: Vec<String>,
    pub sleep_after: Duration,
}

/// Terminal state of a single folder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: PathBuf,
    pub outcome: Outcome,
    /// `None` when the child never produced an exit code (spawn error, signal).
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_utc: String,
    pub finished_utc: String,
    pub root: PathBuf,
    pub launch: PathBuf,
    pub selected: usize,
    pub folders: Vec<FolderReport>,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(Outcome::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.folders.iter().filter(|f| f.outcome == outcome).count()
    }
}

/// Current UTC time in RFC 3339.
pub fn now_utc() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_selects_both_sources() {
        let s = Sources::from_flags(false, false);
        assert!(s.published && s.unpublished);
    }

    #[test]
    fn both_flags_select_both_sources() {
        let s = Sources::from_flags(true, true);
        assert!(s.published && s.unpublished);
    }

    #[test]
    fn single_flag_restricts() {
        assert_eq!(
            Sources::from_flags(true, false),
            Sources {
                published: true,
                unpublished: false
            }
        );
        assert_eq!(
            Sources::from_flags(false, true),
            Sources {
                published: false,
                unpublished: true
            }
        );
    }

    #[test]
    fn report_counts_outcomes() {
        let entry = |outcome| FolderReport {
            folder: PathBuf::from("x"),
            outcome,
            exit_code: None,
            error: None,
            duration: Duration::ZERO,
        };
        let report = BatchReport {
            started_utc: String::new(),
            finished_utc: String::new(),
            root: PathBuf::new(),
            launch: PathBuf::new(),
            selected: 3,
            folders: vec![
                entry(Outcome::Succeeded),
                entry(Outcome::Failed),
                entry(Outcome::Failed),
            ],
            interrupted: false,
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn report_serializes_for_json_output() {
        let report = BatchReport {
            started_utc: "2026-01-01T00:00:00Z".into(),
            finished_utc: "2026-01-01T00:01:00Z".into(),
            root: PathBuf::from("/data"),
            launch: PathBuf::from("/ws/run.launch"),
            selected: 1,
            folders: vec![FolderReport {
                folder: PathBuf::from("/data/ntu_day_01"),
                outcome: Outcome::Interrupted,
                exit_code: Some(130),
                error: None,
                duration: Duration::from_secs(90),
            }],
            interrupted: true,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["folders"][0]["outcome"], "interrupted");
        assert_eq!(value["folders"][0]["duration"], "1m 30s");
        assert_eq!(value["folders"][0]["error"], serde_json::Value::Null);
        assert_eq!(value["interrupted"], true);
    }
}
