//! Sequential batch loop.
//!
//! Folders run strictly one after another. A failed folder is recorded and the
//! loop moves on; an interrupt stops the loop where it is.

use crate::engine::{Invocation, RunDriver};
use crate::model::{now_utc, BatchConfig, BatchReport, Outcome, RunRequest};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn request_for(cfg: &BatchConfig, folder: &Path) -> RunRequest {
    RunRequest {
        folder: folder.to_path_buf(),
        autorun: cfg.autorun,
        extra_args: cfg.extra_args.clone(),
        sleep_after: cfg.sleep_after,
    }
}

fn driver_for(cfg: &BatchConfig) -> RunDriver {
    RunDriver::new(
        cfg.tool.clone(),
        cfg.launch.clone(),
        cfg.interrupt_grace,
        cfg.terminate_grace,
    )
}

/// Commands that a real run would execute, in order.
pub(crate) fn plan_batch(cfg: &BatchConfig, folders: &[PathBuf]) -> Vec<Invocation> {
    let driver = driver_for(cfg);
    folders
        .iter()
        .map(|folder| driver.invocation(&request_for(cfg, folder)))
        .collect()
}

/// Run every folder in order and collect per-folder outcomes.
pub(crate) async fn run_batch(
    cfg: &BatchConfig,
    folders: &[PathBuf],
    cancel: &CancellationToken,
) -> BatchReport {
    let driver = driver_for(cfg);
    let mut report = BatchReport {
        started_utc: now_utc(),
        finished_utc: String::new(),
        root: cfg.root.clone(),
        launch: cfg.launch.clone(),
        selected: folders.len(),
        folders: Vec::with_capacity(folders.len()),
        interrupted: false,
    };

    for (idx, folder) in folders.iter().enumerate() {
        if cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }

        info!(
            "folder {}/{}: {}",
            idx + 1,
            folders.len(),
            folder.display()
        );
        let req = request_for(cfg, folder);
        let entry = driver.run_folder(&req, cancel).await;
        let outcome = entry.outcome;
        report.folders.push(entry);

        if outcome == Outcome::Interrupted {
            report.interrupted = true;
            break;
        }

        if !req.sleep_after.is_zero() {
            info!(
                "sleeping {} to let background saves finish",
                humantime::format_duration(req.sleep_after)
            );
            tokio::select! {
                _ = tokio::time::sleep(req.sleep_after) => {}
                _ = cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
            }
        }
    }

    if report.interrupted {
        let skipped = folders.len() - report.folders.len();
        warn!(skipped, "batch interrupted; remaining folders not started");
    }

    report.finished_utc = now_utc();
    report
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::tests::{fake_tool, wait_for_line};
    use crate::model::{Selection, Sources, TimeOfDay};
    use std::time::{Duration, Instant};

    fn config(tool: &Path, sleep_after: Duration) -> BatchConfig {
        BatchConfig {
            root: PathBuf::from("/data"),
            launch: PathBuf::from("/ws/run.launch"),
            tool: tool.display().to_string(),
            selection: Selection {
                only: TimeOfDay::All,
                sources: Sources::from_flags(false, false),
                day_pattern: "ntu_day_*".into(),
                night_pattern: "ntu_night_*".into(),
                unpublished_dir: "unpublished_sequences".into(),
            },
            autorun: true,
            extra_args: Vec::new(),
            sleep_after,
            interrupt_grace: Duration::from_millis(500),
            terminate_grace: Duration::from_millis(500),
            dry_run: false,
        }
    }

    fn folders(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/data").join(n)).collect()
    }

    #[tokio::test]
    async fn failure_does_not_stop_batch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = tmp.path().join("runs.log");
        let tool = fake_tool(
            tmp.path(),
            &format!(
                "echo \"$2\" >> '{}'\ncase \"$2\" in *ntu_day_01*) exit 2;; esac",
                log.display()
            ),
        );
        let cfg = config(&tool, Duration::ZERO);
        let list = folders(&["ntu_day_01", "ntu_night_01"]);

        let report = run_batch(&cfg, &list, &CancellationToken::new()).await;

        let outcomes: Vec<_> = report.folders.iter().map(|f| f.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Failed, Outcome::Succeeded]);
        assert_eq!(report.folders[0].exit_code, Some(2));
        assert!(!report.interrupted);
        let runs = std::fs::read_to_string(&log).unwrap();
        assert_eq!(runs.lines().count(), 2);
    }

    #[tokio::test]
    async fn interrupt_stops_remaining_folders() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = tmp.path().join("runs.log");
        let pid_file = tmp.path().join("pid");
        let tool = fake_tool(
            tmp.path(),
            &format!(
                "echo $$ > {pid}\ntrap 'kill $child; echo INT >> {log}; exit 130' INT\n\
                 sleep 30 &\nchild=$!\necho started >> {log}\nwait $child",
                pid = pid_file.display(),
                log = log.display()
            ),
        );
        let cfg = config(&tool, Duration::ZERO);
        let list = folders(&["ntu_day_01", "ntu_day_02", "ntu_night_01"]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watched = log.clone();
        tokio::spawn(async move {
            wait_for_line(&watched, "started").await;
            trigger.cancel();
        });

        let report = run_batch(&cfg, &list, &cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.folders.len(), 1);
        assert_eq!(report.folders[0].outcome, Outcome::Interrupted);
        let lines = std::fs::read_to_string(&log).unwrap();
        assert_eq!(lines.lines().collect::<Vec<_>>(), vec!["started", "INT"]);

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok();
        assert!(!alive, "child {pid} still running after batch returned");
    }

    #[tokio::test]
    async fn stubborn_child_is_killed_after_grace() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = tmp.path().join("runs.log");
        let tool = fake_tool(
            tmp.path(),
            &format!(
                "trap '' INT TERM\nsleep 5 &\necho started >> {}\nwait $!",
                log.display()
            ),
        );
        let cfg = config(&tool, Duration::ZERO);
        let list = folders(&["ntu_day_01", "ntu_day_02"]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watched = log.clone();
        tokio::spawn(async move {
            wait_for_line(&watched, "started").await;
            trigger.cancel();
        });

        let start = Instant::now();
        let report = run_batch(&cfg, &list, &cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.folders.len(), 1);
        assert_eq!(report.folders[0].outcome, Outcome::Interrupted);
        assert_eq!(report.folders[0].exit_code, None);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn interrupt_during_pause_stops_batch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let tool = fake_tool(tmp.path(), "exit 0");
        let cfg = config(&tool, Duration::from_secs(10));
        let list = folders(&["ntu_day_01", "ntu_day_02"]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let report = run_batch(&cfg, &list, &cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.folders.len(), 1);
        assert_eq!(report.folders[0].outcome, Outcome::Succeeded);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let tool = fake_tool(tmp.path(), "exit 0");
        let cfg = config(&tool, Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run_batch(&cfg, &folders(&["ntu_day_01"]), &cancel).await;

        assert!(report.interrupted);
        assert!(report.folders.is_empty());
    }

    #[test]
    fn plan_lists_commands_in_order() {
        let cfg = config(Path::new("roslaunch"), Duration::ZERO);
        let plan = plan_batch(&cfg, &folders(&["ntu_day_01", "ntu_night_01"]));
        let bags: Vec<_> = plan.iter().map(|inv| inv.args[1].as_str()).collect();
        assert_eq!(
            bags,
            vec![
                "bag_file:=/data/ntu_day_01/*.bag",
                "bag_file:=/data/ntu_night_01/*.bag"
            ]
        );
    }
}
