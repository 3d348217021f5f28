mod child;
mod command;

pub(crate) use command::Invocation;

use crate::model::{FolderReport, Outcome, RunRequest};
use anyhow::Result;
use child::{ScopedChild, StopSignal};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How a supervised child finished.
enum ChildExit {
    Exited(ExitStatus),
    Interrupted(ExitStatus),
}

/// Runs the external tool for one folder at a time.
pub struct RunDriver {
    tool: String,
    launch: PathBuf,
    interrupt_grace: Duration,
    terminate_grace: Duration,
}

impl RunDriver {
    pub fn new(
        tool: impl Into<String>,
        launch: impl Into<PathBuf>,
        interrupt_grace: Duration,
        terminate_grace: Duration,
    ) -> Self {
        Self {
            tool: tool.into(),
            launch: launch.into(),
            interrupt_grace,
            terminate_grace,
        }
    }

    pub(crate) fn invocation(&self, req: &RunRequest) -> Invocation {
        Invocation::new(&self.tool, &self.launch, req)
    }

    /// Run the tool for `req.folder` and wait for it.
    ///
    /// Never fails: spawn and wait errors become a `Failed` report. Cancellation
    /// while the child runs forwards SIGINT, escalates to a kill after the
    /// interrupt grace, and yields `Interrupted`. The child is reaped before
    /// this returns.
    pub async fn run_folder(&self, req: &RunRequest, cancel: &CancellationToken) -> FolderReport {
        let invocation = self.invocation(req);
        info!(folder = %req.folder.display(), cmd = %invocation.display(), "running folder");

        let start = Instant::now();
        let mut report = FolderReport {
            folder: req.folder.clone(),
            outcome: Outcome::Failed,
            exit_code: None,
            error: None,
            duration: Duration::ZERO,
        };

        let mut child = match ScopedChild::spawn(&mut invocation.to_command()) {
            Ok(child) => child,
            Err(e) => {
                error!(folder = %req.folder.display(), "{e:#}");
                report.error = Some(format!("{e:#}"));
                report.duration = start.elapsed();
                return report;
            }
        };

        let result = self.supervise(&mut child, cancel).await;

        if let Err(e) = child.cleanup(self.terminate_grace).await {
            error!(folder = %req.folder.display(), "cleanup failed: {e:#}");
        }
        report.duration = start.elapsed();

        match result {
            Ok(ChildExit::Exited(status)) => {
                report.exit_code = status.code();
                if status.success() {
                    report.outcome = Outcome::Succeeded;
                    info!(folder = %req.folder.display(), "{} finished with code 0", self.tool);
                } else {
                    error!(
                        folder = %req.folder.display(),
                        code = ?status.code(),
                        "{} failed",
                        self.tool
                    );
                }
            }
            Ok(ChildExit::Interrupted(status)) => {
                report.outcome = Outcome::Interrupted;
                report.exit_code = status.code();
            }
            Err(e) => {
                error!(folder = %req.folder.display(), "unexpected error: {e:#}");
                report.error = Some(format!("{e:#}"));
            }
        }

        report
    }

    async fn supervise(
        &self,
        child: &mut ScopedChild,
        cancel: &CancellationToken,
    ) -> Result<ChildExit> {
        tokio::select! {
            status = child.wait() => Ok(ChildExit::Exited(status?)),
            _ = cancel.cancelled() => {
                warn!(pid = child.id(), "interrupt received; sending SIGINT to {}", self.tool);
                let status = child.shutdown(StopSignal::Interrupt, self.interrupt_grace).await?;
                Ok(ChildExit::Interrupted(status))
            }
        }
    }
}
