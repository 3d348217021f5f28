//! Child process handle with bounded, escalating shutdown.
//!
//! `ScopedChild` is spawned with `kill_on_drop`, so a handle that is dropped
//! without an explicit `cleanup` still takes the process down with it.

use anyhow::{Context, Result};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Signals used for the polite first stage of a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopSignal {
    Interrupt,
    Terminate,
}

pub(crate) struct ScopedChild {
    child: Child,
}

impl ScopedChild {
    pub(crate) fn spawn(cmd: &mut Command) -> Result<Self> {
        cmd.kill_on_drop(true);
        let child = cmd.spawn().context("failed to spawn child process")?;
        Ok(Self { child })
    }

    pub(crate) fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the child to exit. Cancel safe.
    pub(crate) async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.context("failed to wait for child")
    }

    pub(crate) fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn send(&mut self, signal: StopSignal) -> Result<()> {
        let Some(pid) = self.child.id() else {
            // Already reaped.
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let sig = match signal {
                StopSignal::Interrupt => Signal::SIGINT,
                StopSignal::Terminate => Signal::SIGTERM,
            };
            debug!(pid, ?sig, "signalling child");
            kill(Pid::from_raw(pid as i32), sig).context("failed to signal child")?;
        }

        #[cfg(not(unix))]
        {
            debug!(pid, ?signal, "no polite signals on this platform; killing child");
            self.child.start_kill().context("failed to kill child")?;
        }

        Ok(())
    }

    /// Send `signal`, give the child `grace` to exit, then kill it.
    ///
    /// Always returns with the child reaped.
    pub(crate) async fn shutdown(
        &mut self,
        signal: StopSignal,
        grace: Duration,
    ) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait().context("failed to poll child")? {
            return Ok(status);
        }

        if let Err(e) = self.send(signal) {
            warn!("{e:#}");
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status.context("failed to wait for child"),
            Err(_) => {
                warn!(
                    pid = self.child.id(),
                    grace = %humantime::format_duration(grace),
                    "child did not exit in time; killing"
                );
                self.child.kill().await.context("failed to kill child")?;
                self.wait().await
            }
        }
    }

    /// Terminate the child if it is still running. No-op otherwise.
    pub(crate) async fn cleanup(&mut self, grace: Duration) -> Result<()> {
        if self.is_running() {
            warn!(pid = self.child.id(), "child still running; terminating");
            self.shutdown(StopSignal::Terminate, grace).await?;
        }
        Ok(())
    }
}
