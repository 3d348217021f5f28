//! Startup failures and the exit codes they map to.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no dataset root configured; pass --root or set ROSLAUNCH_BATCH_ROOT")]
    RootNotConfigured,

    #[error("root not found or not a directory: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("no launch file configured; pass --launch or set ROSLAUNCH_BATCH_LAUNCH")]
    LaunchNotConfigured,

    #[error("launch file not found: {}", .0.display())]
    LaunchMissing(PathBuf),

    #[error("no matching folders found under {}", .0.display())]
    NoFolders(PathBuf),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::RootNotConfigured | StartupError::RootMissing(_) => 2,
            StartupError::LaunchNotConfigured | StartupError::LaunchMissing(_) => 3,
            StartupError::NoFolders(_) => 4,
        }
    }
}
