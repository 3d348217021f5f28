//! On-disk defaults.
//!
//! A TOML file supplies per-machine values (dataset root, launch file, tool
//! overrides) so nothing environment specific is compiled in. Command-line
//! flags and environment variables take precedence over anything here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TOOL: &str = "roslaunch";
pub const DEFAULT_DAY_PATTERN: &str = "ntu_day_*";
pub const DEFAULT_NIGHT_PATTERN: &str = "ntu_night_*";
pub const DEFAULT_UNPUBLISHED_DIR: &str = "unpublished_sequences";
pub const DEFAULT_SLEEP_AFTER: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERRUPT_GRACE: Duration = Duration::from_secs(20);
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<PathBuf>,
    pub launch: Option<PathBuf>,
    pub tool: Option<String>,
    pub day_pattern: Option<String>,
    pub night_pattern: Option<String>,
    pub unpublished_dir: Option<String>,
    #[serde(with = "humantime_serde")]
    pub sleep_after: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub interrupt_grace: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub terminate_grace: Option<Duration>,
    pub extra_args: Vec<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `explicit` if given, otherwise the per-user default file if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// `<config dir>/roslaunch-batch/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("roslaunch-batch").join("config.toml"))
}
