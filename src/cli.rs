use crate::config::{self, FileConfig};
use crate::error::StartupError;
use crate::model::{BatchConfig, BatchReport, Selection, Sources, TimeOfDay};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "roslaunch-batch",
    version,
    about = "Run a roslaunch playback once per dataset folder, playing all *.bag files in it together",
    after_help = "Unrecognized arguments are passed to every roslaunch call, in order. \
                  Everything after `--` is passed through as is."
)]
pub struct Cli {
    /// Root of the dataset folders
    #[arg(long, env = "ROSLAUNCH_BATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Launch file handed to roslaunch
    #[arg(long, env = "ROSLAUNCH_BATCH_LAUNCH")]
    pub launch: Option<PathBuf>,

    /// TOML file with defaults (default: <config dir>/roslaunch-batch/config.toml)
    #[arg(long, env = "ROSLAUNCH_BATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run only day or night folders
    #[arg(long, value_enum, default_value_t = TimeOfDay::All)]
    pub only: TimeOfDay,

    /// Run only published folders
    #[arg(long)]
    pub published_only: bool,

    /// Run only unpublished folders
    #[arg(long)]
    pub unpublished_only: bool,

    /// Seconds to wait after each folder's run [default: 10]
    #[arg(long, value_parser = parse_seconds)]
    pub sleep_after: Option<f64>,

    /// Pass autorun:=false to roslaunch
    #[arg(long = "no_autorun", visible_alias = "no-autorun")]
    pub no_autorun: bool,

    /// Print the commands that would run and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 5 when any folder fails
    #[arg(long)]
    pub strict: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Extra arguments passed through to roslaunch
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ROSLAUNCH_ARGS")]
    pub extra: Vec<String>,
}

impl Cli {
    /// Parse the process arguments. Flags of this tool are recognised anywhere on
    /// the line; every other token is passed through to roslaunch.
    pub fn parse_known() -> Self {
        Self::try_parse_known(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_known<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut cmd = Self::command();
        cmd.build();

        let mut argv = argv.into_iter().map(Into::into);
        let mut known: Vec<OsString> = argv.next().into_iter().collect();
        let mut extra: Vec<OsString> = Vec::new();

        while let Some(token) = argv.next() {
            let Some(text) = token.to_str() else {
                extra.push(token);
                continue;
            };
            if text == "--" {
                extra.extend(argv.by_ref());
                break;
            }
            match flag_arity(&cmd, text) {
                Some(takes_value) => {
                    known.push(token);
                    if takes_value {
                        known.extend(argv.next());
                    }
                }
                None => extra.push(token),
            }
        }

        known.push("--".into());
        known.extend(extra);
        Self::try_parse_from(known)
    }
}

/// `Some(takes_separate_value)` when `token` is one of `cmd`'s flags.
fn flag_arity(cmd: &clap::Command, token: &str) -> Option<bool> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        let arg = cmd.get_arguments().find(|a| {
            a.get_long() == Some(name)
                || a.get_all_aliases()
                    .is_some_and(|aliases| aliases.contains(&name))
        })?;
        return Some(!inline_value && arg.get_action().takes_values());
    }

    let shorts = token.strip_prefix('-').filter(|s| !s.is_empty())?;
    for (idx, c) in shorts.char_indices() {
        let arg = cmd.get_arguments().find(|a| a.get_short() == Some(c))?;
        if arg.get_action().takes_values() {
            // `-xVALUE` carries its value; a trailing `-x` takes the next token.
            return Some(idx + c.len_utf8() == shorts.len());
        }
    }
    Some(false)
}

fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("`{s}` must be a non-negative number of seconds"));
    }
    Ok(secs)
}

/// How a batch that got past startup validation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    FoldersFailed,
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::FoldersFailed => 5,
            RunStatus::Interrupted => 130,
        }
    }

    fn from_report(report: &BatchReport, strict: bool) -> Self {
        if report.interrupted {
            RunStatus::Interrupted
        } else if strict && report.failed() > 0 {
            RunStatus::FoldersFailed
        } else {
            RunStatus::Completed
        }
    }
}

/// Merge CLI arguments over the file config. Flags and env vars win.
pub fn build_config(args: &Cli, file: FileConfig) -> Result<BatchConfig, StartupError> {
    let root = args
        .root
        .clone()
        .or(file.root)
        .ok_or(StartupError::RootNotConfigured)?;
    let launch = args
        .launch
        .clone()
        .or(file.launch)
        .ok_or(StartupError::LaunchNotConfigured)?;

    let sleep_after = args
        .sleep_after
        .map(Duration::from_secs_f64)
        .or(file.sleep_after)
        .unwrap_or(config::DEFAULT_SLEEP_AFTER);

    let mut extra_args = file.extra_args;
    extra_args.extend(args.extra.iter().cloned());

    Ok(BatchConfig {
        root,
        launch,
        tool: file.tool.unwrap_or_else(|| config::DEFAULT_TOOL.to_string()),
        selection: Selection {
            only: args.only,
            sources: Sources::from_flags(args.published_only, args.unpublished_only),
            day_pattern: file
                .day_pattern
                .unwrap_or_else(|| config::DEFAULT_DAY_PATTERN.to_string()),
            night_pattern: file
                .night_pattern
                .unwrap_or_else(|| config::DEFAULT_NIGHT_PATTERN.to_string()),
            unpublished_dir: file
                .unpublished_dir
                .unwrap_or_else(|| config::DEFAULT_UNPUBLISHED_DIR.to_string()),
        },
        autorun: !args.no_autorun,
        extra_args,
        sleep_after,
        interrupt_grace: file
            .interrupt_grace
            .unwrap_or(config::DEFAULT_INTERRUPT_GRACE),
        terminate_grace: file
            .terminate_grace
            .unwrap_or(config::DEFAULT_TERMINATE_GRACE),
        dry_run: args.dry_run,
    })
}

/// Check that the root and launch file exist.
pub fn validate(cfg: &BatchConfig) -> Result<(), StartupError> {
    if !cfg.root.is_dir() {
        return Err(StartupError::RootMissing(cfg.root.clone()));
    }
    if !cfg.launch.is_file() {
        return Err(StartupError::LaunchMissing(cfg.launch.clone()));
    }
    Ok(())
}

/// Cancel `token` on the first Ctrl+C.
fn spawn_interrupt_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received; stopping the current run");
            token.cancel();
        }
    })
}

pub async fn run(args: Cli) -> Result<RunStatus> {
    let file = FileConfig::load(args.config.as_deref())?;
    let cfg = build_config(&args, file)?;
    validate(&cfg)?;

    let folders = crate::discovery::find_folders(&cfg.root, &cfg.selection)?;
    if folders.is_empty() {
        return Err(StartupError::NoFolders(cfg.root.clone()).into());
    }

    info!(
        count = folders.len(),
        root = %cfg.root.display(),
        launch = %cfg.launch.display(),
        "found folders"
    );
    for (idx, folder) in folders.iter().enumerate() {
        info!("{:02}. {}", idx + 1, folder.display());
    }

    if cfg.dry_run {
        for invocation in crate::orchestrator::plan_batch(&cfg, &folders) {
            println!("{}", invocation.display());
        }
        return Ok(RunStatus::Completed);
    }

    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone());
    let report = crate::orchestrator::run_batch(&cfg, &folders, &cancel).await;
    listener.abort();

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{out}");
    } else {
        for line in crate::text_summary::build_text_summary(&report).lines {
            println!("{line}");
        }
    }

    Ok(RunStatus::from_report(&report, args.strict))
}
