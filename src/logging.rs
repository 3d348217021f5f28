use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Install the stderr fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-q` drops to warnings and each `-v`
/// raises this crate's level (info, debug, trace).
pub fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let local = match (quiet, verbosity) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        EnvFilter::new(format!("warn,roslaunch_batch={local}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}
