mod cli;
mod config;
mod discovery;
mod engine;
mod error;
mod logging;
mod model;
mod orchestrator;
mod text_summary;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse_known();
    logging::init_tracing(args.verbose, args.quiet);

    match cli::run(args).await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            tracing::error!("{e:#}");
            let code = e
                .downcast_ref::<error::StartupError>()
                .map_or(1, error::StartupError::exit_code);
            ExitCode::from(code)
        }
    }
}
