use std::process::ExitCode;

use clap::Parser;
use tas_core::{err, print, AppPaths, AppSettings, IntoStringError};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    print::set_print(!cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Failures are shown even with --quiet
            print::set_print(true);
            err!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: cli::Cli) -> Result<(), String> {
    let paths = AppPaths::from_env().strerr()?;
    paths.ensure_dirs().await.strerr()?;
    if let Err(e) = print::logger_init(&paths.logs_dir) {
        err!(no_log, "Couldn't open the log file, logging to the terminal only: {e}");
    }

    let settings = AppSettings::load(&paths.settings_file).await.strerr()?;
    print::set_redact_emails(settings.streamer_mode);

    commands::run(cli.command, paths, settings).await
}
