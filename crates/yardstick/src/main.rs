mod cli;
mod commands;
mod config;
mod files;

use std::process::ExitCode;

use anyhow::Result;
use logging::LogMode;

use crate::cli::{Commands, YardstickCli};
use crate::commands::typecheck::TypecheckArgs;

fn main() -> ExitCode {
    let cli = YardstickCli::parse_args();

    let mode = match (&cli.log_file, cli.log_json) {
        (Some(path), _) => LogMode::File(path.clone()),
        (None, true) => LogMode::Json,
        (None, false) => LogMode::Cli,
    };
    let _guards = match logging::init(mode, cli.verbose) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("failed to initialize logging: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run(cli.command) {
        Ok(true) => ExitCode::FAILURE,
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Runs a command. `Ok(true)` means the command found problems.
fn run(command: Commands) -> Result<bool> {
    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Typecheck {
            paths,
            level,
            format,
            config,
            threads,
        } => commands::typecheck::run(
            TypecheckArgs {
                paths,
                level,
                format,
                config,
                threads,
            },
            &mut stdout,
        ),
        Commands::Probe {
            file,
            signature,
            line,
        } => {
            commands::probe::run(&file, &signature, line, &mut stdout)?;
            Ok(false)
        }
    }
}
