//! migrun CLI
//!
//! Applies a directory or list of SQL scripts to a database, each at most
//! once, then optionally runs a read-only verification query.

use clap::Parser;
use migrun_core::logging_facility::{self, Profile};
use std::process::ExitCode;

mod commands;
mod report;

use commands::run::{LogFormat, RunArgs, RunStatus};

#[derive(Debug, Parser)]
#[command(name = "run-migrations")]
#[command(about = "Apply SQL migrations in order, each at most once", long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

fn main() -> ExitCode {
    // A missing .env is normal outside development
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    logging_facility::init(match cli.run.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    match commands::run::execute(cli.run) {
        Ok(RunStatus::Clean) => ExitCode::SUCCESS,
        Ok(RunStatus::MigrationsFailed) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.kind().is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::from(3)
            }
        }
    }
}
