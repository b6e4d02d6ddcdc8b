//! Run command
//!
//! Usage: run-migrations (--dir <PATH> | --file <PATH>...) [--continue-on-failure]
//!        [--verify-query <SQL>] [--dry-run] [--database-url <URL>]

use crate::report;
use clap::{ArgGroup, Args, ValueEnum};
use migrun_core::{ExError, FailurePolicy, MigrunError, RunOptions};
use migrun_store::{
    load_dir, load_files, open_target, run_migrations, verify, DatabaseConfig, DatabaseSettings,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable logs on stderr
    Pretty,
    /// One JSON object per log line on stderr
    Json,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["dir", "file"])))]
#[command(group(ArgGroup::new("policy").args(["stop_on_failure", "continue_on_failure"])))]
pub struct RunArgs {
    /// Directory of .sql files, applied in file-name order
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Script file(s), applied in the order given
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub file: Vec<PathBuf>,

    /// Halt at the first failing script (default)
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Keep going after a failing script
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Read-only query to print after a clean run
    #[arg(long, value_name = "SQL")]
    pub verify_query: Option<String>,

    /// Report what would be applied without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// TOML file with connection settings
    #[arg(long, value_name = "FILE", env = "MIGRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Connection URL; overrides every other source
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        let policy = if self.continue_on_failure {
            FailurePolicy::ContinueOnFailure
        } else {
            FailurePolicy::StopOnFirstFailure
        };
        RunOptions::default()
            .with_policy(policy)
            .with_dry_run(self.dry_run)
    }
}

/// How a run that reached the database ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    MigrationsFailed,
}

/// Execute a migration run
///
/// # Errors
///
/// Any precondition, connection, or verification failure. Failing scripts
/// are reported through `RunStatus::MigrationsFailed` instead.
pub fn execute(args: RunArgs) -> Result<RunStatus, ExError> {
    if let Some(query) = &args.verify_query {
        if query.trim().trim_end_matches(';').trim().is_empty() {
            return Err(MigrunError::EmptyQuery.into());
        }
    }

    let settings = DatabaseSettings::load(args.config.as_deref())?;
    let config = DatabaseConfig::resolve(settings, args.database_url.as_deref())?;
    tracing::debug!(db = %config, "database resolved");

    let scripts = match &args.dir {
        Some(dir) => load_dir(dir)?,
        None => load_files(args.file.as_slice())?,
    };

    let mut target = open_target(&config)?;
    let report = run_migrations(target.as_mut(), &scripts, &args.options())?;
    print!("{}", report::render_report(&report));

    if report.has_failures() {
        return Ok(RunStatus::MigrationsFailed);
    }

    if let Some(query) = args.verify_query.as_deref().filter(|_| !args.dry_run) {
        let rows = verify(target.as_mut(), query)?;
        println!();
        print!("{}", report::render_rows(&rows));
    }

    Ok(RunStatus::Clean)
}
