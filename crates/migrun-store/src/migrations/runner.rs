//! Migration runner
//!
//! Applies scripts in order, each at most once, each in its own
//! transaction, and reports an outcome for every script it was given.

use crate::errors::Result;
use crate::target::MigrationTarget;
use migrun_core::model::validate_script_list;
use migrun_core::{
    log_op_end, log_op_error, log_op_start, AppliedMigrationRecord, ExErrorKind, ExecutionOutcome,
    ExecutionResult, FailurePolicy, MigrationScript, RunOptions, RunReport,
};
use migrun_core_types::RunId;
use std::collections::HashMap;
use std::time::Instant;

/// Apply `scripts` to `target` in order
///
/// Returns one result per script regardless of where execution stopped.
/// Only precondition failures are returned as `Err`; a failing script is
/// reported in the report.
///
/// # Errors
///
/// `DuplicateMigration` if two scripts share a name, `Bookkeeping` if the
/// bookkeeping table cannot be created or read. No script has been
/// attempted when an error is returned.
pub fn run_migrations(
    target: &mut dyn MigrationTarget,
    scripts: &[MigrationScript],
    options: &RunOptions,
) -> Result<RunReport> {
    let run_id = RunId::new();
    let start = Instant::now();
    log_op_start!(
        "run_migrations",
        run_id = %run_id,
        backend = %target.backend(),
        scripts = scripts.len(),
        dry_run = options.dry_run,
    );

    let result = run_inner(target, scripts, options, &run_id);
    let duration_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(report) => {
            let summary = report.summary();
            log_op_end!(
                "run_migrations",
                duration_ms = duration_ms,
                run_id = %run_id,
                applied = summary.applied,
                already_applied = summary.already_applied,
                failed = summary.failed,
                skipped = summary.skipped,
            );
        }
        Err(e) => {
            log_op_error!("run_migrations", e.clone(), duration_ms = duration_ms, run_id = %run_id);
        }
    }

    result
}

fn run_inner(
    target: &mut dyn MigrationTarget,
    scripts: &[MigrationScript],
    options: &RunOptions,
    run_id: &RunId,
) -> Result<RunReport> {
    validate_script_list(scripts)?;

    // A dry run must not create the table it is only asked to inspect
    let records = if options.dry_run {
        if target.has_bookkeeping()? {
            target.applied_migrations()?
        } else {
            Vec::new()
        }
    } else {
        target.ensure_bookkeeping()?;
        target.applied_migrations()?
    };

    let mut applied: HashMap<String, AppliedMigrationRecord> = records
        .into_iter()
        .map(|record| (record.name.clone(), record))
        .collect();

    let mut results = Vec::with_capacity(scripts.len());
    let mut halted = false;

    for script in scripts {
        if halted {
            results.push(ExecutionResult::new(script.name(), ExecutionOutcome::Skipped));
            continue;
        }

        let outcome = match applied.get(script.name()) {
            Some(record) => already_applied(record, script, run_id),
            None if options.dry_run => ExecutionOutcome::Pending,
            None => match apply_one(target, script, run_id) {
                Ok((record, duration_ms)) => {
                    applied.insert(record.name.clone(), record);
                    ExecutionOutcome::Applied { duration_ms }
                }
                Err(error) => {
                    // Nothing can be attempted once the connection is gone
                    halted = options.policy == FailurePolicy::StopOnFirstFailure
                        || error.kind() == ExErrorKind::Connection;
                    ExecutionOutcome::Failed { error }
                }
            },
        };

        results.push(ExecutionResult::new(script.name(), outcome));
    }

    Ok(RunReport::new(results))
}

fn already_applied(
    record: &AppliedMigrationRecord,
    script: &MigrationScript,
    run_id: &RunId,
) -> ExecutionOutcome {
    let checksum_changed = record.checksum_differs(script.checksum());
    if checksum_changed {
        tracing::warn!(
            run_id = %run_id,
            migration = script.name(),
            "script changed since it was applied; it will not be re-run"
        );
    } else {
        tracing::debug!(run_id = %run_id, migration = script.name(), "already applied");
    }
    ExecutionOutcome::AlreadyApplied {
        applied_at: record.applied_at,
        checksum_changed,
    }
}

fn apply_one(
    target: &mut dyn MigrationTarget,
    script: &MigrationScript,
    run_id: &RunId,
) -> Result<(AppliedMigrationRecord, u64)> {
    let start = Instant::now();
    log_op_start!("apply_migration", run_id = %run_id, migration = script.name());

    let result = target.apply(script);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(record) => {
            log_op_end!(
                "apply_migration",
                duration_ms = duration_ms,
                run_id = %run_id,
                migration = script.name(),
            );
            Ok((record, duration_ms))
        }
        Err(e) => {
            log_op_error!(
                "apply_migration",
                e.clone(),
                duration_ms = duration_ms,
                run_id = %run_id,
                migration = script.name(),
            );
            Err(e)
        }
    }
}
