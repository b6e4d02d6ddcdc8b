//! Per-script outcomes and the aggregated run report
//!
//! Outcomes are ephemeral: they are returned to the caller for reporting
//! and never persisted.

use crate::errors::ExError;
use chrono::{DateTime, Utc};
use std::fmt;

/// What happened to one script during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Executed and recorded in this run
    Applied { duration_ms: u64 },
    /// A bookkeeping record already existed; nothing was executed
    AlreadyApplied {
        applied_at: DateTime<Utc>,
        /// The script text changed since it was applied
        checksum_changed: bool,
    },
    /// Execution failed and its transaction was rolled back
    Failed { error: ExError },
    /// Not attempted because an earlier script failed
    Skipped,
    /// Dry run: would be applied
    Pending,
}

impl ExecutionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionOutcome::Failed { .. })
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Applied { duration_ms } => {
                write!(f, "applied ({} ms)", duration_ms)
            }
            ExecutionOutcome::AlreadyApplied {
                applied_at,
                checksum_changed,
            } => {
                write!(f, "already applied ({})", applied_at.to_rfc3339())?;
                if *checksum_changed {
                    write!(f, ", script modified since")?;
                }
                Ok(())
            }
            ExecutionOutcome::Failed { error } => {
                let reason = if error.message().is_empty() {
                    error.code()
                } else {
                    error.message()
                };
                write!(f, "failed: {}", reason)
            }
            ExecutionOutcome::Skipped => write!(f, "skipped due to prior failure"),
            ExecutionOutcome::Pending => write!(f, "pending"),
        }
    }
}

/// Outcome of one named script
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub name: String,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    pub fn new(name: impl Into<String>, outcome: ExecutionOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }
}

/// Counts per outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub applied: usize,
    pub already_applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} already applied, {} failed, {} skipped",
            self.applied, self.already_applied, self.failed, self.skipped
        )?;
        if self.pending > 0 {
            write!(f, ", {} pending", self.pending)?;
        }
        Ok(())
    }
}

/// Ordered results of one run, one entry per input script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    results: Vec<ExecutionResult>,
}

impl RunReport {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    /// Outcome for a script by name
    pub fn outcome_of(&self, name: &str) -> Option<&ExecutionOutcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn summary(&self) -> RunSummary {
        self.results
            .iter()
            .fold(RunSummary::default(), |mut acc, r| {
                match r.outcome {
                    ExecutionOutcome::Applied { .. } => acc.applied += 1,
                    ExecutionOutcome::AlreadyApplied { .. } => acc.already_applied += 1,
                    ExecutionOutcome::Failed { .. } => acc.failed += 1,
                    ExecutionOutcome::Skipped => acc.skipped += 1,
                    ExecutionOutcome::Pending => acc.pending += 1,
                }
                acc
            })
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_failure())
    }
}
