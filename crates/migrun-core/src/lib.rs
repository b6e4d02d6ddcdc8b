//! migrun Core - domain model, error facility, and logging facility
//!
//! Provides:
//! - Migration scripts, bookkeeping records, per-script outcomes
//! - Structured errors (`ExError`) with stable codes
//! - A single-init tracing facility with canonical operation macros

pub mod errors;
pub mod logging_facility;
pub mod model;

// Used by the logging macros so callers need not depend on it directly
#[doc(hidden)]
pub use migrun_core_types;

pub use errors::{ExError, ExErrorKind, MigrunError, Result};
pub use model::{
    find_transaction_control, statement_heads, AppliedMigrationRecord, ExecutionOutcome,
    ExecutionResult, FailurePolicy, MigrationScript, StatementHead,
    RunOptions, RunReport, RunSummary,
};
