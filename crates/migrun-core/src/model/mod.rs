//! Migration domain model

pub mod outcome;
pub mod policy;
pub mod record;
pub mod script;
pub mod statements;

pub use outcome::{ExecutionOutcome, ExecutionResult, RunReport, RunSummary};
pub use policy::{FailurePolicy, RunOptions};
pub use record::AppliedMigrationRecord;
pub use script::{validate_script_list, MigrationScript};
pub use statements::{find_transaction_control, statement_heads, StatementHead};
