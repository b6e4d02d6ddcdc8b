//! Verification queries
//!
//! A caller-supplied read-only query, run after a clean migration so the
//! operator can eyeball the result (e.g. the ten newest competitions and
//! their status).

use crate::errors::Result;
use crate::target::{MigrationTarget, QueryRows};
use migrun_core::{log_op_end, log_op_error, log_op_start, statement_heads, MigrunError};
use std::time::Instant;

/// Run `sql` read-only against `target`, outside any migration transaction
///
/// A trailing semicolon and comments are tolerated; the query must hold
/// exactly one statement.
///
/// # Errors
///
/// `InvalidInput` for an empty query or more than one statement,
/// `ReadOnlyViolation` if the query would write or control the
/// transaction, `SqlExecution` if it fails.
pub fn verify(target: &mut dyn MigrationTarget, sql: &str) -> Result<QueryRows> {
    let query = sql.trim().trim_end_matches(';').trim_end();
    let heads = statement_heads(query);
    match heads.as_slice() {
        [] => return Err(MigrunError::EmptyQuery.into()),
        [head] if head.is_transaction_control() => return Err(MigrunError::NotReadOnly.into()),
        [_] => {}
        _ => {
            return Err(MigrunError::MultipleStatements { count: heads.len() }.into());
        }
    }

    let start = Instant::now();
    log_op_start!("verify", backend = %target.backend());

    let result = target.query_rows(query);
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(rows) => log_op_end!("verify", duration_ms = duration_ms, rows = rows.len()),
        Err(e) => log_op_error!("verify", e.clone(), duration_ms = duration_ms),
    }

    result
}
