//! Database targets
//!
//! A target owns one connection for the duration of a run. Dropping the
//! target releases the connection; an uncommitted transaction is rolled
//! back by the database.

mod postgres;
mod sqlite;

pub use postgres::PostgresTarget;
pub use sqlite::SqliteTarget;

use crate::errors::{sql_execution_error, Result};
use migrun_core::{find_transaction_control, AppliedMigrationRecord, MigrationScript};
use std::fmt;

/// Database engine behind a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

/// A database the runner can apply migrations to
///
/// All calls block the calling thread until the database answers.
pub trait MigrationTarget {
    fn backend(&self) -> Backend;

    /// Whether the bookkeeping table exists, without creating it
    ///
    /// # Errors
    ///
    /// `Bookkeeping` if the catalog cannot be read.
    fn has_bookkeeping(&mut self) -> Result<bool>;

    /// Create the bookkeeping table if it is absent
    ///
    /// # Errors
    ///
    /// `Bookkeeping` if the table cannot be created or upgraded.
    fn ensure_bookkeeping(&mut self) -> Result<()>;

    /// Every bookkeeping record, ordered by name
    ///
    /// # Errors
    ///
    /// `Bookkeeping` if the table cannot be read.
    fn applied_migrations(&mut self) -> Result<Vec<AppliedMigrationRecord>>;

    /// Execute `script` and record it, in one transaction
    ///
    /// On error nothing from the script and no bookkeeping row is committed.
    ///
    /// # Errors
    ///
    /// `SqlExecution` if the script fails, `Bookkeeping` if the record
    /// cannot be written, `Connection` if the connection was lost.
    fn apply(&mut self, script: &MigrationScript) -> Result<AppliedMigrationRecord>;

    /// Run a read-only query outside any migration transaction
    ///
    /// # Errors
    ///
    /// `ReadOnlyViolation` if the statement would write, `SqlExecution`
    /// if it fails.
    fn query_rows(&mut self, sql: &str) -> Result<QueryRows>;
}

/// Rows returned by a verification query, rendered as text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell values of one column across all rows
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or("NULL"))
                .collect(),
        )
    }
}

/// Text used for SQL NULL in rendered rows
pub(crate) const NULL_TEXT: &str = "NULL";

/// Refuse a script that would open, end, or abandon the transaction it runs in
pub(crate) fn reject_transaction_control(script: &MigrationScript) -> Result<()> {
    match find_transaction_control(script.sql()) {
        Some(head) => Err(sql_execution_error(
            script.name(),
            format!(
                "'{}' is not allowed in a migration script; each script already runs in its own transaction",
                head
            ),
        )),
        None => Ok(()),
    }
}
