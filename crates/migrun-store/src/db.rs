//! Target acquisition
//!
//! Opens the database named by a `DatabaseConfig`. The returned target owns
//! the connection; dropping it releases the connection on every path.

use crate::config::{DatabaseConfig, SqliteLocation};
use crate::errors::Result;
use crate::target::{MigrationTarget, PostgresTarget, SqliteTarget};
use migrun_core::{log_op_end, log_op_error, log_op_start};
use std::time::Instant;

/// Open a migration target for `config`
///
/// # Errors
///
/// `Connection` if the database cannot be reached, `Config` if the
/// configuration cannot be turned into connection options.
pub fn open_target(config: &DatabaseConfig) -> Result<Box<dyn MigrationTarget>> {
    let start = Instant::now();
    let label = config.to_string();
    log_op_start!("open_target", db = %label);

    let result: Result<Box<dyn MigrationTarget>> = match config {
        DatabaseConfig::Sqlite(SqliteLocation::Memory) => {
            SqliteTarget::open_in_memory().map(|t| Box::new(t) as Box<dyn MigrationTarget>)
        }
        DatabaseConfig::Sqlite(SqliteLocation::File(path)) => {
            SqliteTarget::open(path).map(|t| Box::new(t) as Box<dyn MigrationTarget>)
        }
        DatabaseConfig::Postgres(pg) => PostgresTarget::connect(pg, label.clone())
            .map(|t| Box::new(t) as Box<dyn MigrationTarget>),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(target) => log_op_end!(
            "open_target",
            duration_ms = duration_ms,
            db = %label,
            backend = %target.backend(),
        ),
        Err(e) => log_op_error!("open_target", e.clone(), duration_ms = duration_ms, db = %label),
    }

    result
}
