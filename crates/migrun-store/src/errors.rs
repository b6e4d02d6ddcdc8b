//! Error handling for migrun-store
//!
//! Maps driver errors onto the core error facility

use migrun_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// The connection could not be established or was lost
pub fn connection_error(target: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Connection)
        .with_op("connect")
        .with_message(format!("Cannot connect to {}: {}", target, reason))
}

/// The bookkeeping table could not be created, read, or written
pub fn bookkeeping_error(op: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Bookkeeping)
        .with_op(op.to_string())
        .with_message(reason.to_string())
}

/// A migration's SQL failed
pub fn sql_execution_error(migration: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::SqlExecution)
        .with_op("apply_migration")
        .with_migration(migration)
        .with_message(reason.to_string())
}

/// A verification query failed
pub fn query_error(reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::SqlExecution)
        .with_op("verify")
        .with_message(reason.to_string())
}

/// Classify an sqlx error raised while talking to the server
///
/// Transport failures become `Connection`; everything the server itself
/// rejected keeps `fallback`.
pub fn from_sqlx(err: sqlx::Error, fallback: ExError) -> ExError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            let op = fallback.op().unwrap_or("postgres").to_string();
            let migration = fallback.migration().map(str::to_string);
            let err = ExError::new(ExErrorKind::Connection)
                .with_op(op)
                .with_message(format!("Connection lost: {}", err));
            match migration {
                Some(name) => err.with_migration(name),
                None => err,
            }
        }
        other => {
            let message = match &other {
                sqlx::Error::Database(db) => db.message().to_string(),
                _ => other.to_string(),
            };
            fallback.with_message(message)
        }
    }
}

/// Create an IO error
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(format!("{}: {}", path.display(), err))
}

/// Create a configuration error from the config crate
pub fn config_error(err: config::ConfigError) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(err.to_string())
}
