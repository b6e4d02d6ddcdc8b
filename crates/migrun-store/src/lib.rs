//! migrun Store - database targets and the migration runner
//!
//! Provides:
//! - `MigrationTarget` with SQLite (rusqlite) and PostgreSQL (sqlx) backends
//! - The `migrations_applied` bookkeeping table
//! - The runner: ordered, transactional, applied-at-most-once execution
//! - Script loading from directories or file lists
//! - Read-only verification queries
//! - Connection configuration from flags, environment, and config files

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod target;

// Re-export key types
pub use config::{DatabaseConfig, DatabaseSettings};
pub use db::open_target;
pub use errors::Result;
pub use migrations::{load_dir, load_files, run_migrations, verify};
pub use target::{Backend, MigrationTarget, QueryRows};
