//! Migration framework
//!
//! Provides:
//! - Script loading from a directory or an ordered file list
//! - The runner: bookkeeping, idempotent application, failure policy
//! - Read-only verification queries run after a clean migration

mod runner;
mod source;
mod verify;

pub use runner::run_migrations;
pub use source::{load_dir, load_files};
pub use verify::verify;
