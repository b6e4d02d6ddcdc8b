//! Migration scripts
//!
//! A script is a stable name plus the literal SQL text applied as one
//! transaction. Scripts are immutable once built.

use crate::errors::{MigrunError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// One named SQL migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    name: String,
    sql: String,
    checksum: String,
}

impl MigrationScript {
    /// Build a script from a name and its SQL text
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the trimmed name is empty.
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(MigrunError::EmptyName.into());
        }
        let sql = sql.into();
        let checksum = compute_checksum(&sql);
        Ok(Self {
            name,
            sql,
            checksum,
        })
    }

    /// Build a script from compiled-in text, e.g. `include_str!` output
    ///
    /// # Errors
    ///
    /// Same as [`MigrationScript::new`].
    pub fn embedded(name: &'static str, sql: &'static str) -> Result<Self> {
        Self::new(name, sql)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SHA-256 of the SQL text, lowercase hex
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// Reject script lists that would make bookkeeping ambiguous
///
/// # Errors
///
/// Returns `DuplicateMigration` naming the first repeated name.
pub fn validate_script_list(scripts: &[MigrationScript]) -> Result<()> {
    let mut seen = HashSet::with_capacity(scripts.len());
    for script in scripts {
        if !seen.insert(script.name()) {
            return Err(MigrunError::DuplicateName {
                name: script.name().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
