//! Bookkeeping rows

use chrono::{DateTime, Utc};

/// A row of the bookkeeping table: one migration that has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigrationRecord {
    pub name: String,
    pub applied_at: DateTime<Utc>,
    /// Absent for rows written before checksums were recorded
    pub checksum: Option<String>,
}

impl AppliedMigrationRecord {
    /// True when a checksum was recorded and differs from `current`
    pub fn checksum_differs(&self, current: &str) -> bool {
        self.checksum.as_deref().is_some_and(|stored| stored != current)
    }
}
