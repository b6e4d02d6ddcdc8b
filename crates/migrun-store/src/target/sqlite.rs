//! SQLite target
//!
//! Used for local runs and as the backend of the test-suite. DDL is
//! transactional in SQLite, so a failed script leaves no partial schema.

use crate::errors::{bookkeeping_error, connection_error, query_error, sql_execution_error, Result};
use crate::target::{reject_transaction_control, Backend, MigrationTarget, QueryRows, NULL_TEXT};
use chrono::{DateTime, SubsecRound, Utc};
use migrun_core::{AppliedMigrationRecord, MigrationScript, MigrunError};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS migrations_applied (
    name TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL,
    checksum TEXT
)";

/// A target backed by one SQLite connection
pub struct SqliteTarget {
    conn: Connection,
}

impl SqliteTarget {
    /// Open (creating if needed) the database file at `path`
    ///
    /// # Errors
    ///
    /// `Connection` if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let conn = Connection::open(path).map_err(|e| connection_error(&label, e))?;
        Self::configure(conn, &label)
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// `Connection` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| connection_error(":memory:", e))?;
        Self::configure(conn, ":memory:")
    }

    /// Wrap an already-open connection
    ///
    /// # Errors
    ///
    /// `Connection` if the connection cannot be configured.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        Self::configure(conn, "sqlite")
    }

    /// The underlying connection, for inspection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn configure(conn: Connection, label: &str) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| connection_error(label, e))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| connection_error(label, e))?;
        // Reading the header forces the file open now rather than on first use
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| connection_error(label, e))?;
        Ok(Self { conn })
    }
}

impl MigrationTarget for SqliteTarget {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn has_bookkeeping(&mut self) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                ["migrations_applied"],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| bookkeeping_error("has_bookkeeping", e))
    }

    fn ensure_bookkeeping(&mut self) -> Result<()> {
        self.conn
            .execute(CREATE_BOOKKEEPING, [])
            .map_err(|e| bookkeeping_error("ensure_bookkeeping", e))?;

        // Tables created by the first schema revision have no checksum column
        let has_checksum: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('migrations_applied') WHERE name = 'checksum'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .map_err(|e| bookkeeping_error("ensure_bookkeeping", e))?;
        if !has_checksum {
            self.conn
                .execute("ALTER TABLE migrations_applied ADD COLUMN checksum TEXT", [])
                .map_err(|e| bookkeeping_error("ensure_bookkeeping", e))?;
        }

        Ok(())
    }

    fn applied_migrations(&mut self) -> Result<Vec<AppliedMigrationRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, applied_at, checksum FROM migrations_applied ORDER BY name")
            .map_err(|e| bookkeeping_error("read_bookkeeping", e))?;
        let records = stmt
            .query_map([], |row| {
                Ok(AppliedMigrationRecord {
                    name: row.get(0)?,
                    applied_at: row.get::<_, DateTime<Utc>>(1)?,
                    checksum: row.get(2)?,
                })
            })
            .map_err(|e| bookkeeping_error("read_bookkeeping", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| bookkeeping_error("read_bookkeeping", e))?;
        Ok(records)
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<AppliedMigrationRecord> {
        let name = script.name();
        reject_transaction_control(script)?;

        // Dropping `tx` on any early return rolls the whole script back
        let tx = self
            .conn
            .transaction()
            .map_err(|e| sql_execution_error(name, e))?;

        tx.execute_batch(script.sql())
            .map_err(|e| sql_execution_error(name, e))?;

        let record = AppliedMigrationRecord {
            name: name.to_string(),
            applied_at: Utc::now().trunc_subsecs(6),
            checksum: Some(script.checksum().to_string()),
        };
        tx.execute(
            "INSERT INTO migrations_applied (name, applied_at, checksum) VALUES (?1, ?2, ?3)",
            params![record.name, record.applied_at, record.checksum],
        )
        .map_err(|e| bookkeeping_error("record_migration", e).with_migration(name))?;

        tx.commit().map_err(|e| sql_execution_error(name, e))?;
        Ok(record)
    }

    fn query_rows(&mut self, sql: &str) -> Result<QueryRows> {
        let mut stmt = self.conn.prepare(sql).map_err(query_error)?;
        if !stmt.readonly() {
            return Err(MigrunError::NotReadOnly.into());
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query([]).map_err(query_error)?;
        let mut rendered = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                cells.push(render_value(row.get_ref(index).map_err(query_error)?));
            }
            rendered.push(cells);
        }

        Ok(QueryRows {
            columns,
            rows: rendered,
        })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => NULL_TEXT.to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("\\x{}", hex::encode(b)),
    }
}
