//! PostgreSQL target
//!
//! The runner is synchronous, so this target owns a current-thread tokio
//! runtime and blocks on every sqlx call. Scripts and verification queries
//! go through the simple query protocol, which accepts several statements
//! per script and returns every column in its text form.

use crate::config::{PostgresConfig, PostgresEndpoint};
use crate::errors::{bookkeeping_error, connection_error, from_sqlx, query_error, sql_execution_error, Result};
use crate::target::{reject_transaction_control, Backend, MigrationTarget, QueryRows, NULL_TEXT};
use chrono::{DateTime, SubsecRound, Utc};
use migrun_core::{AppliedMigrationRecord, ExError, ExErrorKind, MigrationScript, MigrunError};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, Postgres};
use sqlx::{Column, Connection, Decode, Executor, Row, Statement, ValueRef};
use std::str::FromStr;
use tokio::runtime::Runtime;

const CREATE_BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS migrations_applied (
    name TEXT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    checksum TEXT
);
ALTER TABLE migrations_applied ADD COLUMN IF NOT EXISTS checksum TEXT;";

/// SQLSTATE raised when a READ ONLY transaction attempts a write
const READ_ONLY_SQL_TRANSACTION: &str = "25006";

/// A target backed by one PostgreSQL connection
pub struct PostgresTarget {
    runtime: Runtime,
    conn: Option<PgConnection>,
    label: String,
}

impl PostgresTarget {
    /// Connect, giving up after the configured timeout
    ///
    /// # Errors
    ///
    /// `Connection` if the server cannot be reached or rejects the
    /// credentials, `Config` if the URL cannot be parsed.
    pub fn connect(config: &PostgresConfig, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let options = connect_options(&config.endpoint)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("connect")
                    .with_message(format!("Cannot start runtime: {}", e))
            })?;

        let timeout = config.connect_timeout;
        let conn = runtime
            .block_on(async {
                tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await
            })
            .map_err(|_| {
                connection_error(&label, format!("timed out after {}s", timeout.as_secs()))
            })?
            .map_err(|e| connection_error(&label, e))?;

        Ok(Self {
            runtime,
            conn: Some(conn),
            label,
        })
    }

    fn parts(&mut self) -> Result<(&Runtime, &mut PgConnection)> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| connection_error(&self.label, "connection already closed"))?;
        Ok((&self.runtime, conn))
    }
}

impl Drop for PostgresTarget {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.close()) {
                tracing::debug!(db = %self.label, error = %e, "connection close failed");
            }
        }
    }
}

impl MigrationTarget for PostgresTarget {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn has_bookkeeping(&mut self) -> Result<bool> {
        let (runtime, conn) = self.parts()?;
        runtime
            .block_on(async move {
                sqlx::query_scalar::<_, bool>(
                    "SELECT to_regclass('migrations_applied') IS NOT NULL",
                )
                .fetch_one(&mut *conn)
                .await
            })
            .map_err(|e| from_sqlx(e, bookkeeping_error("has_bookkeeping", "")))
    }

    fn ensure_bookkeeping(&mut self) -> Result<()> {
        let (runtime, conn) = self.parts()?;
        runtime
            .block_on(async move { sqlx::raw_sql(CREATE_BOOKKEEPING).execute(&mut *conn).await })
            .map(|_| ())
            .map_err(|e| from_sqlx(e, bookkeeping_error("ensure_bookkeeping", "")))
    }

    fn applied_migrations(&mut self) -> Result<Vec<AppliedMigrationRecord>> {
        let (runtime, conn) = self.parts()?;
        let rows = runtime
            .block_on(async move {
                sqlx::query_as::<_, (String, DateTime<Utc>, Option<String>)>(
                    "SELECT name, applied_at::timestamptz, checksum FROM migrations_applied ORDER BY name",
                )
                .fetch_all(&mut *conn)
                .await
            })
            .map_err(|e| from_sqlx(e, bookkeeping_error("read_bookkeeping", "")))?;

        Ok(rows
            .into_iter()
            .map(|(name, applied_at, checksum)| AppliedMigrationRecord {
                name,
                applied_at,
                checksum,
            })
            .collect())
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<AppliedMigrationRecord> {
        let name = script.name();
        reject_transaction_control(script)?;
        let record = AppliedMigrationRecord {
            name: name.to_string(),
            applied_at: Utc::now().trunc_subsecs(6),
            checksum: Some(script.checksum().to_string()),
        };

        let (runtime, conn) = self.parts()?;
        runtime.block_on(async move {
            let mut tx = conn
                .begin()
                .await
                .map_err(|e| from_sqlx(e, sql_execution_error(name, "")))?;

            if let Err(e) = sqlx::raw_sql(script.sql()).execute(&mut *tx).await {
                tx.rollback().await.ok();
                return Err(from_sqlx(e, sql_execution_error(name, "")));
            }

            let inserted = sqlx::query(
                "INSERT INTO migrations_applied (name, applied_at, checksum) VALUES ($1, $2, $3)",
            )
            .bind(&record.name)
            .bind(record.applied_at)
            .bind(&record.checksum)
            .execute(&mut *tx)
            .await;
            if let Err(e) = inserted {
                tx.rollback().await.ok();
                return Err(from_sqlx(
                    e,
                    bookkeeping_error("record_migration", "").with_migration(name),
                ));
            }

            tx.commit()
                .await
                .map_err(|e| from_sqlx(e, sql_execution_error(name, "")))?;
            Ok(record)
        })
    }

    fn query_rows(&mut self, sql: &str) -> Result<QueryRows> {
        let (runtime, conn) = self.parts()?;
        let fetched = runtime.block_on(async move {
            let mut tx = conn.begin().await?;
            sqlx::raw_sql("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await?;
            // Describing first yields the column names even when no row comes back
            let fetched = async {
                let statement = (&mut *tx).prepare(sql).await?;
                let columns: Vec<String> = statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                let rows = sqlx::raw_sql(sql).fetch_all(&mut *tx).await?;
                Ok::<_, sqlx::Error>((columns, rows))
            }
            .await;
            tx.rollback().await.ok();
            fetched
        });

        let (columns, rows) = fetched.map_err(|e| {
            let read_only = matches!(
                &e,
                sqlx::Error::Database(db) if db.code().as_deref() == Some(READ_ONLY_SQL_TRANSACTION)
            );
            if read_only {
                ExError::from(MigrunError::NotReadOnly)
            } else {
                from_sqlx(e, query_error(""))
            }
        })?;

        let mut rendered = Vec::with_capacity(rows.len());
        for row in &rows {
            rendered.push(render_row(row, columns.len())?);
        }
        Ok(QueryRows {
            columns,
            rows: rendered,
        })
    }
}

fn connect_options(endpoint: &PostgresEndpoint) -> Result<PgConnectOptions> {
    let options = match endpoint {
        PostgresEndpoint::Url(url) => PgConnectOptions::from_str(url.expose()).map_err(|e| {
            ExError::from(MigrunError::InvalidUrl {
                reason: e.to_string(),
            })
        })?,
        PostgresEndpoint::Params {
            host,
            port,
            user,
            password,
            database,
        } => {
            let options = PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .database(database);
            match password {
                Some(password) => options.password(password.expose()),
                None => options,
            }
        }
    };
    Ok(options.application_name("migrun"))
}

/// Text form of every cell; the simple query protocol never sends binary values
fn render_row(row: &PgRow, width: usize) -> Result<Vec<String>> {
    (0..width)
        .map(|index| {
            let value = row.try_get_raw(index).map_err(query_error)?;
            if value.is_null() {
                return Ok(NULL_TEXT.to_string());
            }
            <&str as Decode<Postgres>>::decode(value)
                .map(str::to_string)
                .map_err(query_error)
        })
        .collect()
}
