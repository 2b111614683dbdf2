//! # Query Executor
//!
//! [`QueryStore`] is the seam between the lookup layer and the backing
//! store. [`SqliteStore`] opens a read-only connection per call, binds every
//! value positionally, materializes the whole result and closes the
//! connection before returning, so no connection outlives a call.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::config::DbConfig;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use sheetlink_error::{ErrorContext, Result, SheetlinkError};
use tracing::debug;

use crate::value::{ResultSet, SqlValue};

/// SQLite VM instructions between deadline checks.
const PROGRESS_CHECK_OPS: i32 = 1_000;

/// Read-only access to a single-table store.
///
/// Implementations must be callable from many threads at once; each call is
/// independent and shares no connection with any other.
pub trait QueryStore: Send + Sync {
    /// Run `sql` with `params` bound positionally (`?1`, `?2`, ...).
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet>;

    /// Declared column names of `table`; empty if the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Cheap check that the store exists at all.
    fn is_reachable(&self) -> bool;

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    query_timeout: Duration,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, query_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            query_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| self.store_error(e))?;

        conn.busy_timeout(self.query_timeout)
            .map_err(|e| self.store_error(e))?;

        // An unknown "column" must be an error, never a string literal.
        for flag in [DbConfig::SQLITE_DBCONFIG_DQS_DML, DbConfig::SQLITE_DBCONFIG_DQS_DDL] {
            conn.set_db_config(flag, false)
                .map_err(|e| self.store_error(e))?;
        }

        // Statements still running at the deadline are interrupted and
        // surface as SQLITE_INTERRUPT.
        let deadline = Instant::now() + self.query_timeout;
        conn.progress_handler(PROGRESS_CHECK_OPS, Some(move || Instant::now() >= deadline));

        Ok(conn)
    }

    fn store_error(&self, err: rusqlite::Error) -> SheetlinkError {
        SheetlinkError::from(err).with_context(ErrorContext::Store {
            path: Some(self.path.display().to_string()),
            table: None,
        })
    }
}

impl QueryStore for SqliteStore {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        let started = Instant::now();
        let conn = self.connect()?;

        let mut stmt = conn.prepare(sql).map_err(|e| self.store_error(e))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| self.store_error(e))?;

        let mut materialized = Vec::new();
        while let Some(row) = rows.next().map_err(|e| self.store_error(e))? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row.get_ref(idx).map_err(|e| self.store_error(e))?;
                values.push(SqlValue::from_value_ref(value));
            }
            materialized.push(values);
        }

        debug!(
            target: "store",
            rows = materialized.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Query executed"
        );

        Ok(ResultSet::new(columns, materialized))
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(|e| self.store_error(e))?;

        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| self.store_error(e))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| self.store_error(e))?;

        Ok(names)
    }

    fn is_reachable(&self) -> bool {
        self.path.exists()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
