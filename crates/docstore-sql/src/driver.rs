//! Driver seam between the statement builder and a concrete SQL engine.
//!
//! [`Connection`] is the only thing the adapter needs from a driver:
//! explicit transaction control, named-parameter execution, row fetching,
//! and the id assigned to the last insert. [`SqliteConnection`] implements it
//! on top of `rusqlite`; other engines plug in by implementing the trait.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{Value, ValueRef};
use rusqlite::ErrorCode;
use thiserror::Error;
use tracing::debug;

/// A bound parameter or fetched column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            SqlValue::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(n) => Some(*n as f64),
            SqlValue::Real(f) => Some(*f),
            SqlValue::Text(s) => s.parse().ok(),
            SqlValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

/// One fetched row: column names in select order with their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(c, _)| c == name).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn into_columns(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

/// Named parameters as `(":name", value)` pairs.
pub type Params = [(String, SqlValue)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// A unique or primary key constraint rejected the write.
    UniqueViolation,
    Other,
}

/// Failure reported by a driver, already classified.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self { kind: DriverErrorKind::UniqueViolation, message: message.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self { kind: DriverErrorKind::Other, message: message.into() }
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == ErrorCode::ConstraintViolation
                    && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                DriverError::unique_violation(e.to_string())
            }
            _ => DriverError::other(e.to_string()),
        }
    }
}

/// A single, blocking connection to the backing engine.
pub trait Connection {
    fn begin(&mut self) -> Result<(), DriverError>;
    fn commit(&mut self) -> Result<(), DriverError>;
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Run a statement that returns no rows; yields the affected row count.
    fn execute(&mut self, sql: &str, params: &Params) -> Result<usize, DriverError>;

    /// Run a statement and collect every row it returns.
    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>, DriverError>;

    /// Internal id assigned by the most recent successful insert.
    fn last_insert_id(&self) -> i64;
}

/// [`Connection`] backed by an embedded SQLite database.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens (or creates) a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!(path = %path.display(), "opened sqlite connection");
        Ok(Self { conn })
    }

    /// Opens an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, DriverError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        debug!("opened in-memory sqlite connection");
        Ok(Self { conn })
    }

    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), DriverError> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// The underlying rusqlite handle, for inspection outside the adapter.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn prepare_bound<'c>(
        conn: &'c rusqlite::Connection,
        sql: &str,
        params: &Params,
    ) -> Result<rusqlite::Statement<'c>, DriverError> {
        let mut stmt = conn.prepare(sql)?;
        for (name, value) in params {
            let index = stmt
                .parameter_index(name)?
                .ok_or_else(|| DriverError::other(format!("unknown parameter {name}")))?;
            stmt.raw_bind_parameter(index, to_sqlite(value))?;
        }
        Ok(stmt)
    }
}

impl Connection for SqliteConnection {
    fn begin(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &Params) -> Result<usize, DriverError> {
        let mut stmt = Self::prepare_bound(&self.conn, sql, params)?;
        Ok(stmt.raw_execute()?)
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>, DriverError> {
        let mut stmt = Self::prepare_bound(&self.conn, sql, params)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let mut rows = stmt.raw_query();
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                columns.push((name.clone(), from_sqlite(row.get_ref(i)?)));
            }
            result.push(Row::new(columns));
        }
        Ok(result)
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::Integer(*n),
        SqlValue::Real(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Integer(n),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Text(String::from_utf8_lossy(b).into_owned()),
    }
}
