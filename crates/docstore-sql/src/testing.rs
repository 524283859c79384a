//! Recording [`Connection`] for checking rendered SQL without a server.

use crate::driver::{Connection, DriverError, Params, Row, SqlValue};

#[derive(Debug, Default)]
pub(crate) struct RecordingConnection {
    /// `begin`, `execute`, `query`, `commit`, `rollback` in call order.
    pub events: Vec<&'static str>,
    /// Every executed statement with its bound parameters.
    pub statements: Vec<(String, Vec<(String, SqlValue)>)>,
    /// Rows handed back by every query.
    pub rows: Vec<Row>,
    /// Failure returned by execute and query.
    pub failure: Option<DriverError>,
    next_id: i64,
}

impl RecordingConnection {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self { rows, ..Self::default() }
    }

    pub fn failing(failure: DriverError) -> Self {
        Self { failure: Some(failure), ..Self::default() }
    }

    fn record(&mut self, event: &'static str, sql: &str, params: &Params) -> Result<(), DriverError> {
        self.events.push(event);
        self.statements.push((sql.to_string(), params.to_vec()));
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

impl Connection for RecordingConnection {
    fn begin(&mut self) -> Result<(), DriverError> {
        self.events.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.events.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.events.push("rollback");
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &Params) -> Result<usize, DriverError> {
        self.record("execute", sql, params)?;
        self.next_id += 1;
        Ok(1)
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>, DriverError> {
        self.record("query", sql, params)?;
        Ok(self.rows.clone())
    }

    fn last_insert_id(&self) -> i64 {
        self.next_id
    }
}
