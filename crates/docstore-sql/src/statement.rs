//! Append-only statement builder.
//!
//! A [`Statement`] holds exactly one top-level head (select, insert, DDL, …)
//! plus typed clause fragments and named parameters. Nothing is spliced into
//! SQL text until [`Statement::to_sql`] assembles the whole statement once.
//! Setting a second head fails with [`AdapterError::MultipleStatements`].

use std::fmt;

use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::driver::{Connection, Row, SqlValue};
use crate::error::{AdapterError, Result};
use crate::model::IndexType;

/// Alias given to the collection table in reads.
pub const TABLE_ALIAS: &str = "table_main";

/// Keeps `[A-Za-z0-9_]` and drops everything else.
///
/// Every identifier interpolated into SQL goes through here first.
pub fn sanitize(identifier: &str) -> Result<String> {
    let filtered: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if filtered.is_empty() {
        return Err(AdapterError::Validation(format!("invalid identifier: '{identifier}'")));
    }
    Ok(filtered)
}

/// Sanitized, backtick-quoted identifier. Both supported engines accept
/// backticks.
pub fn quote_identifier(identifier: &str) -> Result<String> {
    Ok(format!("`{}`", sanitize(identifier)?))
}

/// `table_main.`column``.
pub fn qualified(column: &str) -> Result<String> {
    Ok(format!("{TABLE_ALIAS}.{}", quote_identifier(column)?))
}

/// `namespace`.`table`, both parts sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    namespace: String,
    name: String,
}

impl TableRef {
    pub fn new(namespace: &str, name: &str) -> Result<Self> {
        Ok(Self { namespace: sanitize(namespace)?, name: sanitize(name)? })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`.`{}`", self.namespace, self.name)
    }
}

/// A boolean SQL expression with the parameters it binds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<(String, SqlValue)>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    pub fn always_true() -> Self {
        Self::new("1=1")
    }

    pub fn always_false() -> Self {
        Self::new("1=0")
    }

    pub fn with_param(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.params.push((name.into(), value));
        self
    }

    /// Joins fragments with `separator`, concatenating their parameters.
    pub fn join(parts: Vec<Fragment>, separator: &str) -> Fragment {
        let mut sql = Vec::with_capacity(parts.len());
        let mut params = Vec::new();
        for part in parts {
            sql.push(part.sql);
            params.extend(part.params);
        }
        Fragment { sql: sql.join(separator), params }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateFn {
    Count,
    Sum(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Head {
    CreateNamespace { name: String, location: String },
    DropNamespace { name: String },
    NamespaceLookup { name: String },
    CreateTable { table: TableRef, definitions: Vec<String> },
    DropTable { table: TableRef },
    AlterTable { table: TableRef },
    CreateIndex { table: TableRef, name: String, kind: IndexType, columns: Vec<String> },
    DropIndex { table: TableRef, name: String },
    Select { table: TableRef },
    Aggregate { table: TableRef, function: AggregateFn },
    Insert { table: TableRef },
    Update { table: TableRef },
    Delete { table: TableRef },
}

#[derive(Debug, Clone, PartialEq)]
enum Alteration {
    AddColumn { column: String, definition: String },
    DropColumn { column: String },
}

/// Result of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub affected: usize,
    pub rows: Vec<Row>,
}

/// Builder for one top-level SQL statement.
pub struct Statement<'d> {
    dialect: &'d dyn Dialect,
    head: Option<Head>,
    values: Vec<String>,
    conditions: Vec<String>,
    alterations: Vec<Alteration>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    params: Vec<(String, SqlValue)>,
}

impl<'d> Statement<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            head: None,
            values: Vec::new(),
            conditions: Vec::new(),
            alterations: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            params: Vec::new(),
        }
    }

    fn head(&mut self, head: Head) -> Result<&mut Self> {
        if self.head.is_some() {
            return Err(AdapterError::MultipleStatements);
        }
        self.head = Some(head);
        Ok(self)
    }

    // ── Heads ──────────────────────────────────────────────

    pub fn create_namespace(&mut self, name: &str, location: &str) -> Result<&mut Self> {
        let name = sanitize(name)?;
        self.head(Head::CreateNamespace { name, location: location.to_string() })
    }

    pub fn drop_namespace(&mut self, name: &str) -> Result<&mut Self> {
        let name = sanitize(name)?;
        self.head(Head::DropNamespace { name })
    }

    pub fn namespace_lookup(&mut self, name: &str) -> Result<&mut Self> {
        let name = sanitize(name)?;
        self.head(Head::NamespaceLookup { name })
    }

    pub fn create_table(&mut self, table: TableRef, definitions: Vec<String>) -> Result<&mut Self> {
        self.head(Head::CreateTable { table, definitions })
    }

    pub fn drop_table(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::DropTable { table })
    }

    pub fn alter_table(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::AlterTable { table })
    }

    /// `columns` are already rendered index columns (name, length, order).
    pub fn create_index(
        &mut self,
        table: TableRef,
        name: &str,
        kind: IndexType,
        columns: Vec<String>,
    ) -> Result<&mut Self> {
        let name = sanitize(name)?;
        self.head(Head::CreateIndex { table, name, kind, columns })
    }

    pub fn drop_index(&mut self, table: TableRef, name: &str) -> Result<&mut Self> {
        let name = sanitize(name)?;
        self.head(Head::DropIndex { table, name })
    }

    /// `SELECT table_main.* FROM …`.
    pub fn select(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::Select { table })
    }

    pub fn aggregate(&mut self, table: TableRef, function: AggregateFn) -> Result<&mut Self> {
        self.head(Head::Aggregate { table, function })
    }

    pub fn insert_into(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::Insert { table })
    }

    pub fn update(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::Update { table })
    }

    pub fn delete_from(&mut self, table: TableRef) -> Result<&mut Self> {
        self.head(Head::Delete { table })
    }

    // ── Clauses ────────────────────────────────────────────

    /// Column assignment for inserts and updates.
    pub fn set(&mut self, column: &str, value: SqlValue) -> Result<&mut Self> {
        let placeholder = format!(":value_{}", self.values.len());
        self.values.push(quote_identifier(column)?);
        self.params.push((placeholder, value));
        Ok(self)
    }

    /// Adds a condition; conditions are AND-combined.
    pub fn filter(&mut self, fragment: Fragment) -> &mut Self {
        self.conditions.push(fragment.sql);
        self.params.extend(fragment.params);
        self
    }

    pub fn add_column(&mut self, column: &str, definition: &str) -> Result<&mut Self> {
        let column = sanitize(column)?;
        self.alterations.push(Alteration::AddColumn { column, definition: definition.to_string() });
        Ok(self)
    }

    pub fn drop_column(&mut self, column: &str) -> Result<&mut Self> {
        let column = sanitize(column)?;
        self.alterations.push(Alteration::DropColumn { column });
        Ok(self)
    }

    /// Appends a rendered `expr ASC|DESC` sort key.
    pub fn order_by(&mut self, key: String) -> &mut Self {
        self.order.push(key);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn params(&self) -> &[(String, SqlValue)] {
        &self.params
    }

    // ── Assembly ───────────────────────────────────────────

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn order_clause(&self) -> String {
        if self.order.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", self.order.join(", "))
        }
    }

    fn limit_clause(&self) -> String {
        let mut clause = String::new();
        if self.limit.is_some() {
            clause.push_str(" LIMIT :limit");
        }
        if self.offset.is_some() {
            clause.push_str(" OFFSET :offset");
        }
        clause
    }

    /// Renders the statement text.
    pub fn to_sql(&self) -> Result<String> {
        let head = self
            .head
            .as_ref()
            .ok_or_else(|| AdapterError::Validation("statement has no head".into()))?;

        let sql = match head {
            Head::CreateNamespace { name, .. } => self.dialect.create_namespace(name),
            Head::DropNamespace { name } => self.dialect.drop_namespace(name),
            Head::NamespaceLookup { .. } => self.dialect.namespace_lookup(),
            Head::CreateTable { table, definitions } => {
                let options = self.dialect.table_options();
                let mut sql = format!(
                    "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n)",
                    definitions.join(",\n    ")
                );
                if !options.is_empty() {
                    sql.push(' ');
                    sql.push_str(options);
                }
                sql
            }
            Head::DropTable { table } => format!("DROP TABLE {table}"),
            Head::AlterTable { table } => {
                if self.alterations.is_empty() {
                    return Err(AdapterError::Validation("ALTER TABLE without alterations".into()));
                }
                let alterations: Vec<String> = self
                    .alterations
                    .iter()
                    .map(|a| match a {
                        Alteration::AddColumn { column, definition } => {
                            format!("ADD COLUMN `{column}` {definition}")
                        }
                        Alteration::DropColumn { column } => format!("DROP COLUMN `{column}`"),
                    })
                    .collect();
                format!("ALTER TABLE {table} {}", alterations.join(", "))
            }
            Head::CreateIndex { table, name, kind, columns } => {
                self.dialect.create_index(table, name, *kind, columns)?
            }
            Head::DropIndex { table, name } => self.dialect.drop_index(table, name),
            Head::Select { table } => format!(
                "SELECT {TABLE_ALIAS}.* FROM {table} {TABLE_ALIAS}{}{}{}",
                self.where_clause(),
                self.order_clause(),
                self.limit_clause()
            ),
            Head::Aggregate { table, function } => {
                let (outer, inner) = match function {
                    AggregateFn::Count => ("COUNT(1)".to_string(), "1".to_string()),
                    AggregateFn::Sum(column) => {
                        let column = quote_identifier(column)?;
                        (format!("SUM({column})"), format!("{TABLE_ALIAS}.{column}"))
                    }
                };
                format!(
                    "SELECT {outer} AS total FROM (SELECT {inner} FROM {table} {TABLE_ALIAS}{}{}) table_count",
                    self.where_clause(),
                    self.limit_clause()
                )
            }
            Head::Insert { table } => {
                let placeholders: Vec<String> =
                    (0..self.values.len()).map(|i| format!(":value_{i}")).collect();
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    self.values.join(", "),
                    placeholders.join(", ")
                )
            }
            Head::Update { table } => {
                if self.values.is_empty() {
                    return Err(AdapterError::Validation("UPDATE without assignments".into()));
                }
                let assignments: Vec<String> = self
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, column)| format!("{column} = :value_{i}"))
                    .collect();
                format!("UPDATE {table} SET {}{}", assignments.join(", "), self.where_clause())
            }
            Head::Delete { table } => format!("DELETE FROM {table}{}", self.where_clause()),
        };

        Ok(sql)
    }

    fn bound_params(&self) -> Result<Vec<(String, SqlValue)>> {
        let mut params = self.params.clone();
        match &self.head {
            Some(Head::CreateNamespace { location, .. }) if self.dialect.binds_namespace_location() => {
                params.push((":location".to_string(), SqlValue::Text(location.clone())));
            }
            Some(Head::NamespaceLookup { name }) => {
                params.push((":name".to_string(), SqlValue::Text(name.clone())));
            }
            _ => {}
        }
        if let Some(limit) = self.limit {
            params.push((":limit".to_string(), SqlValue::Integer(row_count("limit", limit)?)));
        }
        if let Some(offset) = self.offset {
            params.push((":offset".to_string(), SqlValue::Integer(row_count("offset", offset)?)));
        }
        Ok(params)
    }

    fn returns_rows(&self) -> bool {
        matches!(
            self.head,
            Some(Head::Select { .. } | Head::Aggregate { .. } | Head::NamespaceLookup { .. })
        )
    }

    fn transactional(&self) -> bool {
        match self.head {
            Some(Head::CreateNamespace { .. } | Head::DropNamespace { .. }) => {
                self.dialect.namespace_ddl_in_transaction()
            }
            _ => true,
        }
    }

    /// Runs the statement inside its own transaction.
    ///
    /// Any failure rolls the transaction back; unique-key violations come
    /// back as [`AdapterError::Duplicate`], everything else as
    /// [`AdapterError::Execution`].
    pub fn execute<C: Connection + ?Sized>(&self, conn: &mut C) -> Result<Outcome> {
        let sql = self.to_sql()?;
        let params = self.bound_params()?;
        let transactional = self.transactional();
        debug!(sql = %sql, params = params.len(), "executing statement");

        if transactional {
            conn.begin()?;
        }

        let result = if self.returns_rows() {
            conn.query(&sql, &params).map(|rows| Outcome { affected: 0, rows })
        } else {
            conn.execute(&sql, &params).map(|affected| Outcome { affected, rows: Vec::new() })
        };

        let result = match result {
            Ok(outcome) if transactional => conn.commit().map(|_| outcome),
            other => other,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if transactional {
                    warn!(error = %e, "statement failed, rolling back");
                    if let Err(rollback) = conn.rollback() {
                        warn!(error = %rollback, "rollback failed");
                    }
                }
                Err(e.into())
            }
        }
    }
}

/// Engines bind row counts as signed 64-bit; larger values would wrap
/// negative and SQLite reads a negative LIMIT as unbounded.
fn row_count(clause: &str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| AdapterError::Validation(format!("{clause} {value} is out of range")))
}
