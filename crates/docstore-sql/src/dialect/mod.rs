//! Engine dialects.
//!
//! Everything that differs between the supported engines lives behind
//! [`Dialect`]: column definitions for the reserved columns, index DDL,
//! namespace DDL, the full-text predicates and the capability table. The
//! rest of the adapter renders SQL only through these hooks.

mod mariadb;
mod sqlite;

pub use mariadb::{MariaDb, MARIADB_LIMITS};
pub use sqlite::{Sqlite, SQLITE_LIMITS};

use crate::error::{AdapterError, Result};
use crate::model::{IndexType, OrderType};
use crate::statement::{Fragment, TableRef};
use crate::types::Limits;

/// SQL dialect of one backing engine.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn limits(&self) -> &'static Limits;

    /// Quotes `value` as a string literal, escaping it the way the engine's
    /// client library would.
    fn quote(&self, value: &str) -> String;

    /// Column definition of `_id`.
    fn internal_id_definition(&self) -> &'static str;

    /// Table constraint declaring the primary key, when `_id` does not
    /// already declare it.
    fn primary_key_clause(&self) -> Option<&'static str>;

    /// Trailing `CREATE TABLE` options.
    fn table_options(&self) -> &'static str;

    /// Whether indexes can be declared inside `CREATE TABLE`.
    fn inline_indexes(&self) -> bool;

    /// Index kind used for `_index2` over `_read`.
    fn permission_index_type(&self) -> IndexType;

    /// Physical index name for index `id` of `table`.
    fn index_name(&self, _table: &str, id: &str) -> String {
        id.to_string()
    }

    /// One column of an index definition.
    fn index_column(
        &self,
        kind: IndexType,
        column: &str,
        length: Option<u32>,
        order: Option<OrderType>,
    ) -> String;

    fn create_index(
        &self,
        table: &TableRef,
        name: &str,
        kind: IndexType,
        columns: &[String],
    ) -> Result<String>;

    fn drop_index(&self, table: &TableRef, name: &str) -> String;

    /// Index clause for use inside `CREATE TABLE`.
    fn inline_index(&self, kind: IndexType, name: &str, columns: &[String]) -> Result<String> {
        Ok(format!("{} `{name}` ({})", self.index_keyword(kind)?, columns.join(", ")))
    }

    /// `INDEX`, `UNIQUE INDEX` or `FULLTEXT INDEX`; fails for kinds the
    /// engine cannot build.
    fn index_keyword(&self, kind: IndexType) -> Result<&'static str> {
        let limits = self.limits();
        let (supported, keyword) = match kind {
            IndexType::Key | IndexType::Array => (limits.supports_index, "INDEX"),
            IndexType::Unique => (limits.supports_unique_index, "UNIQUE INDEX"),
            IndexType::Fulltext => (limits.supports_fulltext_index, "FULLTEXT INDEX"),
        };
        if !supported {
            return Err(AdapterError::Validation(format!(
                "{} does not support {kind:?} indexes",
                self.name()
            )));
        }
        Ok(keyword)
    }

    /// Condition for the `search` operator on `column`.
    fn search_condition(&self, column: &str, value: &str) -> Result<String>;

    /// Condition matching rows readable by any of `roles`. `roles` is
    /// non-empty and already validated.
    fn permission_condition(&self, column: &str, roles: &[String]) -> Result<Fragment>;

    fn create_namespace(&self, name: &str) -> String;

    fn drop_namespace(&self, name: &str) -> String;

    /// Query returning one row when the namespace bound to `:name` exists.
    fn namespace_lookup(&self) -> String;

    /// Whether `create_namespace` binds the storage location as `:location`.
    fn binds_namespace_location(&self) -> bool {
        false
    }

    /// Whether namespace DDL may run inside a transaction.
    fn namespace_ddl_in_transaction(&self) -> bool {
        true
    }
}

/// Wraps `value` in single quotes for a MySQL string literal.
///
/// Quotes are doubled rather than backslash-escaped, so the literal ends in
/// the same place whether or not the session runs with
/// `NO_BACKSLASH_ESCAPES`. Backslashes and NUL are still escaped for the
/// default mode; under `NO_BACKSLASH_ESCAPES` they reach the server doubled,
/// which changes the value but never the statement.
pub fn mysql_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
