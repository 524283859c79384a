use crate::dialect::Dialect;
use crate::driver::SqlValue;
use crate::error::{AdapterError, Result};
use crate::model::{IndexType, OrderType};
use crate::statement::{Fragment, TableRef};
use crate::types::Limits;

pub const SQLITE_LIMITS: Limits = Limits {
    max_string_length: 1_000_000_000,
    max_int_value: i64::MAX as u64,
    max_attributes: 2000,
    max_indexes: 64,
    max_row_width: 0,
    supports_index: true,
    supports_unique_index: true,
    supports_fulltext_index: false,
};

/// Embedded SQLite. Namespaces are attached database files.
///
/// There is no full-text engine here: `_read` is matched with `json_each`
/// and the search operator is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn limits(&self) -> &'static Limits {
        &SQLITE_LIMITS
    }

    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn internal_id_definition(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn primary_key_clause(&self) -> Option<&'static str> {
        None
    }

    fn table_options(&self) -> &'static str {
        ""
    }

    fn inline_indexes(&self) -> bool {
        false
    }

    fn permission_index_type(&self) -> IndexType {
        IndexType::Key
    }

    // Index names share one namespace per schema.
    fn index_name(&self, table: &str, id: &str) -> String {
        format!("{table}_{id}")
    }

    fn index_column(
        &self,
        _kind: IndexType,
        column: &str,
        _length: Option<u32>,
        order: Option<OrderType>,
    ) -> String {
        match order {
            Some(order) => format!("`{column}` {order}"),
            None => format!("`{column}`"),
        }
    }

    fn create_index(
        &self,
        table: &TableRef,
        name: &str,
        kind: IndexType,
        columns: &[String],
    ) -> Result<String> {
        Ok(format!(
            "CREATE {} `{}`.`{name}` ON `{}` ({})",
            self.index_keyword(kind)?,
            table.namespace(),
            table.name(),
            columns.join(", ")
        ))
    }

    fn drop_index(&self, table: &TableRef, name: &str) -> String {
        format!("DROP INDEX `{}`.`{name}`", table.namespace())
    }

    fn search_condition(&self, column: &str, _value: &str) -> Result<String> {
        Err(AdapterError::Validation(format!(
            "sqlite has no full-text support, cannot search {column}"
        )))
    }

    fn permission_condition(&self, column: &str, roles: &[String]) -> Result<Fragment> {
        let mut fragment = Fragment::default();
        let mut placeholders = Vec::with_capacity(roles.len());
        for (i, role) in roles.iter().enumerate() {
            let placeholder = format!(":role_{i}");
            fragment.params.push((placeholder.clone(), SqlValue::Text(role.clone())));
            placeholders.push(placeholder);
        }
        fragment.sql = format!(
            "EXISTS (SELECT 1 FROM json_each({column}) WHERE json_each.value IN ({}))",
            placeholders.join(", ")
        );
        Ok(fragment)
    }

    fn create_namespace(&self, name: &str) -> String {
        format!("ATTACH DATABASE :location AS `{name}`")
    }

    fn drop_namespace(&self, name: &str) -> String {
        format!("DETACH DATABASE `{name}`")
    }

    fn namespace_lookup(&self) -> String {
        "SELECT name FROM pragma_database_list WHERE name = :name".to_string()
    }

    fn binds_namespace_location(&self) -> bool {
        true
    }

    // ATTACH and DETACH fail inside a transaction.
    fn namespace_ddl_in_transaction(&self) -> bool {
        false
    }
}
