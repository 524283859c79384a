use crate::dialect::{mysql_quote, Dialect};
use crate::error::Result;
use crate::model::{IndexType, OrderType};
use crate::permission;
use crate::statement::{Fragment, TableRef};
use crate::types::Limits;

/// InnoDB capability table.
pub const MARIADB_LIMITS: Limits = Limits {
    max_string_length: 4_294_967_295,
    max_int_value: 4_294_967_295,
    max_attributes: 1017,
    max_indexes: 64,
    max_row_width: 65_535,
    supports_index: true,
    supports_unique_index: true,
    supports_fulltext_index: true,
};

/// MariaDB / MySQL with InnoDB tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDb;

impl Dialect for MariaDb {
    fn name(&self) -> &'static str {
        "mariadb"
    }

    fn limits(&self) -> &'static Limits {
        &MARIADB_LIMITS
    }

    fn quote(&self, value: &str) -> String {
        mysql_quote(value)
    }

    fn internal_id_definition(&self) -> &'static str {
        "int(11) unsigned NOT NULL AUTO_INCREMENT"
    }

    fn primary_key_clause(&self) -> Option<&'static str> {
        Some("PRIMARY KEY (`_id`)")
    }

    fn table_options(&self) -> &'static str {
        "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    }

    fn inline_indexes(&self) -> bool {
        true
    }

    fn permission_index_type(&self) -> IndexType {
        IndexType::Fulltext
    }

    fn index_column(
        &self,
        kind: IndexType,
        column: &str,
        length: Option<u32>,
        order: Option<OrderType>,
    ) -> String {
        let mut rendered = format!("`{column}`");
        if let Some(length) = length.filter(|l| *l > 0) {
            rendered.push_str(&format!("({length})"));
        }
        // Full-text keys take no direction.
        if let (Some(order), false) = (order, kind == IndexType::Fulltext) {
            rendered.push(' ');
            rendered.push_str(order.as_sql());
        }
        rendered
    }

    fn create_index(
        &self,
        table: &TableRef,
        name: &str,
        kind: IndexType,
        columns: &[String],
    ) -> Result<String> {
        Ok(format!(
            "CREATE {} `{name}` ON {table} ({})",
            self.index_keyword(kind)?,
            columns.join(", ")
        ))
    }

    fn drop_index(&self, table: &TableRef, name: &str) -> String {
        format!("ALTER TABLE {table} DROP INDEX `{name}`")
    }

    fn search_condition(&self, column: &str, value: &str) -> Result<String> {
        Ok(format!("MATCH({column}) AGAINST({})", self.quote(value)))
    }

    fn permission_condition(&self, column: &str, roles: &[String]) -> Result<Fragment> {
        // Each role becomes a quoted phrase; without `+`/`-` operators boolean
        // mode matches rows containing any of them.
        let terms = self.quote(&permission::boolean_mode_terms(roles)).replace('+', "\"");
        Ok(Fragment::new(format!("MATCH ({column}) AGAINST ({terms} IN BOOLEAN MODE)")))
    }

    fn create_namespace(&self, name: &str) -> String {
        format!("CREATE DATABASE IF NOT EXISTS `{name}` /*!40100 DEFAULT CHARACTER SET utf8mb4 */")
    }

    fn drop_namespace(&self, name: &str) -> String {
        format!("DROP DATABASE `{name}`")
    }

    fn namespace_lookup(&self) -> String {
        "SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = :name".to_string()
    }
}
