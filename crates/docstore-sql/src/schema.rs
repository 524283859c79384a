//! Namespace, collection, attribute and index DDL.

use tracing::{debug, instrument};

use crate::driver::Connection;
use crate::error::{AdapterError, Result};
use crate::model::{AttributeDef, Collection, IndexDef, IndexType};
use crate::statement::{sanitize, TableRef};
use crate::types::column_type;
use crate::Adapter;

/// Columns every collection table carries.
pub const RESERVED_COLUMNS: [&str; 4] = ["_id", "_uid", "_read", "_write"];

/// Unique index over `_uid`.
pub const UID_INDEX: &str = "_index1";

/// Index over `_read`.
pub const PERMISSION_INDEX: &str = "_index2";

/// Sanitized column name for a user attribute; reserved names are refused.
pub(crate) fn attribute_column(name: &str) -> Result<String> {
    let column = sanitize(name)?;
    if RESERVED_COLUMNS.contains(&column.as_str()) {
        return Err(AdapterError::Validation(format!("attribute name '{column}' is reserved")));
    }
    Ok(column)
}

fn column_definition(attribute: &AttributeDef) -> Result<String> {
    Ok(format!(
        "`{}` {}",
        attribute_column(&attribute.id)?,
        column_type(attribute.kind, attribute.size, attribute.signed, attribute.array)
    ))
}

/// An index ready to render: physical name, kind, rendered columns.
struct IndexSpec {
    name: String,
    kind: IndexType,
    columns: Vec<String>,
}

impl<C: Connection> Adapter<C> {
    fn index_spec(&self, table: &TableRef, index: &IndexDef) -> Result<IndexSpec> {
        if index.attributes.is_empty() {
            return Err(AdapterError::Validation(format!("index '{}' has no attributes", index.id)));
        }
        // Fails early for kinds the engine cannot build.
        self.dialect.index_keyword(index.kind)?;

        let mut columns = Vec::with_capacity(index.attributes.len());
        for (k, attribute) in index.attributes.iter().enumerate() {
            let (length, order) = if index.kind == IndexType::Fulltext {
                (None, None)
            } else {
                (
                    index.lengths.get(k).copied().flatten(),
                    index.orders.get(k).copied().flatten(),
                )
            };
            columns.push(self.dialect.index_column(index.kind, &sanitize(attribute)?, length, order));
        }

        Ok(IndexSpec {
            name: self.dialect.index_name(table.name(), &sanitize(&index.id)?),
            kind: index.kind,
            columns,
        })
    }

    fn reserved_index(&self, table: &TableRef, id: &str, kind: IndexType, column: &str) -> IndexSpec {
        IndexSpec {
            name: self.dialect.index_name(table.name(), id),
            kind,
            columns: vec![self.dialect.index_column(kind, column, None, None)],
        }
    }

    fn run_create_index(&mut self, table: &TableRef, spec: IndexSpec) -> Result<()> {
        let table = table.clone();
        self.run(|stmt| {
            stmt.create_index(table, &spec.name, spec.kind, spec.columns)?;
            Ok(())
        })?;
        Ok(())
    }

    // ── Namespaces ─────────────────────────────────────────

    /// Creates the current namespace: a database on MariaDB, an attached
    /// database on SQLite.
    #[instrument(skip_all, fields(namespace = %self.namespace()))]
    pub fn create_namespace(&mut self) -> Result<()> {
        let name = self.namespace().to_string();
        let location = self.namespace_location();
        self.run(|stmt| {
            stmt.create_namespace(&name, &location)?;
            Ok(())
        })?;
        debug!(location = %location, "namespace created");
        Ok(())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace()))]
    pub fn namespace_exists(&mut self) -> Result<bool> {
        let name = self.namespace().to_string();
        let outcome = self.run(|stmt| {
            stmt.namespace_lookup(&name)?;
            Ok(())
        })?;
        Ok(!outcome.rows.is_empty())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace()))]
    pub fn delete_namespace(&mut self) -> Result<()> {
        let name = self.namespace().to_string();
        self.run(|stmt| {
            stmt.drop_namespace(&name)?;
            Ok(())
        })?;
        Ok(())
    }

    // ── Collections ────────────────────────────────────────

    /// Creates the table for `collection` with its reserved columns, declared
    /// attributes and indexes, then the permission index on `_read`.
    ///
    /// Engines with inline index clauses get a single `CREATE TABLE`; the
    /// others get one `CREATE INDEX` per index afterwards. Either way the
    /// resulting schema matches creating the bare collection and adding the
    /// attributes and indexes one by one.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub fn create_collection(&mut self, collection: &Collection) -> Result<()> {
        let table = self.table(&collection.id)?;

        let mut definitions = vec![
            format!("`_id` {}", self.dialect.internal_id_definition()),
            "`_uid` CHAR(255) NOT NULL".to_string(),
            "`_read` TEXT NOT NULL".to_string(),
            "`_write` TEXT NOT NULL".to_string(),
        ];
        for attribute in &collection.attributes {
            definitions.push(column_definition(attribute)?);
        }
        if let Some(primary_key) = self.dialect.primary_key_clause() {
            definitions.push(primary_key.to_string());
        }

        let mut indexes = Vec::with_capacity(collection.indexes.len() + 1);
        for index in &collection.indexes {
            indexes.push(self.index_spec(&table, index)?);
        }
        indexes.push(self.reserved_index(&table, UID_INDEX, IndexType::Unique, "_uid"));

        let mut follow_up = Vec::new();
        if self.dialect.inline_indexes() {
            for spec in indexes {
                definitions.push(self.dialect.inline_index(spec.kind, &spec.name, &spec.columns)?);
            }
        } else {
            follow_up = indexes;
        }
        follow_up.push(self.reserved_index(
            &table,
            PERMISSION_INDEX,
            self.dialect.permission_index_type(),
            "_read",
        ));

        let create = table.clone();
        self.run(|stmt| {
            stmt.create_table(create, definitions)?;
            Ok(())
        })?;
        for spec in follow_up {
            self.run_create_index(&table, spec)?;
        }

        debug!(
            attributes = collection.attributes.len(),
            indexes = collection.indexes.len(),
            "collection created"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %id))]
    pub fn delete_collection(&mut self, id: &str) -> Result<()> {
        let table = self.table(id)?;
        self.run(|stmt| {
            stmt.drop_table(table)?;
            Ok(())
        })?;
        Ok(())
    }

    // ── Attributes ─────────────────────────────────────────

    #[instrument(skip_all, fields(collection = %collection, attribute = %attribute.id))]
    pub fn create_attribute(&mut self, collection: &str, attribute: &AttributeDef) -> Result<()> {
        let table = self.table(collection)?;
        let column = attribute_column(&attribute.id)?;
        let definition = column_type(attribute.kind, attribute.size, attribute.signed, attribute.array);
        self.run(|stmt| {
            stmt.alter_table(table)?.add_column(&column, &definition)?;
            Ok(())
        })?;
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %collection, attribute = %id))]
    pub fn delete_attribute(&mut self, collection: &str, id: &str) -> Result<()> {
        let table = self.table(collection)?;
        let column = attribute_column(id)?;
        self.run(|stmt| {
            stmt.alter_table(table)?.drop_column(&column)?;
            Ok(())
        })?;
        Ok(())
    }

    // ── Indexes ────────────────────────────────────────────

    #[instrument(skip_all, fields(collection = %collection, index = %index.id))]
    pub fn create_index(&mut self, collection: &str, index: &IndexDef) -> Result<()> {
        let table = self.table(collection)?;
        let spec = self.index_spec(&table, index)?;
        self.run_create_index(&table, spec)
    }

    #[instrument(skip_all, fields(collection = %collection, index = %id))]
    pub fn delete_index(&mut self, collection: &str, id: &str) -> Result<()> {
        let table = self.table(collection)?;
        let name = self.dialect.index_name(table.name(), &sanitize(id)?);
        self.run(|stmt| {
            stmt.drop_index(table, &name)?;
            Ok(())
        })?;
        Ok(())
    }
}
