//! Document ⇄ row mapping and the document operations.
//!
//! Composite values (arrays, objects) and role lists are stored as JSON text,
//! booleans as 0/1. Reading a row back uses the collection definition to
//! restore the declared types.

use serde_json::{Map, Number, Value};
use tracing::{debug, instrument};

use crate::driver::{Connection, Row, SqlValue};
use crate::error::{AdapterError, Result};
use crate::model::{AttributeDef, AttributeType, Authorization, Collection, Document, FindOptions};
use crate::pagination;
use crate::schema::attribute_column;
use crate::statement::{qualified, Fragment};
use crate::Adapter;

/// Converts a JSON value into the value bound for its column.
pub fn encode_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, Some(f)) => SqlValue::Real(f),
            (None, None) => SqlValue::Text(n.to_string()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(value)?),
    })
}

fn raw_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::from(n),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
    }
}

/// Restores a column value according to its attribute definition. Columns
/// without a definition convert as-is.
pub fn decode_value(attribute: Option<&AttributeDef>, value: SqlValue) -> Result<Value> {
    let Some(attribute) = attribute else {
        return Ok(raw_value(value));
    };
    if value.is_null() {
        return Ok(Value::Null);
    }
    if attribute.array {
        return match value {
            SqlValue::Text(s) => Ok(serde_json::from_str(&s)?),
            other => Ok(raw_value(other)),
        };
    }

    Ok(match attribute.kind {
        AttributeType::Boolean => match value.as_i64() {
            Some(n) => Value::Bool(n != 0),
            None => raw_value(value),
        },
        AttributeType::Integer => match value.as_i64() {
            Some(n) => Value::from(n),
            None => raw_value(value),
        },
        AttributeType::Double => match value.as_f64().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => raw_value(value),
        },
        AttributeType::String | AttributeType::Document => match value {
            SqlValue::Text(s) => Value::String(s),
            SqlValue::Integer(n) => Value::String(n.to_string()),
            SqlValue::Real(f) => Value::String(f.to_string()),
            SqlValue::Null => Value::Null,
        },
    })
}

fn decode_roles(value: Option<SqlValue>) -> Result<Vec<String>> {
    match value {
        Some(SqlValue::Text(s)) if !s.is_empty() => Ok(serde_json::from_str(&s)?),
        _ => Ok(Vec::new()),
    }
}

/// Rebuilds a document from a fetched row.
pub fn decode_row(collection: &Collection, row: Row) -> Result<Document> {
    let mut document = Document::empty();
    let mut attributes = Map::new();

    for (column, value) in row.into_columns() {
        match column.as_str() {
            "_id" => document.internal_id = value.as_i64(),
            "_uid" => document.id = value.as_str().unwrap_or_default().to_string(),
            "_read" => document.read = decode_roles(Some(value))?,
            "_write" => document.write = decode_roles(Some(value))?,
            _ => {
                let decoded = decode_value(collection.attribute(&column), value)?;
                attributes.insert(column, decoded);
            }
        }
    }

    document.attributes = attributes;
    Ok(document)
}

/// Column assignments for a document: its attributes followed by the role
/// lists.
///
/// Arrays and objects are only accepted for array attributes, the one place
/// a read turns the stored JSON text back into a value.
fn encode_columns(collection: &Collection, document: &Document) -> Result<Vec<(String, SqlValue)>> {
    let mut columns = Vec::with_capacity(document.attributes.len() + 2);
    for (name, value) in &document.attributes {
        let composite = value.is_array() || value.is_object();
        if composite && !collection.attribute(name).is_some_and(|a| a.array) {
            return Err(AdapterError::Validation(format!(
                "attribute '{name}' is not an array attribute and cannot hold a composite value"
            )));
        }
        columns.push((attribute_column(name)?, encode_value(value)?));
    }
    columns.push(("_read".to_string(), SqlValue::Text(serde_json::to_string(&document.read)?)));
    columns.push(("_write".to_string(), SqlValue::Text(serde_json::to_string(&document.write)?)));
    Ok(columns)
}

fn uid_equals(column: String, id: &str) -> Fragment {
    Fragment::new(format!("{column} = :uid")).with_param(":uid", SqlValue::Text(id.to_string()))
}

impl<C: Connection> Adapter<C> {
    /// Inserts `document` and returns it with its internal id set.
    ///
    /// Fails with [`AdapterError::Duplicate`] when the id already exists in
    /// the collection, and with [`AdapterError::Validation`] when an array or
    /// object is given for an attribute not declared as an array.
    #[instrument(skip_all, fields(collection = %collection.id, id = %document.id))]
    pub fn create_document(&mut self, collection: &Collection, document: &Document) -> Result<Document> {
        let table = self.table(&collection.id)?;
        let columns = encode_columns(collection, document)?;
        let uid = document.id.clone();

        self.run(|stmt| {
            stmt.insert_into(table)?;
            for (column, value) in columns {
                stmt.set(&column, value)?;
            }
            stmt.set("_uid", SqlValue::Text(uid))?;
            Ok(())
        })?;

        let mut created = document.clone();
        created.internal_id = Some(self.conn.last_insert_id());
        debug!(internal_id = ?created.internal_id, "document created");
        Ok(created)
    }

    /// Rewrites the attributes and role lists of the row with `document.id`.
    #[instrument(skip_all, fields(collection = %collection.id, id = %document.id))]
    pub fn update_document(&mut self, collection: &Collection, document: &Document) -> Result<Document> {
        let table = self.table(&collection.id)?;
        let columns = encode_columns(collection, document)?;
        let condition = uid_equals("`_uid`".to_string(), &document.id);

        let outcome = self.run(|stmt| {
            stmt.update(table)?;
            for (column, value) in columns {
                stmt.set(&column, value)?;
            }
            stmt.filter(condition);
            Ok(())
        })?;

        debug!(affected = outcome.affected, "document updated");
        Ok(document.clone())
    }

    /// Looks a document up by id, without any permission check. Returns
    /// [`Document::empty`] when no row matches.
    #[instrument(skip_all, fields(collection = %collection.id, id = %id))]
    pub fn get_document(&mut self, collection: &Collection, id: &str) -> Result<Document> {
        let table = self.table(&collection.id)?;
        let condition = uid_equals(qualified("_uid")?, id);

        let outcome = self.run(|stmt| {
            stmt.select(table)?.filter(condition).limit(1);
            Ok(())
        })?;

        match outcome.rows.into_iter().next() {
            Some(row) => decode_row(collection, row),
            None => Ok(Document::empty()),
        }
    }

    /// Deletes the document with `id`; `true` when a row was removed.
    #[instrument(skip_all, fields(collection = %collection, id = %id))]
    pub fn delete_document(&mut self, collection: &str, id: &str) -> Result<bool> {
        let table = self.table(collection)?;
        let condition = uid_equals("`_uid`".to_string(), id);

        let outcome = self.run(|stmt| {
            stmt.delete_from(table)?.filter(condition);
            Ok(())
        })?;
        Ok(outcome.affected > 0)
    }

    /// Documents readable under `authorization` that match `options`, in the
    /// requested order.
    #[instrument(skip_all, fields(collection = %collection.id, limit = options.limit))]
    pub fn find(
        &mut self,
        collection: &Collection,
        authorization: &Authorization,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let table = self.table(&collection.id)?;
        let conditions = self.read_conditions(authorization, &options.queries)?;
        let page = pagination::plan(options)?;
        let reverse = page.reverse;

        let outcome = self.run(|stmt| {
            stmt.select(table)?;
            for condition in conditions {
                stmt.filter(condition);
            }
            if let Some(boundary) = page.boundary {
                stmt.filter(boundary);
            }
            for key in page.order {
                stmt.order_by(key);
            }
            stmt.limit(options.limit).offset(options.offset);
            Ok(())
        })?;

        let mut documents = outcome
            .rows
            .into_iter()
            .map(|row| decode_row(collection, row))
            .collect::<Result<Vec<_>>>()?;
        if reverse {
            documents.reverse();
        }
        debug!(found = documents.len(), "find complete");
        Ok(documents)
    }
}
