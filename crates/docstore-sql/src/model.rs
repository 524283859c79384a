use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AdapterError, Result};

/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: u64 = 25;

/// A document as seen by callers: reserved fields plus an ordered attribute
/// map.
///
/// Serialized with the `$`-prefixed reserved keys (`$id`, `$internalId`,
/// `$read`, `$write`) next to the flattened attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned id, unique per collection.
    #[serde(rename = "$id", default)]
    pub id: String,
    /// Engine-assigned sequential id. `None` until the row exists.
    #[serde(rename = "$internalId", default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<i64>,
    /// Roles allowed to read the document.
    #[serde(rename = "$read", default)]
    pub read: Vec<String>,
    /// Roles allowed to modify the document.
    #[serde(rename = "$write", default)]
    pub write: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// The "not found" sentinel returned by lookups.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.internal_id.is_none() && self.attributes.is_empty()
    }

    pub fn with_read<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_write<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Abstract attribute types understood by the type mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Integer,
    #[serde(alias = "float")]
    Double,
    Boolean,
    /// Reference to another document, stored as its id.
    Document,
}

impl FromStr for AttributeType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "double" | "float" => Ok(Self::Double),
            "boolean" => Ok(Self::Boolean),
            "document" => Ok(Self::Document),
            other => Err(AdapterError::Validation(format!("unknown attribute type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Maximum length for strings; ignored by the other types.
    #[serde(default)]
    pub size: u64,
    #[serde(default = "default_signed")]
    pub signed: bool,
    #[serde(default)]
    pub array: bool,
}

fn default_signed() -> bool {
    true
}

impl AttributeDef {
    pub fn new(id: impl Into<String>, kind: AttributeType, size: u64) -> Self {
        Self { id: id.into(), kind, size, signed: true, array: false }
    }

    pub fn unsigned(mut self) -> Self {
        self.signed = false;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Key,
    Unique,
    Fulltext,
    /// Index over an array attribute; rendered as a plain key.
    Array,
}

impl FromStr for IndexType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key" => Ok(Self::Key),
            "unique" => Ok(Self::Unique),
            "fulltext" => Ok(Self::Fulltext),
            "array" => Ok(Self::Array),
            other => Err(AdapterError::Validation(format!("unknown index type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IndexType,
    pub attributes: Vec<String>,
    /// Prefix length per attribute, aligned with `attributes`.
    #[serde(default)]
    pub lengths: Vec<Option<u32>>,
    /// Sort order per attribute, aligned with `attributes`.
    #[serde(default)]
    pub orders: Vec<Option<OrderType>>,
}

impl IndexDef {
    pub fn new<I, S>(id: impl Into<String>, kind: IndexType, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            attributes: attributes.into_iter().map(Into::into).collect(),
            lengths: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn with_lengths(mut self, lengths: Vec<Option<u32>>) -> Self {
        self.lengths = lengths;
        self
    }

    pub fn with_orders(mut self, orders: Vec<Option<OrderType>>) -> Self {
        self.orders = orders;
        self
    }
}

/// A collection definition: the document-model analogue of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl Collection {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn attribute(&self, id: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equal,
    NotEqual,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
    /// Full-text match against the attribute.
    Search,
}

impl Operator {
    /// SQL comparison operator; `None` for [`Operator::Search`].
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::Equal => Some("="),
            Self::NotEqual => Some("!="),
            Self::Lesser => Some("<"),
            Self::LesserEqual => Some("<="),
            Self::Greater => Some(">"),
            Self::GreaterEqual => Some(">="),
            Self::Search => None,
        }
    }
}

impl FromStr for Operator {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equal" => Ok(Self::Equal),
            "notEqual" => Ok(Self::NotEqual),
            "lesser" => Ok(Self::Lesser),
            "lesserEqual" => Ok(Self::LesserEqual),
            "greater" => Ok(Self::Greater),
            "greaterEqual" => Ok(Self::GreaterEqual),
            "search" => Ok(Self::Search),
            other => Err(AdapterError::Validation(format!("unknown operator: {other}"))),
        }
    }
}

/// One filter: `attribute OP value` for any of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub attribute: String,
    pub operator: Operator,
    pub values: Vec<Value>,
}

impl Query {
    pub fn new<I, V>(attribute: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            attribute: attribute.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Equal, [value.into()])
    }

    pub fn search(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(attribute, Operator::Search, [Value::String(value.into())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Asc,
    Desc,
}

impl OrderType {
    pub fn invert(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for OrderType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(AdapterError::Validation(format!("invalid order type: {s}")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    #[default]
    After,
    Before,
}

impl FromStr for CursorDirection {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "after" => Ok(Self::After),
            "before" => Ok(Self::Before),
            other => Err(AdapterError::Validation(format!("invalid cursor direction: {other}"))),
        }
    }
}

/// Snapshot of a previously returned document used as a keyset boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub values: Map<String, Value>,
    pub internal_id: i64,
}

impl Cursor {
    pub fn from_document(document: &Document) -> Result<Self> {
        let internal_id = document.internal_id.ok_or_else(|| {
            AdapterError::Validation(format!(
                "cursor document '{}' has no internal id",
                document.id
            ))
        })?;
        Ok(Self { values: document.attributes.clone(), internal_id })
    }
}

/// Read authorization for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Skip the row-level ACL predicate entirely.
    Disabled,
    /// Only rows readable by at least one of these roles are visible.
    Roles(Vec<String>),
}

impl Authorization {
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Roles(roles.into_iter().map(Into::into).collect())
    }
}

/// Filter, order and pagination input for `find`.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOptions {
    pub queries: Vec<Query>,
    pub limit: u64,
    pub offset: u64,
    pub order_attributes: Vec<String>,
    /// Aligned with `order_attributes`; missing entries default to ascending.
    pub order_types: Vec<OrderType>,
    pub cursor: Option<Cursor>,
    pub cursor_direction: CursorDirection,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

impl FindOptions {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            queries: Vec::new(),
            limit,
            offset: 0,
            order_attributes: Vec::new(),
            order_types: Vec::new(),
            cursor: None,
            cursor_direction: CursorDirection::After,
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn order(mut self, attribute: impl Into<String>, order: OrderType) -> Self {
        self.order_attributes.push(attribute.into());
        self.order_types.push(order);
        self
    }

    /// Order by the internal id only, in the given direction.
    pub fn natural_order(mut self, order: OrderType) -> Self {
        self.order_types = vec![order];
        self
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self.cursor_direction = CursorDirection::After;
        self
    }

    pub fn before(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self.cursor_direction = CursorDirection::Before;
        self
    }
}
