//! Abstract attribute types to column types, plus the capability limits each
//! engine advertises.

use crate::error::{AdapterError, Result};
use crate::model::{AttributeType, Collection};

/// Reserved columns: `_id`, `_uid`, `_read`, `_write`.
pub const DEFAULT_ATTRIBUTES: usize = 4;

/// Reserved indexes: primary key, `_index1` on `_uid`, `_index2` on `_read`.
pub const DEFAULT_INDEXES: usize = 3;

/// Fixed width estimate for the reserved columns, buffer included:
/// `_id` 4 bytes, `_uid` CHAR(255) at 4 bytes/char, two TEXT pointers, and
/// roughly 300 bytes of slack because the engine's accounting varies.
pub const BASE_ROW_WIDTH: u64 = 1500;

const VARCHAR_MAX: u64 = 16_383;
const TEXT_MAX: u64 = 65_535;
const MEDIUMTEXT_MAX: u64 = 16_777_215;

/// Off-page pointer a LONGTEXT column leaves in the row.
const LONGTEXT_WIDTH: u64 = 12;

/// Constant capability table of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_string_length: u64,
    pub max_int_value: u64,
    pub max_attributes: usize,
    pub max_indexes: usize,
    /// Maximum row width in bytes; 0 when the engine imposes none.
    pub max_row_width: u64,
    pub supports_index: bool,
    pub supports_unique_index: bool,
    pub supports_fulltext_index: bool,
}

/// Column type for an attribute.
///
/// Array attributes always land in `LONGTEXT` because they are stored
/// JSON-encoded whatever their element type.
pub fn column_type(kind: AttributeType, size: u64, signed: bool, array: bool) -> String {
    if array {
        return "LONGTEXT".to_string();
    }

    let unsigned = if signed { "" } else { " UNSIGNED" };
    match kind {
        AttributeType::String => match size {
            s if s > MEDIUMTEXT_MAX => "LONGTEXT".to_string(),
            s if s > TEXT_MAX => "MEDIUMTEXT".to_string(),
            s if s > VARCHAR_MAX => "TEXT".to_string(),
            s => format!("VARCHAR({s})"),
        },
        // No zerofill support.
        AttributeType::Integer => format!("INT{unsigned}"),
        AttributeType::Double => format!("FLOAT{unsigned}"),
        AttributeType::Boolean => "TINYINT(1)".to_string(),
        AttributeType::Document => "CHAR(255)".to_string(),
    }
}

/// [`column_type`] for a type given by name, as the schema layer receives it.
pub fn column_type_named(kind: &str, size: u64, signed: bool, array: bool) -> Result<String> {
    Ok(column_type(kind.parse()?, size, signed, array))
}

/// Worst-case bytes one attribute adds to a row.
///
/// Bounded strings count 4 bytes per character (utf8mb4) plus a 1 or 2 byte
/// length prefix; the text tiers live off-page and only add their pointer.
pub fn attribute_width(kind: AttributeType, size: u64) -> u64 {
    match kind {
        AttributeType::String => match size {
            s if s > MEDIUMTEXT_MAX => LONGTEXT_WIDTH,
            s if s > TEXT_MAX => 11,
            s if s > VARCHAR_MAX => 10,
            s if s > 255 => s * 4 + 2,
            s => s * 4 + 1,
        },
        // FLOAT(p) is 4 bytes for p <= 24.
        AttributeType::Integer | AttributeType::Double => 4,
        AttributeType::Boolean => 1,
        AttributeType::Document => 255,
    }
}

/// Estimated maximum bytes one document of `collection` needs.
///
/// Array attributes are stored as LONGTEXT whatever their element type, so
/// they count the pointer width.
pub fn estimate_row_width(collection: &Collection) -> u64 {
    collection
        .attributes
        .iter()
        .map(|a| if a.array { LONGTEXT_WIDTH } else { attribute_width(a.kind, a.size) })
        .sum::<u64>()
        + BASE_ROW_WIDTH
}

/// Columns the collection occupies, counting one buffer column because
/// virtual columns count toward the engine total.
pub fn attribute_count(collection: &Collection) -> usize {
    collection.attributes.len() + DEFAULT_ATTRIBUTES + 1
}

pub fn index_count(collection: &Collection) -> usize {
    collection.indexes.len() + DEFAULT_INDEXES
}

/// Checks a collection definition against `limits`.
///
/// Meant for the validation layer that runs before DDL; schema operations
/// never call it on their own.
pub fn check_limits(collection: &Collection, limits: &Limits) -> Result<()> {
    let attributes = attribute_count(collection);
    if attributes > limits.max_attributes {
        return Err(AdapterError::Validation(format!(
            "collection '{}' needs {attributes} columns, limit is {}",
            collection.id, limits.max_attributes
        )));
    }

    let indexes = index_count(collection);
    if indexes > limits.max_indexes {
        return Err(AdapterError::Validation(format!(
            "collection '{}' needs {indexes} indexes, limit is {}",
            collection.id, limits.max_indexes
        )));
    }

    if limits.max_row_width > 0 {
        let width = estimate_row_width(collection);
        if width > limits.max_row_width {
            return Err(AdapterError::Validation(format!(
                "collection '{}' rows may reach {width} bytes, limit is {}",
                collection.id, limits.max_row_width
            )));
        }
    }

    for attribute in &collection.attributes {
        if attribute.kind == AttributeType::String && attribute.size > limits.max_string_length {
            return Err(AdapterError::Validation(format!(
                "attribute '{}' size {} exceeds the string limit {}",
                attribute.id, attribute.size, limits.max_string_length
            )));
        }
    }

    Ok(())
}
