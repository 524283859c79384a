use thiserror::Error;

use crate::driver::{DriverError, DriverErrorKind};

/// Convenience alias used across the adapter.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced by adapter operations.
///
/// The variant tells permanent input problems apart from engine failures;
/// use [`AdapterError::kind`] for coarse classification and
/// [`AdapterError::is_retryable`] before deciding to retry.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Unknown type/operator/index kind, invalid identifier, or a capability
    /// the selected engine does not offer.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique key (usually the external document id) already exists.
    #[error("duplicated document: {0}")]
    Duplicate(String),

    /// A second top-level statement was added to a builder.
    #[error("multiple statements detected: a builder holds at most one top-level statement")]
    MultipleStatements,

    /// The cursor document has no value for a declared order attribute.
    #[error("order attribute '{0}' is empty")]
    OrderAttributeEmpty(String),

    /// Any other failure reported by the backing engine.
    #[error("execution error: {0}")]
    Execution(String),

    /// A stored JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Constraint,
    Protocol,
    Pagination,
    Execution,
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Duplicate(_) => ErrorKind::Constraint,
            Self::MultipleStatements => ErrorKind::Protocol,
            Self::OrderAttributeEmpty(_) => ErrorKind::Pagination,
            Self::Execution(_) | Self::Serialization(_) => ErrorKind::Execution,
        }
    }

    /// Only generic engine failures may succeed on a second attempt; this
    /// layer never retries by itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

impl From<DriverError> for AdapterError {
    fn from(e: DriverError) -> Self {
        match e.kind {
            DriverErrorKind::UniqueViolation => Self::Duplicate(e.message),
            DriverErrorKind::Other => Self::Execution(e.message),
        }
    }
}

impl From<rusqlite::Error> for AdapterError {
    fn from(e: rusqlite::Error) -> Self {
        DriverError::from(e).into()
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
