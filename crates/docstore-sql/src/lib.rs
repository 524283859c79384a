//! # docstore-sql
//!
//! Relational adapter for a document store: collections map to tables,
//! documents to rows, and queries, read permissions and cursor pagination to
//! parameterized SQL.
//!
//! Two engines are supported through the [`Dialect`] trait: MariaDB/MySQL
//! (InnoDB, full-text read ACL) and SQLite (bundled through `rusqlite`,
//! exact-match read ACL). The crate ships a [`Connection`] for SQLite; other
//! drivers plug in by implementing that trait.
//!
//! ## Quick start
//!
//! ```no_run
//! use docstore_sql::{Adapter, AttributeDef, AttributeType, Authorization, Collection, Document};
//!
//! let mut adapter = Adapter::open_in_memory().unwrap();
//!
//! let tasks = Collection::new("tasks")
//!     .with_attribute(AttributeDef::new("title", AttributeType::String, 100));
//! adapter.create_collection(&tasks).unwrap();
//!
//! let doc = Document::new("d1").with_read(["role:all"]).with_attribute("title", "write docs");
//! adapter.create_document(&tasks, &doc).unwrap();
//!
//! let options = adapter.find_options();
//! let found = adapter.find(&tasks, &Authorization::roles(["role:all"]), &options).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

pub mod adapter;
pub mod aggregate;
pub mod config;
pub mod dialect;
pub mod document;
pub mod driver;
pub mod error;
pub mod model;
pub mod pagination;
pub mod permission;
pub mod predicate;
pub mod schema;
pub mod statement;
pub mod types;

// Re-exports for convenience.
pub use adapter::Adapter;
pub use config::AdapterConfig;
pub use dialect::{Dialect, MariaDb, Sqlite, MARIADB_LIMITS, SQLITE_LIMITS};
pub use driver::{Connection, DriverError, DriverErrorKind, Row, SqlValue, SqliteConnection};
pub use error::{AdapterError, ErrorKind, Result};
pub use model::{
    AttributeDef, AttributeType, Authorization, Collection, Cursor, CursorDirection, Document,
    FindOptions, IndexDef, IndexType, Operator, OrderType, Query, DEFAULT_LIMIT,
};
pub use statement::{Statement, TableRef};
pub use types::Limits;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
