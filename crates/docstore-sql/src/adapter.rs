use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::config::{AdapterConfig, MEMORY_PATH};
use crate::dialect::{Dialect, Sqlite};
use crate::driver::{Connection, SqliteConnection};
use crate::error::Result;
use crate::model::{Authorization, Collection, FindOptions, Query};
use crate::permission;
use crate::predicate;
use crate::statement::{sanitize, Fragment, Outcome, Statement, TableRef};
use crate::types::{self, Limits};

/// Document store adapter over one SQL connection.
///
/// Owns a single [`Connection`], the [`Dialect`] of the engine behind it and
/// the namespace its collection tables live in. Every operation runs as one
/// statement in its own transaction; operations take `&mut self`, so
/// concurrent callers need separate adapters.
///
/// Schema, document, query and aggregate operations are implemented in their
/// own modules as further `impl` blocks on this type.
pub struct Adapter<C: Connection> {
    pub(crate) conn: C,
    pub(crate) dialect: Box<dyn Dialect>,
    namespace: String,
    default_limit: u64,
    attach_dir: Option<PathBuf>,
}

impl Adapter<SqliteConnection> {
    /// Opens the SQLite database named by `config`.
    #[instrument(skip_all, fields(path = %config.db_path, namespace = %config.namespace))]
    pub fn open(config: &AdapterConfig) -> Result<Self> {
        let conn = if config.db_path == MEMORY_PATH {
            SqliteConnection::open_in_memory()?
        } else {
            SqliteConnection::open(&config.db_path)?
        };
        conn.set_busy_timeout(config.busy_timeout)?;

        let mut adapter = Self::new(conn, Sqlite);
        adapter.set_namespace(&config.namespace)?;
        adapter.default_limit = config.default_limit;
        adapter.attach_dir = config.attach_dir.clone();
        debug!("opened adapter");
        Ok(adapter)
    }

    /// In-memory SQLite adapter on the `main` namespace.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&AdapterConfig::in_memory())
    }
}

impl<C: Connection> Adapter<C> {
    pub fn new(conn: C, dialect: impl Dialect + 'static) -> Self {
        Self {
            conn,
            dialect: Box::new(dialect),
            namespace: "main".to_string(),
            default_limit: crate::model::DEFAULT_LIMIT,
            attach_dir: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Switches the namespace used by every later operation.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<()> {
        self.namespace = sanitize(namespace)?;
        Ok(())
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Empty [`FindOptions`] with the configured page size.
    pub fn find_options(&self) -> FindOptions {
        FindOptions::with_limit(self.default_limit)
    }

    // ── Capabilities ───────────────────────────────────────

    pub fn limits(&self) -> &'static Limits {
        self.dialect.limits()
    }

    pub fn attribute_count(&self, collection: &Collection) -> usize {
        types::attribute_count(collection)
    }

    pub fn index_count(&self, collection: &Collection) -> usize {
        types::index_count(collection)
    }

    pub fn estimate_row_width(&self, collection: &Collection) -> u64 {
        types::estimate_row_width(collection)
    }

    /// Validates `collection` against this engine's limits. Not called by
    /// any schema operation.
    pub fn check_limits(&self, collection: &Collection) -> Result<()> {
        types::check_limits(collection, self.dialect.limits())
    }

    // ── Internals ──────────────────────────────────────────

    pub(crate) fn table(&self, collection: &str) -> Result<TableRef> {
        TableRef::new(&self.namespace, collection)
    }

    /// Location bound to a new namespace: a file under the attach directory,
    /// or a private in-memory database.
    pub(crate) fn namespace_location(&self) -> String {
        match &self.attach_dir {
            Some(dir) => dir.join(format!("{}.db", self.namespace)).display().to_string(),
            None => MEMORY_PATH.to_string(),
        }
    }

    /// Permission filter followed by one fragment per query.
    pub(crate) fn read_conditions(
        &self,
        authorization: &Authorization,
        queries: &[Query],
    ) -> Result<Vec<Fragment>> {
        let mut conditions = vec![permission::read_filter(self.dialect.as_ref(), authorization)?];
        conditions.extend(predicate::translate(self.dialect.as_ref(), queries)?);
        Ok(conditions)
    }

    /// Builds one statement with `build` and executes it.
    pub(crate) fn run<F>(&mut self, build: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Statement<'_>) -> Result<()>,
    {
        let mut statement = Statement::new(self.dialect.as_ref());
        build(&mut statement)?;
        statement.execute(&mut self.conn)
    }
}
