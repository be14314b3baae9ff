//! Session management for AORM Rust.
//!
//! A Session binds an executor to the shared settings and metadata registry,
//! and runs the generated statements for whole entities.
//!
//! # Example
//!
//! ```rust,ignore
//! use aorm::prelude::*;
//!
//! let session = Session::builder()
//!     .settings(Arc::new(Settings::from_env()))
//!     .build_with(SqliteConnection::open_memory()?);
//!
//! session.create_table::<Note>()?;
//! let mut note = Note { id: 0, title: "hello".into() };
//! session.insert(&mut note)?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use aorm_core::{Entity, Error, Executor, Result, Settings, TableDescriptor, Value};
use aorm_query::{Statement, UpsertOutcome, UpsertPolicy, dml, insert_entity};
use aorm_schema::{DdlGenerator, MetadataRegistry};

/// A database session over one executor.
///
/// Sessions are cheap to build; several sessions may share one
/// [`MetadataRegistry`] so descriptors are resolved once per process.
#[derive(Debug)]
pub struct Session<X: Executor> {
    executor: X,
    settings: Arc<Settings>,
    registry: Arc<MetadataRegistry>,
}

impl<X: Executor> Session<X> {
    /// Create a session with its own registry.
    pub fn new(executor: X, settings: Arc<Settings>) -> Self {
        let registry = Arc::new(MetadataRegistry::new(Arc::clone(&settings)));
        Self {
            executor,
            settings,
            registry,
        }
    }

    /// Create a session sharing an existing registry and its settings.
    pub fn with_registry(executor: X, registry: Arc<MetadataRegistry>) -> Self {
        Self {
            executor,
            settings: Arc::clone(registry.settings()),
            registry,
        }
    }

    /// Create a session builder.
    #[must_use]
    pub fn builder() -> SessionBuilder<X> {
        SessionBuilder::new()
    }

    /// Get a reference to the underlying executor.
    #[must_use]
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Consume the session and return the underlying executor.
    pub fn into_executor(self) -> X {
        self.executor
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// The descriptor of `E` under the current settings.
    pub fn table<E: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        self.registry.resolve::<E>()
    }

    /// Execute `CREATE TABLE` for `E`.
    pub fn create_table<E: Entity>(&self) -> Result<()> {
        let table = self.table::<E>()?;
        self.execute_ddl(&DdlGenerator::create_sql(&table))
    }

    /// Execute `DROP TABLE IF EXISTS` for `E`.
    pub fn drop_table<E: Entity>(&self) -> Result<()> {
        let table = self.table::<E>()?;
        self.execute_ddl(&DdlGenerator::drop_if_exists_sql(&table))
    }

    /// Insert `entity`, storing a generated key back on it.
    ///
    /// Returns the row id of the new row.
    pub fn insert<E: Entity>(&self, entity: &mut E) -> Result<i64> {
        let table = self.table::<E>()?;
        insert_entity(&table, entity, &self.executor, &self.settings)
    }

    /// Update the row whose key matches `entity`. Returns rows changed.
    pub fn update<E: Entity>(&self, entity: &E) -> Result<u64> {
        let table = self.table::<E>()?;
        let stmt = dml::update(&table, entity)?;
        self.execute(&stmt)
    }

    /// Insert or update `entity` under the current upsert mode.
    pub fn insert_or_update<E: Entity>(&self, entity: &mut E) -> Result<UpsertOutcome> {
        let table = self.table::<E>()?;
        UpsertPolicy::from_settings(&self.settings).run(
            &table,
            entity,
            &self.executor,
            &self.settings,
        )
    }

    /// Delete the row whose key matches `entity`. Returns rows deleted.
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<u64> {
        let table = self.table::<E>()?;
        let key = dml::key_value(&table, entity)?;
        let stmt = dml::delete(&table, key)?;
        self.execute(&stmt)
    }

    /// Delete the row of `E` with primary key `key`. Returns rows deleted.
    pub fn delete_by_key<E: Entity>(&self, key: impl Into<Value>) -> Result<u64> {
        let table = self.table::<E>()?;
        let stmt = dml::delete(&table, key.into())?;
        self.execute(&stmt)
    }

    /// Load the row of `E` with primary key `key`.
    pub fn find_by_key<E: Entity>(&self, key: impl Into<Value>) -> Result<Option<E>> {
        let table = self.table::<E>()?;
        let stmt = dml::select_by_key(&table, key.into())?;
        stmt.log(&self.settings);
        self.executor
            .query_one(&stmt.sql, &stmt.params)?
            .map(|row| E::from_row(&row))
            .transpose()
    }

    /// Load every row of `E`.
    pub fn find_all<E: Entity>(&self) -> Result<Vec<E>> {
        let table = self.table::<E>()?;
        let stmt = dml::select_all(&table);
        stmt.log(&self.settings);
        let rows = self.executor.query(&stmt.sql, &stmt.params)?;
        tracing::trace!(table = %table.name(), rows = rows.len(), "decoding rows");
        rows.iter().map(E::from_row).collect()
    }

    /// Number of rows in the table of `E`.
    pub fn count<E: Entity>(&self) -> Result<i64> {
        let table = self.table::<E>()?;
        let stmt = dml::count(&table);
        stmt.log(&self.settings);
        let row = self.executor.query_one(&stmt.sql, &stmt.params)?;
        row.as_ref()
            .and_then(|r| r.get(0))
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Custom(format!("COUNT on {} returned no integer", table.name())))
    }

    fn execute(&self, stmt: &Statement) -> Result<u64> {
        stmt.log(&self.settings);
        self.executor.execute(&stmt.sql, &stmt.params)
    }

    fn execute_ddl(&self, sql: &str) -> Result<()> {
        Statement::new(sql, Vec::new()).log(&self.settings);
        self.executor.execute_raw(sql)
    }
}

/// Builder for creating Session instances with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::builder()
///     .settings(settings)
///     .build_with(connection);
/// ```
#[derive(Debug)]
pub struct SessionBuilder<X: Executor> {
    settings: Option<Arc<Settings>>,
    registry: Option<Arc<MetadataRegistry>>,
    _marker: PhantomData<X>,
}

impl<X: Executor> Default for SessionBuilder<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Executor> SessionBuilder<X> {
    /// Create a new session builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: None,
            registry: None,
            _marker: PhantomData,
        }
    }

    /// Use these settings. Ignored when a registry is given.
    #[must_use]
    pub fn settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Share a registry, and with it the registry's settings.
    #[must_use]
    pub fn registry(mut self, registry: Arc<MetadataRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the session with the provided executor.
    ///
    /// Priorities, highest first:
    /// 1. A registry set via `registry()`
    /// 2. Settings set via `settings()`
    /// 3. Default settings
    pub fn build_with(self, executor: X) -> Session<X> {
        match (self.registry, self.settings) {
            (Some(registry), _) => Session::with_registry(executor, registry),
            (None, Some(settings)) => Session::new(executor, settings),
            (None, None) => Session::new(executor, Arc::new(Settings::default())),
        }
    }
}
