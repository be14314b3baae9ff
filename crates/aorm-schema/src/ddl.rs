//! DDL (Data Definition Language) generation from table descriptors.
//!
//! Generation is pure: it renders SQL text and never touches a database.

use aorm_core::{ColumnDescriptor, Entity, LOG_TAG, Result, TableDescriptor};

use crate::registry::MetadataRegistry;

/// Renders CREATE TABLE and DROP TABLE statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdlGenerator;

impl DdlGenerator {
    /// Generate CREATE TABLE SQL.
    ///
    /// One column definition per line, in descriptor order:
    ///
    /// ```text
    /// CREATE TABLE note(
    /// _id INTEGER PRIMARY KEY AUTOINCREMENT,
    /// title TEXT NOT NULL)
    /// ```
    ///
    /// The statement ends with a line feed.
    pub fn create_sql(table: &TableDescriptor) -> String {
        tracing::trace!(
            table = %table.name(),
            columns = table.column_count(),
            "Generating CREATE TABLE DDL"
        );
        let defs: Vec<String> = table.columns().iter().map(ColumnDescriptor::to_sql).collect();
        format!("CREATE TABLE {}(\n{})\n", table.name(), defs.join(", \n"))
    }

    /// Generate the legacy DROP TABLE text, `DROP TABLE <name> IF EXISTS`.
    ///
    /// SQLite does not accept this word order; use
    /// [`drop_if_exists_sql`](Self::drop_if_exists_sql) for statements that
    /// are executed.
    pub fn drop_sql(table: &TableDescriptor) -> String {
        format!("DROP TABLE {} IF EXISTS", table.name())
    }

    /// Generate `DROP TABLE IF EXISTS <name>`.
    pub fn drop_if_exists_sql(table: &TableDescriptor) -> String {
        format!("DROP TABLE IF EXISTS {}", table.name())
    }
}

/// Resolve `E` and generate its CREATE TABLE statement.
pub fn generate_create_ddl<E: Entity>(registry: &MetadataRegistry) -> Result<String> {
    let table = registry.resolve::<E>()?;
    let sql = DdlGenerator::create_sql(&table);
    if registry.settings().debug() {
        tracing::debug!(tag = LOG_TAG, sql = %sql, "generated CREATE TABLE");
    }
    Ok(sql)
}

/// Resolve `E` and generate its legacy DROP TABLE statement.
pub fn generate_drop_ddl<E: Entity>(registry: &MetadataRegistry) -> Result<String> {
    let table = registry.resolve::<E>()?;
    let sql = DdlGenerator::drop_sql(&table);
    if registry.settings().debug() {
        tracing::debug!(tag = LOG_TAG, sql = %sql, "generated DROP TABLE");
    }
    Ok(sql)
}
