//! DML generation: INSERT, UPDATE, SELECT and DELETE statements built from a
//! table descriptor.
//!
//! Values are always bound through numbered placeholders (`?1, ?2, ...`);
//! only validated identifiers are written into the SQL text. Columns appear
//! in descriptor order.

use aorm_core::{
    ColumnDescriptor, Entity, Error, LOG_TAG, MappingErrorKind, Result, Settings,
    TableDescriptor, Value, column_value,
};

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Emit this statement as a debug event when SQL logging is enabled.
    pub fn log(&self, settings: &Settings) {
        if settings.debug() {
            tracing::debug!(
                tag = LOG_TAG,
                sql = %self.sql,
                params = self.params.len(),
                "executing statement"
            );
        }
    }
}

fn placeholder(index: usize) -> String {
    format!("?{}", index)
}

/// Look up the value an instance supplies for `column`.
fn value_for<'a>(
    table: &TableDescriptor,
    row: &'a [(&'static str, Value)],
    column: &ColumnDescriptor,
) -> Result<&'a Value> {
    column_value(row, column.name()).ok_or_else(|| {
        Error::mapping(
            table.entity(),
            MappingErrorKind::MissingValue,
            format!(
                "{}: instance supplies no value for column '{}'",
                table.entity(),
                column.name()
            ),
        )
    })
}

/// The primary key value of an instance.
///
/// # Errors
///
/// Fails if the table has no primary key or the instance does not supply it.
pub fn key_value<E: Entity>(table: &TableDescriptor, entity: &E) -> Result<Value> {
    let pk = table.require_primary_key()?;
    let row = entity.to_row();
    value_for(table, &row, pk).cloned()
}

/// `INSERT INTO t (c1, c2) VALUES (?1, ?2)`.
///
/// A generated key (INTEGER primary key) whose value is unset is omitted so
/// the database assigns it. When no column remains the statement is
/// `INSERT INTO t DEFAULT VALUES`.
pub fn insert<E: Entity>(table: &TableDescriptor, entity: &E) -> Result<Statement> {
    let row = entity.to_row();
    let mut columns = Vec::with_capacity(table.column_count());
    let mut params = Vec::with_capacity(table.column_count());

    for column in table.columns() {
        let value = value_for(table, &row, column)?;
        if column.is_generated_key() && value.is_unset_key() {
            continue;
        }
        columns.push(column.name());
        params.push(value.clone());
    }

    if columns.is_empty() {
        return Ok(Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", table.name()),
            params,
        ));
    }

    let placeholders: Vec<String> = (1..=params.len()).map(placeholder).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(Statement::new(sql, params))
}

/// `UPDATE t SET c2 = ?1, c3 = ?2 WHERE pk = ?3`.
///
/// A table whose only column is the key sets the key to itself, so the
/// statement still reports whether the row exists.
pub fn update<E: Entity>(table: &TableDescriptor, entity: &E) -> Result<Statement> {
    let pk = table.require_primary_key()?;
    let row = entity.to_row();
    let key = value_for(table, &row, pk)?.clone();

    let mut assignments = Vec::with_capacity(table.column_count());
    let mut params = Vec::with_capacity(table.column_count());
    for column in table.columns().iter().filter(|c| !c.is_primary_key()) {
        params.push(value_for(table, &row, column)?.clone());
        assignments.push(format!("{} = {}", column.name(), placeholder(params.len())));
    }
    if assignments.is_empty() {
        params.push(key.clone());
        assignments.push(format!("{} = {}", pk.name(), placeholder(params.len())));
    }

    params.push(key);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        table.name(),
        assignments.join(", "),
        pk.name(),
        placeholder(params.len())
    );
    Ok(Statement::new(sql, params))
}

/// `SELECT c1, c2 FROM t WHERE pk = ?1`.
pub fn select_by_key(table: &TableDescriptor, key: Value) -> Result<Statement> {
    let pk = table.require_primary_key()?;
    let sql = format!(
        "{} WHERE {} = {}",
        select_all(table).sql,
        pk.name(),
        placeholder(1)
    );
    Ok(Statement::new(sql, vec![key]))
}

/// `DELETE FROM t WHERE pk = ?1`.
pub fn delete(table: &TableDescriptor, key: Value) -> Result<Statement> {
    let pk = table.require_primary_key()?;
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        table.name(),
        pk.name(),
        placeholder(1)
    );
    Ok(Statement::new(sql, vec![key]))
}

/// `SELECT c1, c2 FROM t`.
pub fn select_all(table: &TableDescriptor) -> Statement {
    let columns: Vec<&str> = table.column_names().collect();
    Statement::new(
        format!("SELECT {} FROM {}", columns.join(", "), table.name()),
        Vec::new(),
    )
}

/// `SELECT COUNT(*) FROM t`.
pub fn count(table: &TableDescriptor) -> Statement {
    Statement::new(format!("SELECT COUNT(*) FROM {}", table.name()), Vec::new())
}
