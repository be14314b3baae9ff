//! The execution collaborator.
//!
//! AORM generates SQL text and bound parameters; an [`Executor`] runs them
//! against a database. Database errors are returned as
//! [`Error::Database`](crate::Error::Database) and propagated unchanged by
//! every caller.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A database handle capable of running generated statements.
///
/// Parameters bind to numbered placeholders `?1, ?2, ...` in order.
/// Implementations must be `Send + Sync`; they serialise access to their
/// underlying handle as needed.
///
/// # Example
///
/// ```rust,ignore
/// conn.execute_raw("CREATE TABLE log(line TEXT)\n")?;
/// let n = conn.execute("DELETE FROM log WHERE line = ?1", &[Value::Text("x".into())])?;
/// let rows = conn.query("SELECT line FROM log", &[])?;
/// ```
pub trait Executor: Send + Sync {
    /// Execute SQL without parameters or results (DDL).
    fn execute_raw(&self, sql: &str) -> Result<()>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and return every result row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute an INSERT and return the row id of the inserted row.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }
}

impl<T: Executor + ?Sized> Executor for &T {
    fn execute_raw(&self, sql: &str) -> Result<()> {
        (**self).execute_raw(sql)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        (**self).insert(sql, params)
    }
}

impl<T: Executor + ?Sized> Executor for std::sync::Arc<T> {
    fn execute_raw(&self, sql: &str) -> Result<()> {
        (**self).execute_raw(sql)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        (**self).insert(sql, params)
    }
}
