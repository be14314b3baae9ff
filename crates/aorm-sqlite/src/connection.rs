//! SQLite connection implementation.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the `Executor` trait from aorm-core.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::borrow_as_ptr)]
#![allow(clippy::if_not_else)]

use crate::ffi;
use crate::types;
use aorm_core::{ColumnInfo, DatabaseError, DatabaseErrorKind, Error, Executor, Row, Value};
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Inner state of the SQLite connection, protected by a mutex.
struct SqliteInner {
    db: *mut ffi::sqlite3,
}

// SAFETY: the handle is only used while holding the connection's Mutex.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
///
/// This is a thread-safe wrapper around a SQLite database handle; every
/// call serialises on an internal mutex.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Database(DatabaseError::new(
                DatabaseErrorKind::Connect,
                "Invalid path: contains null byte",
            ))
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = errmsg(db);
                    ffi::sqlite3_close(db);
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Database(DatabaseError::new(
                DatabaseErrorKind::Connect,
                format!("Failed to open database: {}", msg),
            )));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::trace!(path = %config.path, "opened SQLite database");
        Ok(Self {
            inner: Mutex::new(SqliteInner { db }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    // A panic while holding the lock cannot leave the handle half-used:
    // every statement is finalized before the guard is dropped.
    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (for DDL, etc.)
    ///
    /// Multiple `;`-separated statements are allowed.
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(inner.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg is valid and owned by us
                let msg = unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() };
                unsafe { ffi::sqlite3_free(errmsg.cast()) };
                msg
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Database(
                DatabaseError::new(error_code_to_kind(rc), msg).with_sql(sql),
            ));
        }

        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> i32 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) }
    }

    /// Prepare and execute a query, returning all rows.
    fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let inner = self.lock();
        let stmt = Statement::prepare(inner.db, sql)?;
        stmt.bind_all(params)?;

        // SAFETY: stmt is valid
        let col_count = unsafe { ffi::sqlite3_column_count(stmt.raw) };
        let col_names = (0..col_count)
            .map(|i| {
                // SAFETY: stmt is valid, i is in range
                unsafe { types::column_name(stmt.raw, i) }.unwrap_or_else(|| format!("col{}", i))
            })
            .collect();
        let columns = Arc::new(ColumnInfo::new(col_names));

        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            match unsafe { ffi::sqlite3_step(stmt.raw) } {
                ffi::SQLITE_ROW => {
                    let values = (0..col_count)
                        // SAFETY: stmt is valid, we just got SQLITE_ROW
                        .map(|i| unsafe { types::read_column(stmt.raw, i) })
                        .collect();
                    rows.push(Row::with_columns(Arc::clone(&columns), values));
                }
                ffi::SQLITE_DONE => break,
                _ => return Err(step_error(inner.db, sql)),
            }
        }

        tracing::trace!(sql = %sql, rows = rows.len(), "query finished");
        Ok(rows)
    }

    /// Prepare and execute a statement, returning rows affected and the
    /// last inserted rowid, both read under the same lock.
    fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<(u64, i64), Error> {
        let inner = self.lock();
        let stmt = Statement::prepare(inner.db, sql)?;
        stmt.bind_all(params)?;

        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt.raw) };
        drop(stmt);

        match rc {
            ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                // SAFETY: db is valid
                let (changes, rowid) = unsafe {
                    (
                        ffi::sqlite3_changes(inner.db),
                        ffi::sqlite3_last_insert_rowid(inner.db),
                    )
                };
                tracing::trace!(sql = %sql, changes, "statement finished");
                Ok((changes as u64, rowid))
            }
            _ => Err(step_error(inner.db, sql)),
        }
    }
}

impl Executor for SqliteConnection {
    fn execute_raw(&self, sql: &str) -> aorm_core::Result<()> {
        SqliteConnection::execute_raw(self, sql)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> aorm_core::Result<u64> {
        self.execute_sync(sql, params).map(|(changes, _)| changes)
    }

    fn query(&self, sql: &str, params: &[Value]) -> aorm_core::Result<Vec<Row>> {
        self.query_sync(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> aorm_core::Result<i64> {
        self.execute_sync(sql, params).map(|(_, rowid)| rowid)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        if !inner.db.is_null() {
            // SAFETY: db is valid and no statements outlive their call
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
        }
    }
}

/// A prepared statement, finalized on drop.
struct Statement<'a> {
    raw: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    sql: &'a str,
}

impl<'a> Statement<'a> {
    fn prepare(db: *mut ffi::sqlite3, sql: &'a str) -> Result<Self, Error> {
        let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;
        let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                db,
                c_sql.as_ptr(),
                c_sql.as_bytes().len() as c_int,
                &mut raw,
                ptr::null_mut(),
            )
        };

        if rc != ffi::SQLITE_OK {
            return Err(step_error(db, sql));
        }
        Ok(Self { raw, db, sql })
    }

    fn bind_all(&self, params: &[Value]) -> Result<(), Error> {
        // SAFETY: raw is valid
        let expected = unsafe { ffi::sqlite3_bind_parameter_count(self.raw) } as usize;
        if expected != params.len() {
            return Err(Error::Database(
                DatabaseError::new(
                    DatabaseErrorKind::Database,
                    format!(
                        "statement expects {} parameters, {} given",
                        expected,
                        params.len()
                    ),
                )
                .with_sql(self.sql),
            ));
        }

        for (i, param) in params.iter().enumerate() {
            // SAFETY: raw is valid, index is 1-based and in range
            let rc = unsafe { types::bind_value(self.raw, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                return Err(bind_error(self.db, self.sql, i + 1));
            }
        }
        Ok(())
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        // SAFETY: raw came from sqlite3_prepare_v2; finalizing NULL is a no-op
        unsafe {
            ffi::sqlite3_finalize(self.raw);
        }
    }
}

/// Read the current error message of a connection.
///
/// # Safety
/// `db` must be a valid connection handle.
unsafe fn errmsg(db: *mut ffi::sqlite3) -> String {
    // SAFETY: guaranteed by the caller
    unsafe { CStr::from_ptr(ffi::sqlite3_errmsg(db)) }
        .to_string_lossy()
        .into_owned()
}

fn null_byte_error(sql: &str) -> Error {
    Error::Database(
        DatabaseError::new(DatabaseErrorKind::Syntax, "SQL contains null byte").with_sql(sql),
    )
}

fn bind_error(db: *mut ffi::sqlite3, sql: &str, param_index: usize) -> Error {
    // SAFETY: db is valid
    let msg = unsafe { errmsg(db) };
    Error::Database(
        DatabaseError::new(
            DatabaseErrorKind::Database,
            format!("Failed to bind parameter {}: {}", param_index, msg),
        )
        .with_sql(sql),
    )
}

fn step_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe { (errmsg(db), ffi::sqlite3_errcode(db)) };
    let kind = if code == ffi::SQLITE_ERROR && msg.contains("syntax error") {
        DatabaseErrorKind::Syntax
    } else if code == ffi::SQLITE_ERROR && msg.starts_with("no such") {
        DatabaseErrorKind::NotFound
    } else {
        error_code_to_kind(code)
    };
    Error::Database(DatabaseError::new(kind, msg).with_sql(sql))
}

fn error_code_to_kind(code: c_int) -> DatabaseErrorKind {
    // Extended result codes carry the primary code in the low byte.
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => DatabaseErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => DatabaseErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH | ffi::SQLITE_READONLY => {
            DatabaseErrorKind::Permission
        }
        ffi::SQLITE_NOTFOUND => DatabaseErrorKind::NotFound,
        ffi::SQLITE_TOOBIG => DatabaseErrorKind::DataTruncation,
        ffi::SQLITE_INTERRUPT => DatabaseErrorKind::Interrupted,
        _ => DatabaseErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn_with_table() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT UNIQUE, age INTEGER)")
            .unwrap();
        conn
    }

    fn db_kind(err: &Error) -> Option<DatabaseErrorKind> {
        match err {
            Error::Database(e) => Some(e.kind),
            _ => None,
        }
    }

    #[test]
    fn test_open_memory() {
        let conn = SqliteConnection::open_memory().unwrap();
        assert_eq!(conn.path(), ":memory:");
    }

    #[test]
    fn test_execute_raw() {
        let conn = conn_with_table();
        conn.execute_raw("INSERT INTO test (name) VALUES ('Alice')")
            .unwrap();
        assert_eq!(conn.changes(), 1);
        assert_eq!(conn.last_insert_rowid(), 1);
    }

    #[test]
    fn test_query_rows() {
        let conn = conn_with_table();
        conn.execute_raw("INSERT INTO test (name) VALUES ('Alice'), ('Bob')")
            .unwrap();

        let rows = conn.query("SELECT * FROM test ORDER BY id", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_named::<i32>("id").unwrap(), 1);
        assert_eq!(rows[0].get_named::<String>("name").unwrap(), "Alice");
        assert_eq!(rows[1].get_named::<i64>("id").unwrap(), 2);
        assert_eq!(rows[1].get_named::<String>("name").unwrap(), "Bob");
    }

    #[test]
    fn test_numbered_parameters() {
        let conn = conn_with_table();
        let id = conn
            .insert(
                "INSERT INTO test (name, age) VALUES (?1, ?2)",
                &[Value::Text("Alice".to_string()), Value::Int(30)],
            )
            .unwrap();
        assert_eq!(id, 1);

        let rows = conn
            .query(
                "SELECT name, age FROM test WHERE id = ?1",
                &[Value::BigInt(id)],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_named::<i32>("age").unwrap(), 30);
    }

    #[test]
    fn test_every_value_kind_round_trips() {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw("CREATE TABLE v (a INTEGER, b INTEGER, c REAL, d TEXT, e BLOB, f TEXT)")
            .unwrap();
        conn.execute(
            "INSERT INTO v VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &[
                Value::Bool(true),
                Value::BigInt(i64::MAX),
                Value::Double(1.5),
                Value::Text("héllo".into()),
                Value::Bytes(vec![0, 1, 255]),
                Value::Null,
            ],
        )
        .unwrap();

        let row = conn.query_one("SELECT * FROM v", &[]).unwrap().unwrap();
        assert!(row.get_named::<bool>("a").unwrap());
        assert_eq!(row.get_named::<i64>("b").unwrap(), i64::MAX);
        assert!((row.get_named::<f64>("c").unwrap() - 1.5).abs() < f64::EPSILON);
        assert_eq!(row.get_named::<String>("d").unwrap(), "héllo");
        assert_eq!(row.get_named::<Vec<u8>>("e").unwrap(), vec![0, 1, 255]);
        assert_eq!(row.get_named::<Option<String>>("f").unwrap(), None);
    }

    #[test]
    fn test_execute_reports_changes() {
        let conn = conn_with_table();
        conn.execute_raw("INSERT INTO test (name) VALUES ('a'), ('b'), ('c')")
            .unwrap();
        let n = conn
            .execute("UPDATE test SET age = ?1", &[Value::Int(1)])
            .unwrap();
        assert_eq!(n, 3);
        let n = conn
            .execute("DELETE FROM test WHERE id = ?1", &[Value::BigInt(99)])
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_error_kinds() {
        let conn = conn_with_table();
        conn.execute_raw("INSERT INTO test (name) VALUES ('dup')").unwrap();

        let err = conn
            .execute("INSERT INTO test (name) VALUES (?1)", &[Value::Text("dup".into())])
            .unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Constraint));
        assert_eq!(err.sql(), Some("INSERT INTO test (name) VALUES (?1)"));

        let err = conn.query("SELEC 1", &[]).unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Syntax));

        let err = conn.query("SELECT * FROM missing", &[]).unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::NotFound));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let conn = conn_with_table();
        let err = conn
            .execute("INSERT INTO test (name) VALUES (?1)", &[])
            .unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Database));
    }

    #[test]
    fn test_shared_between_threads() {
        let conn = Arc::new(conn_with_table());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let conn = Arc::clone(&conn);
                std::thread::spawn(move || {
                    conn.insert(
                        "INSERT INTO test (name) VALUES (?1)",
                        &[Value::Text(format!("t{}", i))],
                    )
                    .unwrap()
                })
            })
            .collect();
        let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_file_database() {
        let path = std::env::temp_dir().join(format!("aorm-sqlite-{}.db", std::process::id()));
        let path_str = path.to_string_lossy().into_owned();
        {
            let conn = SqliteConnection::open_file(path_str.clone()).unwrap();
            conn.execute_raw("CREATE TABLE IF NOT EXISTS t (x INTEGER)").unwrap();
            conn.execute("INSERT INTO t VALUES (?1)", &[Value::Int(7)]).unwrap();
        }
        let conn = SqliteConnection::open(&SqliteConfig::file(path_str).busy_timeout(100)).unwrap();
        let row = conn.query_one("SELECT COUNT(*) AS n FROM t", &[]).unwrap().unwrap();
        assert!(row.get_named::<i64>("n").unwrap() >= 1);
        drop(conn);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_read_only_flag() {
        let err = SqliteConnection::open(
            &SqliteConfig::file("/nonexistent-dir/aorm.db").flags(OpenFlags::read_only()),
        )
        .unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Connect));
    }

    #[test]
    fn test_open_flags_translation() {
        assert_eq!(OpenFlags::read_only().to_sqlite_flags(), ffi::SQLITE_OPEN_READONLY);
        assert_eq!(OpenFlags::read_write().to_sqlite_flags(), ffi::SQLITE_OPEN_READWRITE);
        assert_eq!(
            OpenFlags::create_read_write().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        // No mode at all falls back to read-write with create.
        assert_eq!(
            OpenFlags::default().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
    }

    #[test]
    fn test_read_only_connection_refuses_writes() {
        let path = std::env::temp_dir().join(format!("aorm-sqlite-ro-{}.db", std::process::id()));
        let path_str = path.to_string_lossy().into_owned();
        {
            let conn = SqliteConnection::open_file(path_str.clone()).unwrap();
            conn.execute_raw("CREATE TABLE IF NOT EXISTS t (x INTEGER)").unwrap();
        }

        let inserted = SqliteConnection::open(
            &SqliteConfig::file(path_str.clone()).flags(OpenFlags::read_write()),
        )
        .and_then(|conn| conn.execute("INSERT INTO t VALUES (?1)", &[Value::Int(1)]));
        assert_eq!(inserted.unwrap(), 1);

        let conn =
            SqliteConnection::open(&SqliteConfig::file(path_str).flags(OpenFlags::read_only()))
                .unwrap();
        let row = conn.query_one("SELECT COUNT(*) AS n FROM t", &[]).unwrap().unwrap();
        assert!(row.get_named::<i64>("n").unwrap() >= 1);
        let err = conn
            .execute("INSERT INTO t VALUES (?1)", &[Value::Int(2)])
            .unwrap_err();
        assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Permission));
        drop(conn);
        let _ = std::fs::remove_file(path);
    }
}
