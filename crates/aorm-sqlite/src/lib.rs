//! SQLite executor for AORM Rust.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate provides the `Executor` implementation that runs generated
//! statements against SQLite, through `libsqlite3-sys` with the bundled
//! amalgamation.
//!
//! # Example
//!
//! ```rust,ignore
//! use aorm_sqlite::SqliteConnection;
//! use aorm_core::{Executor, Value};
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("CREATE TABLE user(name TEXT)\n")?;
//! let id = conn.insert("INSERT INTO user (name) VALUES (?1)", &[Value::Text("Alice".into())])?;
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite storage class |
//! |-------|----------------------|
//! | `Bool`, `TinyInt`, `SmallInt`, `Int`, `BigInt` | INTEGER |
//! | `Float`, `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Null` | NULL |
//!
//! Integers are read back as `Int` when they fit in 32 bits, else `BigInt`.
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`, using internal mutex
//! synchronization to protect the underlying SQLite handle.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
