//! AORM Rust - a lightweight metadata-driven ORM for embedded SQLite.
//!
//! Entities describe their table once, through `#[derive(Entity)]` or a
//! hand-written [`Entity`] impl. From that description AORM provides:
//!
//! - A concurrent metadata registry that resolves each entity once
//! - CREATE TABLE / DROP TABLE generation
//! - INSERT, UPDATE, SELECT and DELETE statements with bound parameters
//! - Insert-or-update with a fast (key sentinel) or exact (SELECT) decision
//! - A SQLite executor built on the bundled library
//!
//! # Quick Start
//!
//! ```ignore
//! use aorm::prelude::*;
//!
//! #[derive(Entity, Debug, Default)]
//! #[aorm(table = "note")]
//! struct Note {
//!     #[aorm(id, auto_increment, column = "_id")]
//!     id: i64,
//!     #[aorm(not_null)]
//!     title: String,
//!     body: Option<String>,
//! }
//!
//! fn main() -> Result<()> {
//!     let session = Session::new(SqliteConnection::open_memory()?, Arc::new(Settings::from_env()));
//!     session.create_table::<Note>()?;
//!
//!     let mut note = Note { title: "hello".into(), ..Default::default() };
//!     session.insert(&mut note)?;          // note.id is now 1
//!
//!     note.body = Some("world".into());
//!     session.insert_or_update(&mut note)?; // key is set: UPDATE
//!
//!     let loaded: Option<Note> = session.find_by_key::<Note>(note.id)?;
//!     Ok(())
//! }
//! ```
//!
//! # Settings
//!
//! Behaviour is controlled by three flags on a shared [`Settings`]:
//! `debug` (log every statement through `tracing` under the `AORM` tag),
//! `support_extend` (include inherited columns) and `exact_insert_or_update`.
//! They can be read from `AORM_DEBUG`, `AORM_SUPPORT_EXTEND` and
//! `AORM_EXACT_UPSERT` with [`Settings::from_env`].

pub use aorm_core::{
    ColumnDescriptor, ColumnSpec, DatabaseError, DatabaseErrorKind, Entity, EntityInfo, Error,
    Executor, LOG_TAG, MappingError, MappingErrorKind, Result, Row, Settings, SqlType,
    TableDescriptor, TypeError, TypeMapper, Value,
};

pub use aorm_macros::Entity;

pub use aorm_query::{Statement, UpsertKind, UpsertOutcome, UpsertPolicy, UpsertState, dml};

pub use aorm_schema::{DdlGenerator, MetadataRegistry, generate_create_ddl, generate_drop_ddl};

pub use aorm_sqlite::{OpenFlags, SqliteConfig, SqliteConnection};

// Session management
pub mod session;
pub use session::{Session, SessionBuilder};

// ============================================================================
// Generic Entity Support Tests
// ============================================================================
//
// Generic parameters are fine as long as they stay out of mapped columns:
// the impl needs `Send + Sync + 'static`, and skipped fields are rebuilt
// with `Default` when rows are read.


/// Prelude module for convenient imports.
///
/// ```ignore
/// use aorm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Core traits and types (Entity is both the trait and the derive)
        Entity,
        EntityInfo,
        Error,
        Executor,
        Result,
        Row,
        Settings,
        Value,
        // Statements and upsert
        UpsertKind,
        UpsertOutcome,
        // Schema
        DdlGenerator,
        MetadataRegistry,
        // Session
        Session,
        SessionBuilder,
        // SQLite
        SqliteConfig,
        SqliteConnection,
    };
    pub use std::sync::Arc;
}
