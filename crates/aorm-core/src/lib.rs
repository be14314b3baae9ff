//! Core types and traits for AORM Rust.
//!
//! This crate provides the metadata model the rest of the workspace builds on:
//!
//! - `Entity` trait describing how a struct maps to a table
//! - `TypeMapper` and `SqlType` for host-type to column-type mapping
//! - `ColumnDescriptor` / `TableDescriptor` validated table metadata
//! - `Value` / `Row` for bound parameters and result rows
//! - `Executor` trait for the database collaborator
//! - `Settings` shared runtime flags

pub mod column;
pub mod entity;
pub mod error;
pub mod executor;
pub mod identifiers;
pub mod row;
pub mod settings;
pub mod table;
pub mod types;
pub mod value;

pub use column::{ColumnDescriptor, ColumnSpec};
pub use entity::{Entity, EntityInfo, column_value};
pub use error::{
    DatabaseError, DatabaseErrorKind, Error, MappingError, MappingErrorKind, Result, TypeError,
};
pub use executor::Executor;
pub use identifiers::{is_reserved_keyword, is_valid_identifier};
pub use row::{ColumnInfo, Row};
pub use settings::{LOG_TAG, Settings};
pub use table::TableDescriptor;
pub use types::{MappedType, SqlType, TypeMapper};
pub use value::Value;
