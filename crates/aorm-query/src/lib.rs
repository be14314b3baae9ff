//! DML generation for AORM Rust.
//!
//! `aorm-query` turns resolved table metadata into executable statements:
//!
//! - **DML**: INSERT, UPDATE, SELECT and DELETE with bound parameters.
//! - **Upsert**: the insert-or-update policy in fast and exact modes.
//!
//! Statements run through the `Executor` trait from `aorm-core`. Most users
//! reach these through the `Session` in the `aorm` facade crate.

pub mod dml;
pub mod upsert;

pub use dml::Statement;
pub use upsert::{UpsertKind, UpsertOutcome, UpsertPolicy, UpsertState, insert_entity};
