//! Metadata registry and DDL generation for AORM Rust.
//!
//! This crate provides:
//! - Resolution of `Entity` descriptions into cached `TableDescriptor`s
//! - CREATE TABLE / DROP TABLE generation from those descriptors

pub mod ddl;
pub mod registry;

pub use ddl::{DdlGenerator, generate_create_ddl, generate_drop_ddl};
pub use registry::MetadataRegistry;
