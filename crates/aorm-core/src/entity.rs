//! Entity trait for mapping Rust types to database tables.
//!
//! The `Entity` trait is the explicit metadata contract that replaces
//! annotation scanning: each mapped type describes its table and columns,
//! and converts itself to and from rows keyed by column name. It is
//! typically derived with `#[derive(Entity)]` from `aorm-macros`.

use crate::Result;
use crate::column::ColumnSpec;
use crate::error::{Error, MappingErrorKind};
use crate::row::Row;
use crate::value::Value;

/// Static description of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityInfo {
    /// Rust type name, used in error messages
    pub type_name: &'static str,
    /// Table name; `None` when the type was not marked as a table
    pub table: Option<&'static str>,
    /// Columns declared directly on this type, in declaration order
    pub columns: &'static [ColumnSpec],
    /// Description of the base entity whose columns this one extends
    pub base: Option<fn() -> EntityInfo>,
}

impl EntityInfo {
    /// Describe a table-mapped type.
    pub const fn table(
        type_name: &'static str,
        table: &'static str,
        columns: &'static [ColumnSpec],
    ) -> Self {
        Self {
            type_name,
            table: Some(table),
            columns,
            base: None,
        }
    }

    /// Describe a type that is not itself a table (for example a base
    /// that only contributes columns).
    pub const fn unmapped(type_name: &'static str, columns: &'static [ColumnSpec]) -> Self {
        Self {
            type_name,
            table: None,
            columns,
            base: None,
        }
    }

    /// Set the base entity.
    pub const fn extends(mut self, base: fn() -> EntityInfo) -> Self {
        self.base = Some(base);
        self
    }

    /// Collect the columns this entity maps.
    ///
    /// With `include_base` the base chain is flattened, root first, so that
    /// inherited columns precede the entity's own.
    pub fn collect_columns(&self, include_base: bool) -> Vec<ColumnSpec> {
        let mut chain = vec![*self];
        if include_base {
            let mut next = self.base;
            while let Some(describe) = next {
                let info = describe();
                next = info.base;
                chain.push(info);
            }
        }
        chain
            .iter()
            .rev()
            .flat_map(|info| info.columns.iter().copied())
            .collect()
    }
}

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// use aorm::Entity;
///
/// #[derive(Entity)]
/// #[aorm(table = "user")]
/// struct User {
///     #[aorm(id, auto_increment)]
///     id: i64,
///     name: String,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// Describe the table and its declared columns.
    fn describe() -> EntityInfo;

    /// Convert this instance to column values, keyed by column name.
    ///
    /// Includes the columns of any base entity.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct an instance from a database row.
    ///
    /// Every column this entity declares itself must be present.
    fn from_row(row: &Row) -> Result<Self>;

    /// Construct an instance that is the base of an extending entity.
    ///
    /// Inherited columns are not selected when extend support is off, so
    /// derived implementations give missing columns their type's default.
    fn from_base_row(row: &Row) -> Result<Self> {
        Self::from_row(row)
    }

    /// Store a database-assigned primary key on this instance.
    ///
    /// The default rejects the call; entities with a generated key
    /// override it.
    fn set_primary_key(&mut self, value: Value) -> Result<()> {
        let _ = value;
        Err(Error::mapping(
            Self::describe().type_name,
            MappingErrorKind::MissingPrimaryKey,
            format!("{} cannot receive a generated primary key", Self::describe().type_name),
        ))
    }
}

/// Find the value of `column` in a row produced by [`Entity::to_row`].
pub fn column_value<'a>(row: &'a [(&'static str, Value)], column: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(name, _)| *name == column)
        .map(|(_, value)| value)
}
