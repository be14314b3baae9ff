//! Resolved table metadata.

use serde::Serialize;

use crate::column::{ColumnDescriptor, ColumnSpec};
use crate::error::{Error, MappingErrorKind, Result};
use crate::identifiers::identifier_problem;

/// A table name plus its ordered, validated columns.
///
/// Column order is the order in which the entity declared its columns
/// (inherited columns first), and is what DDL and positional parameter
/// binding rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    name: String,
    entity: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Option<usize>,
}

impl TableDescriptor {
    /// Validate a list of declared columns and build the descriptor.
    ///
    /// At most one column may be the primary key; a table without one is
    /// legal but cannot be used with key-based statements.
    pub fn from_specs(entity: &str, name: &str, specs: &[ColumnSpec]) -> Result<Self> {
        if let Some(problem) = identifier_problem(name) {
            return Err(Error::mapping(
                entity,
                MappingErrorKind::InvalidIdentifier,
                format!("{}: table name '{}' {}", entity, name, problem),
            ));
        }

        let mut columns: Vec<ColumnDescriptor> = Vec::with_capacity(specs.len());
        let mut primary_key = None;
        for spec in specs {
            let column = ColumnDescriptor::from_spec(entity, spec)?;
            if columns
                .iter()
                .any(|c| c.name().eq_ignore_ascii_case(column.name()))
            {
                return Err(Error::mapping(
                    entity,
                    MappingErrorKind::DuplicateColumn,
                    format!("{}: column '{}' is declared twice", entity, column.name()),
                ));
            }
            if column.is_primary_key() {
                if let Some(existing) = primary_key {
                    let existing: &ColumnDescriptor = &columns[existing];
                    return Err(Error::mapping(
                        entity,
                        MappingErrorKind::MultiplePrimaryKeys,
                        format!(
                            "{}: both '{}' and '{}' are marked as primary key",
                            entity,
                            existing.name(),
                            column.name()
                        ),
                    ));
                }
                primary_key = Some(columns.len());
            }
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(Error::mapping(
                entity,
                MappingErrorKind::Contradiction,
                format!("{}: table '{}' has no columns", entity, name),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            entity: entity.to_string(),
            columns,
            primary_key,
        })
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the entity this table was resolved from.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(ColumnDescriptor::name)
    }

    /// The primary key column, if the table has one.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.primary_key.map(|i| &self.columns[i])
    }

    /// The primary key column, or a mapping error for key-based operations.
    pub fn require_primary_key(&self) -> Result<&ColumnDescriptor> {
        self.primary_key().ok_or_else(|| {
            Error::mapping(
                &self.entity,
                MappingErrorKind::MissingPrimaryKey,
                format!(
                    "{}: table '{}' has no primary key column",
                    self.entity, self.name
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &[ColumnSpec] = &[
        ColumnSpec::new("id", "i64").primary_key(true),
        ColumnSpec::new("name", "String"),
        ColumnSpec::new("age", "Option<i32>"),
    ];

    #[test]
    fn keeps_declared_order() {
        let table = TableDescriptor::from_specs("app::User", "user", USER).unwrap();
        assert_eq!(table.name(), "user");
        assert_eq!(table.entity(), "app::User");
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["id", "name", "age"]);
        assert_eq!(table.primary_key().map(ColumnDescriptor::name), Some("id"));
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn duplicate_columns_rejected() {
        let specs = [ColumnSpec::new("a", "i32"), ColumnSpec::new("b", "i32").column("A")];
        let err = TableDescriptor::from_specs("t::T", "t", &specs).unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::DuplicateColumn));
    }

    #[test]
    fn two_primary_keys_rejected() {
        let specs = [
            ColumnSpec::new("a", "i32").primary_key(true),
            ColumnSpec::new("b", "i32").primary_key(true),
        ];
        let err = TableDescriptor::from_specs("t::T", "t", &specs).unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::MultiplePrimaryKeys));
    }

    #[test]
    fn no_primary_key_is_explicit_state() {
        let specs = [ColumnSpec::new("line", "String")];
        let table = TableDescriptor::from_specs("t::Log", "log", &specs).unwrap();
        assert!(table.primary_key().is_none());
        let err = table.require_primary_key().unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::MissingPrimaryKey));
    }

    #[test]
    fn bad_table_name_rejected() {
        let err = TableDescriptor::from_specs("t::T", "my table", USER).unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidIdentifier));
    }

    #[test]
    fn keyword_table_name_rejected() {
        let err = TableDescriptor::from_specs("t::T", "Order", USER).unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidIdentifier));
        assert!(err.to_string().contains("reserved SQL keyword"));
    }

    #[test]
    fn empty_table_rejected() {
        let err = TableDescriptor::from_specs("t::T", "t", &[]).unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::Contradiction));
    }

    #[test]
    fn serializes_for_inspection() {
        let table = TableDescriptor::from_specs("app::User", "user", USER).unwrap();
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["name"], "user");
        assert_eq!(json["columns"][1]["sql_type"], "Text");
    }
}
