//! Column specifications and resolved column descriptors.

use serde::Serialize;

use crate::error::{Error, MappingErrorKind, Result};
use crate::identifiers::identifier_problem;
use crate::types::{SqlType, TypeMapper};

/// Declared description of one column, as supplied by an entity.
///
/// This is the raw input to metadata resolution; nothing here has been
/// validated yet. Usually produced by `#[derive(Entity)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Rust field name
    pub field: &'static str,
    /// Database column name (may differ from field name)
    pub column: &'static str,
    /// Host type as written in source, e.g. `Option<i64>`
    pub host_type: &'static str,
    /// Explicit SQL type, taking precedence over the type-mapping table
    pub sql_type: Option<&'static str>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
    /// Default value, rendered as a literal of the column type
    pub default: Option<&'static str>,
}

impl ColumnSpec {
    /// Create a column spec whose column name equals the field name.
    pub const fn new(field: &'static str, host_type: &'static str) -> Self {
        Self {
            field,
            column: field,
            host_type,
            sql_type: None,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            unique: false,
            default: None,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column = name;
        self
    }

    /// Set an explicit SQL type name.
    pub const fn sql_type(mut self, name: &'static str) -> Self {
        self.sql_type = Some(name);
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set NOT NULL flag.
    pub const fn not_null(mut self, value: bool) -> Self {
        self.not_null = value;
        self
    }

    /// Set unique flag.
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Set default value.
    pub const fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }
}

/// One resolved, validated column of a table.
///
/// Immutable once constructed; owned by a `TableDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    name: String,
    field: String,
    sql_type: SqlType,
    nullable: bool,
    primary_key: bool,
    auto_increment: bool,
    generated_key: bool,
    unique: bool,
    default: Option<String>,
}

impl ColumnDescriptor {
    /// Validate a declared column and build its descriptor.
    ///
    /// `entity` names the owning Rust type for error messages.
    pub fn from_spec(entity: &str, spec: &ColumnSpec) -> Result<Self> {
        let fail = |kind: MappingErrorKind, message: String| {
            Err(Error::mapping(entity, kind, format!("{}: {}", entity, message)))
        };

        if let Some(problem) = identifier_problem(spec.column) {
            return fail(
                MappingErrorKind::InvalidIdentifier,
                format!("column name '{}' {}", spec.column, problem),
            );
        }

        let optional = TypeMapper::is_optional(spec.host_type);
        let sql_type = match spec.sql_type {
            Some(explicit) => match SqlType::parse(explicit) {
                Some(t) => t,
                None => {
                    return fail(
                        MappingErrorKind::UnmappedType,
                        format!("column '{}' declares unknown SQL type '{}'", spec.column, explicit),
                    );
                }
            },
            None => match TypeMapper::map(spec.host_type) {
                Some(mapped) => mapped.sql_type,
                None => {
                    return fail(
                        MappingErrorKind::UnmappedType,
                        format!(
                            "field '{}' has type '{}' with no SQL column type mapping",
                            spec.field, spec.host_type
                        ),
                    );
                }
            },
        };

        if spec.not_null && optional {
            return fail(
                MappingErrorKind::Contradiction,
                format!("column '{}' is NOT NULL but its field is an Option", spec.column),
            );
        }
        if spec.auto_increment && !(spec.primary_key && sql_type == SqlType::Integer) {
            return fail(
                MappingErrorKind::Contradiction,
                format!(
                    "column '{}' is AUTOINCREMENT but not an INTEGER primary key",
                    spec.column
                ),
            );
        }
        // An assigned row id is written back to the field, which must hold
        // every 64-bit value.
        let generated_key = spec.primary_key
            && sql_type == SqlType::Integer
            && TypeMapper::holds_row_id(spec.host_type);
        if spec.auto_increment && !generated_key {
            return fail(
                MappingErrorKind::Contradiction,
                format!(
                    "column '{}' is AUTOINCREMENT but field '{}' of type '{}' cannot hold a row id; use i64",
                    spec.column, spec.field, spec.host_type
                ),
            );
        }

        let default = match spec.default {
            Some(raw) => match sql_type.format_literal(raw) {
                Ok(literal) => Some(literal),
                Err(reason) => {
                    return fail(
                        MappingErrorKind::InvalidDefault,
                        format!("default of column '{}': {}", spec.column, reason),
                    );
                }
            },
            None => None,
        };

        Ok(Self {
            name: spec.column.to_string(),
            field: spec.field.to_string(),
            sql_type,
            nullable: !spec.not_null && !spec.primary_key,
            primary_key: spec.primary_key,
            auto_increment: spec.auto_increment,
            generated_key,
            unique: spec.unique,
            default,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Rust field this column is read from.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// The rendered default literal, if any.
    pub fn default_literal(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether the database assigns this column's value when the instance
    /// leaves it unset (SQLite's INTEGER PRIMARY KEY rowid alias).
    ///
    /// Only keys held in an `i64` field qualify. A narrower integer key is
    /// always written as given.
    pub fn is_generated_key(&self) -> bool {
        self.generated_key
    }

    /// Render the column definition used inside CREATE TABLE.
    ///
    /// `<name> <TYPE>[ PRIMARY KEY[ AUTOINCREMENT]][ NOT NULL][ UNIQUE][ DEFAULT <literal>]`
    pub fn to_sql(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type.sql_name());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
            if self.auto_increment {
                def.push_str(" AUTOINCREMENT");
            }
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }
}
