//! SQL type definitions and the host-type mapping table.
//!
//! Column types follow SQLite's storage classes. The [`TypeMapper`] owns the
//! complete, explicit table from Rust field types to SQL column types; any
//! host type missing from the table is rejected instead of guessed.

use serde::{Deserialize, Serialize};

/// SQL column types supported by AORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl SqlType {
    /// Get the SQL type name for this type.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Numeric => "NUMERIC",
        }
    }

    /// Parse an explicit SQL type name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "INTEGER" => Some(SqlType::Integer),
            "REAL" => Some(SqlType::Real),
            "TEXT" => Some(SqlType::Text),
            "BLOB" => Some(SqlType::Blob),
            "NUMERIC" => Some(SqlType::Numeric),
            _ => None,
        }
    }

    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Real | SqlType::Numeric)
    }

    /// Render a declared default value as a SQL literal of this type.
    ///
    /// Text is single-quoted with embedded quotes doubled, blobs must be
    /// given as hex and become `X'..'`, numbers must parse. Returns the
    /// reason on failure.
    pub fn format_literal(&self, raw: &str) -> Result<String, String> {
        if raw.eq_ignore_ascii_case("NULL") {
            return Ok("NULL".to_string());
        }
        match self {
            SqlType::Integer => match raw {
                "true" => Ok("1".to_string()),
                "false" => Ok("0".to_string()),
                _ => raw
                    .trim()
                    .parse::<i64>()
                    .map(|v| v.to_string())
                    .map_err(|_| format!("'{}' is not an integer", raw)),
            },
            SqlType::Real | SqlType::Numeric => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(raw.trim().to_string()),
                _ => Err(format!("'{}' is not a finite number", raw)),
            },
            SqlType::Text => Ok(format!("'{}'", raw.replace('\'', "''"))),
            SqlType::Blob => {
                let hex = raw.trim();
                if hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(format!("X'{}'", hex))
                } else {
                    Err(format!("'{}' is not a hex blob literal", raw))
                }
            }
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// The result of mapping one host field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedType {
    pub sql_type: SqlType,
    /// The host type is `Option<_>`
    pub optional: bool,
}

/// Maps Rust field types to SQL column types.
pub struct TypeMapper;

impl TypeMapper {
    /// The complete host-type table. Keys are normalized type names.
    pub const TABLE: &'static [(&'static str, SqlType)] = &[
        ("bool", SqlType::Integer),
        ("i8", SqlType::Integer),
        ("i16", SqlType::Integer),
        ("i32", SqlType::Integer),
        ("i64", SqlType::Integer),
        ("u8", SqlType::Integer),
        ("u16", SqlType::Integer),
        ("u32", SqlType::Integer),
        ("f32", SqlType::Real),
        ("f64", SqlType::Real),
        ("String", SqlType::Text),
        ("Vec<u8>", SqlType::Blob),
    ];

    /// Map a host type (as written in source, e.g. `Option<i64>` or
    /// `std::string::String`) to its column type.
    ///
    /// Returns `None` for types outside the table.
    pub fn map(host_type: &str) -> Option<MappedType> {
        let normalized = normalize(&host_type.split_whitespace().collect::<String>());
        let (inner, optional) = match split_generic(&normalized) {
            Some(("Option", arg)) => (arg.to_string(), true),
            _ => (normalized, false),
        };
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == inner)
            .map(|(_, sql_type)| MappedType {
                sql_type: *sql_type,
                optional,
            })
    }

    /// Whether the host type is `Option<_>`, regardless of its inner type.
    pub fn is_optional(host_type: &str) -> bool {
        let normalized = normalize(&host_type.split_whitespace().collect::<String>());
        matches!(split_generic(&normalized), Some(("Option", _)))
    }

    /// Whether the host type is `i64` or `Option<i64>`, the only field types
    /// that can hold any SQLite row id.
    pub fn holds_row_id(host_type: &str) -> bool {
        let normalized = normalize(&host_type.split_whitespace().collect::<String>());
        match split_generic(&normalized) {
            Some(("Option", arg)) => arg == "i64",
            Some(_) => false,
            None => normalized == "i64",
        }
    }
}

/// Strip module paths from every segment: `std::vec::Vec<std::primitive::u8>` -> `Vec<u8>`.
fn normalize(ty: &str) -> String {
    let head_end = ty.find('<').unwrap_or(ty.len());
    let start = ty[..head_end].rfind("::").map_or(0, |i| i + 2);
    let seg = &ty[start..];
    match split_generic(seg) {
        Some((head, arg)) => format!("{}<{}>", head, normalize(arg)),
        None => seg.to_string(),
    }
}

fn split_generic(ty: &str) -> Option<(&str, &str)> {
    let open = ty.find('<')?;
    let inner = ty.strip_suffix('>')?;
    Some((&ty[..open], &inner[open + 1..]))
}
