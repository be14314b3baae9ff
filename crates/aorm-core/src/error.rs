//! Error types for AORM operations.

use std::fmt;

/// The primary error type for all AORM operations.
#[derive(Debug)]
pub enum Error {
    /// The entity's table/column description is missing or contradictory
    Mapping(MappingError),
    /// Errors reported by the database execution collaborator
    Database(DatabaseError),
    /// Type conversion errors while decoding rows
    Type(TypeError),
    /// Custom error with message
    Custom(String),
}

/// A problem with an entity's metadata.
///
/// Mapping errors point at a programming or configuration mistake and are
/// never retried.
#[derive(Debug)]
pub struct MappingError {
    /// Rust type name of the offending entity
    pub entity: String,
    pub kind: MappingErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// The type carries no table description
    NotATable,
    /// A table or column name is not a plain SQL identifier
    InvalidIdentifier,
    /// Two columns share a name
    DuplicateColumn,
    /// More than one column is flagged as primary key
    MultiplePrimaryKeys,
    /// A key-based operation was requested on a table without primary key
    MissingPrimaryKey,
    /// The host type has no entry in the type-mapping table
    UnmappedType,
    /// A default value cannot be rendered for the column type
    InvalidDefault,
    /// Column flags contradict each other (e.g. NOT NULL on an `Option`)
    Contradiction,
    /// An instance did not supply a value for a mapped column
    MissingValue,
}

impl MappingErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MappingErrorKind::NotATable => "not a table",
            MappingErrorKind::InvalidIdentifier => "invalid identifier",
            MappingErrorKind::DuplicateColumn => "duplicate column",
            MappingErrorKind::MultiplePrimaryKeys => "multiple primary keys",
            MappingErrorKind::MissingPrimaryKey => "missing primary key",
            MappingErrorKind::UnmappedType => "unmapped type",
            MappingErrorKind::InvalidDefault => "invalid default",
            MappingErrorKind::Contradiction => "contradictory column",
            MappingErrorKind::MissingValue => "missing value",
        }
    }
}

#[derive(Debug)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// Failed to open the database
    Connect,
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Data too large for column
    DataTruncation,
    /// Database is busy or locked
    Busy,
    /// Statement was interrupted
    Interrupted,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl MappingError {
    pub fn new(entity: impl Into<String>, kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            kind,
            message: message.into(),
        }
    }

    /// The error raised when a type without a table description is resolved.
    pub fn not_a_table(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        let message = format!(
            "No mapping to {}, did you forget to mark this type as a table?",
            entity
        );
        Self::new(entity, MappingErrorKind::NotATable, message)
    }
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            sql: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the statement that failed.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Is this a constraint violation (unique, primary key, foreign key)?
    pub fn is_constraint_violation(&self) -> bool {
        self.kind == DatabaseErrorKind::Constraint
    }
}

impl Error {
    /// Shorthand for building a mapping error.
    pub fn mapping(entity: impl Into<String>, kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Error::Mapping(MappingError::new(entity, kind, message))
    }

    /// Is this a mapping (metadata) error?
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Error::Mapping(_))
    }

    /// The mapping error kind, if this is a mapping error.
    pub fn mapping_kind(&self) -> Option<MappingErrorKind> {
        match self {
            Error::Mapping(m) => Some(m.kind),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Database(d) => d.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mapping(e) => write!(f, "Mapping error ({}): {}", e.kind.as_str(), e.message),
            Error::Database(e) => write!(f, "Database error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sql) = &self.sql {
            write!(f, "{} (while executing: {})", self.message, sql)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for AORM operations.
pub type Result<T> = std::result::Result<T, Error>;
