//! SQL identifier validation.
//!
//! Table and column names are written into generated SQL verbatim (the DDL
//! text format has no quoting), so they are restricted to plain identifiers
//! that are not SQLite keywords when metadata is resolved. Values never
//! reach SQL text; they are bound.

use regex::Regex;
use std::sync::OnceLock;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// SQLite keywords, upper case and sorted for binary search.
const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern compiles"))
}

/// Check whether `name` is a SQLite keyword, ignoring case.
///
/// Keywords cannot be used unquoted as table or column names.
pub fn is_reserved_keyword(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SQLITE_KEYWORDS.binary_search(&upper.as_str()).is_ok()
}

/// Check whether `name` can be written unquoted into generated SQL.
///
/// It must match `[A-Za-z_][A-Za-z0-9_]*` and must not be a SQLite keyword.
///
/// # Examples
///
/// ```
/// use aorm_core::is_valid_identifier;
///
/// assert!(is_valid_identifier("user_name"));
/// assert!(!is_valid_identifier("user name"));
/// assert!(!is_valid_identifier("users; DROP TABLE x"));
/// assert!(!is_valid_identifier("order"));
/// ```
#[inline]
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_match(name) && !is_reserved_keyword(name)
}

/// Explain why `name` cannot be used as a table or column name, if it can't.
pub(crate) fn identifier_problem(name: &str) -> Option<&'static str> {
    if !identifier_regex().is_match(name) {
        Some("is not a plain SQL identifier")
    } else if is_reserved_keyword(name) {
        Some("is a reserved SQL keyword")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["id", "_id", "User", "order_item2", "x", "orders", "keys", "_order"] {
            assert!(is_valid_identifier(name), "{name}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for name in ["", "2fast", "a-b", "a.b", "\"quoted\"", "na me", "x'--", "ünï"] {
            assert!(!is_valid_identifier(name), "{name}");
        }
    }

    #[test]
    fn keyword_list_is_sorted() {
        assert!(SQLITE_KEYWORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rejects_keywords_in_any_case() {
        for name in ["order", "GROUP", "Index", "default", "from", "select", "key", "Table"] {
            assert!(is_reserved_keyword(name), "{name}");
            assert!(!is_valid_identifier(name), "{name}");
        }
    }

    #[test]
    fn problem_messages() {
        assert_eq!(identifier_problem("name"), None);
        assert_eq!(
            identifier_problem("a b"),
            Some("is not a plain SQL identifier")
        );
        assert_eq!(identifier_problem("where"), Some("is a reserved SQL keyword"));
    }
}
