//! Reserved keyword table
//!
//! Keywords are matched with a compile-time perfect hash map, so the table is
//! immutable and safe to read from every connection thread without locking.
//! Lookups expect the uppercased spelling.

use phf::phf_map;

use super::token::TokenKind;

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    // DML
    "SELECT" => TokenKind::Select,
    "FROM" => TokenKind::From,
    "WHERE" => TokenKind::Where,
    "INSERT" => TokenKind::Insert,
    "INTO" => TokenKind::Into,
    "VALUES" => TokenKind::Values,
    "UPDATE" => TokenKind::Update,
    "SET" => TokenKind::Set,
    "DELETE" => TokenKind::Delete,

    // DDL
    "CREATE" => TokenKind::Create,
    "TABLE" => TokenKind::Table,
    "DROP" => TokenKind::Drop,
    "INDEX" => TokenKind::Index,
    "VIEW" => TokenKind::View,
    "DATABASE" => TokenKind::Database,
    "SCHEMA" => TokenKind::Schema,
    "FUNCTION" => TokenKind::Function,
    "PROCEDURE" => TokenKind::Procedure,
    "TRIGGER" => TokenKind::Trigger,

    // Transactions
    "BEGIN" => TokenKind::Begin,
    "END" => TokenKind::End,
    "COMMIT" => TokenKind::Commit,
    "ROLLBACK" => TokenKind::Rollback,
    "TRANSACTION" => TokenKind::Transaction,

    // Joins and set operations
    "AS" => TokenKind::As,
    "ON" => TokenKind::On,
    "INNER" => TokenKind::Inner,
    "LEFT" => TokenKind::Left,
    "RIGHT" => TokenKind::Right,
    "FULL" => TokenKind::Full,
    "OUTER" => TokenKind::Outer,
    "JOIN" => TokenKind::Join,
    "UNION" => TokenKind::Union,
    "INTERSECT" => TokenKind::Intersect,
    "EXCEPT" => TokenKind::Except,

    // Clauses
    "GROUP" => TokenKind::Group,
    "BY" => TokenKind::By,
    "ORDER" => TokenKind::Order,
    "HAVING" => TokenKind::Having,
    "LIMIT" => TokenKind::Limit,
    "OFFSET" => TokenKind::Offset,
    "DISTINCT" => TokenKind::Distinct,
    "ALL" => TokenKind::All,

    // Predicates
    "AND" => TokenKind::And,
    "OR" => TokenKind::Or,
    "NOT" => TokenKind::Not,
    "NULL" => TokenKind::Null,
    "IS" => TokenKind::Is,
    "IN" => TokenKind::In,
    "EXISTS" => TokenKind::Exists,
    "BETWEEN" => TokenKind::Between,
    "LIKE" => TokenKind::Like,
    "ILIKE" => TokenKind::ILike,
    "SIMILAR" => TokenKind::Similar,

    // Conditional expressions
    "CASE" => TokenKind::Case,
    "WHEN" => TokenKind::When,
    "THEN" => TokenKind::Then,
    "ELSE" => TokenKind::Else,

    // Functions
    "CAST" => TokenKind::Cast,
    "EXTRACT" => TokenKind::Extract,
    "SUBSTRING" => TokenKind::Substring,
    "POSITION" => TokenKind::Position,
    "OVERLAY" => TokenKind::Overlay,
    "TRIM" => TokenKind::Trim,
    "COALESCE" => TokenKind::Coalesce,
    "NULLIF" => TokenKind::NullIf,
    "GREATEST" => TokenKind::Greatest,
    "LEAST" => TokenKind::Least,

    // Boolean literals
    "TRUE" => TokenKind::True,
    "FALSE" => TokenKind::False,
};

/// Look up an uppercased identifier in the keyword table
pub fn lookup_keyword(upper: &str) -> Option<TokenKind> {
    KEYWORDS.get(upper).copied()
}

/// Spelling of a keyword kind, `None` for non-keyword kinds
///
/// Linear over the table; meant for diagnostics, not the scan path.
pub fn keyword_text(kind: TokenKind) -> Option<&'static str> {
    KEYWORDS
        .entries()
        .find(|(_, k)| **k == kind)
        .map(|(text, _)| *text)
}

/// Number of reserved keywords
pub fn keyword_count() -> usize {
    KEYWORDS.len()
}
