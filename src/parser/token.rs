//! Token definitions
//!
//! Lexical units produced by the scanner.

use std::fmt;

use super::keywords::keyword_text;

/// Token kinds
///
/// Keyword variants are listed last; the keyword table maps their uppercased
/// spelling to the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // -------------------------------------------------------------------------
    // Terminal / special
    // -------------------------------------------------------------------------
    Eof,
    Error,

    // -------------------------------------------------------------------------
    // Literals and names
    // -------------------------------------------------------------------------
    StringConst,
    IntegerConst,
    FloatConst,
    Identifier,
    /// Positional parameter (`$1`, `$2`, ...)
    Param,

    // -------------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------------
    Eq,       // =
    NotEq,    // != or <>
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    Plus,     // +
    Minus,    // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Power,    // ^
    Concat,   // ||
    Assign,   // :=
    Dot,      // .
    DotDot,   // ..

    // -------------------------------------------------------------------------
    // Punctuation
    // -------------------------------------------------------------------------
    LParen,
    RParen,
    Comma,
    Semicolon,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // -------------------------------------------------------------------------
    // Keywords
    // -------------------------------------------------------------------------
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Table,
    Drop,
    Index,
    View,
    Database,
    Schema,
    Function,
    Procedure,
    Trigger,
    Begin,
    End,
    Commit,
    Rollback,
    Transaction,
    As,
    On,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Join,
    Union,
    Intersect,
    Except,
    Group,
    By,
    Order,
    Having,
    Limit,
    Offset,
    Distinct,
    All,
    And,
    Or,
    Not,
    Null,
    Is,
    In,
    Exists,
    Between,
    Like,
    ILike,
    Similar,
    Case,
    When,
    Then,
    Else,
    Cast,
    Extract,
    Substring,
    Position,
    Overlay,
    Trim,
    Coalesce,
    NullIf,
    Greatest,
    Least,
    True,
    False,
}

impl TokenKind {
    /// True for the kinds that end a token stream
    pub fn is_terminal(self) -> bool {
        matches!(self, TokenKind::Eof | TokenKind::Error)
    }

    /// True for reserved keyword kinds
    pub fn is_keyword(self) -> bool {
        keyword_text(self).is_some()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "end of input",
            TokenKind::Error => "error",
            TokenKind::StringConst => "string constant",
            TokenKind::IntegerConst => "integer constant",
            TokenKind::FloatConst => "float constant",
            TokenKind::Identifier => "identifier",
            TokenKind::Param => "parameter",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "<>",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Multiply => "*",
            TokenKind::Divide => "/",
            TokenKind::Modulo => "%",
            TokenKind::Power => "^",
            TokenKind::Concat => "||",
            TokenKind::Assign => ":=",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            keyword => keyword_text(*keyword).unwrap_or("keyword"),
        };
        f.write_str(name)
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is
    pub kind: TokenKind,

    /// Value text: identifier/keyword/string value, operator or number lexeme,
    /// or the diagnostic message for an error token
    pub text: String,

    /// Parsed value of an integer constant
    pub int_value: i64,

    /// Parsed value of a float constant
    pub float_value: f64,

    /// Code-point offset of the first character of the token
    pub location: usize,
}

impl Token {
    /// Create a token carrying only text
    pub fn new(kind: TokenKind, text: impl Into<String>, location: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            int_value: 0,
            float_value: 0.0,
            location,
        }
    }

    /// Create an integer constant token
    pub fn integer(text: String, value: i64, location: usize) -> Self {
        Self {
            int_value: value,
            ..Self::new(TokenKind::IntegerConst, text, location)
        }
    }

    /// Create a float constant token
    pub fn float(text: String, value: f64, location: usize) -> Self {
        Self {
            float_value: value,
            ..Self::new(TokenKind::FloatConst, text, location)
        }
    }

    /// Create an error token with a diagnostic message
    pub fn error(message: impl Into<String>, location: usize) -> Self {
        Self::new(TokenKind::Error, message, location)
    }

    /// Create the end-of-input token
    pub fn eof(location: usize) -> Self {
        Self::new(TokenKind::Eof, String::new(), location)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "<eof> at {}", self.location),
            TokenKind::Error => write!(f, "error({}) at {}", self.text, self.location),
            TokenKind::IntegerConst => write!(f, "integer({}) at {}", self.int_value, self.location),
            TokenKind::FloatConst => write!(f, "float({}) at {}", self.float_value, self.location),
            kind => write!(f, "{:?}('{}') at {}", kind, self.text, self.location),
        }
    }
}
