//! Parser Module
//!
//! Lexical analysis of query text. Syntactic analysis consumes the token
//! stream produced here and lives outside this crate.
//!
//! ## Pipeline
//! ```text
//! query text ──► Scanner ──► Token, Token, ..., Eof | Error
//!                   │
//!                   └──► keyword table (per identifier)
//! ```

mod keywords;
mod scanner;
mod token;

pub use keywords::{keyword_count, keyword_text, lookup_keyword};
pub use scanner::{tokenize, ScanMode, Scanner};
pub use token::{Token, TokenKind};
