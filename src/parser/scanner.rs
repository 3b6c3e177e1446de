//! Lexical scanner
//!
//! Turns query text into a stream of [`Token`]s. The scanner walks the text one
//! code point at a time with a single code point of lookahead, so multi-byte
//! UTF-8 characters are handled as one unit and token locations count code
//! points rather than bytes.
//!
//! Lexical problems (bad numbers, unterminated literals, stray characters) are
//! reported as [`TokenKind::Error`] tokens; the scanner itself never fails.

use super::keywords::lookup_keyword;
use super::token::{Token, TokenKind};

/// End-of-input sentinel for the cursor
const EOF_CHAR: char = '\0';

/// Scanning context
///
/// Carried by the scanner so a parser can switch it, but it does not change
/// tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Normal,
    TypeName,
    Expression,
    Assignment,
}

/// Pull-based SQL scanner over one query text
pub struct Scanner<'a> {
    /// Text being scanned
    source: &'a str,

    /// Byte offset of `current` in `source`
    position: usize,

    /// Code point under the cursor (`EOF_CHAR` at end of input)
    current: char,

    /// Code point after `current`
    peek: char,

    /// Code-point offset of `current`
    location: usize,

    /// Scanning context
    mode: ScanMode,

    /// Set once a terminal token has been handed out by the iterator
    finished: bool,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned on the first code point of `source`
    pub fn new(source: &'a str, mode: ScanMode) -> Self {
        let current = char_at(source, 0);
        let peek = if current == EOF_CHAR {
            EOF_CHAR
        } else {
            char_at(source, current.len_utf8())
        };

        Self {
            source,
            position: 0,
            current,
            peek,
            location: 0,
            mode,
            finished: false,
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ScanMode) {
        self.mode = mode;
    }

    /// Code-point offset of the cursor
    pub fn location(&self) -> usize {
        self.location
    }

    /// Tokenize the rest of the input
    ///
    /// Stops after the first end-of-input or error token, which is included.
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }

    /// Scan and return the next token
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            if self.at_end() {
                return Token::eof(self.location);
            }

            match (self.current, self.peek) {
                ('-', '-') => self.skip_line_comment(),
                ('/', '*') => self.skip_block_comment(),
                _ => return self.scan_token(),
            }
        }
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn at_end(&self) -> bool {
        self.current == EOF_CHAR
    }

    /// Move the cursor one code point forward (no-op at end of input)
    fn advance(&mut self) {
        if self.at_end() {
            return;
        }

        self.position += self.current.len_utf8();
        self.location += 1;
        self.current = self.peek;
        self.peek = if self.current == EOF_CHAR {
            EOF_CHAR
        } else {
            char_at(self.source, self.position + self.current.len_utf8())
        };
    }

    fn skip_whitespace(&mut self) {
        while self.current.is_whitespace() {
            self.advance();
        }
    }

    /// Consume `--` through end of line (the newline is left for whitespace skipping)
    fn skip_line_comment(&mut self) {
        while self.current != '\n' && !self.at_end() {
            self.advance();
        }
    }

    /// Consume `/* ... */`, or everything up to end of input if it never closes
    fn skip_block_comment(&mut self) {
        self.advance(); // '/'
        self.advance(); // '*'

        while !self.at_end() {
            if self.current == '*' && self.peek == '/' {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn scan_token(&mut self) -> Token {
        let start = self.location;
        let c = self.current;

        if c.is_alphabetic() || c == '_' {
            return self.scan_identifier();
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }

        match c {
            '"' => self.scan_quoted_identifier(),
            '\'' => self.scan_string(),
            '$' => self.scan_parameter(),

            '<' => match self.peek {
                '=' => self.operator(TokenKind::LtEq, "<=", 2, start),
                '>' => self.operator(TokenKind::NotEq, "<>", 2, start),
                _ => self.operator(TokenKind::Lt, "<", 1, start),
            },
            '>' => match self.peek {
                '=' => self.operator(TokenKind::GtEq, ">=", 2, start),
                _ => self.operator(TokenKind::Gt, ">", 1, start),
            },
            '!' if self.peek == '=' => self.operator(TokenKind::NotEq, "!=", 2, start),
            '|' if self.peek == '|' => self.operator(TokenKind::Concat, "||", 2, start),
            ':' if self.peek == '=' => self.operator(TokenKind::Assign, ":=", 2, start),
            '.' => match self.peek {
                '.' => self.operator(TokenKind::DotDot, "..", 2, start),
                _ => self.operator(TokenKind::Dot, ".", 1, start),
            },

            '=' => self.operator(TokenKind::Eq, "=", 1, start),
            '+' => self.operator(TokenKind::Plus, "+", 1, start),
            '-' => self.operator(TokenKind::Minus, "-", 1, start),
            '*' => self.operator(TokenKind::Multiply, "*", 1, start),
            '/' => self.operator(TokenKind::Divide, "/", 1, start),
            '%' => self.operator(TokenKind::Modulo, "%", 1, start),
            '^' => self.operator(TokenKind::Power, "^", 1, start),
            '(' => self.operator(TokenKind::LParen, "(", 1, start),
            ')' => self.operator(TokenKind::RParen, ")", 1, start),
            ',' => self.operator(TokenKind::Comma, ",", 1, start),
            ';' => self.operator(TokenKind::Semicolon, ";", 1, start),
            '[' => self.operator(TokenKind::LBracket, "[", 1, start),
            ']' => self.operator(TokenKind::RBracket, "]", 1, start),
            '{' => self.operator(TokenKind::LBrace, "{", 1, start),
            '}' => self.operator(TokenKind::RBrace, "}", 1, start),

            other => {
                self.advance();
                Token::error(format!("unexpected character: {}", other), start)
            }
        }
    }

    /// Consume `width` code points and emit an operator/punctuation token
    fn operator(&mut self, kind: TokenKind, text: &str, width: usize, start: usize) -> Token {
        for _ in 0..width {
            self.advance();
        }
        Token::new(kind, text, start)
    }

    // =========================================================================
    // Token readers
    // =========================================================================

    fn scan_identifier(&mut self) -> Token {
        let start = self.location;
        let mut value = String::new();

        while self.current.is_alphabetic() || self.current.is_numeric() || self.current == '_' {
            value.push(self.current);
            self.advance();
        }

        let upper = value.to_uppercase();
        match lookup_keyword(&upper) {
            Some(kind) => Token::new(kind, upper, start),
            None => Token::new(TokenKind::Identifier, value, start),
        }
    }

    /// `"..."` with `""` standing for an embedded quote
    fn scan_quoted_identifier(&mut self) -> Token {
        let start = self.location;
        let mut value = String::new();

        self.advance(); // opening quote

        loop {
            match (self.current, self.peek) {
                (EOF_CHAR, _) => {
                    return Token::error("unterminated quoted identifier", start);
                }
                ('"', '"') => {
                    value.push('"');
                    self.advance();
                    self.advance();
                }
                ('"', _) => {
                    self.advance(); // closing quote
                    return Token::new(TokenKind::Identifier, value, start);
                }
                (c, _) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.location;
        let mut text = String::new();
        let mut is_float = false;

        self.take_digits(&mut text);

        // Fraction
        if self.current == '.' && self.peek.is_ascii_digit() {
            is_float = true;
            text.push('.');
            self.advance();
            self.take_digits(&mut text);
        }

        // Exponent
        if matches!(self.current, 'e' | 'E')
            && (self.peek.is_ascii_digit() || matches!(self.peek, '+' | '-'))
        {
            is_float = true;
            text.push(self.current);
            self.advance();

            if matches!(self.current, '+' | '-') {
                text.push(self.current);
                self.advance();
            }
            self.take_digits(&mut text);
        }

        if is_float {
            return match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Token::float(text, value, start),
                _ => Token::error(format!("invalid float: {}", text), start),
            };
        }

        match text.parse::<i64>() {
            Ok(value) => Token::integer(text, value, start),
            Err(_) => Token::error(format!("invalid integer: {}", text), start),
        }
    }

    fn take_digits(&mut self, text: &mut String) {
        while self.current.is_ascii_digit() {
            text.push(self.current);
            self.advance();
        }
    }

    /// `'...'` with `''` and backslash escapes
    fn scan_string(&mut self) -> Token {
        let start = self.location;
        let mut value = String::new();

        self.advance(); // opening quote

        loop {
            match (self.current, self.peek) {
                (EOF_CHAR, _) => {
                    return Token::error("unterminated string literal", start);
                }
                ('\'', '\'') => {
                    value.push('\'');
                    self.advance();
                    self.advance();
                }
                ('\'', _) => {
                    self.advance(); // closing quote
                    return Token::new(TokenKind::StringConst, value, start);
                }
                ('\\', escaped) => {
                    if escaped == EOF_CHAR {
                        return Token::error("unterminated string literal", start);
                    }
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    self.advance();
                    self.advance();
                }
                (c, _) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    /// `$` followed by one or more digits
    fn scan_parameter(&mut self) -> Token {
        let start = self.location;
        let mut text = String::from("$");

        self.advance();

        if !self.current.is_ascii_digit() {
            return Token::error("invalid parameter", start);
        }
        self.take_digits(&mut text);

        Token::new(TokenKind::Param, text, start)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields tokens up to and including the first terminal token, then `None`
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        if token.is_terminal() {
            self.finished = true;
        }
        Some(token)
    }
}

impl std::iter::FusedIterator for Scanner<'_> {}

/// Decode the code point starting at byte `offset`
fn char_at(source: &str, offset: usize) -> char {
    source
        .get(offset..)
        .and_then(|rest| rest.chars().next())
        .unwrap_or(EOF_CHAR)
}

/// Tokenize a complete query in normal mode
pub fn tokenize(source: &str) -> Vec<Token> {
    Scanner::new(source, ScanMode::Normal).tokenize()
}
