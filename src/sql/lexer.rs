//! Hand-written tokenizer for the sqlcsv query dialect.
//!
//! The [`Lexer`] takes raw query text and produces a `Vec<Token>` that always
//! ends with a [`TokenKind::Eof`] token. Keywords are matched
//! case-insensitively; every token records the 1-based line and column of
//! its first byte so that diagnostics can point a caret at it.
//!
//! The dialect is deliberately small: single-quoted strings without any
//! escape mechanism, unsigned integer and decimal literals, identifiers, and
//! the operator set `( ) , . + - * / % = != <> < <= > >= !`.

use tracing::trace;

use crate::error::LexError;
use crate::types::Value;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// The category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // -- single-character punctuation and operators --
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,

    // -- one or two character operators --
    Bang,
    BangEqual,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotEqual,

    // -- literals --
    Identifier,
    String,
    Integer,
    Double,

    // -- keywords --
    And,
    As,
    Asc,
    By,
    Desc,
    False,
    From,
    Limit,
    Not,
    Null,
    Or,
    Order,
    Select,
    True,
    Where,

    Eof,
}

/// A single lexical token.
///
/// `literal` is present only for [`TokenKind::String`], [`TokenKind::Integer`]
/// and [`TokenKind::Double`] tokens and holds the decoded value. `line` and
/// `col` are 1-based; tokens synthesized after parsing (for example by the
/// `SELECT *` expansion) use line `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Value>,
    pub line: usize,
    pub col: usize,
}

impl Token {
    /// Builds a positionless identifier token for `name`.
    pub fn synthetic_identifier(name: &str) -> Self {
        Token {
            kind: TokenKind::Identifier,
            lexeme: name.to_string(),
            literal: None,
            line: 0,
            col: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyword lookup
// ---------------------------------------------------------------------------

fn keyword_kind(word: &str) -> Option<TokenKind> {
    // The input `word` is already uppercased by the caller.
    match word {
        "AND" => Some(TokenKind::And),
        "AS" => Some(TokenKind::As),
        "ASC" => Some(TokenKind::Asc),
        "BY" => Some(TokenKind::By),
        "DESC" => Some(TokenKind::Desc),
        "FALSE" => Some(TokenKind::False),
        "FROM" => Some(TokenKind::From),
        "LIMIT" => Some(TokenKind::Limit),
        "NOT" => Some(TokenKind::Not),
        "NULL" => Some(TokenKind::Null),
        "OR" => Some(TokenKind::Or),
        "ORDER" => Some(TokenKind::Order),
        "SELECT" => Some(TokenKind::Select),
        "TRUE" => Some(TokenKind::True),
        "WHERE" => Some(TokenKind::Where),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// A hand-written query tokenizer.
///
/// Create one with [`Lexer::new`], then call [`Lexer::tokenize`] to obtain
/// the full token stream. Tokenization either succeeds for the whole input or
/// fails with the first [`LexError`].
pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    /// Byte offset of the next unread byte.
    pos: usize,
    /// Byte offset where the current token starts.
    start: usize,
    line: usize,
    /// Byte offset of the first byte of the current line.
    line_start: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over the given query text.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            input: source.as_bytes(),
            pos: 0,
            start: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// Tokenize the entire input and return the token list.
    ///
    /// The returned vector always ends with [`TokenKind::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            self.start = self.pos;
            if self.peek().is_none() {
                tokens.push(self.make_token(TokenKind::Eof, None));
                break;
            }
            let tok = self.next_token()?;
            trace!(kind = ?tok.kind, lexeme = %tok.lexeme, line = tok.line, col = tok.col, "token");
            tokens.push(tok);
        }
        Ok(tokens)
    }

    // -- helpers ------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    /// Consumes the next byte if it equals `expected`.
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.pos;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.newline();
                }
                _ => break,
            }
        }
    }

    /// 1-based column of the current token's first byte.
    fn start_col(&self) -> usize {
        self.start - self.line_start + 1
    }

    fn make_token(&self, kind: TokenKind, literal: Option<Value>) -> Token {
        Token {
            kind,
            lexeme: self.source[self.start..self.pos].to_string(),
            literal,
            line: self.line,
            col: self.start_col(),
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError::new(message, self.line, self.start_col())
    }

    // -- main scanner -------------------------------------------------------

    fn next_token(&mut self) -> Result<Token, LexError> {
        let ch = match self.peek() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof, None)),
        };

        if ch == b'\'' {
            return self.read_string_literal();
        }
        if ch.is_ascii_digit() {
            return self.read_number();
        }
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.read_identifier_or_keyword());
        }
        self.read_operator()
    }

    // -- literal readers ----------------------------------------------------

    fn read_string_literal(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.start_col());
        self.advance(); // consume opening '
        loop {
            match self.advance() {
                None => return Err(LexError::new("Unterminated string.", line, col)),
                Some(b'\'') => break,
                Some(b'\n') => self.newline(),
                Some(_) => {}
            }
        }
        let text = &self.source[self.start + 1..self.pos - 1];
        Ok(Token {
            kind: TokenKind::String,
            lexeme: self.source[self.start..self.pos].to_string(),
            literal: Some(Value::String(text.to_string())),
            line,
            col,
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        // A fractional part needs at least one digit after the dot.
        if self.peek() == Some(b'.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let text = &self.source[self.start..self.pos];
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("Invalid number '{}'.", text)))?;
            return Ok(self.make_token(TokenKind::Double, Some(Value::Double(value))));
        }

        let text = &self.source[self.start..self.pos];
        let value: i64 = text
            .parse()
            .map_err(|_| self.error(format!("Integer literal '{}' is out of range.", text)))?;
        Ok(self.make_token(TokenKind::Integer, Some(Value::Integer(value))))
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let word = &self.source[self.start..self.pos];
        let kind = keyword_kind(&word.to_ascii_uppercase()).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, None)
    }

    // -- operators ----------------------------------------------------------

    fn read_operator(&mut self) -> Result<Token, LexError> {
        let ch = match self.advance() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof, None)),
        };
        let kind = match ch {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' => TokenKind::Equal,
            b'!' => {
                if self.match_byte(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.match_byte(b'>') {
                    TokenKind::NotEqual
                } else if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            _ => {
                // Report the whole character, not just its first byte.
                let c = self.source[self.start..].chars().next().unwrap_or('?');
                return Err(self.error(format!("Unexpected character '{}'.", c)));
            }
        };
        Ok(self.make_token(kind, None))
    }
}

/// Convenience wrapper: tokenize `source` in one call.
pub fn scan(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

// ===========================================================================
// Tests
// ===========================================================================
