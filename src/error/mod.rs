//! Unified error handling for sqlcsv.
//!
//! Each pipeline stage has its own error type carrying the context needed to
//! render a diagnostic: [`LexError`] (source position), [`ParseError`] and
//! [`RuntimeError`] (the offending token), and [`SemanticError`] (a message
//! naming the unresolved column and the available ones).
//!
//! [`Error`] wraps all of them, together with the I/O and CSV failures of the
//! row source, so that the whole pipeline can propagate with `?`. A
//! convenience [`Result<T>`] alias is re-exported from the crate root.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::sql::lexer::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// The query text contains a character or literal the lexer cannot accept.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}:{col}] Error: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        LexError {
            message: message.into(),
            line,
            col,
        }
    }
}

/// A token appeared where the grammar does not allow it.
///
/// Parsing stops at the first violation; `token` is the token the parser was
/// looking at, so callers can point a caret at `token.line` / `token.col`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ParseError {
            token,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.kind == TokenKind::Eof {
            write!(
                f,
                "[line {}:{}] Error at end: {}",
                self.token.line, self.token.col, self.message
            )
        } else {
            write!(
                f,
                "[line {}:{}] Error at '{}': {}",
                self.token.line, self.token.col, self.token.lexeme, self.message
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// A column reference could not be resolved, or the query names a table the
/// row source does not provide.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Semantic error: {message}")]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    pub fn new(message: impl Into<String>) -> Self {
        SemanticError {
            message: message.into(),
        }
    }
}

/// Evaluation failed: a type violation, a division by zero, or an identifier
/// missing from the current row context.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token,
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens synthesized by the analyzer carry no source position.
        if self.token.line == 0 {
            write!(f, "Runtime error at '{}': {}", self.token.lexeme, self.message)
        } else {
            write!(
                f,
                "[line {}:{}] Runtime error at '{}': {}",
                self.token.line, self.token.col, self.token.lexeme, self.message
            )
        }
    }
}

impl std::error::Error for RuntimeError {}

// ---------------------------------------------------------------------------
// Crate-wide error
// ---------------------------------------------------------------------------

/// The canonical error type for every sqlcsv operation.
///
/// No stage recovers from another stage's error; they all propagate unchanged
/// to the caller, which decides how to present them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// An I/O error from opening or reading the CSV file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The CSV reader rejected the input (bad UTF-8, malformed record).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The statement configuration is unusable (e.g. a multi-byte separator).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An internal invariant was violated. This indicates a bug in sqlcsv.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Process exit code for this error, following the BSD `sysexits`
    /// convention: 64 for usage problems, 65 for bad input data, 70 for
    /// internal failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 64,
            Error::Lex(_)
            | Error::Parse(_)
            | Error::Semantic(_)
            | Error::Runtime(_)
            | Error::Io(_)
            | Error::Csv(_) => 65,
            Error::Internal(_) => 70,
        }
    }
}

/// A specialised [`Result`] type for sqlcsv operations.
pub type Result<T> = std::result::Result<T, Error>;
