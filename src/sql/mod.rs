//! Query front-end for sqlcsv.
//!
//! This module contains the lexer (tokenizer), abstract syntax tree (AST)
//! definitions, and a Pratt parser that transforms raw query text into a
//! [`Select`] ready for analysis against a CSV header.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{Token, TokenKind};

use tracing::debug;

use crate::error::Result;

/// Tokenizes and parses `sql` into a single statement.
///
/// # Examples
///
/// ```
/// let stmt = sqlcsv::sql::parse("SELECT city FROM sales WHERE amount > 100").unwrap();
/// assert_eq!(stmt.table_name(), "sales");
/// assert_eq!(stmt.projections.len(), 1);
/// ```
pub fn parse(sql: &str) -> Result<Select> {
    let tokens = lexer::scan(sql)?;
    debug!(tokens = tokens.len(), "lexed query");
    let stmt = parser::Parser::new(tokens).parse()?;
    debug!(
        table = stmt.table_name(),
        projections = stmt.projections.len(),
        has_where = stmt.where_clause.is_some(),
        order_keys = stmt.order_by.len(),
        has_limit = stmt.limit.is_some(),
        "parsed statement"
    );
    Ok(stmt)
}
