//! Abstract syntax tree definitions for the sqlcsv dialect.
//!
//! Every query parsed by the [`super::parser::Parser`] is represented as a
//! [`Select`] holding trees of [`Expr`]. The tree is immutable once built:
//! the analyzer returns a new [`Select`] rather than editing the parsed one,
//! and the evaluator only ever reads it.

use std::fmt;

use crate::sql::lexer::Token;
use crate::types::Value;

/// An expression node.
///
/// Operator nodes keep their [`Token`] so that runtime errors can point at
/// the exact operator in the query text.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left <op> right`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    /// `NOT right` or `-right`.
    Unary { operator: Token, right: Box<Expr> },
    /// A parenthesised expression.
    Grouping(Box<Expr>),
    /// A constant: `NULL`, `TRUE`/`FALSE`, a number, or a string.
    Literal(Value),
    /// A column reference.
    Identifier(Token),
}

impl Expr {
    /// The column name when this expression is a bare column reference.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(&name.lexeme),
            _ => None,
        }
    }

    /// Calls `f` on every identifier token in this tree, left to right.
    pub fn walk_identifiers<'a, F>(&'a self, f: &mut F) -> Result<(), crate::error::SemanticError>
    where
        F: FnMut(&'a Token) -> Result<(), crate::error::SemanticError>,
    {
        match self {
            Expr::Binary { left, right, .. } => {
                left.walk_identifiers(f)?;
                right.walk_identifiers(f)
            }
            Expr::Unary { right, .. } => right.walk_identifiers(f),
            Expr::Grouping(inner) => inner.walk_identifiers(f),
            Expr::Literal(_) => Ok(()),
            Expr::Identifier(name) => f(name),
        }
    }
}

impl fmt::Display for Expr {
    /// Renders the expression back as query text. Used to name derived
    /// result columns such as `sales * 1.1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator.lexeme, right),
            Expr::Unary { operator, right } => {
                if operator.lexeme.chars().all(|c| c.is_ascii_alphabetic()) {
                    write!(f, "{} {}", operator.lexeme, right)
                } else {
                    write!(f, "{}{}", operator.lexeme, right)
                }
            }
            Expr::Grouping(inner) => write!(f, "({})", inner),
            Expr::Literal(Value::String(s)) => write!(f, "'{}'", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Identifier(name) => write!(f, "{}", name.lexeme),
        }
    }
}

/// A single item in the projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// A bare `*`, expanded by the analyzer.
    Wildcard,
    /// An expression, optionally aliased (`expr AS alias` or `expr alias`).
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    /// The output column name: the alias if given, else the column name for
    /// a bare identifier, else the rendered expression text.
    pub fn output_name(&self) -> String {
        match self {
            SelectItem::Wildcard => "*".to_string(),
            SelectItem::Expr {
                alias: Some(alias), ..
            } => alias.clone(),
            SelectItem::Expr { expr, alias: None } => match expr.as_identifier() {
                Some(name) => name.to_string(),
                None => expr.to_string(),
            },
        }
    }
}

/// A single `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    /// `true` unless `DESC` was given.
    pub ascending: bool,
}

/// A complete `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projections: Vec<SelectItem>,
    /// The `FROM` identifier token.
    pub table: Token,
    pub where_clause: Option<Expr>,
    /// Empty when there is no `ORDER BY`.
    pub order_by: Vec<OrderItem>,
    /// Always an integer [`Expr::Literal`] when produced by the parser.
    pub limit: Option<Expr>,
}

impl Select {
    /// The table name as written in the query.
    pub fn table_name(&self) -> &str {
        &self.table.lexeme
    }

    /// Returns `true` when the projection list is the lone `*`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.projections.as_slice(), [SelectItem::Wildcard])
    }
}
