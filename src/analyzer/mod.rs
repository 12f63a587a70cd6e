//! Semantic analysis: binds a parsed [`Select`] to a concrete header.
//!
//! The analyzer does two things:
//!
//! 1. Expands a lone `*` projection into one aliased identifier per header
//!    column, in header order.
//! 2. Walks every projection, the `WHERE` expression and every `ORDER BY`
//!    expression, checking that each identifier names a header column.
//!
//! It is fail-fast: the first unknown column aborts with a [`SemanticError`]
//! listing the columns that do exist. The input statement is never modified;
//! a new [`Select`] is returned.

use std::collections::HashSet;

use tracing::debug;

use crate::error::SemanticError;
use crate::sql::ast::{Expr, Select, SelectItem};
use crate::sql::lexer::Token;

/// Validates `stmt` against `header` and returns the bound statement.
pub fn analyze(stmt: &Select, header: &[String]) -> Result<Select, SemanticError> {
    let projections = if stmt.is_wildcard() {
        expand_wildcard(header)
    } else {
        stmt.projections.clone()
    };

    let columns: HashSet<&str> = header.iter().map(String::as_str).collect();
    let mut check = |name: &Token| -> Result<(), SemanticError> {
        if columns.contains(name.lexeme.as_str()) {
            Ok(())
        } else {
            Err(unknown_column(&name.lexeme, stmt.table_name(), header))
        }
    };

    for item in &projections {
        match item {
            SelectItem::Expr { expr, .. } => expr.walk_identifiers(&mut check)?,
            SelectItem::Wildcard => {
                return Err(SemanticError::new(
                    "'*' must be the only item in the projection list.",
                ))
            }
        }
    }
    if let Some(filter) = &stmt.where_clause {
        filter.walk_identifiers(&mut check)?;
    }
    for item in &stmt.order_by {
        item.expr.walk_identifiers(&mut check)?;
    }

    debug!(
        table = stmt.table_name(),
        columns = projections.len(),
        "statement validated"
    );

    Ok(Select {
        projections,
        table: stmt.table.clone(),
        where_clause: stmt.where_clause.clone(),
        order_by: stmt.order_by.clone(),
        limit: stmt.limit.clone(),
    })
}

fn expand_wildcard(header: &[String]) -> Vec<SelectItem> {
    header
        .iter()
        .map(|name| SelectItem::Expr {
            expr: Expr::Identifier(Token::synthetic_identifier(name)),
            alias: Some(name.clone()),
        })
        .collect()
}

fn unknown_column(name: &str, table: &str, header: &[String]) -> SemanticError {
    SemanticError::new(format!(
        "Column '{}' not found in table '{}'. Available columns: [{}]",
        name,
        table,
        header.join(", ")
    ))
}
