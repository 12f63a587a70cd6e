//! Expression evaluation against a single row.
//!
//! An [`Evaluator`] borrows a column-name index, the raw fields of one record
//! and the null sentinel. Identifiers classify their raw field on every read
//! via [`Value::from_field`]; nothing is cached between reads.
//!
//! NULL handling is uniform: if either operand of a binary operator is NULL,
//! `=` is true only when both are NULL, `<>`/`!=` is true when exactly one
//! is, and every other operator (including `AND`/`OR`) yields NULL.

use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::sql::ast::Expr;
use crate::sql::lexer::{Token, TokenKind};
use crate::types::Value;

/// Maps each column name to its position. When a name repeats, the last
/// occurrence wins.
pub fn column_index(header: &[String]) -> HashMap<String, usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// Evaluates expressions against one row context.
pub struct Evaluator<'a> {
    columns: &'a HashMap<String, usize>,
    row: &'a [String],
    null_string: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(columns: &'a HashMap<String, usize>, row: &'a [String], null_string: &'a str) -> Self {
        Evaluator {
            columns,
            row,
            null_string,
        }
    }

    /// Computes the value of `expr`.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Identifier(name) => self.read_column(name),
            Expr::Unary { operator, right } => {
                let value = self.evaluate(right)?;
                eval_unary_op(operator, value)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                eval_binary_op(&l, operator, &r)
            }
        }
    }

    fn read_column(&self, name: &Token) -> Result<Value, RuntimeError> {
        let idx = self.columns.get(&name.lexeme).ok_or_else(|| {
            RuntimeError::new(name.clone(), format!("Undefined column: {}", name.lexeme))
        })?;
        Ok(match self.row.get(*idx) {
            Some(raw) => Value::from_field(raw, self.null_string),
            // Short record: the field is absent.
            None => Value::Null,
        })
    }
}

fn eval_unary_op(operator: &Token, value: Value) -> Result<Value, RuntimeError> {
    match operator.kind {
        TokenKind::Not => Ok(Value::Bool(!value.is_truthy())),
        TokenKind::Minus => match value {
            Value::Null => Ok(Value::Null),
            v => match v.as_f64() {
                Some(d) => Ok(Value::Double(-d)),
                None => Err(RuntimeError::new(operator.clone(), "Operand must be a number.")),
            },
        },
        _ => Err(RuntimeError::new(operator.clone(), "Unknown unary operator.")),
    }
}

fn eval_binary_op(left: &Value, operator: &Token, right: &Value) -> Result<Value, RuntimeError> {
    if left.is_null() || right.is_null() {
        return Ok(match operator.kind {
            TokenKind::Equal => Value::Bool(left.is_null() && right.is_null()),
            TokenKind::BangEqual | TokenKind::NotEqual => {
                Value::Bool(left.is_null() != right.is_null())
            }
            _ => Value::Null,
        });
    }

    match operator.kind {
        TokenKind::Plus => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Ok(Value::String(format!("{}{}", left, right)))
            } else {
                numeric_op(operator, left, right, |a, b| a + b)
            }
        }
        TokenKind::Minus => numeric_op(operator, left, right, |a, b| a - b),
        TokenKind::Star => numeric_op(operator, left, right, |a, b| a * b),
        TokenKind::Slash | TokenKind::Percent => {
            let (a, b) = numbers(operator, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::new(operator.clone(), "Division by zero."));
            }
            Ok(Value::Double(if operator.kind == TokenKind::Slash {
                a / b
            } else {
                a % b
            }))
        }
        TokenKind::Greater => compare(operator, left, right, |a, b| a > b),
        TokenKind::GreaterEqual => compare(operator, left, right, |a, b| a >= b),
        TokenKind::Less => compare(operator, left, right, |a, b| a < b),
        TokenKind::LessEqual => compare(operator, left, right, |a, b| a <= b),
        TokenKind::Equal => Ok(Value::Bool(left.sql_eq(right))),
        TokenKind::BangEqual | TokenKind::NotEqual => Ok(Value::Bool(!left.sql_eq(right))),
        TokenKind::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        TokenKind::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        _ => Err(RuntimeError::new(operator.clone(), "Unknown binary operator.")),
    }
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::new(operator.clone(), "Operands must be numbers.")),
    }
}

fn numeric_op(
    operator: &Token,
    left: &Value,
    right: &Value,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let (a, b) = numbers(operator, left, right)?;
    Ok(Value::Double(op(a, b)))
}

fn compare(
    operator: &Token,
    left: &Value,
    right: &Value,
    op: impl Fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    let (a, b) = numbers(operator, left, right)?;
    Ok(Value::Bool(op(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::Parser;
    use crate::sql::lexer::scan;

    fn expr(src: &str) -> Expr {
        Parser::new(scan(src).unwrap()).parse_expression().unwrap()
    }

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Evaluates `src` against a one-row context.
    fn eval_row(src: &str, cols: &[&str], row: &[&str], null_string: &str) -> Result<Value, RuntimeError> {
        let columns = column_index(&header(cols));
        let row = header(row);
        Evaluator::new(&columns, &row, null_string).evaluate(&expr(src))
    }

    fn eval(src: &str) -> Value {
        eval_row(src, &[], &[], "").unwrap()
    }

    fn eval_err(src: &str) -> RuntimeError {
        eval_row(src, &[], &[], "").unwrap_err()
    }

    #[test]
    fn literals_and_grouping() {
        assert_eq!(eval("42"), Value::Integer(42));
        assert_eq!(eval("'x'"), Value::String("x".into()));
        assert_eq!(eval("((TRUE))"), Value::Bool(true));
        assert_eq!(eval("NULL"), Value::Null);
    }

    #[test]
    fn arithmetic_is_floating_point() {
        assert_eq!(eval("1 + 2 * 3"), Value::Double(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Double(9.0));
        assert_eq!(eval("7 / 2"), Value::Double(3.5));
        assert_eq!(eval("7 % 4"), Value::Double(3.0));
        assert_eq!(eval("10 - 4 - 3"), Value::Double(3.0));
        assert_eq!(eval("-5 + 2"), Value::Double(-3.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = eval_err("1 / 0");
        assert_eq!(err.message, "Division by zero.");
        assert_eq!(err.token.kind, TokenKind::Slash);
        assert_eq!(eval_err("1 / (2 - 2)").message, "Division by zero.");
        assert_eq!(eval_err("5 % 0.0").message, "Division by zero.");
    }

    #[test]
    fn plus_concatenates_strings() {
        assert_eq!(eval("'a' + 'b'"), Value::String("ab".into()));
        assert_eq!(eval("'n=' + 1.5"), Value::String("n=1.5".into()));
        assert_eq!(eval("2 + 'x'"), Value::String("2x".into()));
        assert_eq!(eval("'flag:' + TRUE"), Value::String("flag:true".into()));
    }

    #[test]
    fn arithmetic_rejects_non_numbers() {
        let err = eval_err("'a' - 1");
        assert_eq!(err.message, "Operands must be numbers.");
        assert_eq!(eval_err("TRUE + 1").message, "Operands must be numbers.");
        assert_eq!(eval_err("'a' * 'b'").message, "Operands must be numbers.");
    }

    #[test]
    fn comparisons_are_numeric_only() {
        assert_eq!(eval("2 > 1"), Value::Bool(true));
        assert_eq!(eval("2 >= 2.0"), Value::Bool(true));
        assert_eq!(eval("1 < 0.5"), Value::Bool(false));
        assert_eq!(eval("3 <= 2"), Value::Bool(false));
        let err = eval_err("'a' < 'b'");
        assert_eq!(err.message, "Operands must be numbers.");
        assert_eq!(err.token.kind, TokenKind::Less);
    }

    #[test]
    fn equality_never_fails() {
        assert_eq!(eval("1 = 1.0"), Value::Bool(true));
        assert_eq!(eval("'a' = 'a'"), Value::Bool(true));
        assert_eq!(eval("'1' = 1"), Value::Bool(false));
        assert_eq!(eval("'a' <> 'b'"), Value::Bool(true));
        assert_eq!(eval("TRUE != FALSE"), Value::Bool(true));
    }

    #[test]
    fn null_equality_rules() {
        assert_eq!(eval("NULL = NULL"), Value::Bool(true));
        assert_eq!(eval("NULL = 1"), Value::Bool(false));
        assert_eq!(eval("NULL <> 1"), Value::Bool(true));
        assert_eq!(eval("NULL != NULL"), Value::Bool(false));
    }

    #[test]
    fn null_propagates_through_other_operators() {
        for src in [
            "NULL + 1", "1 - NULL", "NULL * 2", "NULL / 0", "NULL % 2", "NULL > 1", "1 <= NULL",
            "NULL AND TRUE", "TRUE OR NULL", "'a' + NULL",
        ] {
            assert_eq!(eval(src), Value::Null, "{src}");
        }
        assert_eq!(eval("-NULL"), Value::Null);
    }

    #[test]
    fn logic_uses_truthiness() {
        assert_eq!(eval("TRUE AND FALSE"), Value::Bool(false));
        assert_eq!(eval("FALSE OR 1"), Value::Bool(true));
        assert_eq!(eval("'x' AND 0"), Value::Bool(true));
        assert_eq!(eval("NOT NULL"), Value::Bool(true));
        assert_eq!(eval("NOT 0"), Value::Bool(false));
        assert_eq!(eval("NOT TRUE"), Value::Bool(false));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("-2.5"), Value::Double(-2.5));
        assert_eq!(eval("--3"), Value::Double(3.0));
        let err = eval_err("-'a'");
        assert_eq!(err.message, "Operand must be a number.");
        assert_eq!(err.token.kind, TokenKind::Minus);
    }

    #[test]
    fn identifiers_classify_raw_fields() {
        let cols = ["id", "name", "active", "score"];
        let row = ["1", "A", "TRUE", ""];
        assert_eq!(eval_row("id", &cols, &row, "").unwrap(), Value::Double(1.0));
        assert_eq!(eval_row("name", &cols, &row, "").unwrap(), Value::String("A".into()));
        assert_eq!(eval_row("active", &cols, &row, "").unwrap(), Value::Bool(true));
        assert_eq!(eval_row("score", &cols, &row, "").unwrap(), Value::Null);
        assert_eq!(eval_row("active = true", &cols, &row, "").unwrap(), Value::Bool(true));
        assert_eq!(eval_row("id * 10", &cols, &row, "").unwrap(), Value::Double(10.0));
    }

    #[test]
    fn custom_null_sentinel() {
        let cols = ["a", "b"];
        let row = ["NA", ""];
        assert_eq!(eval_row("a", &cols, &row, "NA").unwrap(), Value::Null);
        assert_eq!(eval_row("b", &cols, &row, "NA").unwrap(), Value::String(String::new()));
    }

    #[test]
    fn short_rows_read_as_null() {
        let cols = ["a", "b", "c"];
        assert_eq!(eval_row("c", &cols, &["1"], "").unwrap(), Value::Null);
        assert_eq!(eval_row("c = NULL", &cols, &["1"], "").unwrap(), Value::Bool(true));
    }

    #[test]
    fn undefined_column_is_a_runtime_error() {
        let err = eval_row("missing + 1", &["a"], &["1"], "").unwrap_err();
        assert_eq!(err.message, "Undefined column: missing");
        assert_eq!(err.token.lexeme, "missing");
    }

    #[test]
    fn duplicate_header_names_resolve_to_last() {
        assert_eq!(
            eval_row("x", &["x", "x"], &["first", "second"], "").unwrap(),
            Value::String("second".into())
        );
    }
}
