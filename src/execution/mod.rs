//! Query execution engine for sqlcsv.
//!
//! [`execute`] runs a validated [`Select`] against a [`RowSource`] in four
//! strictly ordered stages:
//!
//! 1. **Filter** each raw record with the `WHERE` expression. A record passes
//!    only when the predicate is the boolean `true`; `false`, NULL and any
//!    non-boolean value all exclude it.
//! 2. **Project** passing records through the projection list. Filtering and
//!    projection stream: one record is held at a time.
//! 3. **Sort** the projected rows, if there is an `ORDER BY`. Sort keys are
//!    evaluated against the *output* row: the result header supplies the
//!    names and the projected values, re-stringified, supply the fields. The
//!    sort is stable.
//! 4. **Limit** the (possibly sorted) rows to the first N.
//!
//! Any error aborts the whole statement; rows produced before the error are
//! dropped.

pub mod eval;

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::source::RowSource;
use crate::sql::ast::{Expr, OrderItem, Select, SelectItem};
use crate::types::Value;

use self::eval::{column_index, Evaluator};

// ---------------------------------------------------------------------------
// Result table
// ---------------------------------------------------------------------------

/// The materialized result of a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    /// Output column names in projection order.
    pub header: Vec<String>,
    /// Rows in final order; every row has `header.len()` values.
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first output column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// The value in row `row` under column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col)
    }
}

impl IntoIterator for ResultTable {
    type Item = Vec<Value>;
    type IntoIter = std::vec::IntoIter<Vec<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a Vec<Value>;
    type IntoIter = std::slice::Iter<'a, Vec<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Executes a statement already bound by [`crate::analyzer::analyze`].
pub fn execute<S: RowSource + ?Sized>(
    stmt: &Select,
    source: &mut S,
    null_string: &str,
) -> Result<ResultTable> {
    let exprs = projection_exprs(stmt)?;
    let header: Vec<String> = stmt.projections.iter().map(SelectItem::output_name).collect();
    let columns = column_index(source.header());

    let mut rows = Vec::new();
    let mut scanned = 0u64;
    while source.has_next()? {
        let record = source.next_row()?;
        scanned += 1;
        let evaluator = Evaluator::new(&columns, &record, null_string);

        if let Some(filter) = &stmt.where_clause {
            let verdict = evaluator.evaluate(filter)?;
            if verdict != Value::Bool(true) {
                trace!(row = scanned, ?verdict, "row filtered out");
                continue;
            }
        }

        let projected = exprs
            .iter()
            .map(|expr| evaluator.evaluate(expr))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.push(projected);
    }
    debug!(scanned, passed = rows.len(), "filter and projection complete");

    if !stmt.order_by.is_empty() {
        rows = sort_rows(rows, &stmt.order_by, &header, null_string)?;
    }

    if let Some(limit) = &stmt.limit {
        let n = eval_limit(limit, null_string)?;
        rows.truncate(n);
    }

    debug!(returned = rows.len(), "statement executed");
    Ok(ResultTable { header, rows })
}

fn projection_exprs(stmt: &Select) -> Result<Vec<&Expr>> {
    stmt.projections
        .iter()
        .map(|item| match item {
            SelectItem::Expr { expr, .. } => Ok(expr),
            SelectItem::Wildcard => Err(Error::Internal(
                "'*' projection reached the executor unexpanded".into(),
            )),
        })
        .collect()
}

/// Stable multi-key sort of projected rows.
///
/// Keys are computed once per row up front; a key that fails to evaluate
/// aborts the statement. Fewer than two rows need no comparison, so their
/// keys are never evaluated.
fn sort_rows(
    rows: Vec<Vec<Value>>,
    order_by: &[OrderItem],
    header: &[String],
    null_string: &str,
) -> Result<Vec<Vec<Value>>> {
    if rows.len() < 2 {
        return Ok(rows);
    }
    let columns = column_index(header);

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let fields: Vec<String> = row
            .iter()
            .map(|v| match v {
                Value::Null => null_string.to_string(),
                other => other.to_string(),
            })
            .collect();
        let evaluator = Evaluator::new(&columns, &fields, null_string);
        let keys = order_by
            .iter()
            .map(|item| evaluator.evaluate(&item.expr))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        keyed.push((keys, row));
    }

    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, order_by));
    debug!(rows = keyed.len(), keys = order_by.len(), "rows sorted");
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderItem]) -> Ordering {
    for ((x, y), item) in a.iter().zip(b).zip(order_by) {
        let cmp = x.sort_cmp(y);
        let cmp = if item.ascending { cmp } else { cmp.reverse() };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// Evaluates the `LIMIT` expression in an empty row context.
fn eval_limit(limit: &Expr, null_string: &str) -> Result<usize> {
    let empty = HashMap::new();
    let value = Evaluator::new(&empty, &[], null_string).evaluate(limit)?;
    match value.as_f64() {
        // Negative counts clamp to zero; `as` saturates.
        Some(n) => Ok(n.max(0.0) as usize),
        None => Err(Error::Internal(format!(
            "LIMIT evaluated to a {} value",
            value.type_name()
        ))),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::source::MemorySource;
    use crate::sql;

    fn run(query: &str, mut source: MemorySource) -> Result<ResultTable> {
        let stmt = sql::parse(query)?;
        let bound = analyze(&stmt, source.header())?;
        execute(&bound, &mut source, "")
    }

    fn sales() -> MemorySource {
        MemorySource::from_strs(
            &["id", "city", "sales"],
            &[&["1", "NY", "150.0"], &["2", "SF", "90.0"], &["3", "NY", "200.0"]],
        )
    }

    fn column(table: &ResultTable, name: &str) -> Vec<Value> {
        (0..table.len())
            .map(|i| table.get(i, name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn approx(v: &Value, expected: f64) -> bool {
        matches!(v, Value::Double(d) if (d - expected).abs() < 1e-9)
    }

    #[test]
    fn filter_and_project() {
        let result = run(
            "SELECT city, sales * 1.1 AS new_sales FROM t WHERE sales > 100.0",
            sales(),
        )
        .unwrap();
        assert_eq!(result.header, vec!["city", "new_sales"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.rows[0][0], Value::String("NY".into()));
        assert!(approx(&result.rows[0][1], 165.0));
        assert!(approx(&result.rows[1][1], 220.0));
    }

    #[test]
    fn order_by_desc_with_limit() {
        let src = MemorySource::from_strs(&["id", "val"], &[&["1", "30"], &["2", "10"], &["3", "20"]]);
        let result = run("SELECT id, val FROM t ORDER BY val DESC LIMIT 2", src).unwrap();
        assert_eq!(column(&result, "val"), vec![Value::Double(30.0), Value::Double(20.0)]);
    }

    #[test]
    fn star_keeps_header_order() {
        let src = MemorySource::from_strs(&["id", "name", "active"], &[&["1", "A", "true"]]);
        let result = run("SELECT * FROM t WHERE active = true", src).unwrap();
        assert_eq!(result.header, vec!["id", "name", "active"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Double(1.0), Value::String("A".into()), Value::Bool(true)]]
        );
    }

    #[test]
    fn non_boolean_where_excludes_rows() {
        let result = run("SELECT id FROM t WHERE sales", sales()).unwrap();
        assert!(result.is_empty());
        let result = run("SELECT id FROM t WHERE NULL", sales()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn derived_column_names() {
        let result = run("SELECT id, sales / 2, city c FROM t LIMIT 1", sales()).unwrap();
        assert_eq!(result.header, vec!["id", "sales / 2", "c"]);
    }

    #[test]
    fn order_by_uses_output_names() {
        let result = run("SELECT sales AS s FROM t ORDER BY s", sales()).unwrap();
        assert_eq!(
            column(&result, "s"),
            vec![Value::Double(90.0), Value::Double(150.0), Value::Double(200.0)]
        );
    }

    #[test]
    fn order_by_unselected_column_fails_at_runtime() {
        // Passes analysis (the source has `id`) but the sort context only
        // holds output columns.
        let err = run("SELECT city FROM t ORDER BY id", sales()).unwrap_err();
        match err {
            Error::Runtime(e) => assert_eq!(e.message, "Undefined column: id"),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn order_by_unselected_column_on_single_row_is_not_evaluated() {
        let src = MemorySource::from_strs(&["id", "city"], &[&["1", "NY"]]);
        let result = run("SELECT city FROM t ORDER BY id", src).unwrap();
        assert_eq!(column(&result, "city"), vec![Value::from("NY")]);
    }

    #[test]
    fn overflowed_values_sort_numerically() {
        let src = MemorySource::from_strs(&["x"], &[&["-0.5"], &["-1e308"], &["1e308"], &["2"]]);
        let result = run("SELECT x * 10 AS x FROM t ORDER BY x", src).unwrap();
        assert_eq!(
            column(&result, "x"),
            vec![
                Value::Double(f64::NEG_INFINITY),
                Value::Double(-5.0),
                Value::Double(20.0),
                Value::Double(f64::INFINITY),
            ]
        );
    }

    #[test]
    fn multi_key_sort_is_stable() {
        let src = MemorySource::from_strs(
            &["k", "v", "tag"],
            &[
                &["b", "1", "first"],
                &["a", "2", "second"],
                &["b", "1", "third"],
                &["a", "1", "fourth"],
            ],
        );
        let result = run("SELECT k, v, tag FROM t ORDER BY k ASC, v DESC", src).unwrap();
        let tags: Vec<Value> = column(&result, "tag");
        assert_eq!(
            tags,
            vec![
                Value::from("second"),
                Value::from("fourth"),
                Value::from("first"),
                Value::from("third"),
            ]
        );
    }

    #[test]
    fn nulls_sort_first_ascending_and_last_descending() {
        let src = MemorySource::from_strs(&["x"], &[&["2"], &[""], &["1"]]);
        let asc = run("SELECT x FROM t ORDER BY x", src.clone()).unwrap();
        assert_eq!(column(&asc, "x"), vec![Value::Null, Value::Double(1.0), Value::Double(2.0)]);
        let desc = run("SELECT x FROM t ORDER BY x DESC", src).unwrap();
        assert_eq!(column(&desc, "x"), vec![Value::Double(2.0), Value::Double(1.0), Value::Null]);
    }

    #[test]
    fn mixed_types_sort_by_text_form() {
        let src = MemorySource::from_strs(&["x"], &[&["pear"], &["10"], &["apple"]]);
        let result = run("SELECT x FROM t ORDER BY x", src).unwrap();
        assert_eq!(
            column(&result, "x"),
            vec![Value::Double(10.0), Value::from("apple"), Value::from("pear")]
        );
    }

    #[test]
    fn limit_larger_than_result_and_zero() {
        assert_eq!(run("SELECT id FROM t LIMIT 10", sales()).unwrap().len(), 3);
        assert_eq!(run("SELECT id FROM t LIMIT 0", sales()).unwrap().len(), 0);
    }

    #[test]
    fn limit_applies_after_filter() {
        let result = run("SELECT id FROM t WHERE city = 'NY' LIMIT 1", sales()).unwrap();
        assert_eq!(column(&result, "id"), vec![Value::Double(1.0)]);
    }

    #[test]
    fn runtime_error_aborts_statement() {
        let err = run("SELECT sales / (id - 2) FROM t", sales()).unwrap_err();
        assert!(matches!(err, Error::Runtime(ref e) if e.message == "Division by zero."));
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn type_error_in_where() {
        let err = run("SELECT id FROM t WHERE city > 1", sales()).unwrap_err();
        assert!(matches!(err, Error::Runtime(ref e) if e.message == "Operands must be numbers."));
    }

    #[test]
    fn unexpanded_wildcard_is_internal_error() {
        let stmt = sql::parse("SELECT * FROM t").unwrap();
        let err = execute(&stmt, &mut sales(), "").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn empty_source_yields_empty_result_with_header() {
        let src = MemorySource::from_strs(&["a", "b"], &[]);
        let result = run("SELECT b, a FROM t ORDER BY a", src).unwrap();
        assert_eq!(result.header, vec!["b", "a"]);
        assert!(result.is_empty());
    }

    #[test]
    fn result_table_accessors() {
        let result = run("SELECT id, city FROM t", sales()).unwrap();
        assert_eq!(result.column_index("city"), Some(1));
        assert_eq!(result.column_index("nope"), None);
        assert_eq!(result.get(2, "city"), Some(&Value::from("NY")));
        assert_eq!(result.get(3, "city"), None);
        assert_eq!((&result).into_iter().count(), 3);
        let owned: Vec<Vec<Value>> = result.into_iter().collect();
        assert_eq!(owned.len(), 3);
    }
}
