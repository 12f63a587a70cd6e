//! Runtime value representation for sqlcsv.
//!
//! CSV files carry no type information: every field is raw text. The
//! evaluator classifies each field lazily when an identifier reads it, and
//! the result of every expression is one of the five variants of [`Value`].
//!
//! This module provides:
//! - [`Value`]: the dynamically-typed result of evaluating an expression.
//! - [`Value::from_field`]: the classification rule turning a raw CSV field
//!   into a value (null sentinel, boolean, double, or plain string).
//! - The natural text form ([`fmt::Display`]) used for string concatenation
//!   and for re-stringifying projected rows before sorting.

use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically-typed query value.
///
/// | Variant   | Origin                                             |
/// |-----------|----------------------------------------------------|
/// | `Null`    | the `NULL` literal, the null sentinel, short rows  |
/// | `Bool`    | `TRUE`/`FALSE`, fields reading `true`/`false`      |
/// | `Integer` | integer literals in the query text only            |
/// | `Double`  | numeric fields, double literals, all arithmetic    |
/// | `String`  | string literals, non-numeric fields                |
///
/// Values read from a data field are never `Integer`: numeric fields always
/// classify as `Double`. Integers only come from literal tokens such as the
/// `LIMIT` count.
///
/// `PartialEq` is structural (`Integer(1) != Double(1.0)`); SQL equality,
/// which compares numbers by value, is [`Value::sql_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The SQL NULL value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer (literal tokens only).
    Integer(i64),
    /// An IEEE 754 64-bit floating-point number.
    Double(f64),
    /// A UTF-8 string.
    String(String),
}

impl Value {
    /// Classifies a raw CSV field.
    ///
    /// In order:
    /// 1. the configured null sentinel yields [`Value::Null`];
    /// 2. `true` / `false` in any letter case yield [`Value::Bool`];
    /// 3. a base-10 floating-point number (surrounding whitespace ignored)
    ///    yields [`Value::Double`]. This includes `inf`, `-inf` and `NaN`,
    ///    the text forms of non-finite doubles, so that re-stringified
    ///    values classify back to numbers;
    /// 4. anything else is kept verbatim as [`Value::String`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlcsv::types::Value;
    ///
    /// assert_eq!(Value::from_field("", ""), Value::Null);
    /// assert_eq!(Value::from_field("TRUE", ""), Value::Bool(true));
    /// assert_eq!(Value::from_field("150.0", ""), Value::Double(150.0));
    /// assert_eq!(Value::from_field("42", ""), Value::Double(42.0));
    /// assert_eq!(Value::from_field("NY", ""), Value::String("NY".into()));
    /// assert_eq!(Value::from_field("n/a", "n/a"), Value::Null);
    /// ```
    pub fn from_field(raw: &str, null_string: &str) -> Value {
        if raw == null_string {
            return Value::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        match raw.trim().parse::<f64>() {
            Ok(d) => Value::Double(d),
            Err(_) => Value::String(raw.to_string()),
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for [`Value::Integer`] and [`Value::Double`].
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    /// Widens a numeric value to `f64`. Returns `None` for non-numeric
    /// variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Truthiness used by `AND`, `OR` and `NOT`.
    ///
    /// `NULL` is false, a boolean is itself, and every other value is true
    /// (including `0`, `0.0` and the empty string).
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlcsv::types::Value;
    ///
    /// assert!(!Value::Null.is_truthy());
    /// assert!(!Value::Bool(false).is_truthy());
    /// assert!(Value::Double(0.0).is_truthy());
    /// assert!(Value::String(String::new()).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    /// SQL equality for `=`, `<>` and `!=`.
    ///
    /// Two `NULL`s are equal and `NULL` never equals a non-null value. Numeric
    /// values compare by numeric value regardless of whether they came from an
    /// integer literal or a parsed double; every other pair must match in
    /// both type and value.
    pub fn sql_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            (a, b) => a == b,
        }
    }

    /// Ordering used by `ORDER BY` for a single sort key.
    ///
    /// `NULL` sorts before everything; numbers compare numerically; values of
    /// the same non-numeric type use their natural ordering; anything else
    /// falls back to comparing the natural text forms.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }

    /// A short name for the value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Value {
    /// The natural text form of a value.
    ///
    /// - NULL is rendered as `NULL`.
    /// - Whole doubles keep one decimal place (`165.0`) to stay
    ///   distinguishable from integers; other doubles use the shortest
    ///   representation that round-trips.
    /// - Strings are rendered without quotes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    write!(f, "{:.1}", d)
                } else {
                    write!(f, "{}", d)
                }
            }
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// From trait implementations
// ---------------------------------------------------------------------------

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
