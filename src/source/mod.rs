//! Row sources: where the executor pulls raw records from.
//!
//! A [`RowSource`] exposes an ordered header and a forward-only stream of
//! records, each an ordered list of raw string fields. Records need not match
//! the header's width; the evaluator reads missing trailing fields as `NULL`.
//!
//! Two implementations ship with the crate:
//! - [`CsvSource`] reads delimited text through the `csv` crate.
//! - [`MemorySource`] serves pre-split records, mainly for tests and
//!   benchmarks.
//!
//! A source is owned by whoever runs the statement and is released when it
//! goes out of scope, on success and error paths alike.

pub mod csv;

use std::collections::VecDeque;

use crate::error::{Error, Result};

pub use self::csv::CsvSource;

/// A header plus a forward-only stream of raw records.
pub trait RowSource {
    /// Column names in file order.
    fn header(&self) -> &[String];

    /// Returns `true` if another record is available.
    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next record.
    ///
    /// Fails if the source is exhausted, or on an underlying read error.
    fn next_row(&mut self) -> Result<Vec<String>>;
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn header(&self) -> &[String] {
        (**self).header()
    }

    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }

    fn next_row(&mut self) -> Result<Vec<String>> {
        (**self).next_row()
    }
}

/// A row source over records already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    header: Vec<String>,
    rows: VecDeque<Vec<String>>,
}

impl MemorySource {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        MemorySource {
            header,
            rows: rows.into(),
        }
    }

    /// Builds a source from string slices.
    ///
    /// ```
    /// use sqlcsv::source::{MemorySource, RowSource};
    ///
    /// let mut src = MemorySource::from_strs(&["id", "city"], &[&["1", "NY"]]);
    /// assert_eq!(src.header(), ["id", "city"]);
    /// assert!(src.has_next().unwrap());
    /// assert_eq!(src.next_row().unwrap(), ["1", "NY"]);
    /// assert!(!src.has_next().unwrap());
    /// ```
    pub fn from_strs(header: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    /// Number of records not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for MemorySource {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(!self.rows.is_empty())
    }

    fn next_row(&mut self) -> Result<Vec<String>> {
        self.rows
            .pop_front()
            .ok_or_else(|| Error::Internal("next_row called on an exhausted row source".into()))
    }
}
