//! # sqlcsv
//!
//! A small SQL dialect engine that queries CSV files as relational tables.
//!
//! A query flows through the pipeline
//! lexer → parser → analyzer → executor:
//!
//! ```no_run
//! use sqlcsv::{Config, Engine};
//!
//! let engine = Engine::new(Config::default());
//! let result = engine
//!     .query("SELECT city, sales * 1.1 AS new_sales FROM sales WHERE sales > 100.0", "sales.csv")
//!     .unwrap();
//! for row in &result {
//!     println!("{:?}", row);
//! }
//! ```
//!
//! Each stage is also usable on its own: [`sql::parse`],
//! [`analyzer::analyze`] and [`execution::execute`].

pub mod analyzer;
pub mod config;
pub mod error;
pub mod execution;
pub mod source;
pub mod sql;
pub mod types;

pub use config::Config;
pub use error::{Error, LexError, ParseError, Result, RuntimeError, SemanticError};
pub use execution::ResultTable;
pub use source::{CsvSource, MemorySource, RowSource};
pub use types::Value;

use std::path::Path;

use tracing::debug;

use crate::sql::ast::Select;

/// Runs queries with a fixed [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Engine { config }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `sql` against the CSV file at `path`.
    ///
    /// The table named in `FROM` must match the file name without its final
    /// extension, ignoring ASCII case: `FROM sales` accepts `sales.csv` and
    /// `Sales.CSV` but not `sales_2024.csv`.
    pub fn query(&self, sql_text: &str, path: impl AsRef<Path>) -> Result<ResultTable> {
        let path = path.as_ref();
        let stmt = sql::parse(sql_text)?;
        // Dropped on every return path below, closing the file.
        let mut source = CsvSource::open(path, &self.config)?;
        check_table_name(&stmt, path)?;
        self.run(&stmt, &mut source)
    }

    /// Runs `sql` against an arbitrary row source. The `FROM` name is not
    /// checked.
    pub fn query_source<S: RowSource + ?Sized>(
        &self,
        sql_text: &str,
        source: &mut S,
    ) -> Result<ResultTable> {
        let stmt = sql::parse(sql_text)?;
        self.run(&stmt, source)
    }

    fn run<S: RowSource + ?Sized>(&self, stmt: &Select, source: &mut S) -> Result<ResultTable> {
        let bound = analyzer::analyze(stmt, source.header())?;
        let result = execution::execute(&bound, source, &self.config.null_string)?;
        debug!(rows = result.len(), columns = result.header.len(), "query complete");
        Ok(result)
    }
}

fn check_table_name(stmt: &Select, path: &Path) -> Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stmt.table_name().eq_ignore_ascii_case(&stem) {
        Ok(())
    } else {
        Err(SemanticError::new(format!(
            "Table name in query '{}' does not match CSV file name '{}'.",
            stmt.table_name(),
            stem
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_source_runs_full_pipeline() {
        let engine = Engine::default();
        let mut src = MemorySource::from_strs(&["a", "b"], &[&["1", "x"], &["2", "y"]]);
        let result = engine
            .query_source("SELECT b FROM anything WHERE a >= 2", &mut src)
            .unwrap();
        assert_eq!(result.header, vec!["b"]);
        assert_eq!(result.rows, vec![vec![Value::from("y")]]);
    }

    #[test]
    fn null_sentinel_comes_from_config() {
        let engine = Engine::new(Config::new().null_string("NA"));
        let mut src = MemorySource::from_strs(&["a"], &[&["NA"], &["1"]]);
        let result = engine
            .query_source("SELECT a FROM t WHERE a = NULL", &mut src)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(engine.config().null_string, "NA");
    }

    #[test]
    fn table_name_check() {
        let stmt = sql::parse("SELECT a FROM Sales").unwrap();
        assert!(check_table_name(&stmt, Path::new("/data/sales.csv")).is_ok());
        assert!(check_table_name(&stmt, Path::new("SALES")).is_ok());
        assert!(check_table_name(&stmt, Path::new("sales.tar.csv")).is_err());

        let err = check_table_name(&stmt, Path::new("/data/orders.csv")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Semantic error: Table name in query 'Sales' does not match CSV file name 'orders'."
        );
    }

    #[test]
    fn errors_surface_by_stage() {
        let engine = Engine::default();
        let mut src = MemorySource::from_strs(&["a"], &[&["1"]]);
        assert!(matches!(engine.query_source("SELECT #", &mut src), Err(Error::Lex(_))));
        assert!(matches!(engine.query_source("SELECT a", &mut src), Err(Error::Parse(_))));
        assert!(matches!(
            engine.query_source("SELECT b FROM t", &mut src),
            Err(Error::Semantic(_))
        ));
        assert!(matches!(
            engine.query_source("SELECT a / 0 FROM t", &mut src),
            Err(Error::Runtime(_))
        ));
    }
}
