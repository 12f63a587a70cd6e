//! # sqlcsv CLI
//!
//! Runs one query against one CSV file and prints the result as a table.
//!
//! ```text
//! sqlcsv "SELECT city, sales FROM sales WHERE sales > 100" --csv sales.csv
//! ```
//!
//! Exit codes follow `sysexits`: 0 on success, 64 for usage errors, 65 for
//! bad queries or data, 70 for internal failures.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::error::ErrorKind;
use clap::Parser;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

use sqlcsv::sql::TokenKind;
use sqlcsv::{Config, Engine, Error, ResultTable, Value};

const EXIT_USAGE: u8 = 64;

/// Query a CSV file with SQL.
#[derive(Parser, Debug)]
#[command(name = "sqlcsv", version, about, long_about = None)]
struct Cli {
    /// The query to run, e.g. "SELECT * FROM data LIMIT 10"
    query: String,

    /// Path to the CSV file. Its name (without extension) is the table name.
    #[arg(long)]
    csv: PathBuf,

    /// Field separator. Accepts a single character or `\t` for tab.
    #[arg(long, default_value = ",", value_parser = parse_separator)]
    separator: char,

    /// Whether the first record holds the column names. Only `true`, in any
    /// letter case, turns the header on.
    #[arg(long, default_value = "true", value_parser = parse_header_flag, action = clap::ArgAction::Set)]
    header: bool,

    /// Field text to read as NULL.
    #[arg(long = "null-str", default_value = "")]
    null_str: String,

    /// Log pipeline progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_separator(s: &str) -> Result<char, String> {
    if s == "\\t" {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got {:?}", s)),
    }
}

fn parse_header_flag(s: &str) -> Result<bool, String> {
    Ok(s.eq_ignore_ascii_case("true"))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                return ExitCode::from(EXIT_USAGE);
            }
        },
    };

    let default_directive = if cli.verbose { "sqlcsv=debug" } else { "sqlcsv=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new()
        .separator(cli.separator)
        .has_header(cli.header)
        .null_string(cli.null_str.clone());
    let engine = Engine::new(config);

    let start = Instant::now();
    match engine.query(&cli.query, &cli.csv) {
        Ok(result) => {
            print_result(&result);
            eprintln!("Rows: {} ({} ms)", result.len(), start.elapsed().as_millis());
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&cli.query, &e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_result(result: &ResultTable) {
    if result.is_empty() {
        println!("Query returned no results.");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(result.header.iter().cloned());
    for row in result {
        builder.push_record(row.iter().map(format_value));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Double(d) => format!("{:.1}", d),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn report_error(query: &str, error: &Error) {
    eprintln!("{}", error);
    match error {
        Error::Parse(e) if e.token.kind == TokenKind::Eof => eprintln!(" at end of file."),
        Error::Parse(e) => print_caret(query, e.token.line, e.token.col),
        Error::Lex(e) => print_caret(query, e.line, e.col),
        _ => {}
    }
}

/// Echoes the offending query line with a caret under column `col`.
fn print_caret(query: &str, line: usize, col: usize) {
    if let Some((text, caret)) = caret_lines(query, line, col) {
        eprintln!("{}", text);
        eprintln!("{}", caret);
    }
}

/// The query line at 1-based `line` and a `^-- Here` marker aligned under
/// byte column `col`. Positions outside the query yield `None`.
fn caret_lines(query: &str, line: usize, col: usize) -> Option<(&str, String)> {
    let text = line.checked_sub(1).and_then(|i| query.lines().nth(i))?;
    let width = text
        .get(..col.saturating_sub(1))
        .map_or(0, |prefix| prefix.chars().count());
    Some((text, format!("{}^-- Here", " ".repeat(width))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_points_at_column() {
        let (text, caret) = caret_lines("SELECT a FROM t WHERE", 1, 8).unwrap();
        assert_eq!(text, "SELECT a FROM t WHERE");
        assert_eq!(caret, "       ^-- Here");
    }

    #[test]
    fn caret_uses_the_error_line() {
        let (text, caret) = caret_lines("SELECT a\nFROM t\nORDER x", 3, 7).unwrap();
        assert_eq!(text, "ORDER x");
        assert_eq!(caret, "      ^-- Here");
    }

    #[test]
    fn caret_counts_characters_not_bytes() {
        let (_, caret) = caret_lines("SELECT 'é' ?", 1, 13).unwrap();
        assert_eq!(caret, "           ^-- Here");
    }

    #[test]
    fn caret_outside_query_is_skipped() {
        assert!(caret_lines("SELECT", 0, 1).is_none());
        assert!(caret_lines("SELECT", 2, 1).is_none());
    }

    #[test]
    fn header_flag_ignores_case() {
        assert_eq!(parse_header_flag("TRUE"), Ok(true));
        assert_eq!(parse_header_flag("False"), Ok(false));
        assert_eq!(parse_header_flag("no"), Ok(false));
    }

    #[test]
    fn header_flag_from_command_line() {
        let cli = Cli::try_parse_from(["sqlcsv", "SELECT * FROM t", "--csv", "t.csv", "--header", "FALSE"]).unwrap();
        assert!(!cli.header);
        let cli = Cli::try_parse_from(["sqlcsv", "SELECT * FROM t", "--csv", "t.csv"]).unwrap();
        assert!(cli.header);
    }

    #[test]
    fn tab_separator_escape() {
        assert_eq!(parse_separator("\\t"), Ok('\t'));
        assert_eq!(parse_separator(";"), Ok(';'));
        assert!(parse_separator("ab").is_err());
    }
}
