//! CSV-backed row source.
//!
//! Splitting is delegated to the `csv` crate, configured for RFC 4180 style
//! input: fields may be quoted, quoted fields may contain the separator and
//! line breaks, and a doubled quote inside a quoted field is a literal quote.
//! Records may be shorter or longer than the header.
//!
//! When the configuration says the file has no header, the columns are named
//! `col1`, `col2`, ... after the width of the first record.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::source::RowSource;

/// Reads records from any [`Read`] implementation.
///
/// The source keeps a one-record lookahead so that [`RowSource::has_next`]
/// can answer without consuming. The underlying reader (and the file handle,
/// for [`CsvSource::open`]) is released when the source is dropped.
pub struct CsvSource<R: Read> {
    reader: ::csv::Reader<R>,
    header: Vec<String>,
    pending: Option<Vec<String>>,
    exhausted: bool,
    rows_read: u64,
}

impl CsvSource<File> {
    /// Opens the CSV file at `path`.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening csv source");
        let file = File::open(path)?;
        Self::from_reader(file, config)
    }
}

impl<R: Read> CsvSource<R> {
    /// Wraps `rdr`, reading the header (or the first record, to size a
    /// synthesized header) immediately.
    pub fn from_reader(rdr: R, config: &Config) -> Result<Self> {
        let reader = ::csv::ReaderBuilder::new()
            .delimiter(config.separator_byte()?)
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);

        let mut source = CsvSource {
            reader,
            header: Vec::new(),
            pending: None,
            exhausted: false,
            rows_read: 0,
        };

        if config.has_header {
            if let Some(mut names) = source.read_record()? {
                if let Some(first) = names.first_mut() {
                    if let Some(stripped) = first.strip_prefix('\u{feff}') {
                        *first = stripped.to_string();
                    }
                }
                source.header = names;
            }
        } else if source.has_next()? {
            let width = source.pending.as_ref().map_or(0, Vec::len);
            source.header = (1..=width).map(|i| format!("col{}", i)).collect();
        }

        debug!(columns = ?source.header, "csv header");
        Ok(source)
    }

    /// Number of data records handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut record = ::csv::StringRecord::new();
        if self.reader.read_record(&mut record)? {
            Ok(Some(record.iter().map(str::to_string).collect()))
        } else {
            self.exhausted = true;
            Ok(None)
        }
    }
}

impl<R: Read> RowSource for CsvSource<R> {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.read_record()?;
        }
        Ok(self.pending.is_some())
    }

    fn next_row(&mut self) -> Result<Vec<String>> {
        if !self.has_next()? {
            return Err(Error::Internal(
                "next_row called on an exhausted row source".into(),
            ));
        }
        match self.pending.take() {
            Some(row) => {
                self.rows_read += 1;
                Ok(row)
            }
            None => Err(Error::Internal("lookahead record vanished".into())),
        }
    }
}

impl<R: Read> Drop for CsvSource<R> {
    fn drop(&mut self) {
        trace!(rows_read = self.rows_read, "closing csv source");
    }
}
