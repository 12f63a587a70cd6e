//! Statement configuration.
//!
//! The three settings here parameterize a query run end to end: the
//! separator and header flag shape how the CSV row source splits its input,
//! and the null sentinel decides which raw fields the evaluator reads as
//! `NULL`.

use crate::error::{Error, Result};

/// Configuration threaded from the entry point to the row source and the
/// evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Field separator. Must be a single ASCII character other than a quote
    /// or a line break.
    pub separator: char,
    /// Whether the first record holds the column names.
    pub has_header: bool,
    /// Raw field text that reads as `NULL`. Defaults to the empty string.
    pub null_string: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: ',',
            has_header: true,
            null_string: String::new(),
        }
    }
}

impl Config {
    /// Create a configuration with the defaults: comma separated, header
    /// present, empty fields are `NULL`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field separator.
    #[must_use]
    pub const fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set whether the first record is a header.
    #[must_use]
    pub const fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set the null sentinel.
    #[must_use]
    pub fn null_string(mut self, null_string: impl Into<String>) -> Self {
        self.null_string = null_string.into();
        self
    }

    /// Checks that the separator can be handed to the CSV reader.
    pub fn validate(&self) -> Result<()> {
        match self.separator {
            '"' | '\n' | '\r' => Err(Error::Config(format!(
                "separator {:?} conflicts with CSV quoting or record boundaries",
                self.separator
            ))),
            c if !c.is_ascii() => Err(Error::Config(format!(
                "separator {:?} must be a single ASCII character",
                c
            ))),
            _ => Ok(()),
        }
    }

    /// The separator as the single byte the CSV reader expects.
    pub fn separator_byte(&self) -> Result<u8> {
        self.validate()?;
        Ok(self.separator as u8)
    }
}
