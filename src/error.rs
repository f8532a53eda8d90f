//! The [`GtfError`] `enum` definition and error messages.
//!
use thiserror::Error;

/// The [`GtfError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum GtfError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),

    // Line decoding errors
    #[error("GTF feature line has {0} columns, but exactly 9 tab-separated columns are required.\nLine: {1}")]
    WrongColumnCount(usize, String),
    #[error("Invalid directive line: {0}")]
    InvalidDirective(String),
    #[error("Column '{column}' could not be parsed as {expected_type}: found '{found_value}'.\nLine: {line}")]
    InvalidColumnType {
        column: &'static str,
        expected_type: String,
        found_value: String,
        line: String,
    },
    #[error("Input line {0} is not valid UTF-8")]
    InvalidUtf8(u64),
    #[error("line {line_number}: {source}")]
    AtLine {
        line_number: u64,
        #[source]
        source: Box<GtfError>,
    },

    // Streaming driver errors
    #[error("Maximum line length exceeded: held {length} bytes without a line break (limit {max})")]
    LineTooLong { max: usize, length: usize },

    // Formatting errors
    #[error("Feature nesting exceeds the maximum depth of {0}")]
    MaxDepthExceeded(usize),

    // Command line tool related errors
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}

impl GtfError {
    /// Whether this is a per-line decode error, after which a streaming
    /// parse can keep going with the next line.
    pub fn is_decode_error(&self) -> bool {
        match self {
            GtfError::WrongColumnCount(..)
            | GtfError::InvalidDirective(_)
            | GtfError::InvalidColumnType { .. }
            | GtfError::InvalidUtf8(_) => true,
            GtfError::AtLine { source, .. } => source.is_decode_error(),
            _ => false,
        }
    }

    /// Attach a 1-based input line number to this error.
    pub fn at_line(self, line_number: u64) -> Self {
        GtfError::AtLine {
            line_number,
            source: Box::new(self),
        }
    }
}
