//! # Error Types
//!
//! This module defines all error types for the `ust` crate.
//!
//! Parse errors carry the 1-based line of the document they came from (0 when
//! the text was handed directly to an entry), so a caller can point at the
//! offending line of a project file.
//!
//! ## Error Types
//! - `FormatError` - malformed token or structurally invalid document
//! - `ValueError` - unrecognized or out-of-range note name
//! - `BoundsError` - index violation on a list or tuple entry
//! - `DecodeError` - no candidate encoding could decode the bytes
//! - `EncodeError` - text not representable in the save encoding
//! - `NotFoundError` - a timing record was required but missing
//! - `ConfigError` - invalid settings
//! - `IoError` - filesystem failure, passed through untouched
//!
//! ## Usage
//! ```rust
//! use ust::{Document, Settings, UstError};
//!
//! match Document::load(b"no markers here", &Settings::default()) {
//!     Ok(doc) => println!("{} notes", doc.len()),
//!     Err(UstError::FormatError { line, message }) => {
//!         eprintln!("line {}: {}", line, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UstError {
    /// Malformed token or structurally invalid document.
    ///
    /// # Example
    /// ```
    /// # use ust::UstError;
    /// let err = UstError::FormatError {
    ///     line: 4,
    ///     message: "abc is not int".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Format error at line 4: abc is not int");
    /// ```
    #[error("Format error at line {line}: {message}")]
    FormatError { line: usize, message: String },

    /// A note name outside the supported pitch range, or a velocity with
    /// no finite rate.
    #[error("Invalid value: {0}")]
    ValueError(String),

    /// Index outside a list or tuple entry.
    ///
    /// # Example
    /// ```
    /// # use ust::UstError;
    /// let err = UstError::BoundsError { index: 10, len: 3 };
    /// assert_eq!(err.to_string(), "Index 10 out of bounds for length 3");
    /// ```
    #[error("Index {index} out of bounds for length {len}")]
    BoundsError { index: usize, len: usize },

    /// Every candidate encoding failed.
    #[error("Could not decode text with any of: {}", attempted.join(", "))]
    DecodeError { attempted: Vec<String> },

    /// Saved text contains characters the target encoding cannot represent.
    #[error("Could not encode text as {encoding}: {message}")]
    EncodeError { encoding: String, message: String },

    /// A required external record was absent.
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Invalid settings.
    #[error("Invalid settings: {0}")]
    ConfigError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl UstError {
    /// Shorthand for a format error that is not tied to a document line.
    pub(crate) fn format(message: impl Into<String>) -> Self {
        UstError::FormatError {
            line: 0,
            message: message.into(),
        }
    }

    /// Attach a document line to a format error raised by an entry.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            UstError::FormatError { message, .. } => UstError::FormatError { line, message },
            other => other,
        }
    }
}
