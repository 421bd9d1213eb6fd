//! Error types and result type for the wordlist crate.
//!
//! This module defines all error variants that can occur while importing,
//! storing or checking wordlists. It uses the `snafu` library for ergonomic
//! error handling with automatic backtrace capture.
//!
//! # Examples
//!
//! ```
//! use wordlist::{Result, WordlistError};
//!
//! fn read_status() -> Result<String> {
//!     Err(WordlistError::invalid_state("seed lists do not support containment checks"))
//! }
//!
//! match read_status() {
//!     Ok(data) => println!("Success: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! # Error Variants
//!
//! - [`WordlistError::Io`]: I/O errors from file and stream operations
//! - [`WordlistError::ParserError`]: JSON, URL or archive format errors
//! - [`WordlistError::InvalidState`]: contract violations (e.g. seed op on a word bucket)
//! - [`WordlistError::ServiceUnavailable`]: backing store failures or a closed service
//! - [`WordlistError::ImportError`]: import aborted (no free space, zero words, ...)
//! - [`WordlistError::RemoteFetch`]: network failures while reading a remote source
//! - [`WordlistError::Cancelled`]: cooperative cancellation, not a failure
//! - [`WordlistError::CancelTimeout`]: a background operation did not yield in time

use std::io;
use snafu::{Snafu, Backtrace};

// Re-export snafu for context providers
pub use snafu;

/// Main error type for the wordlist crate.
///
/// All errors include automatic backtrace capture for debugging purposes.
/// Use the helper methods on `WordlistError` for convenient error construction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WordlistError {
    /// I/O error occurred during file or stream operations.
    #[snafu(display("IO error: {source}"))]
    Io {
        source: io::Error,
        backtrace: Backtrace,
    },

    /// Error parsing JSON, URLs or archive structures.
    #[snafu(display("Parser error: {source}"))]
    ParserError {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        backtrace: Backtrace,
    },

    /// Operation is not valid for the current wordlist kind or state.
    #[snafu(display("Invalid state: {message}"))]
    InvalidState {
        message: String,
        backtrace: Backtrace,
    },

    /// The backing store failed or the service is not open.
    #[snafu(display("Service unavailable: {message}"))]
    ServiceUnavailable {
        message: String,
        backtrace: Backtrace,
    },

    /// An import could not complete.
    #[snafu(display("Wordlist import error: {message}"))]
    ImportError {
        message: String,
        backtrace: Backtrace,
    },

    /// A remote wordlist source could not be read.
    #[snafu(display("Remote fetch error: {message}"))]
    RemoteFetch {
        message: String,
        backtrace: Backtrace,
    },

    /// Operation was cancelled cooperatively.
    #[snafu(display("Operation cancelled"))]
    Cancelled {
        backtrace: Backtrace,
    },

    /// A running background operation did not observe the cancel request in time.
    #[snafu(display("Unable to cancel background operation: {message}"))]
    CancelTimeout {
        message: String,
        backtrace: Backtrace,
    },
}

// For automatic conversions from standard error types
impl From<io::Error> for WordlistError {
    fn from(source: io::Error) -> Self {
        Self::Io { source, backtrace: Backtrace::capture() }
    }
}

impl From<serde_json::Error> for WordlistError {
    fn from(source: serde_json::Error) -> Self {
        Self::ParserError { source: Box::new(source), backtrace: Backtrace::capture() }
    }
}

impl From<url::ParseError> for WordlistError {
    fn from(source: url::ParseError) -> Self {
        Self::ParserError { source: Box::new(source), backtrace: Backtrace::capture() }
    }
}

impl From<std::str::Utf8Error> for WordlistError {
    fn from(source: std::str::Utf8Error) -> Self {
        Self::ParserError { source: Box::new(source), backtrace: Backtrace::capture() }
    }
}

impl From<zip::result::ZipError> for WordlistError {
    fn from(source: zip::result::ZipError) -> Self {
        match source {
            zip::result::ZipError::Io(source) => Self::Io { source, backtrace: Backtrace::capture() },
            other => Self::ImportError {
                message: format!("corrupt archive: {}", other),
                backtrace: Backtrace::capture(),
            },
        }
    }
}

impl From<rusqlite::Error> for WordlistError {
    fn from(source: rusqlite::Error) -> Self {
        Self::ServiceUnavailable {
            message: format!("local store error: {}", source),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<reqwest::Error> for WordlistError {
    fn from(source: reqwest::Error) -> Self {
        Self::RemoteFetch {
            message: source.to_string(),
            backtrace: Backtrace::capture(),
        }
    }
}

/// Helper methods for creating errors without context providers.
impl WordlistError {
    /// Creates an `InvalidState` error with the given message.
    ///
    /// # Examples
    ///
    /// ```
    /// use wordlist::WordlistError;
    ///
    /// let error = WordlistError::invalid_state("bucket is not a seed bucket");
    /// ```
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a `ServiceUnavailable` error with the given message.
    pub fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an `ImportError` with the given message.
    pub fn import_error<S: Into<String>>(message: S) -> Self {
        Self::ImportError {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a `RemoteFetch` error with the given message.
    pub fn remote_fetch<S: Into<String>>(message: S) -> Self {
        Self::RemoteFetch {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a `ParserError` from a plain message.
    pub fn parser_error<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::ParserError {
            source: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a `Cancelled` error.
    pub fn cancelled() -> Self {
        Self::Cancelled {
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a `CancelTimeout` error.
    pub fn cancel_timeout<S: Into<String>>(message: S) -> Self {
        Self::CancelTimeout {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Checks if this error is the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WordlistError::Cancelled { .. })
    }

    /// Checks if this error is an `InvalidState` variant.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, WordlistError::InvalidState { .. })
    }

    /// Checks if this error is an `ImportError` variant.
    pub fn is_import_error(&self) -> bool {
        matches!(self, WordlistError::ImportError { .. })
    }
}

/// A specialized `Result` type for wordlist operations.
///
/// This is a convenience type alias that uses [`WordlistError`] as the error type.
pub type Result<T> = std::result::Result<T, WordlistError>;
