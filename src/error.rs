//! Error types for race ticker processing.
//!
//! This module provides comprehensive error handling for the paddock ticker library.
//! All errors implement the `std::error::Error` trait and include structured context
//! for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Fetch Errors**: Transport problems while downloading the timing document
//! - **HTTP Status Errors**: Upstream responded with a non-success status
//! - **Timeout Errors**: The fetch exceeded its configured deadline
//! - **Validation Errors**: A single timing row was rejected during canonicalization
//! - **Parse Errors**: The whole document could not be turned into a race state
//! - **Config Errors**: Invalid ticker configuration
//!
//! Fetch, status and timeout failures are absorbed by the ingest loop, which
//! keeps publishing the last good state; validation failures are absorbed per
//! row. Neither class ever tears down the pipeline.
//!
//! ## Recovery and Retry
//!
//! Errors provide methods to determine if they are recoverable:
//!
//! ```rust
//! use paddock::TickerError;
//!
//! let error = TickerError::fetch_failed("https://timing.example/live.csv", "connection refused");
//! if error.is_retryable() {
//!     println!("Can retry this operation");
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! ## Helper Constructors
//!
//! Use helper methods for common error scenarios:
//!
//! ```rust
//! use paddock::TickerError;
//! use std::time::Duration;
//!
//! // Transport failures
//! let fetch_error = TickerError::fetch_failed("https://timing.example/live.csv", "dns failure");
//!
//! // Deadline overruns
//! let timeout_error = TickerError::timeout("https://timing.example/live.csv", Duration::from_secs(5));
//!
//! // Rejected rows
//! let row_error = TickerError::row_invalid(3, "runner number is not an integer");
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ticker operations.
pub type Result<T, E = TickerError> = std::result::Result<T, E>;

/// Main error type for ticker operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TickerError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        url: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Upstream returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetch of {url} timed out after {duration:?}")]
    Timeout { url: String, duration: Duration },

    #[error("Invalid timing row {row}: {details}")]
    Validation { row: usize, details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },
}

impl TickerError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Transport-level failures are transient by nature; the next poll cycle
    /// may succeed without any intervention. Validation, parse and config
    /// failures are deterministic for the same input and will not clear on
    /// their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            TickerError::Fetch { .. } => true,
            TickerError::HttpStatus { .. } => true,
            TickerError::Timeout { .. } => true,
            TickerError::Validation { .. } => false,
            TickerError::Parse { .. } => false,
            TickerError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TickerError::Fetch { .. } => vec![
                "Check network connectivity to the timing source",
                "Verify the configured URL is reachable",
                "Confirm the timing provider is publishing",
            ],
            TickerError::HttpStatus { .. } => vec![
                "Check the timing source URL path",
                "Verify credentials or access rules on the upstream",
                "Wait for the upstream to recover if it returned 5xx",
            ],
            TickerError::Timeout { .. } => vec![
                "Increase the fetch timeout",
                "Check upstream responsiveness",
                "Reduce the poll interval pressure on the source",
            ],
            TickerError::Validation { .. } => vec![
                "Inspect the offending CSV row",
                "Check the exporter's column order",
                "Confirm runner numbers and lap counts are integers",
            ],
            TickerError::Parse { .. } => vec![
                "Verify the document is CSV",
                "Check the document is UTF-8 encoded",
                "Confirm the export contains at least one timing row",
            ],
            TickerError::Config { .. } => vec![
                "Review the ticker configuration values",
                "Check ranges on poll interval, fps and runner bound",
            ],
        }
    }

    /// Helper constructor for transport-level fetch errors.
    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        TickerError::Fetch { url: url.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport-level fetch errors with source.
    pub fn fetch_failed_with_source(
        url: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TickerError::Fetch { url: url.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for non-success HTTP responses.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        TickerError::HttpStatus { url: url.into(), status }
    }

    /// Helper constructor for fetch deadline overruns.
    pub fn timeout(url: impl Into<String>, duration: Duration) -> Self {
        TickerError::Timeout { url: url.into(), duration }
    }

    /// Helper constructor for rejected timing rows. `row` is the 1-based line
    /// number in the source document.
    pub fn row_invalid(row: usize, details: impl Into<String>) -> Self {
        TickerError::Validation { row, details: details.into() }
    }

    /// Helper constructor for document-level parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TickerError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        TickerError::Config { details: details.into() }
    }
}

impl From<serde_yaml_ng::Error> for TickerError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TickerError::Config { details: err.to_string() }
    }
}
