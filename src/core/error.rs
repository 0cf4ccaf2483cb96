//! Error handling and error types for foldeval.
//!
//! Every failure in fold assignment, metric computation or aggregation is
//! reported through [`FoldEvalError`]. Degenerate metrics (a class with no
//! true or no predicted instances) are not errors: their F1 is defined as 0.

use std::io;
use thiserror::Error;

/// Main error type for the foldeval library.
#[derive(Error, Debug)]
pub enum FoldEvalError {
    /// Invalid input parameters, detected before any computation
    #[error("Invalid argument: {parameter} = {value}, {reason}")]
    InvalidArgument {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Rows that do not match the schema the computation expects
    #[error("Inconsistent schema: {message}")]
    InconsistentSchema { message: String },

    /// A fold or stratum with zero rows where rows are required
    #[error("Empty partition: {what} {index} has no rows")]
    EmptyPartition { what: String, index: usize },

    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Data loading and parsing errors
    #[error("Data loading error: {message}")]
    DataLoading { message: String },

    /// Errors raised by a fitted model while producing predictions
    #[error("Prediction error: {message}")]
    Prediction { message: String },

    /// Thread pool construction errors
    #[error("Threading error: {message}")]
    Threading { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// CSV parsing errors
    #[cfg(feature = "csv")]
    #[error("CSV parsing error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using FoldEvalError
pub type Result<T> = std::result::Result<T, FoldEvalError>;

impl FoldEvalError {
    /// Create an invalid argument error
    pub fn invalid_argument<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        FoldEvalError::InvalidArgument {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an inconsistent schema error
    pub fn inconsistent_schema<S: Into<String>>(message: S) -> Self {
        FoldEvalError::InconsistentSchema {
            message: message.into(),
        }
    }

    /// Create an empty partition error
    pub fn empty_partition<S: Into<String>>(what: S, index: usize) -> Self {
        FoldEvalError::EmptyPartition {
            what: what.into(),
            index,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        FoldEvalError::Config {
            message: message.into(),
        }
    }

    /// Create a data loading error
    pub fn data_loading<S: Into<String>>(message: S) -> Self {
        FoldEvalError::DataLoading {
            message: message.into(),
        }
    }

    /// Create a prediction error
    pub fn prediction<S: Into<String>>(message: S) -> Self {
        FoldEvalError::Prediction {
            message: message.into(),
        }
    }

    /// Create a threading error
    pub fn threading<S: Into<String>>(message: S) -> Self {
        FoldEvalError::Threading {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        FoldEvalError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// No partial reports exist, so only failures that a retry with different
    /// input could clear count as recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FoldEvalError::InvalidArgument { .. } => false,
            FoldEvalError::InconsistentSchema { .. } => false,
            FoldEvalError::EmptyPartition { .. } => true,
            FoldEvalError::Config { .. } => false,
            FoldEvalError::DataLoading { .. } => false,
            FoldEvalError::Prediction { .. } => true,
            FoldEvalError::Threading { .. } => true,
            FoldEvalError::IO { .. } => false,
            #[cfg(feature = "csv")]
            FoldEvalError::Csv { .. } => false,
            FoldEvalError::Json { .. } => false,
            FoldEvalError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            FoldEvalError::InvalidArgument { .. } => "invalid_argument",
            FoldEvalError::InconsistentSchema { .. } => "inconsistent_schema",
            FoldEvalError::EmptyPartition { .. } => "empty_partition",
            FoldEvalError::Config { .. } => "config",
            FoldEvalError::DataLoading { .. } => "data_loading",
            FoldEvalError::Prediction { .. } => "prediction",
            FoldEvalError::Threading { .. } => "threading",
            FoldEvalError::IO { .. } => "io",
            #[cfg(feature = "csv")]
            FoldEvalError::Csv { .. } => "csv",
            FoldEvalError::Json { .. } => "json",
            FoldEvalError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FoldEvalError::invalid_argument("num_folds", "0", "must be positive");
        assert_eq!(err.category(), "invalid_argument");
        assert!(!err.is_recoverable());

        let err = FoldEvalError::empty_partition("fold", 3);
        assert_eq!(err.category(), "empty_partition");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = FoldEvalError::empty_partition("fold", 2);
        let error_string = format!("{}", err);
        assert!(error_string.contains("Empty partition"));
        assert!(error_string.contains("fold 2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: FoldEvalError = io_err.into();
        assert!(matches!(err, FoldEvalError::IO { .. }));
        assert_eq!(err.category(), "io");
    }
}
