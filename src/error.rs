//! Error types for splitting operations

use std::io;
use thiserror::Error;

/// Errors raised while splitting a message
#[derive(Debug, Error)]
pub enum SplitError {
    /// The reopened ancestor tags plus unbreakable content exceed the budget
    #[error("Unsplittable fragment #{index}: {len} chars exceed the limit of {max_len}")]
    UnsplittableFragment {
        /// 1-based number of the fragment that could not be kept under budget.
        index: usize,
        /// Accounted length of the offending fragment.
        len: usize,
        /// Configured budget.
        max_len: usize,
    },

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing a debug diagnostic failed
    #[error("Failed to write diagnostics: {0}")]
    Diagnostics(#[from] io::Error),
}

/// Result type for splitting operations
pub type Result<T> = std::result::Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsplittable_display() {
        let error = SplitError::UnsplittableFragment {
            index: 1,
            len: 28,
            max_len: 10,
        };
        assert_eq!(
            error.to_string(),
            "Unsplittable fragment #1: 28 chars exceed the limit of 10"
        );
    }

    #[test]
    fn test_invalid_config_display() {
        let error = SplitError::InvalidConfig("max_len must be greater than 0".into());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: max_len must be greater than 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let error: SplitError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(error, SplitError::Diagnostics(_)));
        assert!(error.to_string().starts_with("Failed to write diagnostics:"));
    }
}
