//! Core error types.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core table and math operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Referenced column does not exist in the frame.
    #[error("Column not found: '{name}'")]
    ColumnNotFound { name: String },

    /// Column exists but holds the wrong kind of data.
    #[error("Column '{name}' is not {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// Column length disagrees with the frame's row count.
    #[error("Column '{name}' has {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Frames being combined disagree on a column's type.
    #[error("Schema mismatch on column '{name}': {reason}")]
    SchemaMismatch { name: String, reason: String },

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Insufficient data points for the operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Scaler or model used before fitting.
    #[error("Must be fitted before transform")]
    NotFitted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_message() {
        let error = CoreError::ColumnNotFound {
            name: "tempo".to_string(),
        };
        assert_eq!(error.to_string(), "Column not found: 'tempo'");
    }

    #[test]
    fn test_insufficient_data_message() {
        let error = CoreError::InsufficientData {
            required: 4,
            actual: 2,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 4 points, got 2"
        );
    }

    #[test]
    fn test_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>() {}
        assert_std_error::<CoreError>();
    }
}
