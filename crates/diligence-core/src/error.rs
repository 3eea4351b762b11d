//! Error types module
//!
//! One `AppError` enum covers the pipeline's failure surface: database,
//! storage, validation, batch preconditions, and illegal task transitions.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature. With `default-features = false` the enum carries the database
//! error message as a plain string instead.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Illegal upload transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    /// Whether the caller may retry the failed operation without changing it.
    ///
    /// Validation and batch-precondition failures are final until the input
    /// changes; storage and database errors are candidates for an explicit
    /// retry by the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_)
        )
    }

    /// Error type name for structured log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Validation(_) => "Validation",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidBatch(_) => "InvalidBatch",
            AppError::IllegalTransition { .. } => "IllegalTransition",
            AppError::Internal(_) => "Internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_not_recoverable() {
        let err = AppError::Validation(ValidationError::UnsupportedType {
            filename: "report.exe".to_string(),
            content_type: "application/octet-stream".to_string(),
        });
        assert!(!err.is_recoverable());
        assert_eq!(err.error_type(), "Validation");
    }

    #[test]
    fn test_storage_error_is_recoverable() {
        let err = AppError::Storage("connection reset".to_string());
        assert!(err.is_recoverable());
        assert_eq!(err.error_type(), "Storage");
    }

    #[test]
    fn test_illegal_transition_display() {
        let err = AppError::IllegalTransition {
            from: "removed".to_string(),
            to: "uploading".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Illegal upload transition: removed -> uploading"
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_batch_display() {
        let err = AppError::InvalidBatch("document not completed".to_string());
        assert!(err.to_string().contains("document not completed"));
    }
}
