//! File validation
//!
//! Pure accept/reject rules applied before any upload state is created.
//! Rules run in order and the first failure wins.

/// Maximum accepted file size (10 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Content types accepted for upload: PDF, Word, Excel, and common images.
pub const ALLOWED_CONTENT_TYPES: [&str; 8] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "image/jpeg",
    "image/png",
    "image/gif",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{filename} exceeds the {limit} byte limit ({size} bytes)")]
    FileTooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },

    #[error("{filename} is not a supported format ({content_type})")]
    UnsupportedType {
        filename: String,
        content_type: String,
    },
}

/// Validate a candidate file from its metadata alone.
///
/// Deterministic and side-effect free; callers surface the returned reason
/// to the user and create no state on rejection.
pub fn validate_file(filename: &str, size: u64, content_type: &str) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_SIZE_BYTES {
        return Err(ValidationError::FileTooLarge {
            filename: filename.to_string(),
            size,
            limit: MAX_UPLOAD_SIZE_BYTES,
        });
    }

    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(ValidationError::UnsupportedType {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        });
    }

    Ok(())
}
