use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::category::{Category, Subcategory};
use super::storage::StorageLocator;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "uploading" => Ok(UploadStatus::Uploading),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

/// Persisted record describing one uploaded file and its processing status.
///
/// `file_url` and `storage_key` are set together by the completing update
/// and are non-null exactly when `upload_status` is `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub category: Category,
    pub document_type: Subcategory,
    pub bucket_name: String,
    pub file_url: Option<String>,
    pub storage_key: Option<String>,
    pub upload_status: UploadStatus,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_completed(&self) -> bool {
        self.upload_status == UploadStatus::Completed
    }

    /// Durable storage reference, present once the upload has completed.
    pub fn locator(&self) -> Option<StorageLocator> {
        match (&self.file_url, &self.storage_key) {
            (Some(url), Some(key)) => Some(StorageLocator {
                bucket: self.bucket_name.clone(),
                key: key.clone(),
                url: url.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Document {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Document {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            filename: row.try_get("filename")?,
            file_size: row.try_get("file_size")?,
            category: row.try_get::<String, _>("category")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse category: {}", e).into())
            })?,
            document_type: row
                .try_get::<String, _>("document_type")?
                .parse()
                .map_err(|e| {
                    sqlx::Error::Decode(format!("Failed to parse document_type: {}", e).into())
                })?,
            bucket_name: row.try_get("bucket_name")?,
            file_url: row.try_get("file_url")?,
            storage_key: row.try_get("storage_key")?,
            upload_status: row
                .try_get::<String, _>("upload_status")?
                .parse()
                .map_err(|e| {
                    sqlx::Error::Decode(format!("Failed to parse upload_status: {}", e).into())
                })?,
            processed: row.try_get("processed")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for registering a document ahead of its transfer.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub category: Category,
    pub document_type: Subcategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document(status: UploadStatus) -> Document {
        Document {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            filename: "invoice.pdf".to_string(),
            file_size: 2048,
            category: Category::Revenue,
            document_type: Subcategory::Invoice,
            bucket_name: Category::Revenue.bucket().to_string(),
            file_url: None,
            storage_key: None,
            upload_status: status,
            processed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_upload_status_round_trip() {
        for status in [
            UploadStatus::Pending,
            UploadStatus::Uploading,
            UploadStatus::Completed,
            UploadStatus::Failed,
        ] {
            let parsed: UploadStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<UploadStatus>().is_err());
    }

    #[test]
    fn test_locator_absent_without_url() {
        let doc = sample_document(UploadStatus::Pending);
        assert!(doc.locator().is_none());
        assert!(!doc.is_completed());
    }

    #[test]
    fn test_locator_present_when_completed() {
        let mut doc = sample_document(UploadStatus::Completed);
        doc.file_url = Some("http://localhost:3000/revenue-documents/a/b.pdf".to_string());
        doc.storage_key = Some("a/b.pdf".to_string());

        let locator = doc.locator().unwrap();
        assert_eq!(locator.bucket, "revenue-documents");
        assert_eq!(locator.key, "a/b.pdf");
        assert!(doc.is_completed());
    }
}
