//! Metadata repository trait
//!
//! Single data-access abstraction for the upload pipeline, the analysis
//! initiator, and the aggregation engine. Every operation is scoped to one
//! owner; implementations must provide read-your-writes consistency for the
//! owner that just wrote.

use async_trait::async_trait;
use diligence_core::models::{
    Activity, Analysis, Document, NewActivity, NewAnalysis, NewDocument, StorageLocator,
    UploadStatus,
};
use diligence_core::AppError;
use uuid::Uuid;

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Register a document ahead of its transfer: status `Pending`, no
    /// locator. The bucket is derived from the category.
    async fn create_document(&self, input: NewDocument) -> Result<Document, AppError>;

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError>;

    async fn list_documents(&self, owner_id: Uuid) -> Result<Vec<Document>, AppError>;

    /// Move a document between non-completed statuses (`Uploading`,
    /// `Failed`). Never writes a locator.
    async fn update_document_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: UploadStatus,
    ) -> Result<(), AppError>;

    /// Finalize an upload: set the locator and `Completed` in one update.
    /// This is the only operation that writes `file_url`/`storage_key`.
    async fn complete_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        locator: &StorageLocator,
    ) -> Result<Document, AppError>;

    /// Delete a document row. Returns whether a row existed.
    async fn delete_document(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn count_processed_documents(&self, owner_id: Uuid) -> Result<i64, AppError>;

    // ------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------

    async fn create_analysis(&self, input: NewAnalysis) -> Result<Analysis, AppError>;

    /// Atomic batch: mark every referenced document processed (only legal
    /// when its upload is `Completed`), insert one `InProgress` analysis and
    /// one audit activity. All-or-nothing; any document that is missing,
    /// foreign, or not completed fails the whole call with `InvalidBatch`
    /// and leaves the repository unchanged.
    async fn create_analysis_for_documents(
        &self,
        owner_id: Uuid,
        title: &str,
        description: &str,
        document_ids: &[Uuid],
    ) -> Result<Analysis, AppError>;

    async fn count_analyses_in_progress(&self, owner_id: Uuid) -> Result<i64, AppError>;

    /// Rounded mean of the non-null compliance scores; 0 when none exist.
    async fn average_compliance_score(&self, owner_id: Uuid) -> Result<i32, AppError>;

    // ------------------------------------------------------------------
    // Activities
    // ------------------------------------------------------------------

    async fn append_activity(&self, input: NewActivity) -> Result<Activity, AppError>;

    /// Most recent activities for the owner, newest first.
    async fn recent_activities(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Activity>, AppError>;

    // ------------------------------------------------------------------
    // Red flags (written by the analysis process; read-only here)
    // ------------------------------------------------------------------

    async fn count_unresolved_red_flags(&self, owner_id: Uuid) -> Result<i64, AppError>;
}
