//! PostgreSQL metadata repository

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use diligence_core::models::{
    Activity, Analysis, AnalysisStatus, Document, NewActivity, NewAnalysis, NewDocument,
    StorageLocator, UploadStatus,
};
use diligence_core::{AppError, Config};

use crate::repository::MetadataRepository;

/// Connect a pool using the configured limits.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("DATABASE_URL not configured".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(url)
        .await?;

    Ok(pool)
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
}

#[derive(Clone)]
pub struct PostgresMetadataRepository {
    pool: PgPool,
}

impl PostgresMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataRepository for PostgresMetadataRepository {
    #[tracing::instrument(skip(self, input), fields(db.table = "documents", db.operation = "insert"))]
    async fn create_document(&self, input: NewDocument) -> Result<Document, AppError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                id, owner_id, filename, file_size, category, document_type,
                bucket_name, upload_status, processed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.owner_id)
        .bind(&input.filename)
        .bind(input.file_size)
        .bind(input.category.to_string())
        .bind(input.document_type.to_string())
        .bind(input.category.bucket())
        .bind(UploadStatus::Pending.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE owner_id = $1 AND id = $2",
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    async fn list_documents(&self, owner_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update"))]
    async fn update_document_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: UploadStatus,
    ) -> Result<(), AppError> {
        if status == UploadStatus::Completed {
            return Err(AppError::InvalidInput(
                "Completion requires a locator; use complete_document".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET upload_status = $3, updated_at = NOW()
            WHERE owner_id = $1 AND id = $2
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document {} not found", id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, locator), fields(db.table = "documents", db.operation = "update"))]
    async fn complete_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        locator: &StorageLocator,
    ) -> Result<Document, AppError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET upload_status = $3, file_url = $4, storage_key = $5, updated_at = NOW()
            WHERE owner_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .bind(UploadStatus::Completed.to_string())
        .bind(&locator.url)
        .bind(&locator.key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    async fn delete_document(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE owner_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_processed_documents(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM documents WHERE owner_id = $1 AND processed",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self, input), fields(db.table = "analyses", db.operation = "insert"))]
    async fn create_analysis(&self, input: NewAnalysis) -> Result<Analysis, AppError> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            INSERT INTO analyses (id, owner_id, title, description, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.owner_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.status.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(analysis)
    }

    #[tracing::instrument(
        skip(self, title, description, document_ids),
        fields(db.table = "analyses", db.operation = "insert", batch_size = document_ids.len())
    )]
    async fn create_analysis_for_documents(
        &self,
        owner_id: Uuid,
        title: &str,
        description: &str,
        document_ids: &[Uuid],
    ) -> Result<Analysis, AppError> {
        // Dropping the transaction without a commit rolls it back, so every
        // early return below leaves the repository unchanged.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE documents
            SET processed = TRUE, updated_at = NOW()
            WHERE owner_id = $1 AND id = ANY($2) AND upload_status = 'completed'
            "#,
        )
        .bind(owner_id)
        .bind(document_ids)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != document_ids.len() as u64 {
            return Err(AppError::InvalidBatch(format!(
                "{} of {} documents are not ready for analysis",
                document_ids.len() as u64 - updated.rows_affected(),
                document_ids.len()
            )));
        }

        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            INSERT INTO analyses (id, owner_id, title, description, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(AnalysisStatus::InProgress.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let activity = NewActivity::analysis_created(owner_id, analysis.id, title);
        sqlx::query(
            r#"
            INSERT INTO activities (id, owner_id, action, entity_type, entity_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(activity.owner_id)
        .bind(&activity.action)
        .bind(activity.entity_type.map(|k| k.to_string()))
        .bind(activity.entity_id)
        .bind(&activity.description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(analysis)
    }

    async fn count_analyses_in_progress(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM analyses WHERE owner_id = $1 AND status = $2",
        )
        .bind(owner_id)
        .bind(AnalysisStatus::InProgress.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn average_compliance_score(&self, owner_id: Uuid) -> Result<i32, AppError> {
        let score = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(ROUND(AVG(compliance_score)), 0)::INT
            FROM analyses
            WHERE owner_id = $1 AND compliance_score IS NOT NULL
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(score)
    }

    #[tracing::instrument(skip(self, input), fields(db.table = "activities", db.operation = "insert"))]
    async fn append_activity(&self, input: NewActivity) -> Result<Activity, AppError> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (id, owner_id, action, entity_type, entity_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.owner_id)
        .bind(&input.action)
        .bind(input.entity_type.map(|k| k.to_string()))
        .bind(input.entity_id)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(activity)
    }

    async fn recent_activities(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    async fn count_unresolved_red_flags(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM red_flags WHERE owner_id = $1 AND NOT resolved",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
