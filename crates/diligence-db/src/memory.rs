//! In-memory metadata repository
//!
//! Backs tests and ephemeral runs. State lives under one lock, so the batch
//! operation is atomic by construction; every mutation publishes a change
//! notification on an internal broadcast channel, making the repository its
//! own [`ChangeFeed`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

use diligence_core::models::{
    Activity, Analysis, AnalysisStatus, Document, NewActivity, NewAnalysis, NewDocument, RedFlag,
    StorageLocator, UploadStatus,
};
use diligence_core::AppError;

use crate::feed::{ChangeFeed, ChangeNotification, ChangeOp, ChangeTable, FEED_BUFFER};
use crate::repository::MetadataRepository;

#[derive(Default)]
struct State {
    documents: HashMap<Uuid, Document>,
    analyses: HashMap<Uuid, Analysis>,
    activities: Vec<Activity>,
    red_flags: HashMap<Uuid, RedFlag>,
}

pub struct MemoryMetadataRepository {
    state: RwLock<State>,
    feed_tx: broadcast::Sender<ChangeNotification>,
}

impl Default for MemoryMetadataRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMetadataRepository {
    pub fn new() -> Self {
        let (feed_tx, _rx) = broadcast::channel(FEED_BUFFER);
        Self {
            state: RwLock::new(State::default()),
            feed_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, table: ChangeTable, op: ChangeOp, owner_id: Uuid) {
        // Send fails only when nobody subscribes, which is fine.
        let _ = self.feed_tx.send(ChangeNotification {
            table,
            op,
            owner_id,
        });
    }

    /// Insert a red flag as the external analysis process would.
    pub fn insert_red_flag(&self, red_flag: RedFlag) {
        let owner_id = red_flag.owner_id;
        self.write().red_flags.insert(red_flag.id, red_flag);
        self.publish(ChangeTable::RedFlags, ChangeOp::Insert, owner_id);
    }

    /// Resolve a red flag as the external analysis process would.
    pub fn resolve_red_flag(&self, owner_id: Uuid, id: Uuid) -> bool {
        let resolved = {
            let mut state = self.write();
            match state.red_flags.get_mut(&id) {
                Some(flag) if flag.owner_id == owner_id => {
                    flag.resolved = true;
                    true
                }
                _ => false,
            }
        };
        if resolved {
            self.publish(ChangeTable::RedFlags, ChangeOp::Update, owner_id);
        }
        resolved
    }

    /// Score an analysis as the external analysis process would.
    pub fn set_compliance_score(&self, owner_id: Uuid, id: Uuid, score: i32) -> bool {
        let updated = {
            let mut state = self.write();
            match state.analyses.get_mut(&id) {
                Some(analysis) if analysis.owner_id == owner_id => {
                    analysis.compliance_score = Some(score);
                    true
                }
                _ => false,
            }
        };
        if updated {
            self.publish(ChangeTable::Analyses, ChangeOp::Update, owner_id);
        }
        updated
    }
}

impl ChangeFeed for MemoryMetadataRepository {
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.feed_tx.subscribe()
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataRepository {
    async fn create_document(&self, input: NewDocument) -> Result<Document, AppError> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            filename: input.filename,
            file_size: input.file_size,
            category: input.category,
            document_type: input.document_type,
            bucket_name: input.category.bucket().to_string(),
            file_url: None,
            storage_key: None,
            upload_status: UploadStatus::Pending,
            processed: false,
            created_at: now,
            updated_at: now,
        };

        self.write().documents.insert(document.id, document.clone());
        self.publish(ChangeTable::Documents, ChangeOp::Insert, document.owner_id);

        Ok(document)
    }

    async fn get_document(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self
            .read()
            .documents
            .get(&id)
            .filter(|d| d.owner_id == owner_id)
            .cloned())
    }

    async fn list_documents(&self, owner_id: Uuid) -> Result<Vec<Document>, AppError> {
        let mut documents: Vec<Document> = self
            .read()
            .documents
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

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

        {
            let mut state = self.write();
            let document = state
                .documents
                .get_mut(&id)
                .filter(|d| d.owner_id == owner_id)
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
            document.upload_status = status;
            document.updated_at = Utc::now();
        }

        self.publish(ChangeTable::Documents, ChangeOp::Update, owner_id);
        Ok(())
    }

    async fn complete_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        locator: &StorageLocator,
    ) -> Result<Document, AppError> {
        let document = {
            let mut state = self.write();
            let document = state
                .documents
                .get_mut(&id)
                .filter(|d| d.owner_id == owner_id)
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
            document.upload_status = UploadStatus::Completed;
            document.file_url = Some(locator.url.clone());
            document.storage_key = Some(locator.key.clone());
            document.updated_at = Utc::now();
            document.clone()
        };

        self.publish(ChangeTable::Documents, ChangeOp::Update, owner_id);
        Ok(document)
    }

    async fn delete_document(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let removed = {
            let mut state = self.write();
            match state.documents.get(&id) {
                Some(d) if d.owner_id == owner_id => {
                    state.documents.remove(&id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            self.publish(ChangeTable::Documents, ChangeOp::Delete, owner_id);
        }
        Ok(removed)
    }

    async fn count_processed_documents(&self, owner_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .read()
            .documents
            .values()
            .filter(|d| d.owner_id == owner_id && d.processed)
            .count() as i64)
    }

    async fn create_analysis(&self, input: NewAnalysis) -> Result<Analysis, AppError> {
        let analysis = Analysis {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            title: input.title,
            description: input.description,
            status: input.status,
            compliance_score: None,
            created_at: Utc::now(),
        };

        self.write().analyses.insert(analysis.id, analysis.clone());
        self.publish(ChangeTable::Analyses, ChangeOp::Insert, analysis.owner_id);

        Ok(analysis)
    }

    async fn create_analysis_for_documents(
        &self,
        owner_id: Uuid,
        title: &str,
        description: &str,
        document_ids: &[Uuid],
    ) -> Result<Analysis, AppError> {
        let analysis = {
            let mut state = self.write();

            // Validate the whole batch before mutating anything.
            for id in document_ids {
                match state.documents.get(id) {
                    Some(d)
                        if d.owner_id == owner_id
                            && d.upload_status == UploadStatus::Completed => {}
                    _ => {
                        return Err(AppError::InvalidBatch(format!(
                            "Document {} is not ready for analysis",
                            id
                        )))
                    }
                }
            }

            let now = Utc::now();
            for id in document_ids {
                if let Some(document) = state.documents.get_mut(id) {
                    document.processed = true;
                    document.updated_at = now;
                }
            }

            let analysis = Analysis {
                id: Uuid::new_v4(),
                owner_id,
                title: title.to_string(),
                description: Some(description.to_string()),
                status: AnalysisStatus::InProgress,
                compliance_score: None,
                created_at: now,
            };
            state.analyses.insert(analysis.id, analysis.clone());

            let activity = NewActivity::analysis_created(owner_id, analysis.id, title);
            state.activities.push(Activity {
                id: Uuid::new_v4(),
                owner_id: activity.owner_id,
                action: activity.action,
                entity_type: activity.entity_type,
                entity_id: activity.entity_id,
                description: activity.description,
                created_at: now,
            });

            analysis
        };

        for _ in document_ids {
            self.publish(ChangeTable::Documents, ChangeOp::Update, owner_id);
        }
        self.publish(ChangeTable::Analyses, ChangeOp::Insert, owner_id);
        self.publish(ChangeTable::Activities, ChangeOp::Insert, owner_id);

        Ok(analysis)
    }

    async fn count_analyses_in_progress(&self, owner_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .read()
            .analyses
            .values()
            .filter(|a| a.owner_id == owner_id && a.status == AnalysisStatus::InProgress)
            .count() as i64)
    }

    async fn average_compliance_score(&self, owner_id: Uuid) -> Result<i32, AppError> {
        let state = self.read();
        let scores: Vec<i32> = state
            .analyses
            .values()
            .filter(|a| a.owner_id == owner_id)
            .filter_map(|a| a.compliance_score)
            .collect();

        if scores.is_empty() {
            return Ok(0);
        }

        let sum: i64 = scores.iter().map(|&s| s as i64).sum();
        Ok((sum as f64 / scores.len() as f64).round() as i32)
    }

    async fn append_activity(&self, input: NewActivity) -> Result<Activity, AppError> {
        let activity = Activity {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            action: input.action,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            description: input.description,
            created_at: Utc::now(),
        };

        self.write().activities.push(activity.clone());
        self.publish(ChangeTable::Activities, ChangeOp::Insert, activity.owner_id);

        Ok(activity)
    }

    async fn recent_activities(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError> {
        // Append order doubles as recency order, even for identical timestamps.
        Ok(self
            .read()
            .activities
            .iter()
            .rev()
            .filter(|a| a.owner_id == owner_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_unresolved_red_flags(&self, owner_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .read()
            .red_flags
            .values()
            .filter(|f| f.owner_id == owner_id && !f.resolved)
            .count() as i64)
    }
}
