//! Upload orchestrator
//!
//! Sequences validate -> create metadata -> transfer -> finalize for each
//! file, so a crash between steps leaves the document row in an observable,
//! resumable state (`pending` or `failed`, never half-completed). Transfer
//! failures park the task in `failed`; retry is an explicit `start` call
//! that reuses the same document row.

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Semaphore};
use uuid::Uuid;

use diligence_core::models::{Category, NewActivity, NewDocument, Subcategory, UploadStatus};
use diligence_core::{validate_file, AppError, Config};
use diligence_db::MetadataRepository;
use diligence_storage::{object_key, Storage};

use super::task::{TaskState, UploadTask};

/// A file handed over by the UI layer for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Published view of one task, replaced wholesale on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub progress: u8,
}

#[derive(Clone)]
pub struct UploadConfig {
    /// Bound on simultaneous transfers; a tunable, not a correctness knob.
    pub max_concurrent_transfers: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: 4,
        }
    }
}

impl From<&Config> for UploadConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_transfers: config.max_concurrent_transfers,
        }
    }
}

struct TaskEntry {
    task: UploadTask,
    snapshot_tx: watch::Sender<TaskSnapshot>,
}

pub struct UploadOrchestrator {
    repository: Arc<dyn MetadataRepository>,
    storage: Arc<dyn Storage>,
    tasks: RwLock<HashMap<Uuid, TaskEntry>>,
    transfer_permits: Arc<Semaphore>,
}

impl UploadOrchestrator {
    pub fn new(
        repository: Arc<dyn MetadataRepository>,
        storage: Arc<dyn Storage>,
        config: UploadConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            tasks: RwLock::new(HashMap::new()),
            transfer_permits: Arc::new(Semaphore::new(config.max_concurrent_transfers)),
        }
    }

    fn read_tasks(&self) -> RwLockReadGuard<'_, HashMap<Uuid, TaskEntry>> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tasks(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, TaskEntry>> {
        self.tasks.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(entry: &TaskEntry) {
        entry.snapshot_tx.send_replace(TaskSnapshot {
            state: entry.task.state(),
            progress: entry.task.progress(),
        });
    }

    fn with_entry<R>(
        &self,
        task_id: Uuid,
        f: impl FnOnce(&mut TaskEntry) -> R,
    ) -> Result<R, AppError> {
        let mut tasks = self.write_tasks();
        let entry = tasks
            .get_mut(&task_id)
            .ok_or_else(|| AppError::NotFound(format!("Upload task {} not found", task_id)))?;
        Ok(f(entry))
    }

    /// Validate a file and register it for upload.
    ///
    /// On rejection the reason is returned and nothing is created: no
    /// document row, no task. On acceptance the document row exists with
    /// status `pending` and the returned task id is ready for `start`.
    pub async fn enqueue(
        &self,
        owner_id: Uuid,
        file: FileUpload,
        category: Category,
        subcategory: Subcategory,
    ) -> Result<Uuid, AppError> {
        validate_file(&file.filename, file.data.len() as u64, &file.content_type)?;

        if !category.allows(subcategory) {
            return Err(AppError::InvalidInput(format!(
                "Subcategory {} is not valid for category {}",
                subcategory, category
            )));
        }

        let document = self
            .repository
            .create_document(NewDocument {
                owner_id,
                filename: file.filename.clone(),
                file_size: file.data.len() as i64,
                category,
                document_type: subcategory,
            })
            .await?;

        let task = UploadTask::new(
            document.id,
            owner_id,
            file.filename,
            category,
            subcategory,
            file.data,
        );
        let task_id = task.id;
        let (snapshot_tx, _rx) = watch::channel(TaskSnapshot {
            state: TaskState::Pending,
            progress: 0,
        });

        self.write_tasks()
            .insert(task_id, TaskEntry { task, snapshot_tx });

        tracing::info!(
            task_id = %task_id,
            document_id = %document.id,
            category = %category,
            subcategory = %subcategory,
            "Upload task enqueued"
        );

        Ok(task_id)
    }

    /// Drive one task's transfer to completion.
    ///
    /// Legal from `pending` and from `failed` (retry); a retry reuses the
    /// document row created at enqueue time.
    pub async fn start(&self, task_id: Uuid) -> Result<(), AppError> {
        let (document_id, owner_id, bucket, key, data) = self.with_entry(task_id, |entry| {
            entry.task.transition(TaskState::Uploading)?;
            entry.task.set_progress(25);
            Self::publish(entry);
            let key = object_key(entry.task.owner_id, entry.task.subcategory, &entry.task.filename);
            Ok::<_, AppError>((
                entry.task.document_id,
                entry.task.owner_id,
                entry.task.category.bucket(),
                key,
                entry.task.data(),
            ))
        })??;

        let locator = match self
            .transfer(owner_id, document_id, bucket, &key, data)
            .await
        {
            Ok(locator) => locator,
            Err(e) => {
                self.record_failure(task_id, owner_id, document_id, &e).await;
                return Err(e);
            }
        };

        // Bytes are durable; finalize the row with the locator.
        self.with_entry(task_id, |entry| {
            entry.task.set_progress(75);
            Self::publish(entry);
        })?;

        if let Err(e) = self
            .repository
            .complete_document(owner_id, document_id, &locator)
            .await
        {
            self.record_failure(task_id, owner_id, document_id, &e).await;
            return Err(e);
        }

        let filename = self.with_entry(task_id, |entry| {
            entry.task.transition(TaskState::Completed)?;
            entry.task.set_progress(100);
            Self::publish(entry);
            Ok::<_, AppError>(entry.task.filename.clone())
        })??;

        // The upload is durable; a failed audit write is logged, not
        // surfaced.
        if let Err(e) = self
            .repository
            .append_activity(NewActivity::document_uploaded(
                owner_id,
                document_id,
                &filename,
            ))
            .await
        {
            tracing::warn!(error = %e, document_id = %document_id, "Failed to record upload activity");
        }

        tracing::info!(task_id = %task_id, document_id = %document_id, "Upload completed");
        Ok(())
    }

    /// Move the document row to `uploading` and push the bytes through one
    /// of the bounded transfer permits.
    async fn transfer(
        &self,
        owner_id: Uuid,
        document_id: Uuid,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<diligence_core::models::StorageLocator, AppError> {
        self.repository
            .update_document_status(owner_id, document_id, UploadStatus::Uploading)
            .await?;

        let _permit = self
            .transfer_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Transfer pool closed".to_string()))?;

        self.storage
            .put(bucket, key, data.to_vec())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Park the task and its row in `failed`; retry stays an explicit call.
    async fn record_failure(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        document_id: Uuid,
        error: &AppError,
    ) {
        tracing::error!(
            task_id = %task_id,
            document_id = %document_id,
            error = %error,
            "Upload failed"
        );

        if let Err(e) = self
            .repository
            .update_document_status(owner_id, document_id, UploadStatus::Failed)
            .await
        {
            tracing::warn!(error = %e, document_id = %document_id, "Failed to record failed upload status");
        }

        if let Err(e) = self.with_entry(task_id, |entry| {
            if let Err(transition_err) = entry.task.transition(TaskState::Failed) {
                tracing::warn!(error = %transition_err, task_id = %task_id, "Task left uploading before failure was recorded");
            }
            Self::publish(entry);
        }) {
            tracing::warn!(error = %e, task_id = %task_id, "Task disappeared while recording failure");
        }
    }

    /// Remove a task and its document, from any live state.
    ///
    /// An in-flight transfer is awaited first so the storage delete cannot
    /// race the object's creation. The storage delete is best-effort: an
    /// orphaned object is preferred over an undeletable record.
    pub async fn remove(&self, task_id: Uuid) -> Result<(), AppError> {
        let (owner_id, document_id) = loop {
            let waiter = {
                let mut tasks = self.write_tasks();
                let entry = tasks.get_mut(&task_id).ok_or_else(|| {
                    AppError::NotFound(format!("Upload task {} not found", task_id))
                })?;
                if entry.task.state() == TaskState::Uploading {
                    Some(entry.snapshot_tx.subscribe())
                } else {
                    entry.task.transition(TaskState::Removed)?;
                    Self::publish(entry);
                    break (entry.task.owner_id, entry.task.document_id);
                }
            };

            if let Some(mut rx) = waiter {
                rx.changed().await.map_err(|_| {
                    AppError::NotFound(format!("Upload task {} not found", task_id))
                })?;
            }
        };

        if let Some(document) = self.repository.get_document(owner_id, document_id).await? {
            if let Some(locator) = document.locator() {
                if let Err(e) = self.storage.delete(&locator.bucket, &locator.key).await {
                    tracing::warn!(
                        error = %e,
                        bucket = %locator.bucket,
                        key = %locator.key,
                        "Storage delete failed during removal; leaving orphaned object"
                    );
                }
            }
        }

        self.repository.delete_document(owner_id, document_id).await?;
        self.write_tasks().remove(&task_id);

        tracing::info!(task_id = %task_id, document_id = %document_id, "Upload task removed");
        Ok(())
    }

    /// Current state and progress of a task, if it is still registered.
    pub fn snapshot(&self, task_id: Uuid) -> Option<TaskSnapshot> {
        self.read_tasks()
            .get(&task_id)
            .map(|entry| TaskSnapshot {
                state: entry.task.state(),
                progress: entry.task.progress(),
            })
    }

    /// Live view of a task's snapshots.
    pub fn watch(&self, task_id: Uuid) -> Option<watch::Receiver<TaskSnapshot>> {
        self.read_tasks()
            .get(&task_id)
            .map(|entry| entry.snapshot_tx.subscribe())
    }

    /// Ids of the registered tasks for one owner.
    pub fn tasks_for(&self, owner_id: Uuid) -> Vec<Uuid> {
        self.read_tasks()
            .iter()
            .filter(|(_, entry)| entry.task.owner_id == owner_id)
            .map(|(id, _)| *id)
            .collect()
    }
}
