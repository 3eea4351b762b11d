//! Per-file upload task
//!
//! Transient client-side handle tracking one pending or in-flight upload.
//! Legal state transitions:
//! `pending -> uploading -> {completed | failed}`, `failed -> uploading`
//! (explicit retry), and `{pending, completed, failed} -> removed`.
//! Removal of an uploading task first waits for the transfer to settle, so
//! `uploading -> removed` is never a direct edge, and nothing leaves
//! `removed`.

use bytes::Bytes;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use diligence_core::models::{Category, Subcategory};
use diligence_core::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Uploading,
    Completed,
    Failed,
    Removed,
}

impl TaskState {
    pub fn can_transition(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Uploading, Completed)
                | (Uploading, Failed)
                | (Failed, Uploading)
                | (Pending, Removed)
                | (Completed, Removed)
                | (Failed, Removed)
        )
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Uploading => write!(f, "uploading"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Removed => write!(f, "removed"),
        }
    }
}

/// One file's upload, owned exclusively by the orchestrator driving it.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: Uuid,
    pub document_id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub category: Category,
    pub subcategory: Subcategory,
    state: TaskState,
    progress: u8,
    data: Bytes,
}

impl UploadTask {
    pub fn new(
        document_id: Uuid,
        owner_id: Uuid,
        filename: String,
        category: Category,
        subcategory: Subcategory,
        data: Bytes,
    ) -> Self {
        UploadTask {
            id: Uuid::new_v4(),
            document_id,
            owner_id,
            filename,
            category,
            subcategory,
            state: TaskState::Pending,
            progress: 0,
            data,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Move to `next`, rejecting anything outside the transition graph.
    pub fn transition(&mut self, next: TaskState) -> Result<(), AppError> {
        if !self.state.can_transition(next) {
            return Err(AppError::IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Progress is UI feedback only; it never decreases and caps at 100.
    pub fn set_progress(&mut self, value: u8) {
        self.progress = self.progress.max(value.min(100));
    }

    pub(crate) fn data(&self) -> Bytes {
        self.data.clone()
    }
}
