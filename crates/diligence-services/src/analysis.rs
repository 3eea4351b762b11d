//! Analysis job initiator
//!
//! Turns a batch of completed documents into one `InProgress` analysis, and
//! offers the dashboard's direct "new draft analysis" action.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use diligence_core::models::{Analysis, AnalysisStatus, NewActivity, NewAnalysis};
use diligence_core::AppError;
use diligence_db::MetadataRepository;

pub struct AnalysisInitiator {
    repository: Arc<dyn MetadataRepository>,
}

impl AnalysisInitiator {
    pub fn new(repository: Arc<dyn MetadataRepository>) -> Self {
        Self { repository }
    }

    /// Start an analysis over a batch of completed documents.
    ///
    /// All-or-nothing: every referenced document is marked processed and
    /// exactly one analysis and one audit activity are created. If any
    /// document is missing, foreign, or not completed, the call fails with
    /// `InvalidBatch` and the repository is untouched; callers should
    /// re-fetch document statuses and retry with a corrected set.
    #[tracing::instrument(skip(self, document_ids), fields(batch_size = document_ids.len()))]
    pub async fn start_analysis(
        &self,
        owner_id: Uuid,
        document_ids: &[Uuid],
    ) -> Result<Analysis, AppError> {
        if document_ids.is_empty() {
            return Err(AppError::InvalidBatch("No documents selected".to_string()));
        }

        let mut ids = document_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let title = format!("Analysis of {}", plural(ids.len(), "document"));
        let description = format!(
            "Automated analysis for {} selected for processing",
            plural(ids.len(), "document")
        );

        let analysis = self
            .repository
            .create_analysis_for_documents(owner_id, &title, &description, &ids)
            .await?;

        tracing::info!(
            analysis_id = %analysis.id,
            documents = ids.len(),
            "Analysis started"
        );

        Ok(analysis)
    }

    /// Create an empty draft analysis directly, without documents.
    pub async fn create_draft(
        &self,
        owner_id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Analysis, AppError> {
        let title =
            title.unwrap_or_else(|| format!("Analysis {}", Utc::now().format("%Y-%m-%d")));

        let analysis = self
            .repository
            .create_analysis(NewAnalysis {
                owner_id,
                title,
                description,
                status: AnalysisStatus::Draft,
            })
            .await?;

        if let Err(e) = self
            .repository
            .append_activity(NewActivity::analysis_created(
                owner_id,
                analysis.id,
                &analysis.title,
            ))
            .await
        {
            tracing::warn!(error = %e, analysis_id = %analysis.id, "Failed to record analysis activity");
        }

        tracing::info!(analysis_id = %analysis.id, "Draft analysis created");
        Ok(analysis)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "document"), "1 document");
        assert_eq!(plural(3, "document"), "3 documents");
    }
}
