mod helpers;

use helpers::{pdf_upload, setup, TestHarness};
use uuid::Uuid;

use diligence_core::models::{AnalysisStatus, Category, Subcategory, ACTION_ANALYSIS_CREATED};
use diligence_core::AppError;
use diligence_db::MetadataRepository;
use diligence_services::AnalysisInitiator;

async fn completed_upload(harness: &TestHarness, owner: Uuid, filename: &str) -> Uuid {
    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload(filename, 2048),
            Category::Revenue,
            Subcategory::Invoice,
        )
        .await
        .unwrap();
    harness.orchestrator.start(task_id).await.unwrap();

    harness
        .repository
        .list_documents(owner)
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.filename == filename)
        .unwrap()
        .id
}

#[tokio::test]
async fn test_batch_marks_documents_and_creates_one_analysis() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let x = completed_upload(&harness, owner, "x.pdf").await;
    let y = completed_upload(&harness, owner, "y.pdf").await;

    let analysis = initiator.start_analysis(owner, &[x, y]).await.unwrap();
    assert_eq!(analysis.status, AnalysisStatus::InProgress);
    assert!(analysis.compliance_score.is_none());

    assert_eq!(harness.repository.count_processed_documents(owner).await.unwrap(), 2);
    assert_eq!(harness.repository.count_analyses_in_progress(owner).await.unwrap(), 1);

    // Two upload activities plus the analysis activity, newest first.
    let activities = harness.repository.recent_activities(owner, 10).await.unwrap();
    assert_eq!(activities.len(), 3);
    assert_eq!(activities[0].action, ACTION_ANALYSIS_CREATED);
    assert_eq!(activities[0].entity_id, Some(analysis.id));
}

#[tokio::test]
async fn test_batch_with_concurrently_removed_document_fails_cleanly() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let x = completed_upload(&harness, owner, "x.pdf").await;
    let y = completed_upload(&harness, owner, "y.pdf").await;

    // The user removes Y between selection and submission.
    harness.repository.delete_document(owner, y).await.unwrap();

    let result = initiator.start_analysis(owner, &[x, y]).await;
    assert!(matches!(result, Err(AppError::InvalidBatch(_))));

    let document = harness.repository.get_document(owner, x).await.unwrap().unwrap();
    assert!(!document.processed, "no partial processing on failed batch");
    assert_eq!(harness.repository.count_analyses_in_progress(owner).await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let harness = setup();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let result = initiator.start_analysis(Uuid::new_v4(), &[]).await;
    assert!(matches!(result, Err(AppError::InvalidBatch(_))));
}

#[tokio::test]
async fn test_duplicate_ids_are_deduplicated() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let x = completed_upload(&harness, owner, "x.pdf").await;

    let analysis = initiator.start_analysis(owner, &[x, x, x]).await.unwrap();
    assert_eq!(analysis.status, AnalysisStatus::InProgress);
    assert_eq!(harness.repository.count_processed_documents(owner).await.unwrap(), 1);
    assert_eq!(harness.repository.count_analyses_in_progress(owner).await.unwrap(), 1);
}

#[tokio::test]
async fn test_batch_rejects_foreign_documents() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let theirs = completed_upload(&harness, stranger, "theirs.pdf").await;

    let result = initiator.start_analysis(owner, &[theirs]).await;
    assert!(matches!(result, Err(AppError::InvalidBatch(_))));
    assert_eq!(
        harness.repository.count_processed_documents(stranger).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_create_draft_writes_activity() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let analysis = initiator
        .create_draft(owner, Some("Q3 revenue review".to_string()), None)
        .await
        .unwrap();
    assert_eq!(analysis.status, AnalysisStatus::Draft);

    let activities = harness.repository.recent_activities(owner, 10).await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].action, ACTION_ANALYSIS_CREATED);
    assert!(activities[0]
        .description
        .as_deref()
        .unwrap()
        .contains("Q3 revenue review"));
}

#[tokio::test]
async fn test_create_draft_defaults_title_to_date() {
    let harness = setup();
    let owner = Uuid::new_v4();
    let initiator = AnalysisInitiator::new(harness.repository.clone());

    let analysis = initiator.create_draft(owner, None, None).await.unwrap();
    assert!(analysis.title.starts_with("Analysis "));
}
