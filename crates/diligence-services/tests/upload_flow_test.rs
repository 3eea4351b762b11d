mod helpers;

use helpers::{pdf_upload, setup, upload_with_type};
use uuid::Uuid;

use diligence_core::models::{Category, Subcategory, UploadStatus, ACTION_DOCUMENT_UPLOADED};
use diligence_core::{AppError, ValidationError};
use diligence_db::MetadataRepository;
use diligence_services::TaskState;
use diligence_storage::StorageError;

#[tokio::test]
async fn test_upload_completes_with_locator_and_activity() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("invoice.pdf", 2 * 1024 * 1024),
            Category::Revenue,
            Subcategory::Invoice,
        )
        .await
        .unwrap();

    let snapshot = harness.orchestrator.snapshot(task_id).unwrap();
    assert_eq!(snapshot.state, TaskState::Pending);
    assert_eq!(snapshot.progress, 0);

    harness.orchestrator.start(task_id).await.unwrap();

    let snapshot = harness.orchestrator.snapshot(task_id).unwrap();
    assert_eq!(snapshot.state, TaskState::Completed);
    assert_eq!(snapshot.progress, 100);

    let documents = harness.repository.list_documents(owner).await.unwrap();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.upload_status, UploadStatus::Completed);
    assert_eq!(document.bucket_name, "revenue-documents");
    assert!(document.locator().is_some());
    assert!(!document.processed);

    let activities = harness.repository.recent_activities(owner, 10).await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].action, ACTION_DOCUMENT_UPLOADED);
    assert_eq!(activities[0].entity_id, Some(document.id));

    assert_eq!(harness.storage.object_count(), 1);
}

#[tokio::test]
async fn test_oversized_file_rejected_without_state() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let result = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("huge.pdf", 12 * 1024 * 1024),
            Category::Revenue,
            Subcategory::Invoice,
        )
        .await;

    match result {
        Err(AppError::Validation(ValidationError::FileTooLarge { .. })) => {}
        other => panic!("expected FileTooLarge, got {:?}", other.map(|_| ())),
    }

    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
    assert!(harness.orchestrator.tasks_for(owner).is_empty());
    assert_eq!(harness.storage.object_count(), 0);
}

#[tokio::test]
async fn test_unsupported_type_rejected() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let result = harness
        .orchestrator
        .enqueue(
            owner,
            upload_with_type("tool.exe", "application/octet-stream", 1024),
            Category::Payroll,
            Subcategory::Master,
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::Validation(ValidationError::UnsupportedType { .. }))
    ));
    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_category_pairing_rejected() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let result = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("rates.pdf", 1024),
            Category::Payroll,
            Subcategory::Invoice,
        )
        .await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_transfer_then_retry_reuses_row() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("ledger.pdf", 4096),
            Category::Revenue,
            Subcategory::Sales,
        )
        .await
        .unwrap();

    harness
        .storage
        .push_put_failure(StorageError::NetworkFailure("connection reset".to_string()));

    let result = harness.orchestrator.start(task_id).await;
    assert!(matches!(result, Err(AppError::Storage(_))));

    let snapshot = harness.orchestrator.snapshot(task_id).unwrap();
    assert_eq!(snapshot.state, TaskState::Failed);

    let documents = harness.repository.list_documents(owner).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].upload_status, UploadStatus::Failed);
    assert!(documents[0].locator().is_none());
    let failed_id = documents[0].id;

    // Explicit retry succeeds and no second row appears.
    harness.orchestrator.start(task_id).await.unwrap();

    let documents = harness.repository.list_documents(owner).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, failed_id);
    assert_eq!(documents[0].upload_status, UploadStatus::Completed);
    assert!(documents[0].locator().is_some());
}

#[tokio::test]
async fn test_locator_iff_completed_at_every_step() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("policy.pdf", 1024),
            Category::Payroll,
            Subcategory::Policies,
        )
        .await
        .unwrap();

    let assert_invariant = |documents: Vec<diligence_core::models::Document>| {
        for document in documents {
            assert_eq!(
                document.locator().is_some(),
                document.upload_status == UploadStatus::Completed,
                "locator must exist exactly when completed (status {})",
                document.upload_status
            );
        }
    };

    assert_invariant(harness.repository.list_documents(owner).await.unwrap());

    harness
        .storage
        .push_put_failure(StorageError::QuotaExceeded("bucket full".to_string()));
    let _ = harness.orchestrator.start(task_id).await;
    assert_invariant(harness.repository.list_documents(owner).await.unwrap());

    harness.orchestrator.start(task_id).await.unwrap();
    assert_invariant(harness.repository.list_documents(owner).await.unwrap());
}

#[tokio::test]
async fn test_remove_completed_survives_failing_storage_delete() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("contract.pdf", 2048),
            Category::PurchaseOrder,
            Subcategory::Agreement,
        )
        .await
        .unwrap();
    harness.orchestrator.start(task_id).await.unwrap();
    assert_eq!(harness.storage.object_count(), 1);

    harness
        .storage
        .push_delete_failure(StorageError::NetworkFailure("timeout".to_string()));

    harness.orchestrator.remove(task_id).await.unwrap();

    // The row and the task are gone even though the blob delete failed.
    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
    assert!(harness.orchestrator.snapshot(task_id).is_none());
    assert_eq!(harness.storage.object_count(), 1, "orphaned object remains");
}

#[tokio::test]
async fn test_remove_pending_task_deletes_row_only() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("po.pdf", 2048),
            Category::PurchaseOrder,
            Subcategory::PurchaseOrder,
        )
        .await
        .unwrap();

    harness.orchestrator.remove(task_id).await.unwrap();

    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
    assert!(harness.orchestrator.snapshot(task_id).is_none());
    assert_eq!(harness.storage.object_count(), 0);
}

#[tokio::test]
async fn test_remove_failed_task_skips_storage_delete() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("pr.pdf", 2048),
            Category::PurchaseOrder,
            Subcategory::PurchaseRequest,
        )
        .await
        .unwrap();

    harness
        .storage
        .push_put_failure(StorageError::Rejected("checksum mismatch".to_string()));
    let _ = harness.orchestrator.start(task_id).await;

    harness.orchestrator.remove(task_id).await.unwrap();
    assert!(harness.repository.list_documents(owner).await.unwrap().is_empty());
    assert_eq!(harness.storage.object_count(), 0);
}

#[tokio::test]
async fn test_double_start_is_illegal() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let task_id = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("a.pdf", 1024),
            Category::Revenue,
            Subcategory::Agreement,
        )
        .await
        .unwrap();

    harness.orchestrator.start(task_id).await.unwrap();
    let result = harness.orchestrator.start(task_id).await;
    assert!(matches!(result, Err(AppError::IllegalTransition { .. })));
}

#[tokio::test]
async fn test_concurrent_uploads_both_complete() {
    let harness = setup();
    let owner = Uuid::new_v4();

    let first = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("a.pdf", 1024),
            Category::Revenue,
            Subcategory::Invoice,
        )
        .await
        .unwrap();
    let second = harness
        .orchestrator
        .enqueue(
            owner,
            pdf_upload("b.pdf", 1024),
            Category::Revenue,
            Subcategory::Sales,
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        harness.orchestrator.start(first),
        harness.orchestrator.start(second)
    );
    a.unwrap();
    b.unwrap();

    let documents = harness.repository.list_documents(owner).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents
        .iter()
        .all(|d| d.upload_status == UploadStatus::Completed));
}

#[tokio::test]
async fn test_start_unknown_task_not_found() {
    let harness = setup();
    let result = harness.orchestrator.start(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
