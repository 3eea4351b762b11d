use bytes::Bytes;
use std::sync::Arc;

use diligence_db::MemoryMetadataRepository;
use diligence_services::{FileUpload, UploadConfig, UploadOrchestrator};
use diligence_storage::MemoryStorage;

/// Test harness wiring the orchestrator to in-memory backends.
pub struct TestHarness {
    pub repository: Arc<MemoryMetadataRepository>,
    pub storage: Arc<MemoryStorage>,
    pub orchestrator: UploadOrchestrator,
}

pub fn setup() -> TestHarness {
    let repository = Arc::new(MemoryMetadataRepository::new());
    let storage = Arc::new(MemoryStorage::new());
    let orchestrator = UploadOrchestrator::new(
        repository.clone(),
        storage.clone(),
        UploadConfig::default(),
    );

    TestHarness {
        repository,
        storage,
        orchestrator,
    }
}

pub fn pdf_upload(filename: &str, size: usize) -> FileUpload {
    FileUpload {
        filename: filename.to_string(),
        content_type: "application/pdf".to_string(),
        data: Bytes::from(vec![0u8; size]),
    }
}

pub fn upload_with_type(filename: &str, content_type: &str, size: usize) -> FileUpload {
    FileUpload {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        data: Bytes::from(vec![0u8; size]),
    }
}
