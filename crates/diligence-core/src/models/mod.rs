//! Domain models

pub mod activity;
pub mod analysis;
pub mod category;
pub mod document;
pub mod red_flag;
pub mod stats;
pub mod storage;

pub use activity::{Activity, EntityKind, NewActivity, ACTION_ANALYSIS_CREATED, ACTION_DOCUMENT_UPLOADED};
pub use analysis::{Analysis, AnalysisStatus, NewAnalysis};
pub use category::{Category, Subcategory};
pub use document::{Document, NewDocument, UploadStatus};
pub use red_flag::RedFlag;
pub use stats::AggregateStats;
pub use storage::{StorageBackend, StorageLocator};
