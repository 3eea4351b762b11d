//! Diligence Services Library
//!
//! Business services over the metadata repository and storage adapter: the
//! upload orchestrator (per-file state machine), the analysis job initiator,
//! and the aggregation engine that keeps dashboard statistics live.

pub mod analysis;
pub mod stats;
pub mod upload;

pub use analysis::AnalysisInitiator;
pub use stats::{compute_stats, AggregationEngine, StatsConfig, StatsSubscription};
pub use upload::{
    FileUpload, TaskSnapshot, TaskState, UploadConfig, UploadOrchestrator, UploadTask,
};
