//! Diligence Database Library
//!
//! The metadata repository over `documents`, `analyses`, `activities`, and
//! `red_flags`, plus the change-notification feed the aggregation engine
//! subscribes to. Two implementations are provided: PostgreSQL (sqlx, with
//! trigger-driven LISTEN/NOTIFY) and in-memory (broadcast-backed, for tests
//! and ephemeral runs).

pub mod feed;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use feed::{
    ChangeFeed, ChangeNotification, ChangeOp, ChangeTable, PgChangeFeed, CHANGE_NOTIFY_CHANNEL,
};
pub use memory::MemoryMetadataRepository;
pub use postgres::{connect, run_migrations, PostgresMetadataRepository};
pub use repository::MetadataRepository;
