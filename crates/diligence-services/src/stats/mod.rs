//! Aggregate statistics

pub mod engine;

pub use engine::{compute_stats, AggregationEngine, StatsConfig, StatsSubscription};
