//! Configuration module
//!
//! Environment-driven configuration for the database, storage backend, the
//! upload worker pool, and the aggregation engine.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;

use crate::models::StorageBackend;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 4;
const DEFAULT_STATS_DEBOUNCE_MS: u64 = 200;
const DEFAULT_STATS_RETRY_BACKOFF_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string. Absent when running purely in-memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload orchestrator configuration
    pub max_concurrent_transfers: usize,
    // Aggregation engine configuration
    pub stats_debounce_ms: u64,
    pub stats_retry_backoff_secs: u64,
}

impl Config {
    /// Load configuration from the environment (and `.env` when present).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS)?,
            storage_backend: env_or("STORAGE_BACKEND", StorageBackend::Local)?,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_concurrent_transfers: env_or(
                "MAX_CONCURRENT_TRANSFERS",
                DEFAULT_MAX_CONCURRENT_TRANSFERS,
            )?,
            stats_debounce_ms: env_or("STATS_DEBOUNCE_MS", DEFAULT_STATS_DEBOUNCE_MS)?,
            stats_retry_backoff_secs: env_or(
                "STATS_RETRY_BACKOFF_SECS",
                DEFAULT_STATS_RETRY_BACKOFF_SECS,
            )?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            db_timeout_seconds: DEFAULT_DB_TIMEOUT_SECS,
            storage_backend: StorageBackend::Memory,
            local_storage_path: None,
            local_storage_base_url: None,
            max_concurrent_transfers: DEFAULT_MAX_CONCURRENT_TRANSFERS,
            stats_debounce_ms: DEFAULT_STATS_DEBOUNCE_MS,
            stats_retry_backoff_secs: DEFAULT_STATS_RETRY_BACKOFF_SECS,
        }
    }
}

/// Read an environment variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
