use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue raised by the downstream analysis process.
///
/// External to this core: rows are written elsewhere and only the
/// unresolved count is read here for the dashboard statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RedFlag {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}
