use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

pub const ACTION_DOCUMENT_UPLOADED: &str = "Document Uploaded";
pub const ACTION_ANALYSIS_CREATED: &str = "Analysis Created";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityKind {
    Document,
    Analysis,
    RedFlag,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EntityKind::Document => write!(f, "Document"),
            EntityKind::Analysis => write!(f, "Analysis"),
            EntityKind::RedFlag => write!(f, "Red Flag"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Document" => Ok(EntityKind::Document),
            "Analysis" => Ok(EntityKind::Analysis),
            "Red Flag" => Ok(EntityKind::RedFlag),
            _ => Err(anyhow::anyhow!("Invalid entity kind: {}", s)),
        }
    }
}

/// Append-only audit record. Never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub action: String,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Activity {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let entity_type = row
            .try_get::<Option<String>, _>("entity_type")?
            .map(|raw| {
                raw.parse().map_err(|e| {
                    sqlx::Error::Decode(format!("Failed to parse entity_type: {}", e).into())
                })
            })
            .transpose()?;
        Ok(Activity {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            action: row.try_get("action")?,
            entity_type,
            entity_id: row.try_get("entity_id")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub owner_id: Uuid,
    pub action: String,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
    pub description: Option<String>,
}

impl NewActivity {
    pub fn document_uploaded(owner_id: Uuid, document_id: Uuid, filename: &str) -> Self {
        NewActivity {
            owner_id,
            action: ACTION_DOCUMENT_UPLOADED.to_string(),
            entity_type: Some(EntityKind::Document),
            entity_id: Some(document_id),
            description: Some(format!("Document \"{}\" uploaded", filename)),
        }
    }

    pub fn analysis_created(owner_id: Uuid, analysis_id: Uuid, title: &str) -> Self {
        NewActivity {
            owner_id,
            action: ACTION_ANALYSIS_CREATED.to_string(),
            entity_type: Some(EntityKind::Analysis),
            entity_id: Some(analysis_id),
            description: Some(format!("New analysis \"{}\" created", title)),
        }
    }
}
