use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    Draft,
    InProgress,
    Completed,
}

impl Display for AnalysisStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnalysisStatus::Draft => write!(f, "Draft"),
            AnalysisStatus::InProgress => write!(f, "In Progress"),
            AnalysisStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(AnalysisStatus::Draft),
            "In Progress" => Ok(AnalysisStatus::InProgress),
            "Completed" => Ok(AnalysisStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid analysis status: {}", s)),
        }
    }
}

/// A processing job grouping one or more completed documents.
///
/// The compliance score is populated by a downstream analysis process and
/// stays `None` until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: AnalysisStatus,
    pub compliance_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Analysis {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Analysis {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse analysis status: {}", e).into())
            })?,
            compliance_score: row.try_get("compliance_score")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: AnalysisStatus,
}
