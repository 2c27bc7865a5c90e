use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::repo_types::AnalysisRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnalysisRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub analysis_data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub analysis_data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<AnalysisRecord> for AnalysisItem {
    fn from(r: AnalysisRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            content: r.content,
            analysis_data: r.analysis_data,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveAnalysisResponse {
    pub success: bool,
    pub analysis: AnalysisItem,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisItem,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<AnalysisItem>,
}

impl From<Vec<AnalysisRecord>> for HistoryResponse {
    fn from(records: Vec<AnalysisRecord>) -> Self {
        Self {
            history: records.into_iter().map(AnalysisItem::from).collect(),
        }
    }
}

/// Absent `limit` means the whole history.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}
