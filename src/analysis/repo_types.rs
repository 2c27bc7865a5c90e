use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub analysis_data: serde_json::Value,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub analysis_data: serde_json::Value,
}
