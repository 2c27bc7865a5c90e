use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::analysis::repo_types::{AnalysisRecord, NewAnalysis};
use crate::error::AppResult;

/// Persistence for `analysis_history`. Records are never updated.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert(&self, new: NewAnalysis) -> AppResult<AnalysisRecord>;
    /// Newest first. `limit = None` returns every record.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: i64,
    ) -> AppResult<Vec<AnalysisRecord>>;
    async fn find(&self, id: Uuid) -> AppResult<Option<AnalysisRecord>>;
}

#[derive(Clone)]
pub struct PgAnalysisStore {
    db: PgPool,
}

impl PgAnalysisStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn insert(&self, new: NewAnalysis) -> AppResult<AnalysisRecord> {
        let record = sqlx::query_as::<_, AnalysisRecord>(
            r#"
            INSERT INTO analysis_history (user_id, title, content, analysis_data)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, content, analysis_data, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.analysis_data)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: i64,
    ) -> AppResult<Vec<AnalysisRecord>> {
        // LIMIT NULL is LIMIT ALL in Postgres.
        let rows = sqlx::query_as::<_, AnalysisRecord>(
            r#"
            SELECT id, user_id, title, content, analysis_data, created_at
            FROM analysis_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<AnalysisRecord>> {
        let row = sqlx::query_as::<_, AnalysisRecord>(
            r#"
            SELECT id, user_id, title, content, analysis_data, created_at
            FROM analysis_history
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
