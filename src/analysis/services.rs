use tracing::{info, instrument};
use uuid::Uuid;

use crate::analysis::repo_types::{AnalysisRecord, NewAnalysis};
use crate::auth::jwt::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_PAGE: i64 = 500;

#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub title: String,
    pub content: String,
    pub analysis_data: serde_json::Value,
}

#[instrument(skip(state, input), fields(title = %input.title))]
pub async fn save_analysis(
    state: &AppState,
    user_id: Uuid,
    input: AnalysisInput,
) -> AppResult<AnalysisRecord> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation("Title too long".into()));
    }

    // A token can outlive its user.
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    if user.blocked {
        return Err(AppError::AccountBlocked);
    }

    let analysis_data = match input.analysis_data {
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    };
    let record = state
        .analyses
        .insert(NewAnalysis {
            user_id,
            title,
            content: input.content,
            analysis_data,
        })
        .await?;
    info!(analysis_id = %record.id, user_id = %user_id, "analysis saved");
    Ok(record)
}

/// Newest first; an empty history is not an error.
#[instrument(skip(state))]
pub async fn history(
    state: &AppState,
    user_id: Uuid,
    limit: Option<i64>,
    offset: i64,
) -> AppResult<Vec<AnalysisRecord>> {
    if offset < 0 || limit.map_or(false, |l| l < 0) {
        return Err(AppError::Validation("limit and offset must not be negative".into()));
    }
    let limit = limit.map(|l| l.min(MAX_PAGE));
    state.analyses.list_by_user(user_id, limit, offset).await
}

/// Full history of another user, for admins.
#[instrument(skip(state))]
pub async fn history_for_user(state: &AppState, user_id: Uuid) -> AppResult<Vec<AnalysisRecord>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::UserNotFound);
    }
    state.analyses.list_by_user(user_id, None, 0).await
}

/// Owner or admin only. Anyone else sees a 404 so ids cannot be probed.
#[instrument(skip(state))]
pub async fn get_analysis(state: &AppState, caller: AuthUser, id: Uuid) -> AppResult<AnalysisRecord> {
    let not_found = || AppError::NotFound("Analysis".into());
    let record = state.analyses.find(id).await?.ok_or_else(not_found)?;
    if record.user_id == caller.id {
        return Ok(record);
    }

    let is_admin = caller.is_admin
        && state
            .users
            .find_by_id(caller.id)
            .await?
            .map_or(false, |u| u.is_admin && !u.blocked);
    if is_admin {
        Ok(record)
    } else {
        Err(not_found())
    }
}
