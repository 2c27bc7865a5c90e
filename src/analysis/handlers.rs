use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    analysis::{
        dto::{
            AnalysisItem, AnalysisResponse, HistoryResponse, Pagination, SaveAnalysisRequest,
            SaveAnalysisResponse,
        },
        services::{self, AnalysisInput},
    },
    auth::jwt::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/save", post(save))
        .route("/analysis/history", get(history))
        .route("/analysis/:id", get(get_one))
}

#[instrument(skip(state, payload))]
pub async fn save(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<SaveAnalysisRequest>,
) -> AppResult<Json<SaveAnalysisResponse>> {
    let record = services::save_analysis(
        &state,
        caller.id,
        AnalysisInput {
            title: payload.title,
            content: payload.content,
            analysis_data: payload.analysis_data,
        },
    )
    .await?;
    Ok(Json(SaveAnalysisResponse {
        success: true,
        analysis: AnalysisItem::from(record),
    }))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> AppResult<Json<HistoryResponse>> {
    let records = services::history(&state, caller.id, p.limit, p.offset).await?;
    Ok(Json(HistoryResponse::from(records)))
}

#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<AnalysisResponse>> {
    let record = services::get_analysis(&state, caller, id).await?;
    Ok(Json(AnalysisResponse {
        analysis: AnalysisItem::from(record),
    }))
}
