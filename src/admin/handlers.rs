use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    admin::{
        dto::{
            AdminResetPasswordRequest, CreateUserRequest, ToggleStatusRequest, UserResponse,
            UsersResponse, VerifyUserRequest, VerifyUserResponse,
        },
        services,
    },
    analysis::{dto::HistoryResponse, services as analysis},
    auth::{
        dto::{MessageResponse, PublicUser},
        jwt::AdminUser,
    },
    error::AppResult,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/history", get(user_history))
        .route("/admin/toggle-status", post(toggle_status))
        .route("/admin/verify-user", post(verify_user))
        .route("/admin/reset-password", post(reset_password))
        .route("/admin/create-user", post(create_user))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<UsersResponse>> {
    let users = services::list_users(&state).await?;
    Ok(Json(UsersResponse {
        users: users.iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn toggle_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<ToggleStatusRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = services::set_blocked(&state, &admin, payload.user_id, payload.blocked).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn verify_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<VerifyUserRequest>,
) -> AppResult<Json<VerifyUserResponse>> {
    let (user, already_verified) = services::verify_user(&state, payload.target()?).await?;
    Ok(Json(VerifyUserResponse {
        success: true,
        already_verified,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<AdminResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::reset_password(&state, payload.user_id, &payload.new_password).await?;
    Ok(Json(MessageResponse::ok("Password updated")))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let (reg, is_admin) = payload.into_parts();
    let user = services::create_user(&state, reg, is_admin).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete_user(&state, &admin, id).await?;
    Ok(Json(MessageResponse::ok("User deleted")))
}

#[instrument(skip(state, _admin))]
pub async fn user_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<HistoryResponse>> {
    let records = analysis::history_for_user(&state, id).await?;
    Ok(Json(HistoryResponse::from(records)))
}
