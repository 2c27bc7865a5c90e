use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, EmailQuery, EmailRequest, LoginRequest, MeResponse, MessageResponse,
            PublicUser, RefreshRequest, RegisterRequest, RegisterResponse, RequestResetRequest,
            ResetPasswordRequest, ResetTokenResponse, SecurityQuestionResponse,
            SecurityQuestionsResponse, VerifyQuery,
        },
        jwt::AuthUser,
        security_questions::SECURITY_QUESTIONS,
        services::{self, LoginOutcome},
    },
    error::AppResult,
    extract::{ApiJson, ApiQuery},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify", get(verify))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/security-questions", get(security_questions))
        .route("/auth/security-question", get(security_question))
        .route("/auth/request-reset", post(request_reset))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn auth_response(out: LoginOutcome) -> Json<AuthResponse> {
    Json(AuthResponse {
        success: true,
        token: out.access_token,
        refresh_token: out.refresh_token,
        user: PublicUser::from(&out.user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let out = services::register(&state, payload.into()).await?;

    let message = if out.email_sent {
        "Account created. Check your email to verify your address."
    } else {
        "Account created, but the verification email could not be sent."
    };
    let verification_token = state
        .config
        .expose_verification_token
        .then_some(out.verification_token);

    Ok(Json(RegisterResponse {
        success: true,
        message: message.into(),
        email_sent: out.email_sent,
        user: PublicUser::from(&out.user),
        verification_token,
    }))
}

#[instrument(skip(state, q))]
pub async fn verify(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<VerifyQuery>,
) -> AppResult<Json<MessageResponse>> {
    services::verify_email(&state, &q.token).await?;
    Ok(Json(MessageResponse::ok("Email verified. You can now log in.")))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::resend_verification(&state, &payload.email).await?;
    Ok(Json(MessageResponse::ok(
        "If the account exists and is unverified, a new verification email was sent.",
    )))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let out = services::login(&state, &payload.email, &payload.password).await?;
    Ok(auth_response(out))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let out = services::refresh(&state, &payload.refresh_token).await?;
    Ok(auth_response(out))
}

pub async fn security_questions() -> Json<SecurityQuestionsResponse> {
    Json(SecurityQuestionsResponse {
        questions: SECURITY_QUESTIONS.to_vec(),
    })
}

#[instrument(skip(state))]
pub async fn security_question(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<EmailQuery>,
) -> AppResult<Json<SecurityQuestionResponse>> {
    let question = services::security_question_for(&state, &q.email).await?;
    Ok(Json(SecurityQuestionResponse { question }))
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RequestResetRequest>,
) -> AppResult<Json<ResetTokenResponse>> {
    let cred =
        services::request_password_reset(&state, &payload.email, &payload.security_answer).await?;
    Ok(Json(ResetTokenResponse {
        success: true,
        reset_token: cred.token,
        expires_at: cred.expires_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::complete_password_reset(&state, &payload.token, &payload.new_password).await?;
    Ok(Json(MessageResponse::ok("Password updated. You can now log in.")))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = services::current_user(&state, caller.id).await?;
    Ok(Json(MeResponse {
        user: PublicUser::from(&user),
    }))
}
