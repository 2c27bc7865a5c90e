use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::auth::{
    jwt::JwtKeys,
    password::{
        dummy_verify, hash_password, hash_security_answer, verify_password,
        verify_security_answer,
    },
    repo_types::{NewUser, User},
    security_questions,
    tokens::{generate_token, hash_token},
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_PASSWORD_LEN: usize = 256;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lowercases and trims, then checks the shape. Every lookup and write goes through here.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn validate_password(state: &AppState, password: &str) -> AppResult<()> {
    let min = state.config.password_min_length.max(1);
    if password.chars().count() < min {
        return Err(AppError::Validation(format!(
            "Password must be at least {min} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Validation("Password too long".into()));
    }
    Ok(())
}

fn clean_name(raw: &str, field: &str) -> AppResult<String> {
    let name = raw.trim().to_string();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!("{field} too long")));
    }
    Ok(name)
}

fn canonical_question(raw: &str) -> AppResult<&'static str> {
    security_questions::canonical(raw)
        .ok_or_else(|| AppError::Validation("Unknown security question".into()))
}

fn require_answer(raw: &str) -> AppResult<()> {
    if raw.trim().is_empty() {
        return Err(AppError::Validation("Security answer is required".into()));
    }
    Ok(())
}

fn internal(e: anyhow::Error) -> AppError {
    AppError::Internal(e.to_string())
}

/// Input shared by self-registration and admin creation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub security_question: String,
    pub security_answer: String,
}

/// Validates and hashes a registration into an insertable row.
pub(crate) fn prepare_user(
    state: &AppState,
    reg: &Registration,
    is_verified: bool,
    is_admin: bool,
    verification_token: Option<String>,
) -> AppResult<NewUser> {
    let email = normalize_email(&reg.email)?;
    validate_password(state, &reg.password)?;
    let first_name = clean_name(&reg.first_name, "First name")?;
    let last_name = clean_name(&reg.last_name, "Last name")?;
    let question = canonical_question(&reg.security_question)?;
    require_answer(&reg.security_answer)?;

    Ok(NewUser {
        email,
        password_hash: hash_password(&reg.password).map_err(internal)?,
        first_name,
        last_name,
        is_verified,
        is_admin,
        verification_token,
        security_question: question.to_string(),
        security_answer: hash_security_answer(&reg.security_answer).map_err(internal)?,
    })
}

#[derive(Debug)]
pub struct RegisterOutcome {
    pub user: User,
    /// Raw token; only its digest is stored.
    pub verification_token: String,
    pub email_sent: bool,
}

/// Sends the verification mail within the configured timeout. Never fails the caller.
async fn dispatch_verification(state: &AppState, email: &str, token: &str) -> bool {
    let link = state.config.verification_link(token);
    let timeout = state.config.email.timeout;
    match tokio::time::timeout(timeout, state.mailer.send_verification(email, &link)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, email = %email, "verification email failed");
            false
        }
        Err(_) => {
            error!(email = %email, timeout_secs = timeout.as_secs(), "verification email timed out");
            false
        }
    }
}

#[instrument(skip(state, reg), fields(email = %reg.email))]
pub async fn register(state: &AppState, reg: Registration) -> AppResult<RegisterOutcome> {
    let token = generate_token();
    let new_user = prepare_user(state, &reg, false, false, Some(hash_token(&token)))?;

    if state.users.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    // The unique index still decides a concurrent race.
    let user = state.users.insert(new_user).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    let email_sent = dispatch_verification(state, &user.email, &token).await;

    Ok(RegisterOutcome {
        user,
        verification_token: token,
        email_sent,
    })
}

#[instrument(skip(state, token))]
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<User> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidToken);
    }
    match state.users.consume_verification_token(&hash_token(token)).await? {
        Some(user) => {
            info!(user_id = %user.id, "email verified");
            Ok(user)
        }
        None => {
            warn!("unknown or consumed verification token");
            Err(AppError::InvalidToken)
        }
    }
}

/// Issues a fresh verification token for an unverified account.
///
/// Returns `Ok(())` for unknown or already verified e-mails as well.
#[instrument(skip(state))]
pub async fn resend_verification(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email)?;
    let Some(user) = state.users.find_by_email(&email).await? else {
        info!(email = %email, "resend for unknown email ignored");
        return Ok(());
    };
    if user.is_verified {
        return Ok(());
    }

    let token = generate_token();
    state
        .users
        .set_verification_token(user.id, &hash_token(&token))
        .await?;
    dispatch_verification(state, &user.email, &token).await;
    info!(user_id = %user.id, "verification token reissued");
    Ok(())
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

fn issue_tokens(state: &AppState, user: &User) -> AppResult<(String, String)> {
    let keys = JwtKeys::from_config(&state.config.jwt);
    let access = keys.sign_access(user.id, user.is_admin).map_err(internal)?;
    let refresh = keys.sign_refresh(user.id, user.is_admin).map_err(internal)?;
    Ok((access, refresh))
}

#[instrument(skip(state, password))]
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<LoginOutcome> {
    let email = normalize_email(email)?;

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        dummy_verify(password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash).map_err(internal)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if user.blocked {
        warn!(user_id = %user.id, "login on blocked account");
        return Err(AppError::AccountBlocked);
    }
    if !user.is_verified && !user.is_admin {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::NotVerified);
    }

    state.users.touch_last_login(user.id).await?;
    user.last_login = Some(OffsetDateTime::now_utc());

    let (access_token, refresh_token) = issue_tokens(state, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome {
        user,
        access_token,
        refresh_token,
    })
}

/// Exchanges a refresh token for a new pair, re-reading the user's flags.
#[instrument(skip(state, refresh_token))]
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<LoginOutcome> {
    let keys = JwtKeys::from_config(&state.config.jwt);
    let claims = keys
        .verify_refresh(refresh_token.trim())
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    if user.blocked {
        return Err(AppError::AccountBlocked);
    }

    let (access_token, refresh_token) = issue_tokens(state, &user)?;
    Ok(LoginOutcome {
        user,
        access_token,
        refresh_token,
    })
}

pub async fn security_question_for(state: &AppState, email: &str) -> AppResult<String> {
    let email = normalize_email(email)?;
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(user.security_question)
}

#[derive(Debug)]
pub struct ResetCredential {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Answer-gated step one of a password reset: returns a single-use reset token.
#[instrument(skip(state, security_answer))]
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
    security_answer: &str,
) -> AppResult<ResetCredential> {
    let email = normalize_email(email)?;
    require_answer(security_answer)?;

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if !verify_security_answer(security_answer, &user.security_answer).map_err(internal)? {
        warn!(user_id = %user.id, "security answer mismatch");
        return Err(AppError::SecurityAnswerMismatch);
    }
    if user.blocked {
        return Err(AppError::AccountBlocked);
    }

    let token = generate_token();
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.reset_token_ttl_minutes);
    state
        .users
        .set_reset_token(user.id, &hash_token(&token), expires_at)
        .await?;

    info!(user_id = %user.id, "password reset token issued");
    Ok(ResetCredential { token, expires_at })
}

/// Step two: consumes the reset token and stores the new password.
#[instrument(skip(state, token, new_password))]
pub async fn complete_password_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> AppResult<User> {
    validate_password(state, new_password)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidToken);
    }

    let hash = hash_password(new_password).map_err(internal)?;
    let user = state
        .users
        .consume_reset_token(&hash_token(token), OffsetDateTime::now_utc(), &hash)
        .await?
        .ok_or(AppError::InvalidToken)?;

    info!(user_id = %user.id, "password reset completed");
    Ok(user)
}

pub async fn current_user(state: &AppState, user_id: uuid::Uuid) -> AppResult<User> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))
}
