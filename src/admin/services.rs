use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    password::hash_password,
    repo_types::User,
    security_questions::SECURITY_QUESTIONS,
    services::{normalize_email, prepare_user, validate_password, Registration},
    tokens::generate_token,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// How an admin names the target of an operation.
#[derive(Debug, Clone)]
pub enum UserRef {
    Id(Uuid),
    Email(String),
}

async fn resolve(state: &AppState, target: &UserRef) -> AppResult<User> {
    let found = match target {
        UserRef::Id(id) => state.users.find_by_id(*id).await?,
        UserRef::Email(email) => state.users.find_by_email(&normalize_email(email)?).await?,
    };
    found.ok_or(AppError::UserNotFound)
}

#[instrument(skip(state))]
pub async fn list_users(state: &AppState) -> AppResult<Vec<User>> {
    state.users.list().await
}

/// Idempotent: setting the current value again succeeds.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_blocked(
    state: &AppState,
    admin: &User,
    user_id: Uuid,
    blocked: bool,
) -> AppResult<User> {
    if blocked && admin.id == user_id {
        return Err(AppError::Validation("You cannot block your own account".into()));
    }
    let user = state
        .users
        .set_blocked(user_id, blocked)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = %user.id, blocked, "user block status changed");
    Ok(user)
}

/// Returns the user and whether it was already verified (a no-op then).
#[instrument(skip(state))]
pub async fn verify_user(state: &AppState, target: UserRef) -> AppResult<(User, bool)> {
    let user = resolve(state, &target).await?;
    if user.is_verified {
        info!(user_id = %user.id, "user already verified");
        return Ok((user, true));
    }
    let user = state
        .users
        .mark_verified(user.id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = %user.id, "user verified by admin");
    Ok((user, false))
}

#[instrument(skip(state, new_password))]
pub async fn reset_password(state: &AppState, user_id: Uuid, new_password: &str) -> AppResult<User> {
    validate_password(state, new_password)?;
    let hash = hash_password(new_password).map_err(|e| AppError::Internal(e.to_string()))?;
    let user = state
        .users
        .update_password(user_id, &hash)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = %user.id, "password reset by admin");
    Ok(user)
}

/// Inserts an already verified account, skipping the e-mail flow.
#[instrument(skip(state, reg), fields(email = %reg.email))]
pub async fn create_user(state: &AppState, reg: Registration, is_admin: bool) -> AppResult<User> {
    let new_user = prepare_user(state, &reg, true, is_admin, None)?;
    if state.users.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "admin create on taken email");
        return Err(AppError::DuplicateEmail);
    }
    let user = state.users.insert(new_user).await?;
    info!(user_id = %user.id, is_admin, "user created by admin");
    Ok(user)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(state: &AppState, admin: &User, user_id: Uuid) -> AppResult<()> {
    if admin.id == user_id {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }
    if !state.users.delete(user_id).await? {
        return Err(AppError::UserNotFound);
    }
    info!(user_id = %user_id, "user deleted");
    Ok(())
}

/// Creates the configured first admin if its e-mail is free.
///
/// Its security answer is random, so it can only be reset by another admin.
pub async fn ensure_bootstrap_admin(state: &AppState) -> AppResult<()> {
    let Some(seed) = state.config.bootstrap_admin.clone() else {
        return Ok(());
    };
    let email = normalize_email(&seed.email)?;
    if state.users.find_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let reg = Registration {
        email,
        password: seed.password,
        first_name: "Admin".into(),
        last_name: String::new(),
        security_question: SECURITY_QUESTIONS[0].into(),
        security_answer: generate_token(),
    };
    match create_user(state, reg, true).await {
        Ok(user) => {
            info!(user_id = %user.id, "bootstrap admin created");
            Ok(())
        }
        // another instance seeded it first
        Err(AppError::DuplicateEmail) => Ok(()),
        Err(e) => Err(e),
    }
}
