use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, AppResult};

macro_rules! user_columns {
    () => {
        "id, email, password_hash, first_name, last_name, is_verified, is_admin, blocked, \
         verification_token, reset_token, reset_token_expires, security_question, \
         security_answer, last_login, created_at, updated_at"
    };
}

const EMAIL_UNIQUE_INDEX: &str = "users_email_lower_key";

/// Persistence for `users`. E-mails passed in are already normalised.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`AppError::DuplicateEmail`] when the e-mail is taken.
    async fn insert(&self, new: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Marks the owner of `token_hash` verified and clears the token, atomically.
    async fn consume_verification_token(&self, token_hash: &str) -> AppResult<Option<User>>;
    async fn set_verification_token(&self, id: Uuid, token_hash: &str) -> AppResult<()>;
    /// Returns `None` when the user does not exist.
    async fn mark_verified(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires: OffsetDateTime,
    ) -> AppResult<()>;
    /// Swaps in `password_hash` if the token exists and has not expired at `now`.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> AppResult<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<Option<User>>;
    async fn set_blocked(&self, id: Uuid, blocked: bool) -> AppResult<Option<User>>;
    async fn touch_last_login(&self, id: Uuid) -> AppResult<()>;
    /// Deletes the user; their analysis records go with them.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation()
                && matches!(db_err.constraint(), None | Some(EMAIL_UNIQUE_INDEX)) =>
        {
            AppError::DuplicateEmail
        }
        _ => e.into(),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (email, password_hash, first_name, last_name, is_verified, \
             is_admin, verification_token, security_question, security_answer) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING ",
            user_columns!()
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.is_verified)
        .bind(new.is_admin)
        .bind(&new.verification_token)
        .bind(&new.security_question)
        .bind(&new.security_answer)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn consume_verification_token(&self, token_hash: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET is_verified = TRUE, verification_token = NULL, updated_at = now() \
             WHERE verification_token = $1 RETURNING ",
            user_columns!()
        ))
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_verification_token(&self, id: Uuid, token_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET verification_token = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET is_verified = TRUE, verification_token = NULL, updated_at = now() \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires: OffsetDateTime,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET reset_token = $2, reset_token_expires = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET password_hash = $3, reset_token = NULL, \
             reset_token_expires = NULL, updated_at = now() \
             WHERE reset_token = $1 AND reset_token_expires > $2 RETURNING ",
            user_columns!()
        ))
        .bind(token_hash)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET password_hash = $2, reset_token = NULL, \
             reset_token_expires = NULL, updated_at = now() \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET blocked = $2, updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(blocked)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
