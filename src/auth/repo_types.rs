use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // always lowercase
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub is_admin: bool,
    pub blocked: bool,
    pub verification_token: Option<String>, // sha-256 hex of the raw token
    pub reset_token: Option<String>,        // sha-256 hex of the raw token
    pub reset_token_expires: Option<OffsetDateTime>,
    pub security_question: String,
    pub security_answer: String, // Argon2 hash of the normalised answer
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Values for a fresh `users` row; hashes are computed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub is_admin: bool,
    pub verification_token: Option<String>,
    pub security_question: String,
    pub security_answer: String,
}
