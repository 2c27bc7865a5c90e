use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key. `None` means mail is only logged.
    pub resend_api_key: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

/// Optional first admin, created at startup when no user owns the e-mail yet.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub app_base_url: String,
    pub expose_verification_token: bool,
    pub reset_token_ttl_minutes: i64,
    pub password_min_length: usize,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "patentaudit".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "patentaudit-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let email = EmailConfig {
            resend_api_key: env_opt("RESEND_API_KEY"),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "PatentAudit <noreply@localhost>".into()),
            timeout: Duration::from_secs(env_or("EMAIL_TIMEOUT_SECS", 5)),
        };
        let bootstrap_admin = match (env_opt("ADMIN_EMAIL"), env_opt("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            email,
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            expose_verification_token: env_flag("EXPOSE_VERIFICATION_TOKEN"),
            reset_token_ttl_minutes: env_or("RESET_TOKEN_TTL_MINUTES", 15),
            password_min_length: env_or("PASSWORD_MIN_LENGTH", DEFAULT_PASSWORD_MIN_LENGTH),
            bootstrap_admin,
        })
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify?token={}", self.app_base_url, token)
    }
}
