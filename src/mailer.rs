use std::sync::Arc;

use async_trait::async_trait;
use resend_rs::{types::CreateEmailBaseOptions, Resend};
use tracing::{debug, info};

use crate::config::EmailConfig;

/// Outbound mail. Implementations must not retry; callers bound the wait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: Resend::new(api_key),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        let subject = "PatentAudit - Verify your email";
        let html = format!(
            "<p>Welcome to PatentAudit.</p>\
             <p><a href=\"{link}\">Confirm your email address</a></p>\
             <p>If you did not create an account you can ignore this message.</p>"
        );

        let email = CreateEmailBaseOptions::new(self.from.as_str(), [to], subject)
            .with_html(html.as_str());

        self.client
            .emails
            .send(email)
            .await
            .map_err(|e| anyhow::anyhow!("resend send failed: {e}"))?;

        debug!(to = %to, "verification email sent");
        Ok(())
    }
}

/// Used when no provider key is configured: the link goes to the log instead.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(to = %to, link = %link, "email provider not configured; verification link logged");
        Ok(())
    }
}

pub fn from_config(cfg: &EmailConfig) -> Arc<dyn Mailer> {
    match cfg.resend_api_key.as_deref() {
        Some(key) => Arc::new(ResendMailer::new(key, &cfg.from)),
        None => {
            tracing::warn!("RESEND_API_KEY not set; verification emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}
