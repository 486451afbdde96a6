//! Outbound mail.

use async_trait::async_trait;
use tracing::info;

use crate::error::MailError;

/// Delivers transactional mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an invitation carrying `link` to `to`.
    async fn send_invite(&self, to: &str, tenant_name: &str, link: &str) -> Result<(), MailError>;

    /// Send a password reset link to `to`.
    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError>;
}

/// Mailer that writes every message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invite(&self, to: &str, tenant_name: &str, link: &str) -> Result<(), MailError> {
        info!(to, tenant = tenant_name, link, "Invitation mail");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError> {
        info!(to, link, "Password reset mail");
        Ok(())
    }
}

/// Build `<base>/<path>?token=<token>`, tolerating a trailing slash on `base`.
pub fn token_link(base: &str, path: &str, token: &str) -> String {
    format!("{}/{}?token={}", base.trim_end_matches('/'), path, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_link_joins_without_double_slash() {
        assert_eq!(
            token_link("http://localhost:3000/", "accept-invite", "abc"),
            "http://localhost:3000/accept-invite?token=abc"
        );
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        assert!(mailer.send_password_reset("a@example.com", "http://x/reset").await.is_ok());
    }
}
