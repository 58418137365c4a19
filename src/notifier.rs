//! Password Reset Notification
//!
//! Renders the reset email and hands it to a background delivery queue.
//! Delivery is best effort: the request that scheduled a message never
//! waits for it, and a failed send is logged and dropped.

use crate::config::MailConfig;
use crate::error::AuthError;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Subject line of the reset email
pub const RESET_SUBJECT: &str = "Password Reset Request";

/// A rendered password reset email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Render the reset email for `email` carrying `token`
pub fn render_reset_email(app_url: &str, token: &str, email: &str, year: i32) -> ResetEmail {
    let link = format!("{}/reset-password/{}", app_url.trim_end_matches('/'), token);
    let href = html_escape::encode_double_quoted_attribute(&link);
    let link_text = html_escape::encode_text(&link);
    let recipient = html_escape::encode_text(email);

    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Reset your password</h2>
    <p>We received a request to reset the password for <strong>{recipient}</strong>.</p>
    <p><a href="{href}">Click here to choose a new password</a></p>
    <p>If the button does not work, copy this link into your browser:<br>{link_text}</p>
    <p>If you did not request a reset, you can ignore this email.</p>
    <p style="font-size: 12px; color: #999;">&copy; {year}</p>
  </body>
</html>
"#
    );

    ResetEmail {
        to: email.to_string(),
        subject: RESET_SUBJECT.to_string(),
        html_body,
    }
}

/// Email transport
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one email; errors are [`AuthError::Delivery`]
    async fn send(&self, email: ResetEmail) -> Result<(), AuthError>;
}

// ============================================
// SMTP
// ============================================

/// Sends mail through an SMTP relay with STARTTLS
pub struct SmtpNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, AuthError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AuthError::Config(format!("invalid MAIL_FROM address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| AuthError::Config(format!("invalid MAIL_SERVER: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: ResetEmail) -> Result<(), AuthError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AuthError::Delivery(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)
            .map_err(|e| AuthError::Delivery(format!("failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        Ok(())
    }
}

// ============================================
// Delivery Queue
// ============================================

/// Fire-and-forget queue in front of a [`Notifier`]
#[derive(Clone)]
pub struct DeliveryQueue {
    sender: mpsc::UnboundedSender<ResetEmail>,
}

impl DeliveryQueue {
    /// Spawn the delivery worker. It runs until every queue handle is dropped.
    pub fn start(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ResetEmail>();

        let worker = tokio::spawn(async move {
            while let Some(email) = receiver.recv().await {
                let notifier = Arc::clone(&notifier);
                // One task per message so a slow relay does not hold up the rest.
                tokio::spawn(async move {
                    let to = email.to.clone();
                    match notifier.send(email).await {
                        Ok(()) => tracing::info!(to = %to, "Password reset email delivered"),
                        Err(e) => tracing::warn!(to = %to, "Password reset email dropped: {}", e),
                    }
                });
            }
            tracing::debug!("Delivery queue closed");
        });

        (Self { sender }, worker)
    }

    /// Queue an email without waiting for delivery
    pub fn schedule(&self, email: ResetEmail) -> Result<(), AuthError> {
        self.sender.send(email).map_err(|_| {
            tracing::error!("Delivery queue is closed");
            AuthError::Internal
        })
    }
}
