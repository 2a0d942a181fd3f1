//! Invitation email delivery via SMTP.
//!
//! [`InvitationMailer`] wraps the `lettre` async SMTP transport. If
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and the
//! mailer runs in mock mode: sends are logged and reported as mocked.

use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use beheard_core::invitation::INVITATION_TTL_DAYS;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@beheard.app";

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                |
    /// |-----------------|----------|------------------------|
    /// | `SMTP_HOST`     | yes      | none                   |
    /// | `SMTP_PORT`     | no       | `587`                  |
    /// | `SMTP_FROM`     | no       | `noreply@beheard.app`  |
    /// | `SMTP_USER`     | no       | none                   |
    /// | `SMTP_PASSWORD` | no       | none                   |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// InvitationMailer
// ---------------------------------------------------------------------------

/// Outcome of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReceipt {
    /// `true` when SMTP is not configured and nothing left the process.
    pub mocked: bool,
}

/// Sends partner invitation emails.
pub struct InvitationMailer {
    config: Option<EmailConfig>,
}

impl InvitationMailer {
    /// `None` puts the mailer in mock mode.
    pub fn new(config: Option<EmailConfig>) -> Self {
        if config.is_none() {
            tracing::warn!("SMTP_HOST not configured, invitation emails will be logged only");
        }
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Send the invitation to `to`.
    pub async fn send_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        invitation_url: &str,
    ) -> Result<EmailReceipt, EmailError> {
        let subject = invitation_subject(inviter_name);

        let Some(config) = &self.config else {
            tracing::info!(to, subject = %subject, invitation_url, "Mock invitation email");
            return Ok(EmailReceipt { mocked: true });
        };

        let email = Message::builder()
            .from(config.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(invitation_text(inviter_name, invitation_url)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(invitation_html(inviter_name, invitation_url)),
                    ),
            )
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to, "Invitation email sent");
        Ok(EmailReceipt { mocked: false })
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

pub fn invitation_subject(inviter_name: &str) -> String {
    format!("{inviter_name} invited you to BeHeard")
}

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

pub fn invitation_html(inviter_name: &str, invitation_url: &str) -> String {
    let name = escape_html(inviter_name);
    let url = escape_html(invitation_url);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>BeHeard Invitation</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #4F46E5; text-align: center;">BeHeard</h1>
  <div style="background: #F9FAFB; border-radius: 12px; padding: 30px; margin-bottom: 30px;">
    <h2 style="margin-top: 0; color: #111827;">You've been invited</h2>
    <p style="font-size: 16px; color: #4B5563;"><strong>{name}</strong> wants to work through something together using BeHeard.</p>
    <p style="font-size: 14px; color: #6B7280;">BeHeard is a guided process that helps two people understand each other better and find common ground.</p>
  </div>
  <div style="text-align: center; margin-bottom: 30px;">
    <a href="{url}" style="display: inline-block; background: #4F46E5; color: white; padding: 14px 32px; text-decoration: none; border-radius: 8px; font-weight: 600;">Accept Invitation</a>
  </div>
  <div style="text-align: center; color: #9CA3AF; font-size: 12px;">
    <p>This invitation expires in {INVITATION_TTL_DAYS} days.</p>
    <p>If you didn't expect this invitation, you can safely ignore this email.</p>
  </div>
</body>
</html>"#
    )
}

pub fn invitation_text(inviter_name: &str, invitation_url: &str) -> String {
    format!(
        "You've been invited to BeHeard\n\n\
         {inviter_name} wants to work through something together using BeHeard.\n\n\
         BeHeard is a guided process that helps two people understand each other better \
         and find common ground.\n\n\
         Accept the invitation: {invitation_url}\n\n\
         This invitation expires in {INVITATION_TTL_DAYS} days.\n\
         If you didn't expect this invitation, you can safely ignore this email.\n"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escapes_inviter_name() {
        let html = invitation_html("<b>Alex</b> & \"Sam\"", "https://beheard.app/invitation/1");
        assert!(html.contains("&lt;b&gt;Alex&lt;/b&gt; &amp; &quot;Sam&quot;"));
        assert!(!html.contains("<b>Alex</b>"));
        assert!(html.contains(r#"href="https://beheard.app/invitation/1""#));
    }

    #[test]
    fn text_body_carries_link_and_expiry() {
        let text = invitation_text("Alex", "https://beheard.app/invitation/9");
        assert!(text.contains("Alex wants to work through something"));
        assert!(text.contains("https://beheard.app/invitation/9"));
        assert!(text.contains("expires in 7 days"));
    }

    #[test]
    fn subject_names_inviter() {
        assert_eq!(invitation_subject("Alex"), "Alex invited you to BeHeard");
    }

    #[tokio::test]
    async fn unconfigured_mailer_mocks_the_send() {
        let mailer = InvitationMailer::new(None);
        assert!(!mailer.is_configured());
        let receipt = mailer
            .send_invitation("partner@example.com", "Alex", "https://beheard.app/invitation/1")
            .await
            .unwrap();
        assert!(receipt.mocked);
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
