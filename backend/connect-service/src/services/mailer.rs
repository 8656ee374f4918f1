/// Outbound email: verification links for new credential accounts.
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::error::{AppError, Result};

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether an SMTP transport is configured
    fn is_enabled(&self) -> bool;

    async fn send_verification_email(&self, recipient: &str, link: &str) -> Result<()>;

    /// Open and close an SMTP session without sending anything
    async fn test_connection(&self) -> std::result::Result<(), String>;
}

/// SMTP mailer; without an SMTP host it logs instead of sending.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    app_name: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid FROM_EMAIL address: {}", e)))?;

        let transport = match &config.smtp {
            None => {
                warn!("SMTP host not configured; email service will operate in no-op mode");
                None
            }
            Some(smtp) => {
                let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to configure SMTP transport: {}", e))
                    })?
                    .port(smtp.port);

                let builder = match (&smtp.user, &smtp.password) {
                    (Some(user), Some(password)) => builder.credentials(Credentials::new(
                        user.clone(),
                        password.expose_secret().to_string(),
                    )),
                    _ => builder,
                };
                Some(builder.build())
            }
        };

        Ok(Self {
            transport,
            from,
            app_name: config.from_name.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    async fn send_verification_email(&self, recipient: &str, link: &str) -> Result<()> {
        let subject = format!("Verify your {} account", self.app_name);
        let Some(transport) = &self.transport else {
            info!(subject = %subject, recipient, "Email service running in no-op mode; skipping actual send");
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient email address: {}", e)))?;

        let body = format!(
            "Welcome to {}!\n\nPlease open the following link to verify your email address:\n{}\n\n\
             The link expires in 24 hours. If you did not sign up, please ignore this email.",
            self.app_name, link
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject.as_str())
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;
        info!(subject = %subject, "email sent successfully");
        Ok(())
    }

    async fn test_connection(&self) -> std::result::Result<(), String> {
        match &self.transport {
            None => Err("SMTP not configured".to_string()),
            Some(transport) => match transport.test_connection().await {
                Ok(true) => Ok(()),
                Ok(false) => Err("SMTP server did not accept the connection".to_string()),
                Err(e) => Err(e.to_string()),
            },
        }
    }
}
