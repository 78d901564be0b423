use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::ServiceConfig;

/// Email delivery collaborator. Returns whether the message was handed off
/// to the transport; ordinary transport errors become `false`, never panics.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str, name: &str) -> bool;
    async fn send_password_reset(&self, to: &str, code: &str, name: &str) -> bool;
    /// Probe transport connectivity without sending anything.
    async fn verify_connection(&self) -> bool;
}

/// SMTP-backed gateway. STARTTLS submission, credentials and sender address
/// from the environment.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    app_name: String,
    timeout: Duration,
    code_ttl: Duration,
}

impl SmtpMailer {
    /// Build the mailer from `SMTP_HOST`, `SMTP_PORT` (default 587),
    /// `SMTP_USER`, `SMTP_PASS`, `EMAIL_FROM` (default `SMTP_USER`) and
    /// `APP_NAME`.
    pub fn from_env(config: &ServiceConfig) -> Result<Self, String> {
        let smtp_host = env::var("SMTP_HOST").map_err(|_| "SMTP_HOST is not set".to_string())?;
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        let smtp_user = env::var("SMTP_USER").map_err(|_| "SMTP_USER is not set".to_string())?;
        let smtp_pass = env::var("SMTP_PASS").map_err(|_| "SMTP_PASS is not set".to_string())?;
        let email_from = env::var("EMAIL_FROM").unwrap_or_else(|_| smtp_user.clone());
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "Noor Al Quran".to_string());

        let from = format!("\"{}\" <{}>", app_name, email_from)
            .parse()
            .map_err(|e| format!("Invalid EMAIL_FROM address: {}", e))?;

        let creds = Credentials::new(smtp_user, smtp_pass);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
            .map_err(|e| format!("SMTP transport setup failed: {}", e))?
            .port(smtp_port)
            .credentials(creds)
            .timeout(Some(config.delivery_timeout))
            .build();

        Ok(Self {
            transport,
            from,
            app_name,
            timeout: config.delivery_timeout,
            code_ttl: config.otp_ttl,
        })
    }

    async fn send(&self, to: &str, subject: String, body: String) -> bool {
        let to_addr: Mailbox = match to.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Refusing to send to invalid address {}: {}", to, e);
                return false;
            }
        };
        let email = match Message::builder()
            .from(self.from.clone())
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to build email for {}: {}", to, e);
                return false;
            }
        };

        // The outer timeout bounds the whole exchange; dropping the send
        // future aborts the in-flight network operation.
        match tokio::time::timeout(self.timeout, self.transport.send(email)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                error!("SMTP send to {} failed: {}", to, e);
                false
            }
            Err(_) => {
                error!("SMTP send to {} timed out after {:?}", to, self.timeout);
                false
            }
        }
    }

    fn ttl_minutes(&self) -> u64 {
        self.code_ttl.as_secs() / 60
    }
}

#[async_trait]
impl DeliveryGateway for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str, name: &str) -> bool {
        let subject = format!("Your Verification Code - {}", self.app_name);
        let body = code_email_body(
            &self.app_name,
            code,
            name,
            "To complete your verification, please use the code below:",
            self.ttl_minutes(),
        );
        self.send(to, subject, body).await
    }

    async fn send_password_reset(&self, to: &str, code: &str, name: &str) -> bool {
        let subject = format!("Your Password Reset Code - {}", self.app_name);
        let body = code_email_body(
            &self.app_name,
            code,
            name,
            "We received a request to reset your password. Use the code below to continue:",
            self.ttl_minutes(),
        );
        self.send(to, subject, body).await
    }

    async fn verify_connection(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.transport.test_connection()).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                error!("SMTP connection test failed: {}", e);
                false
            }
            Err(_) => {
                error!("SMTP connection test timed out after {:?}", self.timeout);
                false
            }
        }
    }
}

fn code_email_body(app_name: &str, code: &str, name: &str, intro: &str, ttl_minutes: u64) -> String {
    let greeting = if name.is_empty() {
        String::new()
    } else {
        format!(", {}", name)
    };
    format!(
        r#"<div style="font-family: 'Segoe UI', Tahoma, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2c3e50;">Assalamu Alaikum{greeting}!</h2>
  <p style="color: #7f8c8d;">Welcome to {app_name}. {intro}</p>
  <div style="background-color: #f8f9fa; border: 2px solid #3498db; border-radius: 15px; padding: 20px; text-align: center; margin: 20px 0;">
    <span style="font-size: 32px; font-weight: 900; color: #2c3e50; letter-spacing: 8px; font-family: 'Courier New', monospace;">{code}</span>
  </div>
  <p style="color: #95a5a6;">This code will expire in <strong style="color: #e74c3c;">{ttl_minutes} minutes</strong>.</p>
  <p style="color: #856404;">If you didn't request this code, please ignore this email. Your account remains secure.</p>
  <p style="color: #95a5a6;"><strong>{app_name} Team</strong></p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_carries_code_and_expiry() {
        let body = code_email_body("Noor Al Quran", "123456", "Alice", "Use the code below:", 10);
        assert!(body.contains("123456"));
        assert!(body.contains("Assalamu Alaikum, Alice!"));
        assert!(body.contains("10 minutes"));
    }

    #[test]
    fn test_body_without_name_has_plain_greeting() {
        let body = code_email_body("Noor Al Quran", "123456", "", "Use the code below:", 10);
        assert!(body.contains("Assalamu Alaikum!"));
    }
}
