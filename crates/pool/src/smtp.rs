//! Delivery adapter over the SMTP transport.
//!
//! The pool only sees the [`MailTransport`] trait; the [`SmtpMailer`]
//! implementation builds a fresh client per message (no connection reuse)
//! from the configuration snapshot taken by the worker.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use courier_common::config::{AuthMode, DeliveryConfig};
use courier_common::types::MailMessage;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

/// Fixed timeout applied to both connect and send.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// A rendered message ready for transmission.
#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub message: MailMessage,
    /// Inlined HTML body.
    pub html: String,
    /// Plain-text alternative.
    pub plain: String,
}

/// Narrow transmission capability the pool depends on. Implementations must
/// tolerate concurrent calls from multiple workers.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(
        &self,
        mail: &OutboundMail,
        config: &DeliveryConfig,
    ) -> Result<(), DeliveryError>;
}

/// SMTP implementation of [`MailTransport`].
#[derive(Debug, Default)]
pub struct SmtpMailer {
    abort_on_connect_failure: bool,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short-circuit the send when the connection test fails, instead of the
    /// historical behavior of attempting it anyway.
    pub fn abort_on_connect_failure(mut self, abort: bool) -> Self {
        self.abort_on_connect_failure = abort;
        self
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(
        &self,
        mail: &OutboundMail,
        config: &DeliveryConfig,
    ) -> Result<(), DeliveryError> {
        let transport = build_transport(config)?;

        let connected = match transport.test_connection().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(host = %config.smtp_host, "SMTP connection test failed");
                false
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    host = %config.smtp_host,
                    "Could not connect to SMTP server"
                );
                false
            }
        };

        // Historical behavior: a failed connection does not short-circuit the
        // send, which then fails on its own terms.
        if !should_attempt_send(connected, self.abort_on_connect_failure) {
            return Err(DeliveryError::Transport(format!(
                "connection to {} failed",
                config.smtp_host
            )));
        }

        let message = build_message(mail)?;
        transport.send(message).await?;
        Ok(())
    }
}

/// Whether to go ahead with the send after the connection test.
fn should_attempt_send(connected: bool, abort_on_connect_failure: bool) -> bool {
    connected || !abort_on_connect_failure
}

/// Parse the configured port string, falling back to 0 on an unparsable
/// value instead of failing the message.
fn smtp_port(config: &DeliveryConfig) -> u16 {
    match config.smtp_port.parse() {
        Ok(port) => port,
        Err(_) => {
            tracing::warn!(
                port = %config.smtp_port,
                "Unparsable SMTP port, falling back to 0"
            );
            0
        }
    }
}

/// Build a single-use SMTP client from the configuration snapshot: TLS
/// required, auth mechanism by the localhost rule, fixed timeouts. The client
/// is dropped after one message, so connections are never kept alive.
fn build_transport(
    config: &DeliveryConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
    let mechanism = match config.auth_mode() {
        AuthMode::Plain => Mechanism::Plain,
        AuthMode::Login => Mechanism::Login,
    };

    let tls = TlsParameters::new(config.smtp_host.clone())?;

    Ok(
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
            .port(smtp_port(config))
            .tls(Tls::Required(tls))
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .authentication(vec![mechanism])
            .timeout(Some(SMTP_TIMEOUT))
            .build(),
    )
}

/// Assemble the outbound message: sender, recipients, subject, HTML body with
/// plain-text alternative, plus any attachments. An unreadable attachment is
/// logged and skipped rather than failing the whole message.
fn build_message(mail: &OutboundMail) -> Result<Message, DeliveryError> {
    let message = &mail.message;

    let from: Mailbox = if message.from_name.is_empty() {
        message.from_address.parse()?
    } else {
        format!("{} <{}>", message.from_name, message.from_address).parse()?
    };

    let mut builder = Message::builder()
        .from(from)
        .to(message.to_address.parse()?)
        .subject(message.subject.clone());

    for address in &message.additional_to {
        builder = builder.to(address.parse()?);
    }
    for address in &message.cc {
        builder = builder.cc(address.parse()?);
    }

    let body = MultiPart::alternative_plain_html(mail.plain.clone(), mail.html.clone());

    let attachments: Vec<(String, Vec<u8>)> = message
        .attachments
        .iter()
        .filter_map(|path| match std::fs::read(path) {
            Ok(bytes) => Some((attachment_name(path), bytes)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Could not read attachment, skipping it"
                );
                None
            }
        })
        .collect();

    if attachments.is_empty() {
        return Ok(builder.multipart(body)?);
    }

    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| DeliveryError::Transport(format!("bad attachment content type: {e}")))?;

    let mut mixed = MultiPart::mixed().multipart(body);
    for (name, bytes) in attachments {
        mixed = mixed.singlepart(Attachment::new(name).body(bytes, content_type.clone()));
    }
    Ok(builder.multipart(mixed)?)
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_port(port: &str) -> DeliveryConfig {
        DeliveryConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: port.to_string(),
            smtp_user: "user".to_string(),
            smtp_password: "secret".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Courier".to_string(),
        }
    }

    fn outbound(message: MailMessage) -> OutboundMail {
        OutboundMail {
            message,
            html: "<p>Hi</p>".to_string(),
            plain: "Hi".to_string(),
        }
    }

    #[test]
    fn test_smtp_port_parses_valid_value() {
        assert_eq!(smtp_port(&config_with_port("2525")), 2525);
    }

    #[test]
    fn test_smtp_port_falls_back_to_zero() {
        assert_eq!(smtp_port(&config_with_port("not-a-port")), 0);
        assert_eq!(smtp_port(&config_with_port("")), 0);
    }

    #[test]
    fn test_should_attempt_send_branches() {
        // Historical behavior: send even after a failed connection.
        assert!(should_attempt_send(true, false));
        assert!(should_attempt_send(false, false));
        // Hardened behavior: connection failure short-circuits.
        assert!(should_attempt_send(true, true));
        assert!(!should_attempt_send(false, true));
    }

    #[test]
    fn test_build_message_sets_headers_and_bodies() {
        let mut message = MailMessage::new("a@x.com", "S", "<p>Hi</p>");
        message.from_address = "noreply@example.com".to_string();
        message.from_name = "Courier".to_string();
        message.additional_to = vec!["b@x.com".to_string()];
        message.cc = vec!["c@x.com".to_string()];

        let built = build_message(&outbound(message)).unwrap();
        let raw = String::from_utf8_lossy(&built.formatted()).into_owned();

        assert!(raw.contains("Subject: S"));
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("b@x.com"));
        assert!(raw.contains("Cc: c@x.com"));
        assert!(raw.contains("noreply@example.com"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_build_message_rejects_invalid_recipient() {
        let mut message = MailMessage::new("not an address", "S", "");
        message.from_address = "noreply@example.com".to_string();

        assert!(matches!(
            build_message(&outbound(message)),
            Err(DeliveryError::Address(_))
        ));
    }

    #[test]
    fn test_build_message_skips_unreadable_attachment() {
        let mut message = MailMessage::new("a@x.com", "S", "");
        message.from_address = "noreply@example.com".to_string();
        message.attachments = vec!["/no/such/file.pdf".into()];

        let built = build_message(&outbound(message)).unwrap();
        let raw = String::from_utf8_lossy(&built.formatted()).into_owned();
        assert!(!raw.contains("file.pdf"));
    }

    #[tokio::test]
    async fn test_build_transport_tolerates_bad_port() {
        // Port 0 is wrong but building the client must not fail; the
        // connection attempt fails later instead.
        assert!(build_transport(&config_with_port("garbage")).is_ok());
    }
}
