//! Per-message processing: render pipeline followed by delivery.
//!
//! Every failure is handled here. Nothing propagates back into the worker
//! loop, so a bad message can never take a worker down with it.

use std::sync::Arc;

use courier_common::config::SharedConfig;
use courier_common::types::MailMessage;
use courier_render::render_mail;
use tera::Tera;

use crate::smtp::{MailTransport, OutboundMail};

/// Shared processing context handed to every worker.
pub struct MailProcessor {
    config: SharedConfig,
    templates: Arc<Tera>,
    transport: Arc<dyn MailTransport>,
}

impl MailProcessor {
    pub fn new(
        config: SharedConfig,
        templates: Arc<Tera>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            templates,
            transport,
        }
    }

    /// Run the full pipeline for one message. Infallible by design: delivery
    /// is at-most-once and a failed message is logged and dropped.
    pub async fn process(&self, message: MailMessage) {
        let config = self.config.snapshot();

        let rendered = match render_mail(&message, &config, &self.templates) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    template = %message.template,
                    to = %message.to_address,
                    "Dropping message, template could not be resolved"
                );
                return;
            }
        };

        let mail = OutboundMail {
            message,
            html: rendered.html,
            plain: rendered.plain,
        };

        match self.transport.deliver(&mail, &config).await {
            Ok(()) => {
                tracing::info!(to = %mail.message.to_address, "Email sent");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    to = %mail.message.to_address,
                    "Email delivery failed, message dropped"
                );
            }
        }
    }
}
