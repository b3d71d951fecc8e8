//! Producer side of the mail queue.
//!
//! Producers (HTTP handlers, schedulers) hold a cheap-to-clone [`Mailer`] and
//! call [`submit`](Mailer::submit); delivery is fire-and-forget from their
//! perspective. The only back-pressure is the bounded intake channel.

use courier_common::config::SharedConfig;
use courier_common::types::MailMessage;
use thiserror::Error;
use tokio::sync::mpsc;

/// Returned when the pool has shut down; carries the message back to the
/// caller since it was never enqueued.
#[derive(Debug, Error)]
#[error("mail queue is closed")]
pub struct SubmitError(pub MailMessage);

/// Create the bounded intake queue. The receiver goes to the
/// [`Dispatcher`](crate::Dispatcher); the [`Mailer`] is handed to producers.
pub fn mail_queue(capacity: usize, config: SharedConfig) -> (Mailer, mpsc::Receiver<MailMessage>) {
    let (intake_tx, intake_rx) = mpsc::channel(capacity.max(1));
    (Mailer { intake_tx, config }, intake_rx)
}

/// Submission handle for outbound mail.
#[derive(Debug, Clone)]
pub struct Mailer {
    intake_tx: mpsc::Sender<MailMessage>,
    config: SharedConfig,
}

impl Mailer {
    /// Queue one message for delivery.
    ///
    /// A message without a sender gets the configured default sender before
    /// it reaches the queue. Blocks only while the intake queue is full.
    pub async fn submit(&self, mut message: MailMessage) -> Result<(), SubmitError> {
        if message.from_address.is_empty() {
            let config = self.config.snapshot();
            message.from_address = config.from_address.clone();
            message.from_name = config.from_name.clone();
        }

        self.intake_tx
            .send(message)
            .await
            .map_err(|mpsc::error::SendError(message)| SubmitError(message))
    }
}
