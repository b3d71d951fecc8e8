//! Long-lived worker task.
//!
//! A worker advertises availability by putting its private job sender onto
//! the shared registration channel, then blocks for exactly one message.
//! After processing it re-registers, so at most one availability token per
//! worker is ever outstanding.

use std::sync::Arc;

use courier_common::types::MailMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::processor::MailProcessor;

/// A worker's private job sender, published as its availability token.
pub type JobSender = mpsc::Sender<MailMessage>;

pub struct Worker {
    id: usize,
    job_tx: JobSender,
    job_rx: mpsc::Receiver<MailMessage>,
    pool_tx: mpsc::Sender<JobSender>,
    quit_rx: mpsc::Receiver<()>,
    processor: Arc<MailProcessor>,
}

/// External control for a running worker. Dropping the handle does not stop
/// the worker; only [`stop`](WorkerHandle::stop) does.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: usize,
    quit_tx: mpsc::Sender<()>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Ask the worker to stop accepting work. Asynchronous: never waits for
    /// an acknowledgement and never interrupts a message already being
    /// processed; the worker observes the signal at its next idle point.
    pub fn stop(&self) {
        let _ = self.quit_tx.try_send(());
    }
}

impl Worker {
    pub fn new(
        id: usize,
        pool_tx: mpsc::Sender<JobSender>,
        processor: Arc<MailProcessor>,
    ) -> (Self, WorkerHandle) {
        // Capacity 1: the worker accepts exactly one message per idle cycle.
        let (job_tx, job_rx) = mpsc::channel(1);
        let (quit_tx, quit_rx) = mpsc::channel(1);

        let worker = Self {
            id,
            job_tx,
            job_rx,
            pool_tx,
            quit_rx,
            processor,
        };
        (worker, WorkerHandle { id, quit_tx })
    }

    /// Spawn the worker loop: register, wait for one message, process,
    /// repeat. Exits on a stop signal or when the registration channel is
    /// gone.
    pub fn start(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.pool_tx.send(self.job_tx.clone()).await.is_err() {
                    tracing::warn!(worker = self.id, "Registration channel closed, worker exiting");
                    break;
                }

                tokio::select! {
                    message = self.job_rx.recv() => match message {
                        Some(message) => self.processor.process(message).await,
                        None => break,
                    },
                    _ = self.quit_rx.recv() => {
                        tracing::info!(worker = self.id, "Worker stopping");
                        break;
                    }
                }
            }
        })
    }
}
