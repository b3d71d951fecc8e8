//! Matches queued messages to available workers.
//!
//! The dispatcher owns the intake receiver and the registration channel.
//! Each message is paired with a worker in its own short-lived hand-off
//! task, so a slow pairing never stalls intake; pending hand-offs simply
//! accumulate until workers free up.

use std::sync::Arc;

use courier_common::types::MailMessage;
use tokio::sync::{Mutex, mpsc};

use crate::processor::MailProcessor;
use crate::worker::{JobSender, Worker, WorkerHandle};

pub struct Dispatcher {
    intake_rx: mpsc::Receiver<MailMessage>,
    pool_tx: mpsc::Sender<JobSender>,
    pool_rx: mpsc::Receiver<JobSender>,
    pool_size: usize,
}

/// Handles to the running pool, returned by [`Dispatcher::run`].
pub struct PoolHandle {
    workers: Vec<WorkerHandle>,
}

impl PoolHandle {
    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Ask every worker to stop. In-flight messages still complete.
    pub fn stop(&self) {
        for worker in &self.workers {
            worker.stop();
        }
    }
}

impl Dispatcher {
    /// Registration capacity equals the pool size, so every worker can hold
    /// an outstanding availability token without blocking.
    pub fn new(intake_rx: mpsc::Receiver<MailMessage>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        let (pool_tx, pool_rx) = mpsc::channel(pool_size);
        Self {
            intake_rx,
            pool_tx,
            pool_rx,
            pool_size,
        }
    }

    /// Spawn the workers and the matching loop, then return control handles.
    ///
    /// The matching loop runs until the intake queue closes. Dispatch never
    /// returns an error: as long as the process runs and a worker is alive,
    /// every message is eventually handed off.
    pub fn run(self, processor: Arc<MailProcessor>) -> PoolHandle {
        let mut workers = Vec::with_capacity(self.pool_size);
        for id in 1..=self.pool_size {
            let (worker, handle) = Worker::new(id, self.pool_tx.clone(), processor.clone());
            let _ = worker.start();
            workers.push(handle);
        }
        tracing::info!(pool_size = self.pool_size, "Mail worker pool started");

        // Hand-off tasks share the registration receiver behind a mutex;
        // whichever task holds it consumes the next token to become
        // available. Worker selection is therefore not FIFO-fair.
        let pool_rx = Arc::new(Mutex::new(self.pool_rx));
        let mut intake_rx = self.intake_rx;

        tokio::spawn(async move {
            while let Some(message) = intake_rx.recv().await {
                let pool_rx = Arc::clone(&pool_rx);
                tokio::spawn(async move {
                    let token = pool_rx.lock().await.recv().await;
                    match token {
                        Some(job_tx) => {
                            if let Err(e) = job_tx.send(message).await {
                                tracing::warn!(
                                    to = %e.0.to_address,
                                    "Worker went away before hand-off, message dropped"
                                );
                            }
                        }
                        None => {
                            tracing::warn!(
                                to = %message.to_address,
                                "No workers left, message dropped"
                            );
                        }
                    }
                });
            }
            tracing::info!("Intake queue closed, dispatcher exiting");
        });

        PoolHandle { workers }
    }
}
