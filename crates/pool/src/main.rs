use std::sync::Arc;

use courier_common::config::{DeliveryConfig, SharedConfig};
use courier_pool::{Dispatcher, MailProcessor, SmtpMailer, mail_queue};
use courier_render::load_templates;

/// Pool size used when COURIER_POOL_SIZE is unset.
const DEFAULT_POOL_SIZE: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_pool=info,courier_render=info".into()),
        )
        .init();

    tracing::info!("Courier mail pool starting...");

    // Load configuration
    let config = SharedConfig::new(DeliveryConfig::from_env()?);

    let pool_size = match std::env::var("COURIER_POOL_SIZE") {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("COURIER_POOL_SIZE must be a valid usize"))?,
        Err(_) => DEFAULT_POOL_SIZE,
    };

    let templates_dir =
        std::env::var("COURIER_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    let templates = Arc::new(load_templates(&templates_dir)?);

    // Intake queue and worker pool
    let (mailer, intake_rx) = mail_queue(pool_size, config.clone());
    let processor = Arc::new(MailProcessor::new(
        config,
        templates,
        Arc::new(SmtpMailer::new()),
    ));
    let pool = Dispatcher::new(intake_rx, pool_size).run(processor);

    tracing::info!(pool_size, "Courier ready, accepting mail");

    // Producers would clone `mailer` from here; the daemon itself just waits
    // for shutdown.
    let _mailer = mailer;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping workers...");
    pool.stop();

    tracing::info!("Courier mail pool stopped.");
    Ok(())
}
