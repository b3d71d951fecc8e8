use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Server name that selects plaintext authentication.
pub const LOCAL_SMTP_HOST: &str = "localhost";

/// SMTP authentication mechanism, derived from the configured server address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Plaintext auth, used only against the local loopback server.
    Plain,
    /// Login auth, used for every remote server.
    Login,
}

impl AuthMode {
    /// Pick the auth mechanism for a server address: plaintext for the local
    /// loopback name, login for everything else.
    pub fn for_host(host: &str) -> Self {
        if host == LOCAL_SMTP_HOST {
            AuthMode::Plain
        } else {
            AuthMode::Login
        }
    }
}

/// Delivery settings consulted by every worker at processing time.
///
/// Serializable so templates can read the whole snapshot under the stable
/// context key `preferences`.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryConfig {
    /// SMTP server hostname.
    pub smtp_host: String,

    /// SMTP server port, kept as the raw preference string. It is parsed when
    /// the client is built; an unparsable value falls back to port 0 instead
    /// of failing the message.
    pub smtp_port: String,

    /// Username for SMTP authentication.
    pub smtp_user: String,

    /// Password for SMTP authentication.
    pub smtp_password: String,

    /// Default sender address, applied when a message has none.
    pub from_address: String,

    /// Default sender display name, applied together with the address.
    pub from_name: String,
}

impl DeliveryConfig {
    /// Load delivery settings from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| LOCAL_SMTP_HOST.to_string()),
            smtp_port: std::env::var("SMTP_PORT").unwrap_or_else(|_| "587".to_string()),
            smtp_user: std::env::var("SMTP_USER").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_address: std::env::var("SMTP_FROM_EMAIL")
                .map_err(|_| anyhow::anyhow!("SMTP_FROM_EMAIL environment variable is required"))?,
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_default(),
        })
    }

    /// Auth mechanism for the configured server.
    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::for_host(&self.smtp_host)
    }
}

/// Shared, concurrency-safe view over the delivery configuration.
///
/// Workers take a cheap [`snapshot`](SharedConfig::snapshot) per processed
/// message; an administrative settings update calls
/// [`replace`](SharedConfig::replace) and is visible to every message
/// processed afterwards, without restarting the pool.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<DeliveryConfig>>>,
}

impl SharedConfig {
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration snapshot. The returned `Arc` stays valid even if
    /// the configuration is replaced while the message is in flight.
    pub fn snapshot(&self) -> Arc<DeliveryConfig> {
        Arc::clone(&self.inner.read().expect("delivery config lock poisoned"))
    }

    /// Swap in a new configuration. Messages already being processed keep
    /// their snapshot; later messages see the new values.
    pub fn replace(&self, config: DeliveryConfig) {
        *self.inner.write().expect("delivery config lock poisoned") = Arc::new(config);
    }
}
