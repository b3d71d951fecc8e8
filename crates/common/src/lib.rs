pub mod config;
pub mod types;

pub use config::{AuthMode, DeliveryConfig, SharedConfig};
pub use types::MailMessage;
