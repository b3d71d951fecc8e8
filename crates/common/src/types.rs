use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One unit of outbound mail work, immutable once enqueued.
///
/// `content` is an already-rendered HTML fragment that gets injected into the
/// selected template; the auxiliary maps are exposed to the template for
/// substitution. An empty `template` selects the process default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailMessage {
    /// Pre-rendered HTML fragment placed into the template body.
    pub content: String,
    /// Sender address; filled from configuration defaults when empty.
    pub from_address: String,
    /// Sender display name; filled together with the address.
    pub from_name: String,
    /// Primary recipient.
    pub to_address: String,
    pub subject: String,
    /// Extra recipients beyond the primary one.
    pub additional_to: Vec<String>,
    pub cc: Vec<String>,
    /// Paths of files to attach.
    pub attachments: Vec<PathBuf>,
    /// Template name; the empty string selects the default mail template.
    pub template: String,
    /// Auxiliary data handed to the template.
    pub string_map: HashMap<String, String>,
    pub int_map: HashMap<String, i64>,
    pub float_map: HashMap<String, f64>,
    /// Arbitrary row-set data (tables, lists) for the template.
    pub row_sets: HashMap<String, serde_json::Value>,
}

impl MailMessage {
    /// Convenience constructor for the common case: one recipient, default
    /// template, no auxiliary data.
    pub fn new(
        to_address: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to_address: to_address.into(),
            subject: subject.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}
