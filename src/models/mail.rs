//! Outgoing mail message

use serde::{Deserialize, Serialize};

/// A message handed to the mail queue. Delivery is the worker's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailData {
    pub to: String,
    pub from: String,
    pub subject: String,
    /// HTML body
    pub content: String,
    /// Template file wrapping `content`, if any
    pub template: Option<String>,
}
