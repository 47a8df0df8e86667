//! Notification dispatch contract.
//!
//! The engine only decides *that* and *what* to notify; delivery transport
//! is owned by an external service behind the [`Notifier`] trait. Dispatch
//! is fire-and-forget: failures are logged and swallowed, never propagated
//! into the operation that triggered them.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::db::models::MatchRecord;

/// Outbound delivery seam. Implementations must not block the caller beyond
/// ordinary I/O and must treat every send as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default impl: records the would-be delivery in the log stream only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        info!(recipient, subject, "queued outbound notification");
        Ok(())
    }
}

/// A message captured by [`MemoryNotifier`].
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Captures every send in memory instead of delivering it. Used by tests
/// and dry runs to observe exactly what would have gone out.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    outbox: Mutex<Vec<OutboundMessage>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().expect("outbox lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .push(OutboundMessage {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// Send one message if the recipient is known; log and swallow any failure.
pub(crate) async fn dispatch(
    notifier: &dyn Notifier,
    recipient: Option<&str>,
    subject: &str,
    body: String,
) {
    let Some(recipient) = recipient else {
        return;
    };
    if let Err(err) = notifier.send(recipient, subject, &body).await {
        warn!(recipient, subject, "notification dispatch failed: {err:#}");
    }
}

// ============================================================================
// Message templates
// ============================================================================

pub mod subject {
    /// To the loster, when a new found report matched their open lost report.
    pub const LOST_ITEM_MAYBE_FOUND: &str = "Good News! Your Lost Item May Have Been Found";
    /// To the founder, when their new found report matched an open lost report.
    pub const FOUND_REPORT_MAY_HELP: &str = "Thank You! Your Found Item Report May Help Someone";
    /// To the loster, when their new lost report matched an existing found report.
    pub const MATCH_FOR_LOST_REPORT: &str = "Possible Match Found for Your Lost Item";
    /// To the founder, when a new lost report matched their open found report.
    pub const OWNER_LOCATED: &str = "Potential Owner Located for the Found Item";
    /// To the owner, once a claim is finalized.
    pub const RETURN_READY_OWNER: &str = "Your Item Is Ready for Handover";
    /// To the finder, once a claim is finalized.
    pub const RETURN_READY_FINDER: &str = "Handover Confirmed for the Item You Found";
}

fn contact_line(name: Option<&str>, phone: Option<&str>, email: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(name) = name {
        parts.push(name.to_string());
    }
    if let Some(email) = email {
        parts.push(email.to_string());
    }
    if let Some(phone) = phone {
        parts.push(phone.to_string());
    }
    if parts.is_empty() {
        "not provided".to_string()
    } else {
        parts.join(", ")
    }
}

pub(crate) fn found_report_to_loster_body(m: &MatchRecord) -> String {
    format!(
        "Someone reported finding an item whose serial number matches your lost item report.\n\
         Item: {} (serial {}).\n\
         Finder contact: {}.\n\
         If this is your item, you can claim the match to arrange the handover.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.founder_name.as_deref(),
            m.founder_phone.as_deref(),
            m.founder_email.as_deref()
        ),
    )
}

pub(crate) fn found_report_to_founder_body(m: &MatchRecord) -> String {
    format!(
        "The item you reported finding ({}, serial {}) matches an existing lost item report.\n\
         Owner contact: {}.\n\
         Thank you for reporting it — the owner has been notified.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.loster_name.as_deref(),
            m.loster_phone.as_deref(),
            m.loster_email.as_deref()
        ),
    )
}

pub(crate) fn lost_report_to_loster_body(m: &MatchRecord) -> String {
    format!(
        "An item matching the serial number of your lost item report was already reported found.\n\
         Item: {} (serial {}).\n\
         Finder contact: {}.\n\
         If this is your item, you can claim the match to arrange the handover.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.founder_name.as_deref(),
            m.founder_phone.as_deref(),
            m.founder_email.as_deref()
        ),
    )
}

pub(crate) fn lost_report_to_founder_body(m: &MatchRecord) -> String {
    format!(
        "A lost item report was just filed for the serial number of the item you found ({}, serial {}).\n\
         Owner contact: {}.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.loster_name.as_deref(),
            m.loster_phone.as_deref(),
            m.loster_email.as_deref()
        ),
    )
}

pub(crate) fn return_to_owner_body(m: &MatchRecord) -> String {
    format!(
        "The match for your item ({}, serial {}) is confirmed and the item is ready for handover.\n\
         Finder contact: {}.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.founder_name.as_deref(),
            m.founder_phone.as_deref(),
            m.founder_email.as_deref()
        ),
    )
}

pub(crate) fn return_to_finder_body(m: &MatchRecord) -> String {
    format!(
        "The item you found ({}, serial {}) is confirmed matched and its return has been recorded.\n\
         Owner contact: {}.",
        m.device_name,
        m.serial_number,
        contact_line(
            m.loster_name.as_deref(),
            m.loster_phone.as_deref(),
            m.loster_email.as_deref()
        ),
    )
}
