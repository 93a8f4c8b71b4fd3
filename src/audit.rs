//! Audit trail: one structured event per provider attempt (and per policy
//! denial), delivered to a background writer over an unbounded channel so the
//! request path never blocks on I/O.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Event shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Ok,
    Error,
    Denied,
}

/// A single audit record, serialized as one JSON line.
///
/// `attempt` is the 1-based position in the fallback chain; policy denials
/// that happen before any provider is chosen use attempt 0. Snapshots carry
/// redacted content only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub ts_ms: i64,
    pub request_id: String,
    pub tenant_id: String,
    pub route: String,
    pub config_version: String,
    pub provider: String,
    pub model: String,
    pub attempt: u32,
    pub fallback_used: bool,
    pub status: AuditStatus,
    pub latency_ms: u64,
    pub request_redacted: serde_json::Value,
    pub response_redacted: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Sink + writer task
// ---------------------------------------------------------------------------

/// Fire-and-forget emitter held by the gateway. Cloning is cheap; all clones
/// feed the same writer task.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. A closed channel (writer task gone) is logged, not
    /// propagated: audit loss must never fail the request.
    pub fn emit(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Audit channel closed, event dropped");
        }
    }
}

/// Drain the audit channel into `writer` as JSON Lines until every sender is
/// dropped, then flush.
pub fn spawn_audit_writer<W>(
    mut rx: mpsc::UnboundedReceiver<AuditEvent>,
    mut writer: W,
) -> tokio::task::JoinHandle<()>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    if let Err(e) = writeln!(writer, "{line}") {
                        tracing::error!(error = %e, "Failed to write audit event");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize audit event"),
            }
        }
        if let Err(e) = writer.flush() {
            tracing::error!(error = %e, "Failed to flush audit log");
        }
    })
}
