//! Audit sink implementations backed by tracing and channels.
//!
//! Both sinks honor the port contract: `record` returns promptly, never
//! blocks, and never fails the calling path. The channel sink drops on
//! overflow and accounts for the loss.

use aegis_core::{AuditEvent, AuditKind, AuditSink};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::metrics::Metrics;

/// Writes each audit event as one structured log line under the `audit`
/// target. Rejections and modify refusals log at WARN, everything else at
/// INFO.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let code = event.code.as_deref().unwrap_or("");
        match event.kind {
            AuditKind::Rejected | AuditKind::ModifyRejected => {
                warn!(
                    target: "audit",
                    kind = %event.kind,
                    subject = %event.subject,
                    code,
                    at = %event.at,
                    "{}",
                    event.detail
                );
            }
            _ => {
                info!(
                    target: "audit",
                    kind = %event.kind,
                    subject = %event.subject,
                    code,
                    at = %event.at,
                    "{}",
                    event.detail
                );
            }
        }
    }
}

/// Forwards audit events into a bounded channel for an external consumer
/// (a persister, a UI feed). When the consumer falls behind, events are
/// dropped and counted rather than stalling the engine.
pub struct ChannelAuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Create the sink and the receiving end the consumer drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Err(err) = self.tx.try_send(event) {
            Metrics::audit_dropped();
            warn!("audit event dropped, sink channel unavailable: {err}");
        }
    }
}
