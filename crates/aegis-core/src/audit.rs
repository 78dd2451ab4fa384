//! Audit events and the audit sink port.
//!
//! Every validation decision and every lifecycle transition produces one
//! `AuditEvent`. The sink is fire-and-forget: implementations must not
//! block or fail the calling path. If a sink cannot keep up it drops and
//! accounts for the loss; the engine never waits on it.

use crate::order::{GroupId, OrderId};
use crate::reject::RejectReason;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of decision or transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Validation passed.
    Validated,
    /// Validation or dispatch refused the request.
    Rejected,
    /// Order handed to the venue connector.
    Submitted,
    /// Venue acknowledged the order as working.
    Accepted,
    /// Partial fill applied.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Cancellation requested (outcome arrives asynchronously).
    CancelRequested,
    /// Cancellation confirmed.
    Cancelled,
    /// Modification acknowledged and applied.
    Modified,
    /// Modification refused; order restored unchanged.
    ModifyRejected,
    /// Order expired at the venue.
    Expired,
    /// Kill switch activated.
    KillSwitchActivated,
    /// Kill switch deactivated with a valid override.
    KillSwitchDeactivated,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::CancelRequested => "cancel_requested",
            Self::Cancelled => "cancelled",
            Self::Modified => "modified",
            Self::ModifyRejected => "modify_rejected",
            Self::Expired => "expired",
            Self::KillSwitchActivated => "kill_switch_activated",
            Self::KillSwitchDeactivated => "kill_switch_deactivated",
        };
        write!(f, "{s}")
    }
}

/// What the event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubject {
    /// A registered order.
    Order(OrderId),
    /// A bracket group as a whole.
    Group(GroupId),
    /// An intent that was rejected before any record existed.
    Intent(String),
    /// Engine-level events (kill switch).
    System,
}

impl fmt::Display for AuditSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => write!(f, "order:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
            Self::Intent(summary) => write!(f, "intent:{summary}"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Immutable record of one decision or transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the decision was made.
    pub at: DateTime<Utc>,
    /// Decision or transition kind.
    pub kind: AuditKind,
    /// Subject of the event.
    pub subject: AuditSubject,
    /// Machine-readable reason code, for rejections.
    pub code: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, subject: AuditSubject, detail: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            subject,
            code: None,
            detail: detail.into(),
        }
    }

    /// Event about a registered order.
    pub fn order(kind: AuditKind, order_id: &OrderId, detail: impl Into<String>) -> Self {
        Self::new(kind, AuditSubject::Order(order_id.clone()), detail)
    }

    /// Event about a bracket group.
    pub fn group(kind: AuditKind, group_id: &GroupId, detail: impl Into<String>) -> Self {
        Self::new(kind, AuditSubject::Group(group_id.clone()), detail)
    }

    /// Engine-level event.
    pub fn system(kind: AuditKind, detail: impl Into<String>) -> Self {
        Self::new(kind, AuditSubject::System, detail)
    }

    /// Rejection event carrying the taxonomy code.
    pub fn rejection(subject: AuditSubject, reason: &RejectReason) -> Self {
        Self {
            at: Utc::now(),
            kind: AuditKind::Rejected,
            subject,
            code: Some(reason.code().to_string()),
            detail: reason.to_string(),
        }
    }

    /// Attach a reason code to a non-rejection event.
    #[must_use]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code.to_string());
        self
    }
}

/// Port for the external audit sink.
///
/// `record` must return promptly and must never panic; the engine proceeds
/// regardless of sink health.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Sink that retains events in memory. Used by tests and by embedders that
/// drain the trail themselves.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Count of events of one kind.
    pub fn count(&self, kind: AuditKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that discards everything.
#[derive(Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_retains_order() {
        let sink = MemoryAuditSink::new();
        let id = OrderId::new();

        sink.record(AuditEvent::order(AuditKind::Validated, &id, "ok"));
        sink.record(AuditEvent::order(AuditKind::Submitted, &id, "sent"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, AuditKind::Validated);
        assert_eq!(events[1].kind, AuditKind::Submitted);
        assert_eq!(sink.count(AuditKind::Submitted), 1);
    }

    #[test]
    fn test_rejection_event_carries_code() {
        let reason = RejectReason::TradingDisabled;
        let event = AuditEvent::rejection(AuditSubject::Intent("buy 1 AAPL market".into()), &reason);

        assert_eq!(event.kind, AuditKind::Rejected);
        assert_eq!(event.code.as_deref(), Some("trading_disabled"));
        assert_eq!(event.detail, "trading is disabled by policy");
    }

    #[test]
    fn test_subject_display() {
        assert_eq!(AuditSubject::System.to_string(), "system");
        let id = OrderId::from_string("ord_1_abc".into());
        assert_eq!(AuditSubject::Order(id).to_string(), "order:ord_1_abc");
    }
}
