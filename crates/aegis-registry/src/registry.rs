//! The order registry.
//!
//! Exclusive owner of every [`OrderRecord`] and [`BracketGroup`] in the
//! session. The registry is synchronous; the dispatcher drives it from the
//! reconciliation loop and executes whatever [`FollowUp`] work a state
//! change produces (submitting newly activated legs, requesting venue
//! cancels).
//!
//! Locking discipline: records live in sharded maps and the registry never
//! holds two record guards at once. Cross-order effects (bracket cascades,
//! one-cancels-other) first copy the group's identifier list out, then visit
//! each record in turn.
//!
//! Anomalous venue events (unknown identifier, terminal order, impossible
//! transition, overfill) are logged and dropped. They never mutate state and
//! never panic.

use std::sync::Arc;

use aegis_core::{
    AuditEvent, AuditKind, AuditSink, FillEvent, GroupId, OrderChanges, OrderId, OrderStatus,
    RejectReason, VenueEvent,
};
use aegis_telemetry::Metrics;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bracket::{BracketGroup, LegRole};
use crate::record::{FillProgress, ModifyTicket, OrderRecord};

/// Registry behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Activate protective legs on the entry's first partial fill instead
    /// of waiting for the complete fill.
    #[serde(default = "default_activate_on_partial_fill")]
    pub activate_on_partial_fill: bool,
}

fn default_activate_on_partial_fill() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            activate_on_partial_fill: default_activate_on_partial_fill(),
        }
    }
}

/// Venue-side work requested by a registry state change.
///
/// The registry records the decision; the dispatcher performs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Submit a protective leg that just left `PendingActivation`.
    SubmitLeg(OrderId),
    /// Ask the venue to cancel an order it is working.
    RequestCancel(OrderId),
}

/// Outcome of a caller-initiated cancel.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    /// The order was already terminal. Idempotent success.
    AlreadyTerminal(OrderRecord),
    /// The order had not reached the venue and was cancelled locally.
    CancelledLocally(OrderRecord),
    /// A venue cancel was requested; the order keeps its current status
    /// until the venue confirms the cancellation.
    VenueCancelRequested(OrderRecord),
}

impl CancelOutcome {
    /// The record snapshot carried by any outcome.
    #[must_use]
    pub fn record(&self) -> &OrderRecord {
        match self {
            Self::AlreadyTerminal(r) | Self::CancelledLocally(r) | Self::VenueCancelRequested(r) => {
                r
            }
        }
    }
}

/// Snapshot of all three legs of a bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketSnapshot {
    pub group_id: GroupId,
    pub entry: OrderRecord,
    pub stop: OrderRecord,
    pub target: OrderRecord,
}

/// Session-wide order and group state.
pub struct OrderRegistry {
    orders: DashMap<OrderId, OrderRecord>,
    groups: DashMap<GroupId, BracketGroup>,
    modifies: DashMap<OrderId, ModifyTicket>,
    config: RegistryConfig,
    audit: Arc<dyn AuditSink>,
}

impl OrderRegistry {
    pub fn new(config: RegistryConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            orders: DashMap::new(),
            groups: DashMap::new(),
            modifies: DashMap::new(),
            config,
            audit,
        }
    }

    // ========================================================
    // Registration
    // ========================================================

    /// Track a standalone order. Returns the record unchanged.
    pub fn insert_order(&self, record: OrderRecord) -> OrderRecord {
        debug!(order_id = %record.id, status = %record.status, "order registered");
        self.orders.insert(record.id.clone(), record.clone());
        record
    }

    /// Track a bracket: the group plus its three leg records.
    pub fn insert_bracket(
        &self,
        group: BracketGroup,
        entry: OrderRecord,
        stop: OrderRecord,
        target: OrderRecord,
    ) -> BracketSnapshot {
        debug_assert_eq!(group.entry, entry.id);
        debug_assert_eq!(group.stop, stop.id);
        debug_assert_eq!(group.target, target.id);
        debug!(
            group_id = %group.id,
            entry = %entry.id,
            stop = %stop.id,
            target = %target.id,
            "bracket registered"
        );
        let snapshot = BracketSnapshot {
            group_id: group.id.clone(),
            entry: entry.clone(),
            stop: stop.clone(),
            target: target.clone(),
        };
        self.orders.insert(entry.id.clone(), entry);
        self.orders.insert(stop.id.clone(), stop);
        self.orders.insert(target.id.clone(), target);
        self.groups.insert(group.id.clone(), group);
        snapshot
    }

    // ========================================================
    // Queries
    // ========================================================

    /// Snapshot of one order.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<OrderRecord> {
        self.orders.get(order_id).map(|r| r.clone())
    }

    /// Snapshot of one order, or `UnknownOrder`.
    pub fn require(&self, order_id: &OrderId) -> Result<OrderRecord, RejectReason> {
        self.get(order_id).ok_or_else(|| RejectReason::UnknownOrder {
            order_id: order_id.clone(),
        })
    }

    /// Snapshot of a bracket group and all three legs.
    pub fn group(&self, group_id: &GroupId) -> Result<BracketSnapshot, RejectReason> {
        let group = self
            .groups
            .get(group_id)
            .map(|g| g.clone())
            .ok_or_else(|| RejectReason::UnknownGroup {
                group_id: group_id.clone(),
            })?;
        Ok(BracketSnapshot {
            group_id: group.id.clone(),
            entry: self.require(&group.entry)?,
            stop: self.require(&group.stop)?,
            target: self.require(&group.target)?,
        })
    }

    /// All non-terminal orders, oldest first.
    #[must_use]
    pub fn list_open(&self) -> Vec<OrderRecord> {
        let mut open: Vec<OrderRecord> = self
            .orders
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| r.clone())
            .collect();
        open.sort_by_key(|r| r.created_at);
        open
    }

    /// All live protective stops (standalone and bracket stop legs),
    /// oldest first.
    #[must_use]
    pub fn list_active_stops(&self) -> Vec<OrderRecord> {
        let mut stops: Vec<OrderRecord> = self
            .orders
            .iter()
            .filter(|r| r.is_active_risk_order())
            .map(|r| r.clone())
            .collect();
        stops.sort_by_key(|r| r.created_at);
        stops
    }

    /// Count of live protective stops, for the validator's risk cap.
    #[must_use]
    pub fn active_risk_order_count(&self) -> u32 {
        self.orders
            .iter()
            .filter(|r| r.is_active_risk_order())
            .count() as u32
    }

    /// Total tracked orders, terminal included.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Non-terminal order count.
    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.orders.iter().filter(|r| !r.is_terminal()).count()
    }

    // ========================================================
    // Dispatch lifecycle
    // ========================================================

    /// Record that the dispatcher handed the order to the venue.
    pub fn mark_submitted(&self, order_id: &OrderId) {
        if let Some(record) = self.orders.get(order_id) {
            self.audit.record(AuditEvent::order(
                AuditKind::Submitted,
                order_id,
                format!("submitted to venue: {}", record.intent.summary()),
            ));
        }
    }

    /// The venue acknowledged a submission.
    pub fn on_venue_accepted(&self, order_id: &OrderId, venue_id: &str) {
        let Some(mut record) = self.orders.get_mut(order_id) else {
            self.anomaly(order_id, "venue ack for unknown order");
            return;
        };
        if !record.try_transition(OrderStatus::Working) {
            self.anomaly_status(order_id, record.status, "venue ack");
            return;
        }
        record.set_venue_id(venue_id);
        info!(order_id = %order_id, venue_id = %venue_id, "order working at venue");
        self.audit.record(AuditEvent::order(
            AuditKind::Accepted,
            order_id,
            format!("acknowledged by venue as {venue_id}"),
        ));
    }

    /// The submission failed before the venue accepted it (venue refusal or
    /// connectivity timeout). Marks the order `Rejected` and cascades to
    /// bracket siblings when the entry died.
    pub fn on_submit_rejected(
        &self,
        order_id: &OrderId,
        reason: &RejectReason,
    ) -> Vec<FollowUp> {
        let cascade_from = {
            let Some(mut record) = self.orders.get_mut(order_id) else {
                self.anomaly(order_id, "submit rejection for unknown order");
                return Vec::new();
            };
            if !record.try_transition(OrderStatus::Rejected) {
                self.anomaly_status(order_id, record.status, "submit rejection");
                return Vec::new();
            }
            record.note(reason.to_string());
            warn!(order_id = %order_id, code = reason.code(), "submission failed: {reason}");
            self.audit.record(
                AuditEvent::order(AuditKind::Rejected, order_id, reason.to_string())
                    .with_code(reason.code()),
            );
            entry_group(&record)
        };
        match cascade_from {
            Some(group_id) => self.cascade_protective(&group_id, "entry submission failed"),
            None => Vec::new(),
        }
    }

    /// Apply one venue event from the reconciliation loop.
    pub fn apply_event(&self, event: &VenueEvent) -> Vec<FollowUp> {
        match event {
            VenueEvent::Fill(fill) => self.on_fill(fill),
            VenueEvent::Cancelled { order_id, .. } => self.on_venue_cancelled(order_id),
            VenueEvent::Expired { order_id, .. } => self.on_expired(order_id),
            VenueEvent::Rejected {
                order_id, reason, ..
            } => self.on_venue_rejected(order_id, reason),
        }
    }

    fn on_fill(&self, fill: &FillEvent) -> Vec<FollowUp> {
        let (progress, group_id, role) = {
            let Some(mut record) = self.orders.get_mut(&fill.order_id) else {
                self.anomaly(&fill.order_id, "fill for unknown order");
                return Vec::new();
            };
            match record.apply_fill(fill.qty, fill.price) {
                Ok(progress) => {
                    let kind = match progress {
                        FillProgress::Partial => AuditKind::PartiallyFilled,
                        FillProgress::Complete => AuditKind::Filled,
                    };
                    info!(
                        order_id = %fill.order_id,
                        qty = %fill.qty,
                        price = %fill.price,
                        remaining = %record.remaining_qty(),
                        "fill applied"
                    );
                    self.audit.record(AuditEvent::order(
                        kind,
                        &fill.order_id,
                        format!(
                            "filled {} @ {}, {} remaining",
                            fill.qty,
                            fill.price,
                            record.remaining_qty()
                        ),
                    ));
                    (progress, record.group_id.clone(), record.role)
                }
                Err(anomaly) => {
                    Metrics::anomaly();
                    warn!(order_id = %fill.order_id, "{anomaly}, event dropped");
                    return Vec::new();
                }
            }
        };

        let (Some(group_id), Some(role)) = (group_id, role) else {
            return Vec::new();
        };
        match role {
            LegRole::Entry => {
                let activate = matches!(progress, FillProgress::Complete)
                    || self.config.activate_on_partial_fill;
                if activate {
                    self.activate_protective_legs(&group_id)
                } else {
                    Vec::new()
                }
            }
            LegRole::Stop | LegRole::Target => {
                if matches!(progress, FillProgress::Complete) {
                    self.resolve_oco(&group_id, &fill.order_id)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn on_venue_cancelled(&self, order_id: &OrderId) -> Vec<FollowUp> {
        let cascade_from = {
            let Some(mut record) = self.orders.get_mut(order_id) else {
                self.anomaly(order_id, "cancel confirmation for unknown order");
                return Vec::new();
            };
            if record.is_terminal() {
                // Normal race: locally cancelled leg, venue confirms later.
                debug!(order_id = %order_id, status = %record.status, "late cancel event on terminal order, dropped");
                return Vec::new();
            }
            if !record.try_transition(OrderStatus::Cancelled) {
                self.anomaly_status(order_id, record.status, "cancel confirmation");
                return Vec::new();
            }
            info!(order_id = %order_id, "order cancelled");
            self.audit.record(AuditEvent::order(
                AuditKind::Cancelled,
                order_id,
                "cancellation confirmed by venue",
            ));
            entry_group(&record)
        };
        match cascade_from {
            Some(group_id) => self.cascade_protective(&group_id, "entry cancelled"),
            None => Vec::new(),
        }
    }

    fn on_expired(&self, order_id: &OrderId) -> Vec<FollowUp> {
        let cascade_from = {
            let Some(mut record) = self.orders.get_mut(order_id) else {
                self.anomaly(order_id, "expiry for unknown order");
                return Vec::new();
            };
            if !record.try_transition(OrderStatus::Expired) {
                self.anomaly_status(order_id, record.status, "expiry");
                return Vec::new();
            }
            info!(order_id = %order_id, "order expired");
            self.audit.record(AuditEvent::order(
                AuditKind::Expired,
                order_id,
                "expired at venue without completing",
            ));
            // An entry that expired with a partial fill leaves its
            // protective legs working; there is a live position to protect.
            if record.filled_qty.is_zero() {
                entry_group(&record)
            } else {
                None
            }
        };
        match cascade_from {
            Some(group_id) => self.cascade_protective(&group_id, "entry expired unfilled"),
            None => Vec::new(),
        }
    }

    fn on_venue_rejected(&self, order_id: &OrderId, reason: &str) -> Vec<FollowUp> {
        self.on_submit_rejected(
            order_id,
            &RejectReason::VenueRejected {
                reason: reason.to_string(),
            },
        )
    }

    // ========================================================
    // Caller-initiated cancel
    // ========================================================

    /// Cancel an order on the caller's behalf.
    ///
    /// Terminal orders return `AlreadyTerminal` (idempotent). Orders that
    /// never reached the venue are cancelled locally; working orders produce
    /// a venue cancel request and keep their status until confirmation.
    pub fn request_cancel(
        &self,
        order_id: &OrderId,
    ) -> Result<(CancelOutcome, Vec<FollowUp>), RejectReason> {
        let (outcome, follow_ups, cascade_from) = {
            let mut record = self
                .orders
                .get_mut(order_id)
                .ok_or_else(|| RejectReason::UnknownOrder {
                    order_id: order_id.clone(),
                })?;

            if record.is_terminal() {
                return Ok((CancelOutcome::AlreadyTerminal(record.clone()), Vec::new()));
            }
            if !record.status.is_cancellable() {
                return Err(RejectReason::NotCancellable {
                    order_id: order_id.clone(),
                    status: record.status,
                });
            }

            match record.status {
                OrderStatus::PendingActivation => {
                    record.try_transition(OrderStatus::Cancelled);
                    record.note("cancelled before activation");
                    info!(order_id = %order_id, "inactive leg cancelled locally");
                    self.audit.record(AuditEvent::order(
                        AuditKind::Cancelled,
                        order_id,
                        "cancelled before reaching the venue",
                    ));
                    (
                        CancelOutcome::CancelledLocally(record.clone()),
                        Vec::new(),
                        entry_group(&record),
                    )
                }
                _ => {
                    self.audit.record(AuditEvent::order(
                        AuditKind::CancelRequested,
                        order_id,
                        "cancel requested by caller",
                    ));
                    (
                        CancelOutcome::VenueCancelRequested(record.clone()),
                        vec![FollowUp::RequestCancel(order_id.clone())],
                        None,
                    )
                }
            }
        };
        let mut all = follow_ups;
        if let Some(group_id) = cascade_from {
            all.extend(self.cascade_protective(&group_id, "entry cancelled"));
        }
        Ok((outcome, all))
    }

    // ========================================================
    // Modification
    // ========================================================

    /// Move a modifiable order into `PendingModify` and remember how to
    /// finish the ticket.
    pub fn begin_modify(
        &self,
        order_id: &OrderId,
        changes: OrderChanges,
    ) -> Result<OrderRecord, RejectReason> {
        let mut record = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| RejectReason::UnknownOrder {
                order_id: order_id.clone(),
            })?;
        if !record.status.is_modifiable() {
            return Err(RejectReason::NotModifiable {
                order_id: order_id.clone(),
                status: record.status,
            });
        }
        let ticket = ModifyTicket::new(order_id.clone(), record.status, changes);
        record.try_transition(OrderStatus::PendingModify);
        debug!(order_id = %order_id, "modification pending at venue");
        self.modifies.insert(order_id.clone(), ticket);
        Ok(record.clone())
    }

    /// The venue accepted the modification: apply the changes and restore
    /// the pre-modify status.
    pub fn complete_modify(&self, order_id: &OrderId) -> Option<OrderRecord> {
        let Some((_, ticket)) = self.modifies.remove(order_id) else {
            self.anomaly(order_id, "modify completion without ticket");
            return None;
        };
        let Some(mut record) = self.orders.get_mut(order_id) else {
            self.anomaly(order_id, "modify completion for unknown order");
            return None;
        };
        if record.is_terminal() {
            warn!(order_id = %order_id, status = %record.status, "order went terminal during modify, changes discarded");
            return Some(record.clone());
        }
        record.apply_changes(&ticket.changes);
        record.try_transition(ticket.prior_status);
        info!(order_id = %order_id, "modification applied");
        self.audit.record(AuditEvent::order(
            AuditKind::Modified,
            order_id,
            "modification accepted by venue",
        ));
        Some(record.clone())
    }

    /// The venue refused the modification: restore the pre-modify status
    /// and discard the ticket. The order itself is untouched.
    pub fn fail_modify(&self, order_id: &OrderId, reason: &RejectReason) -> Option<OrderRecord> {
        let Some((_, ticket)) = self.modifies.remove(order_id) else {
            self.anomaly(order_id, "modify failure without ticket");
            return None;
        };
        let Some(mut record) = self.orders.get_mut(order_id) else {
            self.anomaly(order_id, "modify failure for unknown order");
            return None;
        };
        if !record.is_terminal() {
            record.try_transition(ticket.prior_status);
        }
        warn!(order_id = %order_id, code = reason.code(), "modification refused: {reason}");
        self.audit.record(
            AuditEvent::order(AuditKind::ModifyRejected, order_id, reason.to_string())
                .with_code(reason.code()),
        );
        Some(record.clone())
    }

    // ========================================================
    // Bracket internals
    // ========================================================

    /// Move `PendingActivation` legs to `PendingSubmit` and hand them to
    /// the dispatcher. Idempotent: already-activated legs are skipped.
    fn activate_protective_legs(&self, group_id: &GroupId) -> Vec<FollowUp> {
        let Some(group) = self.groups.get(group_id).map(|g| g.clone()) else {
            warn!(group_id = %group_id, "fill referenced unknown bracket group");
            return Vec::new();
        };
        let mut follow_ups = Vec::new();
        for leg_id in group.protective_legs() {
            let Some(mut leg) = self.orders.get_mut(&leg_id) else {
                continue;
            };
            if leg.status == OrderStatus::PendingActivation
                && leg.try_transition(OrderStatus::PendingSubmit)
            {
                debug!(order_id = %leg_id, group_id = %group_id, "protective leg activated");
                follow_ups.push(FollowUp::SubmitLeg(leg_id.clone()));
            }
        }
        follow_ups
    }

    /// One protective leg filled completely: cancel the other.
    fn resolve_oco(&self, group_id: &GroupId, filled_leg: &OrderId) -> Vec<FollowUp> {
        let Some(group) = self.groups.get(group_id).map(|g| g.clone()) else {
            warn!(group_id = %group_id, "fill referenced unknown bracket group");
            return Vec::new();
        };
        let Some(sibling_id) = group.oco_sibling(filled_leg) else {
            return Vec::new();
        };
        self.cancel_sibling(&sibling_id, "one-cancels-other")
    }

    /// Cancel every protective leg of a group after its entry died.
    fn cascade_protective(&self, group_id: &GroupId, origin: &str) -> Vec<FollowUp> {
        let Some(group) = self.groups.get(group_id).map(|g| g.clone()) else {
            return Vec::new();
        };
        let mut follow_ups = Vec::new();
        for leg_id in group.protective_legs() {
            follow_ups.extend(self.cancel_sibling(&leg_id, origin));
        }
        follow_ups
    }

    fn cancel_sibling(&self, order_id: &OrderId, origin: &str) -> Vec<FollowUp> {
        let Some(mut record) = self.orders.get_mut(order_id) else {
            return Vec::new();
        };
        match record.status {
            OrderStatus::PendingActivation | OrderStatus::PendingSubmit => {
                record.try_transition(OrderStatus::Cancelled);
                record.note(origin);
                info!(order_id = %order_id, origin, "sibling leg cancelled locally");
                self.audit.record(AuditEvent::order(
                    AuditKind::Cancelled,
                    order_id,
                    format!("cancelled locally: {origin}"),
                ));
                Vec::new()
            }
            OrderStatus::Working | OrderStatus::PartiallyFilled | OrderStatus::PendingModify => {
                info!(order_id = %order_id, origin, "sibling leg cancel requested at venue");
                self.audit.record(AuditEvent::order(
                    AuditKind::CancelRequested,
                    order_id,
                    format!("cancel requested: {origin}"),
                ));
                vec![FollowUp::RequestCancel(order_id.clone())]
            }
            _ => Vec::new(),
        }
    }

    // ========================================================
    // Anomaly logging
    // ========================================================

    fn anomaly(&self, order_id: &OrderId, what: &str) {
        Metrics::anomaly();
        warn!(order_id = %order_id, "{what}, event dropped");
    }

    fn anomaly_status(&self, order_id: &OrderId, status: OrderStatus, what: &str) {
        Metrics::anomaly();
        warn!(order_id = %order_id, status = %status, "{what} not applicable in current status, event dropped");
    }
}

/// Group identifier when (and only when) the record is a bracket entry.
fn entry_group(record: &OrderRecord) -> Option<GroupId> {
    if record.role == Some(LegRole::Entry) {
        record.group_id.clone()
    } else {
        None
    }
}
