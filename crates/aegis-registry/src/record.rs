//! Order records and fill accounting.
//!
//! An [`OrderRecord`] is the authoritative view of one order for the whole
//! session. Status changes go through [`OrderRecord::try_transition`] so the
//! lifecycle matrix is enforced in exactly one place; fills go through
//! [`OrderRecord::apply_fill`] which keeps the cumulative quantity and the
//! volume-weighted average price consistent.

use aegis_core::{
    is_valid_transition, GroupId, OrderChanges, OrderId, OrderIntent, OrderStatus, Price, Qty,
};
use aegis_telemetry::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bracket::LegRole;

/// Progress reported by a successfully applied fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillProgress {
    /// The order still has remaining quantity.
    Partial,
    /// The order is now completely filled.
    Complete,
}

/// A fill event that cannot be applied to the record.
///
/// Anomalous fills are dropped by the registry after logging; they must
/// never corrupt the record or crash the session.
#[derive(Debug, Clone, Error)]
pub enum FillAnomaly {
    #[error("fill quantity {qty} is not positive")]
    NonPositiveQty { qty: Qty },
    #[error("fill of {qty} exceeds remaining quantity {remaining}")]
    Overfill { qty: Qty, remaining: Qty },
    #[error("order in status {status} cannot receive fills")]
    NotFillable { status: OrderStatus },
}

/// One order tracked for the life of the session.
///
/// Records are never removed, terminal orders stay queryable until
/// shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Internal order identifier, assigned before dispatch.
    pub id: OrderId,
    /// Bracket group this order belongs to, if any.
    pub group_id: Option<GroupId>,
    /// Role within the bracket group, if any.
    pub role: Option<LegRole>,
    /// The validated intent this record was created from.
    pub intent: OrderIntent,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Cumulative filled quantity.
    pub filled_qty: Qty,
    /// Volume-weighted average fill price.
    pub avg_fill_price: Option<Price>,
    /// Identifier assigned by the venue on acknowledgment.
    pub venue_id: Option<String>,
    /// Free-form note for terminal causes (reject reason, cascade origin).
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Create a standalone order record in `PendingSubmit`.
    #[must_use]
    pub fn new(intent: OrderIntent) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            group_id: None,
            role: None,
            intent,
            status: OrderStatus::PendingSubmit,
            filled_qty: Qty::ZERO,
            avg_fill_price: None,
            venue_id: None,
            detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a bracket leg record.
    ///
    /// The entry leg starts in `PendingSubmit`; protective legs start in
    /// `PendingActivation` and are only submitted once the entry fills.
    #[must_use]
    pub fn leg(intent: OrderIntent, group_id: GroupId, role: LegRole) -> Self {
        let status = match role {
            LegRole::Entry => OrderStatus::PendingSubmit,
            LegRole::Stop | LegRole::Target => OrderStatus::PendingActivation,
        };
        let mut record = Self::new(intent);
        record.group_id = Some(group_id);
        record.role = Some(role);
        record.status = status;
        record
    }

    /// Quantity still unfilled.
    #[must_use]
    pub fn remaining_qty(&self) -> Qty {
        self.intent.qty - self.filled_qty
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True for a live protective stop (standalone or bracket stop leg).
    #[must_use]
    pub fn is_active_risk_order(&self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.intent.is_risk_order() || self.role == Some(LegRole::Stop)
    }

    /// Apply a status change if the lifecycle matrix allows it.
    ///
    /// Returns false (and leaves the record untouched) for an invalid
    /// transition; the caller decides how loudly to log it.
    pub fn try_transition(&mut self, to: OrderStatus) -> bool {
        if !is_valid_transition(self.status, to) {
            return false;
        }
        self.status = to;
        self.touch();
        Metrics::transition(&to.to_string());
        true
    }

    /// Apply a fill, updating cumulative quantity, average price and status.
    pub fn apply_fill(&mut self, qty: Qty, price: Price) -> Result<FillProgress, FillAnomaly> {
        if !matches!(
            self.status,
            OrderStatus::Working | OrderStatus::PartiallyFilled | OrderStatus::PendingModify
        ) {
            return Err(FillAnomaly::NotFillable {
                status: self.status,
            });
        }
        if !qty.is_positive() {
            return Err(FillAnomaly::NonPositiveQty { qty });
        }
        let remaining = self.remaining_qty();
        if qty > remaining {
            return Err(FillAnomaly::Overfill { qty, remaining });
        }

        let prior_notional = match self.avg_fill_price {
            Some(avg) => self.filled_qty.inner() * avg.inner(),
            None => rust_decimal::Decimal::ZERO,
        };
        self.filled_qty = self.filled_qty + qty;
        let new_notional = prior_notional + qty.inner() * price.inner();
        self.avg_fill_price = Some(Price::new(new_notional / self.filled_qty.inner()));

        let progress = if self.remaining_qty().is_zero() {
            self.try_transition(OrderStatus::Filled);
            FillProgress::Complete
        } else {
            // A repeat partial fill keeps the status, only quantities move.
            if self.status != OrderStatus::PartiallyFilled {
                self.try_transition(OrderStatus::PartiallyFilled);
            } else {
                self.touch();
            }
            FillProgress::Partial
        };
        Ok(progress)
    }

    /// Fold accepted modification changes into the stored intent.
    pub fn apply_changes(&mut self, changes: &OrderChanges) {
        if let Some(qty) = changes.qty {
            self.intent.qty = qty;
        }
        if let Some(price) = changes.limit_price {
            self.intent.limit_price = Some(price);
        }
        if let Some(price) = changes.stop_price {
            self.intent.stop_price = Some(price);
        }
        self.touch();
    }

    pub fn set_venue_id(&mut self, venue_id: impl Into<String>) {
        self.venue_id = Some(venue_id.into());
        self.touch();
    }

    /// Attach a terminal-cause note.
    pub fn note(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// In-flight modification bookkeeping.
///
/// While a modify is at the venue the order sits in `PendingModify`; the
/// ticket remembers where to return it and what to apply on acceptance.
#[derive(Debug, Clone)]
pub struct ModifyTicket {
    pub order_id: OrderId,
    pub prior_status: OrderStatus,
    pub changes: OrderChanges,
    pub requested_at: DateTime<Utc>,
}

impl ModifyTicket {
    #[must_use]
    pub fn new(order_id: OrderId, prior_status: OrderStatus, changes: OrderChanges) -> Self {
        Self {
            order_id,
            prior_status,
            changes,
            requested_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{OrderSide, Routing};
    use rust_decimal_macros::dec;

    fn record(qty: Qty) -> OrderRecord {
        let intent = OrderIntent::market(
            Routing::equity("AAPL", "SMART", "USD"),
            OrderSide::Buy,
            qty,
        );
        let mut record = OrderRecord::new(intent);
        assert!(record.try_transition(OrderStatus::Working));
        record
    }

    #[test]
    fn fills_accumulate_with_weighted_average() {
        let mut record = record(Qty::new(dec!(100)));

        let progress = record
            .apply_fill(Qty::new(dec!(40)), Price::new(dec!(10)))
            .unwrap();
        assert_eq!(progress, FillProgress::Partial);
        assert_eq!(record.status, OrderStatus::PartiallyFilled);
        assert_eq!(record.remaining_qty(), Qty::new(dec!(60)));

        let progress = record
            .apply_fill(Qty::new(dec!(60)), Price::new(dec!(11)))
            .unwrap();
        assert_eq!(progress, FillProgress::Complete);
        assert_eq!(record.status, OrderStatus::Filled);
        // (40*10 + 60*11) / 100 = 10.6
        assert_eq!(record.avg_fill_price, Some(Price::new(dec!(10.6))));
    }

    #[test]
    fn overfill_is_rejected_without_mutation() {
        let mut record = record(Qty::new(dec!(10)));
        record
            .apply_fill(Qty::new(dec!(6)), Price::new(dec!(5)))
            .unwrap();

        let err = record
            .apply_fill(Qty::new(dec!(5)), Price::new(dec!(5)))
            .unwrap_err();
        assert!(matches!(err, FillAnomaly::Overfill { .. }));
        assert_eq!(record.filled_qty, Qty::new(dec!(6)));
        assert_eq!(record.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn fills_on_terminal_orders_are_anomalous() {
        let mut record = record(Qty::new(dec!(10)));
        assert!(record.try_transition(OrderStatus::Cancelled));

        let err = record
            .apply_fill(Qty::new(dec!(1)), Price::new(dec!(5)))
            .unwrap_err();
        assert!(matches!(err, FillAnomaly::NotFillable { .. }));
    }

    #[test]
    fn terminal_records_refuse_transitions() {
        let mut record = record(Qty::new(dec!(10)));
        assert!(record.try_transition(OrderStatus::Filled));
        assert!(!record.try_transition(OrderStatus::Working));
        assert!(!record.try_transition(OrderStatus::Cancelled));
        assert_eq!(record.status, OrderStatus::Filled);
    }

    #[test]
    fn leg_records_start_in_the_right_state() {
        let group = GroupId::new();
        let intent = OrderIntent::market(
            Routing::equity("AAPL", "SMART", "USD"),
            OrderSide::Buy,
            Qty::new(dec!(10)),
        );
        let entry = OrderRecord::leg(intent.clone(), group.clone(), LegRole::Entry);
        let stop = OrderRecord::leg(intent.clone(), group.clone(), LegRole::Stop);
        let target = OrderRecord::leg(intent, group, LegRole::Target);

        assert_eq!(entry.status, OrderStatus::PendingSubmit);
        assert_eq!(stop.status, OrderStatus::PendingActivation);
        assert_eq!(target.status, OrderStatus::PendingActivation);
    }
}
