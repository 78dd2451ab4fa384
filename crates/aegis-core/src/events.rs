//! Asynchronous events delivered by the venue connector.
//!
//! Keyed by our order identifier. The dispatcher's reconciliation loop is
//! the only consumer; events naming unknown or terminal orders are logged
//! and dropped there.

use crate::decimal::{Price, Qty};
use crate::order::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fill (partial or complete) reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: OrderId,
    /// Quantity filled in this execution.
    pub qty: Qty,
    /// Execution price.
    pub price: Price,
    pub at: DateTime<Utc>,
}

impl FillEvent {
    pub fn new(order_id: OrderId, qty: Qty, price: Price) -> Self {
        Self {
            order_id,
            qty,
            price,
            at: Utc::now(),
        }
    }
}

/// Status message from the venue, keyed by our order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum VenueEvent {
    /// An execution against the order.
    Fill(FillEvent),
    /// The venue cancelled the order (requested or venue-initiated).
    Cancelled { order_id: OrderId, at: DateTime<Utc> },
    /// The order expired at the venue.
    Expired { order_id: OrderId, at: DateTime<Utc> },
    /// The venue rejected the order after initially accepting it.
    Rejected {
        order_id: OrderId,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl VenueEvent {
    /// The order this event refers to.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::Fill(fill) => &fill.order_id,
            Self::Cancelled { order_id, .. } => order_id,
            Self::Expired { order_id, .. } => order_id,
            Self::Rejected { order_id, .. } => order_id,
        }
    }

    pub fn cancelled(order_id: OrderId) -> Self {
        Self::Cancelled {
            order_id,
            at: Utc::now(),
        }
    }

    pub fn expired(order_id: OrderId) -> Self {
        Self::Expired {
            order_id,
            at: Utc::now(),
        }
    }

    pub fn rejected(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            order_id,
            reason: reason.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_order_id() {
        let id = OrderId::new();
        let fill = VenueEvent::Fill(FillEvent::new(
            id.clone(),
            Qty::new(dec!(10)),
            Price::new(dec!(99.5)),
        ));
        assert_eq!(fill.order_id(), &id);

        let cancelled = VenueEvent::cancelled(id.clone());
        assert_eq!(cancelled.order_id(), &id);
    }
}
