//! The venue connector port.
//!
//! The engine never talks to a brokerage directly; the dispatcher drives
//! this trait. `submit`/`modify`/`cancel` resolve to the venue's synchronous
//! accept/refuse decision, while fills and later status changes arrive on a
//! separate event stream (see `events`).

use crate::decimal::{Price, Qty};
use crate::instrument::Routing;
use crate::order::{OrderChanges, OrderId, OrderIntent, OrderKind, OrderSide, TimeInForce};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat order representation handed to the venue connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueOrder {
    pub order_id: OrderId,
    pub routing: Routing,
    pub side: OrderSide,
    pub qty: Qty,
    pub kind: OrderKind,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub tif: TimeInForce,
}

impl VenueOrder {
    /// Flatten an intent into the wire shape.
    #[must_use]
    pub fn from_intent(order_id: OrderId, intent: &OrderIntent) -> Self {
        Self {
            order_id,
            routing: intent.routing.clone(),
            side: intent.side,
            qty: intent.qty,
            kind: intent.kind,
            limit_price: intent.limit_price,
            stop_price: intent.stop_price,
            tif: intent.tif,
        }
    }
}

/// Venue acknowledgment of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    /// Our order identifier, echoed back.
    pub order_id: OrderId,
    /// The venue's own identifier for the order.
    pub venue_id: String,
}

/// Failure reported by the venue connector.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    /// The venue received the request and refused it.
    #[error("venue rejected: {reason}")]
    Rejected { reason: String },

    /// The request may or may not have reached the venue.
    #[error("transport failure: {detail}")]
    Transport { detail: String },
}

impl VenueError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }
}

/// Port for the external venue connector.
#[async_trait]
pub trait VenueConnector: Send + Sync {
    /// Submit a new order. `Ok` means the venue accepted it as working.
    async fn submit(&self, order: VenueOrder) -> Result<SubmitAck, VenueError>;

    /// Request cancellation of a working order. Confirmation of the realized
    /// cancellation arrives on the event stream.
    async fn cancel(&self, order_id: &OrderId) -> Result<(), VenueError>;

    /// Request modification of a working order.
    async fn modify(&self, order_id: &OrderId, changes: OrderChanges) -> Result<(), VenueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Price, Qty};
    use crate::instrument::Routing;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_intent_flattens_prices() {
        let intent = OrderIntent::stop_limit(
            Routing::equity("TSLA", "NASDAQ", "USD"),
            OrderSide::Sell,
            Qty::new(dec!(5)),
            Price::new(dec!(210)),
            Price::new(dec!(208)),
        );
        let id = OrderId::new();
        let order = VenueOrder::from_intent(id.clone(), &intent);

        assert_eq!(order.order_id, id);
        assert_eq!(order.kind, OrderKind::StopLimit);
        assert_eq!(order.stop_price, Some(Price::new(dec!(210))));
        assert_eq!(order.limit_price, Some(Price::new(dec!(208))));
    }
}
