//! The rejection taxonomy surfaced to callers.
//!
//! Every refused request carries one `RejectReason`: a stable
//! machine-readable `code()` plus a human-readable `Display`. Policy
//! rejections happen before dispatch; venue and connectivity rejections
//! reach the caller through the order's terminal snapshot.

use crate::decimal::{Price, Qty};
use crate::order::{GroupId, OrderId};
use crate::status::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a rejection, used for metrics labels and
/// retry guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Local policy decision; caller must change parameters or config.
    Policy,
    /// Transient throttle; caller may retry after a backoff.
    RateLimit,
    /// The venue refused the order.
    Venue,
    /// Submission could not be confirmed; order state is uncertain.
    Connectivity,
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("kill switch is triggered: {reason}")]
    KillSwitchTriggered { reason: String },

    #[error("trading is disabled by policy")]
    TradingDisabled,

    #[error("forex trading is disabled by policy")]
    ForexDisabled,

    #[error("international trading is disabled by policy")]
    InternationalDisabled,

    #[error("stop orders are disabled by policy")]
    StopOrdersDisabled,

    #[error("account '{account}' is not permitted by policy")]
    AccountNotAllowed { account: String },

    #[error("quantity {qty} is not a positive amount")]
    InvalidQuantity { qty: Qty },

    #[error("quantity {qty} exceeds max order size {max}")]
    OrderTooLarge { qty: Qty, max: Qty },

    #[error("price {price} is not a positive amount")]
    InvalidPrice { price: Price },

    #[error("order value {notional} exceeds max order value {max}")]
    NotionalTooLarge { notional: Decimal, max: Decimal },

    #[error("{active} risk orders already active, cap is {max}")]
    RiskOrderCapExceeded { active: u32, max: u32 },

    #[error("stop is {distance_pct}% from reference, minimum distance is {min_pct}%")]
    StopTooClose {
        distance_pct: Decimal,
        min_pct: Decimal,
    },

    #[error("invalid bracket pricing: {detail}")]
    InvalidBracketPricing { detail: String },

    #[error("cannot resolve '{symbol}': {detail}")]
    ResolutionFailed { symbol: String, detail: String },

    #[error("rate limit of {max_per_minute} calls per minute exceeded")]
    RateLimited { max_per_minute: u32 },

    #[error("daily order limit of {max_per_day} reached")]
    DailyLimitExceeded { max_per_day: u32 },

    #[error("venue rejected order: {reason}")]
    VenueRejected { reason: String },

    #[error("venue did not confirm in time: {detail}")]
    ConnectivityFailure { detail: String },

    #[error("unknown order {order_id}")]
    UnknownOrder { order_id: OrderId },

    #[error("unknown bracket group {group_id}")]
    UnknownGroup { group_id: GroupId },

    #[error("order {order_id} in status {status} cannot be modified")]
    NotModifiable {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("order {order_id} in status {status} cannot be cancelled")]
    NotCancellable {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("order {order_id} is not a stop order")]
    NotAStopOrder { order_id: OrderId },

    #[error("invalid stop price {stop} for a {side} stop against reference {reference}")]
    StopOnWrongSide {
        stop: Price,
        reference: Price,
        side: String,
    },
}

impl RejectReason {
    /// Stable machine-readable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::KillSwitchTriggered { .. } => "kill_switch_triggered",
            Self::TradingDisabled => "trading_disabled",
            Self::ForexDisabled => "forex_disabled",
            Self::InternationalDisabled => "international_disabled",
            Self::StopOrdersDisabled => "stop_orders_disabled",
            Self::AccountNotAllowed { .. } => "account_not_allowed",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::OrderTooLarge { .. } => "order_too_large",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::NotionalTooLarge { .. } => "notional_too_large",
            Self::RiskOrderCapExceeded { .. } => "risk_order_cap_exceeded",
            Self::StopTooClose { .. } => "stop_too_close",
            Self::InvalidBracketPricing { .. } => "invalid_bracket_pricing",
            Self::ResolutionFailed { .. } => "resolution_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::DailyLimitExceeded { .. } => "daily_limit_exceeded",
            Self::VenueRejected { .. } => "venue_rejected",
            Self::ConnectivityFailure { .. } => "connectivity_failure",
            Self::UnknownOrder { .. } => "unknown_order",
            Self::UnknownGroup { .. } => "unknown_group",
            Self::NotModifiable { .. } => "not_modifiable",
            Self::NotCancellable { .. } => "not_cancellable",
            Self::NotAStopOrder { .. } => "not_a_stop_order",
            Self::StopOnWrongSide { .. } => "stop_on_wrong_side",
        }
    }

    /// Coarse classification per the error-handling taxonomy.
    #[must_use]
    pub fn kind(&self) -> RejectKind {
        match self {
            Self::RateLimited { .. } => RejectKind::RateLimit,
            Self::VenueRejected { .. } => RejectKind::Venue,
            Self::ConnectivityFailure { .. } => RejectKind::Connectivity,
            _ => RejectKind::Policy,
        }
    }

    /// Returns true when the caller should verify order state before
    /// resubmitting (the venue may or may not have seen the order).
    #[must_use]
    pub fn state_uncertain(&self) -> bool {
        matches!(self, Self::ConnectivityFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_codes_are_stable() {
        let reason = RejectReason::KillSwitchTriggered {
            reason: "manual test".into(),
        };
        assert_eq!(reason.code(), "kill_switch_triggered");

        let reason = RejectReason::DailyLimitExceeded { max_per_day: 2 };
        assert_eq!(reason.code(), "daily_limit_exceeded");
    }

    #[test]
    fn test_display_carries_detail() {
        let reason = RejectReason::OrderTooLarge {
            qty: Qty::new(dec!(500)),
            max: Qty::new(dec!(100)),
        };
        assert_eq!(
            reason.to_string(),
            "quantity 500 exceeds max order size 100"
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            RejectReason::RateLimited { max_per_minute: 5 }.kind(),
            RejectKind::RateLimit
        );
        assert_eq!(
            RejectReason::VenueRejected {
                reason: "insufficient buying power".into()
            }
            .kind(),
            RejectKind::Venue
        );
        assert_eq!(
            RejectReason::TradingDisabled.kind(),
            RejectKind::Policy
        );
        assert_eq!(
            RejectReason::DailyLimitExceeded { max_per_day: 10 }.kind(),
            RejectKind::Policy
        );
    }

    #[test]
    fn test_connectivity_is_uncertain() {
        let reason = RejectReason::ConnectivityFailure {
            detail: "submit timed out after 5000ms".into(),
        };
        assert!(reason.state_uncertain());
        assert_eq!(reason.kind(), RejectKind::Connectivity);

        assert!(!RejectReason::TradingDisabled.state_uncertain());
    }
}
