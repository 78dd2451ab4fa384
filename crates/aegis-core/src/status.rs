//! Order lifecycle states and the legal-transition matrix.
//!
//! Every status change in the registry goes through `is_valid_transition`;
//! terminal states accept no further mutation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of an order in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Reserved in the registry, submission not yet acknowledged.
    #[default]
    PendingSubmit,
    /// Bracket stop/target leg held back until the entry fills.
    PendingActivation,
    /// Acknowledged and live at the venue.
    Working,
    /// Some quantity filled, remainder live.
    PartiallyFilled,
    /// Modification sent, awaiting venue acknowledgment.
    PendingModify,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Rejected, by policy, by the venue, or by connectivity failure.
    Rejected,
    /// Expired at the venue.
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if the order is live at the venue and may be modified.
    #[must_use]
    pub fn is_modifiable(&self) -> bool {
        matches!(self, Self::Working | Self::PartiallyFilled)
    }

    /// Returns true if a cancellation may be requested.
    ///
    /// `PendingActivation` legs are cancellable locally; they were never
    /// submitted, so no venue round-trip is involved.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Working | Self::PartiallyFilled | Self::PendingActivation
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingSubmit => "pending_submit",
            Self::PendingActivation => "pending_activation",
            Self::Working => "working",
            Self::PartiallyFilled => "partially_filled",
            Self::PendingModify => "pending_modify",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Returns true if `from -> to` is a legal lifecycle transition.
///
/// Terminal states have no successors. A fill arriving during
/// `PendingModify` may complete the order, so terminal exits from
/// `PendingModify` are legal alongside the restore to the prior status.
#[must_use]
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (PendingSubmit, Working)
            | (PendingSubmit, Rejected)
            | (PendingSubmit, Cancelled)
            | (PendingActivation, PendingSubmit)
            | (PendingActivation, Cancelled)
            | (Working, PartiallyFilled)
            | (Working, Filled)
            | (Working, Cancelled)
            | (Working, Rejected)
            | (Working, Expired)
            | (Working, PendingModify)
            | (PartiallyFilled, Working)
            | (PartiallyFilled, Filled)
            | (PartiallyFilled, Cancelled)
            | (PartiallyFilled, Expired)
            | (PartiallyFilled, PendingModify)
            | (PendingModify, Working)
            | (PendingModify, PartiallyFilled)
            | (PendingModify, Filled)
            | (PendingModify, Cancelled)
            | (PendingModify, Rejected)
            | (PendingModify, Expired)
    )
}
