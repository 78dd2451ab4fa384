//! Bracket group membership.
//!
//! A bracket is three legs sharing one [`GroupId`]: an entry order plus a
//! protective stop and a profit target. The group itself is a flat lookup
//! table of identifiers. All cascade and one-cancels-other behavior lives in
//! the registry, which resolves identifiers to records one at a time; leg
//! records never reference each other directly.

use aegis_core::{GroupId, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which leg of a bracket an order is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegRole {
    Entry,
    Stop,
    Target,
}

impl std::fmt::Display for LegRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Stop => write!(f, "stop"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Identifier linkage for one bracket submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketGroup {
    pub id: GroupId,
    pub entry: OrderId,
    pub stop: OrderId,
    pub target: OrderId,
    pub created_at: DateTime<Utc>,
}

impl BracketGroup {
    #[must_use]
    pub fn new(id: GroupId, entry: OrderId, stop: OrderId, target: OrderId) -> Self {
        Self {
            id,
            entry,
            stop,
            target,
            created_at: Utc::now(),
        }
    }

    /// Role of `order_id` within this group, if it is a member.
    #[must_use]
    pub fn role_of(&self, order_id: &OrderId) -> Option<LegRole> {
        if *order_id == self.entry {
            Some(LegRole::Entry)
        } else if *order_id == self.stop {
            Some(LegRole::Stop)
        } else if *order_id == self.target {
            Some(LegRole::Target)
        } else {
            None
        }
    }

    /// The stop and target identifiers.
    #[must_use]
    pub fn protective_legs(&self) -> [OrderId; 2] {
        [self.stop.clone(), self.target.clone()]
    }

    /// The other protective leg, for one-cancels-other resolution.
    ///
    /// Returns `None` when `order_id` is the entry or not a member.
    #[must_use]
    pub fn oco_sibling(&self, order_id: &OrderId) -> Option<OrderId> {
        match self.role_of(order_id)? {
            LegRole::Stop => Some(self.target.clone()),
            LegRole::Target => Some(self.stop.clone()),
            LegRole::Entry => None,
        }
    }
}
