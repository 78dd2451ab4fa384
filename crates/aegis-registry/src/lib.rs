//! Order lifecycle tracking.
//!
//! The registry is the session's single source of truth for order state:
//!
//! - [`OrderRecord`]: one order's status, fills and venue identity
//! - [`BracketGroup`]: identifier linkage between a bracket's three legs
//! - [`OrderRegistry`]: the owning store, lifecycle transitions, bracket
//!   cascades and one-cancels-other resolution
//!
//! State changes that require venue work (submitting an activated leg,
//! cancelling a sibling) are returned as [`FollowUp`] values for the
//! dispatcher to execute; the registry itself never talks to a venue.

pub mod bracket;
pub mod record;
pub mod registry;

pub use bracket::{BracketGroup, LegRole};
pub use record::{FillAnomaly, FillProgress, ModifyTicket, OrderRecord};
pub use registry::{
    BracketSnapshot, CancelOutcome, FollowUp, OrderRegistry, RegistryConfig,
};

/// Caller-facing snapshot alias; queries and engine operations return
/// cloned records.
pub type OrderSnapshot = OrderRecord;
