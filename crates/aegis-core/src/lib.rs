//! Core domain types for the aegis order safety engine.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `OrderIntent`, `OrderId`, `GroupId`: orders and identifiers
//! - `OrderStatus` and the legal-transition matrix
//! - `RejectReason`: the caller-facing rejection taxonomy
//! - `AuditEvent`/`AuditSink`: the decision trail and its port
//! - `VenueConnector`, `SymbolResolver`: external collaborator ports

pub mod audit;
pub mod decimal;
pub mod events;
pub mod instrument;
pub mod order;
pub mod reject;
pub mod status;
pub mod venue;

pub use audit::{AuditEvent, AuditKind, AuditSink, AuditSubject, MemoryAuditSink, NullAuditSink};
pub use decimal::{Price, Qty};
pub use events::{FillEvent, VenueEvent};
pub use instrument::{AssetClass, ResolveError, Routing, SymbolResolver};
pub use order::{
    BracketPrices, GroupId, OrderChanges, OrderId, OrderIntent, OrderKind, OrderSide, TimeInForce,
};
pub use reject::{RejectKind, RejectReason};
pub use status::{is_valid_transition, OrderStatus};
pub use venue::{SubmitAck, VenueConnector, VenueError, VenueOrder};
