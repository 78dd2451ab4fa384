//! Order-related types and identifiers.
//!
//! Provides order side, kind, time-in-force, identifier, and intent types
//! for the safety engine.

use crate::decimal::{Price, Qty};
use crate::instrument::Routing;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    ///
    /// The protective legs of a bracket always trade opposite the entry.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for directional price comparisons).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Market order, executed at the prevailing price.
    Market,
    /// Limit order at a fixed price.
    Limit,
    /// Stop order that becomes a market order once triggered.
    StopMarket,
    /// Stop order that becomes a limit order once triggered.
    StopLimit,
    /// Stop whose trigger trails the market.
    TrailingStop,
}

impl OrderKind {
    /// Returns true for the protective stop family.
    ///
    /// Stop-kind orders count against `max_concurrent_risk_orders` and
    /// require the stop-loss feature toggle.
    pub fn is_stop_kind(&self) -> bool {
        matches!(self, Self::StopMarket | Self::StopLimit | Self::TrailingStop)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
            Self::StopMarket => write!(f, "stop_market"),
            Self::StopLimit => write!(f, "stop_limit"),
            Self::TrailingStop => write!(f, "trailing_stop"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Valid for the current trading day.
    #[default]
    #[serde(rename = "Day")]
    Day,
    /// Good-til-cancelled.
    #[serde(rename = "Gtc")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "Ioc")]
    ImmediateOrCancel,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "Day"),
            Self::GoodTilCancelled => write!(f, "Gtc"),
            Self::ImmediateOrCancel => write!(f, "Ioc"),
        }
    }
}

/// Session-unique order identifier.
///
/// Every order must carry a unique identifier so that venue callbacks,
/// cancellations, and bracket linkage can never address the wrong record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new unique order ID.
    ///
    /// Format: `ord_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("ord_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing venue messages).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier shared by the three legs of a bracket group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Create a new unique group ID.
    ///
    /// Format: `brk_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("brk_{ts}_{uuid_short}"))
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three coupled price levels of a bracket submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPrices {
    /// Entry limit price.
    pub entry: Price,
    /// Protective stop trigger.
    pub stop: Price,
    /// Profit target limit price.
    pub target: Price,
}

impl BracketPrices {
    pub fn new(entry: Price, stop: Price, target: Price) -> Self {
        Self {
            entry,
            stop,
            target,
        }
    }
}

/// Requested field changes for an order modification.
///
/// `None` fields are left untouched at the venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanges {
    pub qty: Option<Qty>,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
}

impl OrderChanges {
    /// Returns true if no field is changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qty.is_none() && self.limit_price.is_none() && self.stop_price.is_none()
    }

    #[must_use]
    pub fn with_qty(mut self, qty: Qty) -> Self {
        self.qty = Some(qty);
        self
    }

    #[must_use]
    pub fn with_limit_price(mut self, price: Price) -> Self {
        self.limit_price = Some(price);
        self
    }

    #[must_use]
    pub fn with_stop_price(mut self, price: Price) -> Self {
        self.stop_price = Some(price);
        self
    }
}

/// A caller's requested operation, after symbol resolution.
///
/// The routing has already been produced by the external resolver; the
/// intent carries everything the validator and the venue need to know
/// about the requested order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Resolved instrument routing.
    pub routing: Routing,
    /// Order side.
    pub side: OrderSide,
    /// Requested quantity.
    pub qty: Qty,
    /// Order kind.
    pub kind: OrderKind,
    /// Limit price (limit and stop-limit kinds).
    pub limit_price: Option<Price>,
    /// Stop trigger price (stop kinds).
    pub stop_price: Option<Price>,
    /// Time-in-force.
    #[serde(default)]
    pub tif: TimeInForce,
    /// Coupled price levels for a bracket submission (entry leg only).
    #[serde(default)]
    pub bracket: Option<BracketPrices>,
}

impl OrderIntent {
    /// Create a market order intent.
    #[must_use]
    pub fn market(routing: Routing, side: OrderSide, qty: Qty) -> Self {
        Self {
            routing,
            side,
            qty,
            kind: OrderKind::Market,
            limit_price: None,
            stop_price: None,
            tif: TimeInForce::Day,
            bracket: None,
        }
    }

    /// Create a limit order intent.
    #[must_use]
    pub fn limit(
        routing: Routing,
        side: OrderSide,
        qty: Qty,
        limit_price: Price,
        tif: TimeInForce,
    ) -> Self {
        Self {
            routing,
            side,
            qty,
            kind: OrderKind::Limit,
            limit_price: Some(limit_price),
            stop_price: None,
            tif,
            bracket: None,
        }
    }

    /// Create a stop-market order intent.
    #[must_use]
    pub fn stop_market(routing: Routing, side: OrderSide, qty: Qty, stop_price: Price) -> Self {
        Self {
            routing,
            side,
            qty,
            kind: OrderKind::StopMarket,
            limit_price: None,
            stop_price: Some(stop_price),
            tif: TimeInForce::GoodTilCancelled,
            bracket: None,
        }
    }

    /// Create a stop-limit order intent.
    #[must_use]
    pub fn stop_limit(
        routing: Routing,
        side: OrderSide,
        qty: Qty,
        stop_price: Price,
        limit_price: Price,
    ) -> Self {
        Self {
            routing,
            side,
            qty,
            kind: OrderKind::StopLimit,
            limit_price: Some(limit_price),
            stop_price: Some(stop_price),
            tif: TimeInForce::GoodTilCancelled,
            bracket: None,
        }
    }

    /// Create the entry-leg intent of a bracket submission.
    ///
    /// The entry is a limit order at `prices.entry`; the coupled levels ride
    /// along so validation can check their ordering as one unit.
    #[must_use]
    pub fn bracket_entry(
        routing: Routing,
        side: OrderSide,
        qty: Qty,
        prices: BracketPrices,
        tif: TimeInForce,
    ) -> Self {
        Self {
            routing,
            side,
            qty,
            kind: OrderKind::Limit,
            limit_price: Some(prices.entry),
            stop_price: None,
            tif,
            bracket: Some(prices),
        }
    }

    /// Returns true if this intent is for a stop-kind (risk) order.
    #[must_use]
    pub fn is_risk_order(&self) -> bool {
        self.kind.is_stop_kind()
    }

    /// Returns true if this intent carries bracket price levels.
    #[must_use]
    pub fn is_bracket(&self) -> bool {
        self.bracket.is_some()
    }

    /// Short human-readable summary, used as the audit subject for intents
    /// that never became orders.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {} {} {}",
            self.side, self.qty, self.routing.symbol, self.kind
        )
    }
}
