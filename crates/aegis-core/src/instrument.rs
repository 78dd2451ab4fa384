//! Instrument routing types and the symbol resolution port.
//!
//! Symbol and exchange resolution (fuzzy search, alias fallback, currency
//! lookup) lives outside this engine. The engine only consumes the resolved
//! `Routing` and treats a resolution failure as a validation rejection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Asset class of a resolved instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Forex,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equity => write!(f, "equity"),
            Self::Forex => write!(f, "forex"),
        }
    }
}

/// Resolved instrument routing: where and in what currency an order trades.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Routing {
    /// Venue-level symbol.
    pub symbol: String,
    /// Destination exchange.
    pub exchange: String,
    /// Trading currency.
    pub currency: String,
    /// Asset class.
    pub asset_class: AssetClass,
}

impl Routing {
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
        asset_class: AssetClass,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            currency: currency.into(),
            asset_class,
        }
    }

    /// Convenience constructor for an equity routing.
    pub fn equity(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self::new(symbol, exchange, currency, AssetClass::Equity)
    }

    /// Convenience constructor for a forex pair routing.
    pub fn forex(pair: impl Into<String>, currency: impl Into<String>) -> Self {
        Self::new(pair, "IDEALPRO", currency, AssetClass::Forex)
    }

    pub fn is_forex(&self) -> bool {
        self.asset_class == AssetClass::Forex
    }
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.exchange)
    }
}

/// Resolution failure reported by the external resolver.
#[derive(Debug, Clone, Error)]
#[error("cannot resolve '{symbol}': {detail}")]
pub struct ResolveError {
    pub symbol: String,
    pub detail: String,
}

impl ResolveError {
    pub fn new(symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            detail: detail.into(),
        }
    }
}

/// Port for the external symbol/exchange resolver.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    /// Resolve a requested instrument to a tradable routing.
    async fn resolve(&self, symbol: &str, exchange: Option<&str>) -> Result<Routing, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_display() {
        let routing = Routing::equity("AAPL", "NASDAQ", "USD");
        assert_eq!(routing.to_string(), "AAPL@NASDAQ");
        assert!(!routing.is_forex());
    }

    #[test]
    fn test_forex_routing() {
        let routing = Routing::forex("EUR.USD", "USD");
        assert_eq!(routing.exchange, "IDEALPRO");
        assert!(routing.is_forex());
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::new("XYZZY", "no match on any exchange");
        assert_eq!(
            err.to_string(),
            "cannot resolve 'XYZZY': no match on any exchange"
        );
    }
}
