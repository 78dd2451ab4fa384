//! Safety policy definition.
//!
//! A [`SafetyPolicy`] is the single source of truth for what the engine is
//! allowed to do. It combines account gating, per-order limits, quota limits
//! and feature toggles. Every order passes through the full policy via the
//! [`Validator`](crate::Validator) before it may reach a venue.
//!
//! # Policy Groups
//!
//! ## Toggles
//! - trading_enabled: master switch for new orders
//! - forex_enabled / international_enabled: asset-class and venue gating
//! - stop_loss_enabled: standalone risk orders
//!
//! ## Limits
//! - max_order_size / max_order_value: per-order caps
//! - max_daily_orders / max_orders_per_minute: quota caps
//! - max_concurrent_risk_orders: active stop cap
//! - min_stop_distance_pct: protective-price sanity band

use aegis_core::Qty;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{SafetyError, SafetyResult};

/// The full safety policy, as loaded from configuration.
///
/// Every field has a conservative default so a partially specified policy
/// file still yields a tradable but tightly limited engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Master switch. When false, every new order is rejected.
    #[serde(default = "default_trading_enabled")]
    pub trading_enabled: bool,
    /// Allow forex (cash currency) orders.
    #[serde(default)]
    pub forex_enabled: bool,
    /// Allow orders routed to non-domestic exchanges.
    #[serde(default)]
    pub international_enabled: bool,
    /// Allow standalone protective stop orders.
    #[serde(default = "default_stop_loss_enabled")]
    pub stop_loss_enabled: bool,
    /// Require the account to match one of the paper prefixes.
    #[serde(default = "default_require_paper_account")]
    pub require_paper_account: bool,
    /// Account prefixes treated as paper accounts.
    #[serde(default = "default_allowed_account_prefixes")]
    pub allowed_account_prefixes: Vec<String>,
    /// Currency considered domestic for the international toggle.
    #[serde(default = "default_domestic_currency")]
    pub domestic_currency: String,
    /// Maximum quantity for a single order.
    #[serde(default = "default_max_order_size")]
    pub max_order_size: Qty,
    /// Maximum notional value (qty x reference price) for a single order.
    #[serde(default = "default_max_order_value")]
    pub max_order_value: Decimal,
    /// Maximum confirmed orders per UTC day.
    #[serde(default = "default_max_daily_orders")]
    pub max_daily_orders: u32,
    /// Maximum orders per sliding 60-second window.
    #[serde(default = "default_max_orders_per_minute")]
    pub max_orders_per_minute: u32,
    /// Maximum simultaneously active protective stop orders.
    #[serde(default = "default_max_concurrent_risk_orders")]
    pub max_concurrent_risk_orders: u32,
    /// Minimum distance between a stop price and its reference, in percent.
    #[serde(default = "default_min_stop_distance_pct")]
    pub min_stop_distance_pct: Decimal,
    /// Credential required to rearm the kill switch once triggered.
    #[serde(default = "default_kill_switch_override")]
    pub kill_switch_override: String,
}

fn default_trading_enabled() -> bool {
    true
}

fn default_stop_loss_enabled() -> bool {
    true
}

fn default_require_paper_account() -> bool {
    true
}

fn default_allowed_account_prefixes() -> Vec<String> {
    vec!["DU".to_string(), "DF".to_string()]
}

fn default_domestic_currency() -> String {
    "USD".to_string()
}

fn default_max_order_size() -> Qty {
    Qty::new(Decimal::new(10_000, 0))
}

fn default_max_order_value() -> Decimal {
    Decimal::new(250_000, 0)
}

fn default_max_daily_orders() -> u32 {
    200
}

fn default_max_orders_per_minute() -> u32 {
    10
}

fn default_max_concurrent_risk_orders() -> u32 {
    25
}

fn default_min_stop_distance_pct() -> Decimal {
    // 0.5%
    Decimal::new(5, 1)
}

fn default_kill_switch_override() -> String {
    "LIFT-HALT".to_string()
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            trading_enabled: default_trading_enabled(),
            forex_enabled: false,
            international_enabled: false,
            stop_loss_enabled: default_stop_loss_enabled(),
            require_paper_account: default_require_paper_account(),
            allowed_account_prefixes: default_allowed_account_prefixes(),
            domestic_currency: default_domestic_currency(),
            max_order_size: default_max_order_size(),
            max_order_value: default_max_order_value(),
            max_daily_orders: default_max_daily_orders(),
            max_orders_per_minute: default_max_orders_per_minute(),
            max_concurrent_risk_orders: default_max_concurrent_risk_orders(),
            min_stop_distance_pct: default_min_stop_distance_pct(),
            kill_switch_override: default_kill_switch_override(),
        }
    }
}

impl SafetyPolicy {
    /// Check whether an account id passes the paper-account gate.
    #[must_use]
    pub fn account_allowed(&self, account: &str) -> bool {
        if !self.require_paper_account {
            return true;
        }
        self.allowed_account_prefixes
            .iter()
            .any(|prefix| account.starts_with(prefix.as_str()))
    }

    /// Validate internal consistency of the policy values.
    ///
    /// Rejects zero or negative limits that would make the engine
    /// unconditionally reject everything by accident rather than intent.
    pub fn validate(&self) -> SafetyResult<()> {
        if !self.max_order_size.is_positive() {
            return Err(SafetyError::InvalidPolicy(
                "max_order_size must be positive".to_string(),
            ));
        }
        if self.max_order_value <= Decimal::ZERO {
            return Err(SafetyError::InvalidPolicy(
                "max_order_value must be positive".to_string(),
            ));
        }
        if self.max_daily_orders == 0 {
            return Err(SafetyError::InvalidPolicy(
                "max_daily_orders must be at least 1".to_string(),
            ));
        }
        if self.max_orders_per_minute == 0 {
            return Err(SafetyError::InvalidPolicy(
                "max_orders_per_minute must be at least 1".to_string(),
            ));
        }
        if self.min_stop_distance_pct < Decimal::ZERO {
            return Err(SafetyError::InvalidPolicy(
                "min_stop_distance_pct must not be negative".to_string(),
            ));
        }
        if self.require_paper_account && self.allowed_account_prefixes.is_empty() {
            return Err(SafetyError::InvalidPolicy(
                "allowed_account_prefixes must not be empty when require_paper_account is set"
                    .to_string(),
            ));
        }
        if self.kill_switch_override.is_empty() {
            return Err(SafetyError::InvalidPolicy(
                "kill_switch_override must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
