//! Pre-dispatch order validation.
//!
//! Every order intent runs through the same fixed checklist, cheapest and
//! most global checks first, short-circuiting on the first failure:
//!
//! 1. Kill switch armed
//! 2. Feature toggles (trading / stop orders / forex / international)
//! 3. Account allow-list
//! 4. Quantity and price sanity, per-order size cap
//! 5. Notional value cap
//! 6. Order-kind logic (bracket price ordering, stop side and distance,
//!    concurrent risk-order cap)
//! 7. Rate limiter, then daily counter
//!
//! Every outcome, allowed or rejected, is written to the audit sink before
//! the result is returned. An allowed intent leaves step 7 holding one rate
//! slot and one daily reservation; the dispatcher commits or releases the
//! reservation once the venue outcome is known.

use std::sync::Arc;

use aegis_core::{
    AuditEvent, AuditKind, AuditSink, AuditSubject, OrderChanges, OrderId, OrderIntent, OrderSide,
    Price, Qty, RejectReason,
};
use aegis_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::daily::DailyCounter;
use crate::kill_switch::KillSwitch;
use crate::policy::SafetyPolicy;
use crate::rate_limit::RateLimiter;

/// Validates order intents against the safety policy.
///
/// Owns no order state. Holds shared handles to the kill switch and the
/// quota counters so a passing validation atomically reserves quota.
pub struct Validator {
    policy: SafetyPolicy,
    kill_switch: Arc<KillSwitch>,
    rate_limiter: Arc<RateLimiter>,
    daily_counter: Arc<DailyCounter>,
    audit: Arc<dyn AuditSink>,
}

impl Validator {
    pub fn new(
        policy: SafetyPolicy,
        kill_switch: Arc<KillSwitch>,
        rate_limiter: Arc<RateLimiter>,
        daily_counter: Arc<DailyCounter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            policy,
            kill_switch,
            rate_limiter,
            daily_counter,
            audit,
        }
    }

    /// The policy this validator enforces.
    #[must_use]
    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Run the full checklist for a new order intent.
    ///
    /// `reference_price` is the price the notional and stop-distance checks
    /// are computed against (limit price for limit orders, caller-supplied
    /// market reference otherwise). `active_risk_orders` is the registry's
    /// current count of live protective stops.
    ///
    /// On `Ok(())` one rate slot and one daily reservation are held.
    pub fn validate(
        &self,
        intent: &OrderIntent,
        account: &str,
        reference_price: Price,
        active_risk_orders: u32,
    ) -> Result<(), RejectReason> {
        if let Err(reason) = self.run_checks(intent, account, reference_price, active_risk_orders)
        {
            return Err(self.reject_intent(intent, reason));
        }
        debug!(intent = %intent.summary(), "order intent validated");
        Metrics::validation_allowed();
        self.audit.record(AuditEvent::new(
            AuditKind::Validated,
            AuditSubject::Intent(intent.summary()),
            "all safety checks passed".to_string(),
        ));
        Ok(())
    }

    /// Run the modify subset of the checklist against an existing order.
    ///
    /// Applies the kill switch and trading toggle, re-checks size and
    /// notional caps against the post-modification values, re-checks stop
    /// distance when the stop price moves and a reference is available, and
    /// consumes one rate slot. Modifications never touch the daily counter;
    /// the order already spent its slot when first placed.
    pub fn validate_modify(
        &self,
        intent: &OrderIntent,
        order_id: &OrderId,
        changes: &OrderChanges,
        reference_price: Option<Price>,
    ) -> Result<(), RejectReason> {
        if let Err(reason) = self.run_modify_checks(intent, changes, reference_price) {
            warn!(
                order_id = %order_id,
                code = reason.code(),
                "order modification rejected: {reason}"
            );
            Metrics::validation_rejected(reason.code());
            self.audit.record(
                AuditEvent::order(AuditKind::ModifyRejected, order_id, reason.to_string())
                    .with_code(reason.code()),
            );
            return Err(reason);
        }
        debug!(order_id = %order_id, "order modification validated");
        Metrics::validation_allowed();
        self.audit.record(AuditEvent::order(
            AuditKind::Validated,
            order_id,
            "modification passed safety checks".to_string(),
        ));
        Ok(())
    }

    fn reject_intent(&self, intent: &OrderIntent, reason: RejectReason) -> RejectReason {
        warn!(
            intent = %intent.summary(),
            code = reason.code(),
            "order intent rejected: {reason}"
        );
        Metrics::validation_rejected(reason.code());
        self.audit.record(AuditEvent::rejection(
            AuditSubject::Intent(intent.summary()),
            &reason,
        ));
        reason
    }

    fn run_checks(
        &self,
        intent: &OrderIntent,
        account: &str,
        reference_price: Price,
        active_risk_orders: u32,
    ) -> Result<(), RejectReason> {
        // 1. Kill switch.
        if self.kill_switch.is_triggered() {
            return Err(RejectReason::KillSwitchTriggered {
                reason: self
                    .kill_switch
                    .trigger_reason()
                    .unwrap_or_else(|| "unspecified".to_string()),
            });
        }

        // 2. Feature toggles.
        if !self.policy.trading_enabled {
            return Err(RejectReason::TradingDisabled);
        }
        // A bracket carries a protective stop leg, so the stop toggle
        // gates it the same as a standalone stop order.
        if (intent.is_risk_order() || intent.is_bracket()) && !self.policy.stop_loss_enabled {
            return Err(RejectReason::StopOrdersDisabled);
        }
        if intent.routing.is_forex() && !self.policy.forex_enabled {
            return Err(RejectReason::ForexDisabled);
        }
        if intent.routing.currency != self.policy.domestic_currency
            && !self.policy.international_enabled
        {
            return Err(RejectReason::InternationalDisabled);
        }

        // 3. Account allow-list.
        if !self.policy.account_allowed(account) {
            return Err(RejectReason::AccountNotAllowed {
                account: account.to_string(),
            });
        }

        // 4. Quantity and price sanity, size cap.
        self.check_size(intent.qty, intent.limit_price, intent.stop_price)?;
        if let Some(prices) = &intent.bracket {
            for price in [prices.entry, prices.stop, prices.target] {
                if !price.is_positive() {
                    return Err(RejectReason::InvalidPrice { price });
                }
            }
        }

        // 5. Notional cap.
        self.check_notional(intent.qty, reference_price)?;

        // 6. Order-kind logic.
        if let Some(prices) = &intent.bracket {
            self.check_bracket_ordering(intent.side, prices)?;
            self.check_stop_distance(prices.stop, prices.entry)?;
            self.check_risk_cap(active_risk_orders)?;
        } else if intent.is_risk_order() {
            // Constructors guarantee a stop price on stop kinds.
            if let Some(stop) = intent.stop_price {
                self.check_stop_side(intent.side, stop, reference_price)?;
                self.check_stop_distance(stop, reference_price)?;
            }
            self.check_risk_cap(active_risk_orders)?;
        }

        // 7. Quota. Rate first, then daily; a daily rejection hands the rate
        // slot back so the failed attempt costs nothing.
        if !self.rate_limiter.try_acquire() {
            return Err(RejectReason::RateLimited {
                max_per_minute: self.rate_limiter.max_per_minute(),
            });
        }
        if !self.daily_counter.check_and_reserve() {
            self.rate_limiter.release_one();
            return Err(RejectReason::DailyLimitExceeded {
                max_per_day: self.daily_counter.max_per_day(),
            });
        }

        Ok(())
    }

    fn run_modify_checks(
        &self,
        intent: &OrderIntent,
        changes: &OrderChanges,
        reference_price: Option<Price>,
    ) -> Result<(), RejectReason> {
        if self.kill_switch.is_triggered() {
            return Err(RejectReason::KillSwitchTriggered {
                reason: self
                    .kill_switch
                    .trigger_reason()
                    .unwrap_or_else(|| "unspecified".to_string()),
            });
        }
        if !self.policy.trading_enabled {
            return Err(RejectReason::TradingDisabled);
        }

        let new_qty = changes.qty.unwrap_or(intent.qty);
        self.check_size(new_qty, changes.limit_price, changes.stop_price)?;

        let effective_reference = reference_price.or(changes.limit_price).or(intent.limit_price);
        if let Some(reference) = effective_reference {
            self.check_notional(new_qty, reference)?;
        }

        if let (Some(stop), Some(reference)) = (changes.stop_price, reference_price) {
            self.check_stop_side(intent.side, stop, reference)?;
            self.check_stop_distance(stop, reference)?;
        }

        if !self.rate_limiter.try_acquire() {
            return Err(RejectReason::RateLimited {
                max_per_minute: self.rate_limiter.max_per_minute(),
            });
        }

        Ok(())
    }

    fn check_size(
        &self,
        qty: Qty,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
    ) -> Result<(), RejectReason> {
        if !qty.is_positive() {
            return Err(RejectReason::InvalidQuantity { qty });
        }
        if qty > self.policy.max_order_size {
            return Err(RejectReason::OrderTooLarge {
                qty,
                max: self.policy.max_order_size,
            });
        }
        for price in [limit_price, stop_price].into_iter().flatten() {
            if !price.is_positive() {
                return Err(RejectReason::InvalidPrice { price });
            }
        }
        Ok(())
    }

    fn check_notional(&self, qty: Qty, reference: Price) -> Result<(), RejectReason> {
        let notional = qty.notional(reference);
        if notional > self.policy.max_order_value {
            return Err(RejectReason::NotionalTooLarge {
                notional,
                max: self.policy.max_order_value,
            });
        }
        Ok(())
    }

    /// Bracket legs must straddle the entry: stop on the losing side,
    /// target on the winning side for the entry's direction.
    fn check_bracket_ordering(
        &self,
        side: OrderSide,
        prices: &aegis_core::BracketPrices,
    ) -> Result<(), RejectReason> {
        let sign = Decimal::from(side.sign());
        let entry = prices.entry.inner();
        let stop = prices.stop.inner();
        let target = prices.target.inner();

        if (entry - stop) * sign <= Decimal::ZERO || (target - entry) * sign <= Decimal::ZERO {
            let expected = match side {
                OrderSide::Buy => "stop < entry < target",
                OrderSide::Sell => "target < entry < stop",
            };
            return Err(RejectReason::InvalidBracketPricing {
                detail: format!(
                    "{side} bracket requires {expected}, got stop {stop}, entry {entry}, target {target}"
                ),
            });
        }
        Ok(())
    }

    /// A protective stop triggers on adverse movement: a sell stop sits
    /// below the reference, a buy stop above it.
    fn check_stop_side(
        &self,
        side: OrderSide,
        stop: Price,
        reference: Price,
    ) -> Result<(), RejectReason> {
        let wrong_side = match side {
            OrderSide::Sell => stop >= reference,
            OrderSide::Buy => stop <= reference,
        };
        if wrong_side {
            return Err(RejectReason::StopOnWrongSide {
                stop,
                reference,
                side: side.to_string(),
            });
        }
        Ok(())
    }

    fn check_stop_distance(&self, stop: Price, reference: Price) -> Result<(), RejectReason> {
        let Some(pct) = stop.pct_from(reference) else {
            return Err(RejectReason::InvalidPrice { price: reference });
        };
        let distance_pct = pct.abs();
        if distance_pct < self.policy.min_stop_distance_pct {
            return Err(RejectReason::StopTooClose {
                distance_pct,
                min_pct: self.policy.min_stop_distance_pct,
            });
        }
        Ok(())
    }

    fn check_risk_cap(&self, active_risk_orders: u32) -> Result<(), RejectReason> {
        if active_risk_orders >= self.policy.max_concurrent_risk_orders {
            return Err(RejectReason::RiskOrderCapExceeded {
                active: active_risk_orders,
                max: self.policy.max_concurrent_risk_orders,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{
        AuditSink, BracketPrices, MemoryAuditSink, OrderIntent, OrderSide, Routing, TimeInForce,
    };
    use rust_decimal_macros::dec;

    const ACCOUNT: &str = "DU1234567";

    struct Fixture {
        validator: Validator,
        sink: Arc<MemoryAuditSink>,
        kill_switch: Arc<KillSwitch>,
        daily: Arc<DailyCounter>,
        rate: Arc<RateLimiter>,
    }

    fn fixture(policy: SafetyPolicy) -> Fixture {
        let sink = Arc::new(MemoryAuditSink::default());
        let audit: Arc<dyn AuditSink> = sink.clone();
        let kill_switch = Arc::new(KillSwitch::new(
            policy.kill_switch_override.clone(),
            audit.clone(),
        ));
        let rate = Arc::new(RateLimiter::new(policy.max_orders_per_minute));
        let daily = Arc::new(DailyCounter::new(policy.max_daily_orders));
        let validator = Validator::new(
            policy,
            kill_switch.clone(),
            rate.clone(),
            daily.clone(),
            audit,
        );
        Fixture {
            validator,
            sink,
            kill_switch,
            daily,
            rate,
        }
    }

    fn routing() -> Routing {
        Routing::equity("AAPL", "SMART", "USD")
    }

    fn market_intent(qty: Qty) -> OrderIntent {
        OrderIntent::market(routing(), OrderSide::Buy, qty)
    }

    #[test]
    fn allows_plain_market_order_and_reserves_quota() {
        let f = fixture(SafetyPolicy::default());
        let intent = market_intent(Qty::new(dec!(100)));
        f.validator
            .validate(&intent, ACCOUNT, Price::new(dec!(50)), 0)
            .unwrap();

        assert_eq!(f.sink.count(AuditKind::Validated), 1);
        assert_eq!(f.rate.current_count(), 1);
        assert_eq!(f.daily.reserved_count_at(chrono::Utc::now()), 1);
        assert_eq!(f.daily.confirmed_count(), 0);
    }

    #[test]
    fn kill_switch_blocks_before_everything() {
        let f = fixture(SafetyPolicy::default());
        f.kill_switch.activate("drill");

        // Even an order that would fail five other checks reports the halt.
        let intent = market_intent(Qty::new(dec!(0)));
        let err = f
            .validator
            .validate(&intent, "BAD", Price::new(dec!(1)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::KillSwitchTriggered { .. }));
        assert_eq!(f.sink.count(AuditKind::Rejected), 1);
        assert_eq!(f.rate.current_count(), 0);
    }

    #[test]
    fn toggle_and_account_gates() {
        let mut policy = SafetyPolicy::default();
        policy.trading_enabled = false;
        let f = fixture(policy);
        let err = f
            .validator
            .validate(&market_intent(Qty::new(dec!(1))), ACCOUNT, Price::new(dec!(10)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::TradingDisabled));

        let f = fixture(SafetyPolicy::default());
        let err = f
            .validator
            .validate(
                &market_intent(Qty::new(dec!(1))),
                "U7654321",
                Price::new(dec!(10)),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, RejectReason::AccountNotAllowed { .. }));
    }

    #[test]
    fn stop_toggle_gates_brackets_too() {
        let mut policy = SafetyPolicy::default();
        policy.stop_loss_enabled = false;
        let f = fixture(policy);

        let stop = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
        );
        let err = f
            .validator
            .validate(&stop, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::StopOrdersDisabled));

        // A bracket's protective stop leg is gated up front, before any
        // leg exists to validate on its own.
        let bracket = OrderIntent::bracket_entry(
            routing(),
            OrderSide::Buy,
            Qty::new(dec!(10)),
            BracketPrices {
                entry: Price::new(dec!(100)),
                stop: Price::new(dec!(95)),
                target: Price::new(dec!(110)),
            },
            TimeInForce::Day,
        );
        let err = f
            .validator
            .validate(&bracket, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::StopOrdersDisabled));

        // Plain orders are unaffected by the stop toggle.
        f.validator
            .validate(&market_intent(Qty::new(dec!(10))), ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap();
    }

    #[test]
    fn forex_and_international_gates() {
        let f = fixture(SafetyPolicy::default());
        let fx = OrderIntent::market(
            Routing::forex("EUR.USD", "USD"),
            OrderSide::Buy,
            Qty::new(dec!(1)),
        );
        let err = f
            .validator
            .validate(&fx, ACCOUNT, Price::new(dec!(1)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::ForexDisabled));

        let intl = OrderIntent::market(
            Routing::new("BMW", "IBIS", "EUR", aegis_core::AssetClass::Equity),
            OrderSide::Buy,
            Qty::new(dec!(1)),
        );
        let err = f
            .validator
            .validate(&intl, ACCOUNT, Price::new(dec!(1)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::InternationalDisabled));
    }

    #[test]
    fn size_and_notional_caps() {
        let f = fixture(SafetyPolicy::default());

        let err = f
            .validator
            .validate(&market_intent(Qty::new(dec!(0))), ACCOUNT, Price::new(dec!(10)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::InvalidQuantity { .. }));

        let err = f
            .validator
            .validate(
                &market_intent(Qty::new(dec!(20000))),
                ACCOUNT,
                Price::new(dec!(10)),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, RejectReason::OrderTooLarge { .. }));

        // 1000 * 300 = 300_000 > default 250_000 cap.
        let err = f
            .validator
            .validate(
                &market_intent(Qty::new(dec!(1000))),
                ACCOUNT,
                Price::new(dec!(300)),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, RejectReason::NotionalTooLarge { .. }));
    }

    #[test]
    fn bracket_ordering_both_sides() {
        let f = fixture(SafetyPolicy::default());
        let good_buy = OrderIntent::bracket_entry(
            routing(),
            OrderSide::Buy,
            Qty::new(dec!(10)),
            BracketPrices {
                entry: Price::new(dec!(100)),
                stop: Price::new(dec!(95)),
                target: Price::new(dec!(110)),
            },
            TimeInForce::Day,
        );
        f.validator
            .validate(&good_buy, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap();

        let inverted = OrderIntent::bracket_entry(
            routing(),
            OrderSide::Buy,
            Qty::new(dec!(10)),
            BracketPrices {
                entry: Price::new(dec!(100)),
                stop: Price::new(dec!(110)),
                target: Price::new(dec!(95)),
            },
            TimeInForce::Day,
        );
        let err = f
            .validator
            .validate(&inverted, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::InvalidBracketPricing { .. }));

        let good_sell = OrderIntent::bracket_entry(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            BracketPrices {
                entry: Price::new(dec!(100)),
                stop: Price::new(dec!(105)),
                target: Price::new(dec!(90)),
            },
            TimeInForce::Day,
        );
        f.validator
            .validate(&good_sell, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap();
    }

    #[test]
    fn stop_side_and_distance() {
        let f = fixture(SafetyPolicy::default());

        // Protective sell stop above the reference is on the wrong side.
        let wrong = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(105)),
        );
        let err = f
            .validator
            .validate(&wrong, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::StopOnWrongSide { .. }));

        // 0.1% away violates the default 0.5% minimum distance.
        let tight = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(99.9)),
        );
        let err = f
            .validator
            .validate(&tight, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::StopTooClose { .. }));

        let fine = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
        );
        f.validator
            .validate(&fine, ACCOUNT, Price::new(dec!(100)), 0)
            .unwrap();
    }

    #[test]
    fn risk_order_cap() {
        let mut policy = SafetyPolicy::default();
        policy.max_concurrent_risk_orders = 2;
        let f = fixture(policy);
        let stop = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
        );
        f.validator
            .validate(&stop, ACCOUNT, Price::new(dec!(100)), 1)
            .unwrap();
        let err = f
            .validator
            .validate(&stop, ACCOUNT, Price::new(dec!(100)), 2)
            .unwrap_err();
        assert!(matches!(err, RejectReason::RiskOrderCapExceeded { .. }));
    }

    #[test]
    fn rate_then_daily_with_rollback() {
        let mut policy = SafetyPolicy::default();
        policy.max_orders_per_minute = 2;
        policy.max_daily_orders = 1;
        let f = fixture(policy);
        let intent = market_intent(Qty::new(dec!(1)));
        let reference = Price::new(dec!(10));

        f.validator.validate(&intent, ACCOUNT, reference, 0).unwrap();

        // Daily cap reached; the rate slot taken for this attempt is undone.
        let err = f
            .validator
            .validate(&intent, ACCOUNT, reference, 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::DailyLimitExceeded { .. }));
        assert_eq!(f.rate.current_count(), 1);

        // Rate cap rejects before daily once the window is full.
        f.rate.try_acquire();
        let err = f
            .validator
            .validate(&intent, ACCOUNT, reference, 0)
            .unwrap_err();
        assert!(matches!(err, RejectReason::RateLimited { .. }));
    }

    #[test]
    fn every_outcome_is_audited() {
        let f = fixture(SafetyPolicy::default());
        let intent = market_intent(Qty::new(dec!(1)));
        f.validator
            .validate(&intent, ACCOUNT, Price::new(dec!(10)), 0)
            .unwrap();
        f.validator
            .validate(&intent, "BAD", Price::new(dec!(10)), 0)
            .unwrap_err();
        assert_eq!(f.sink.len(), 2);
        assert_eq!(f.sink.count(AuditKind::Validated), 1);
        assert_eq!(f.sink.count(AuditKind::Rejected), 1);
    }

    #[test]
    fn modify_checks_subset() {
        let f = fixture(SafetyPolicy::default());
        let intent = OrderIntent::limit(
            routing(),
            OrderSide::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(100)),
            TimeInForce::Day,
        );
        let id = OrderId::new();

        let changes = OrderChanges::default().with_qty(Qty::new(dec!(20)));
        f.validator
            .validate_modify(&intent, &id, &changes, None)
            .unwrap();

        let too_big = OrderChanges::default().with_qty(Qty::new(dec!(20000)));
        let err = f
            .validator
            .validate_modify(&intent, &id, &too_big, None)
            .unwrap_err();
        assert!(matches!(err, RejectReason::OrderTooLarge { .. }));
        assert_eq!(f.sink.count(AuditKind::ModifyRejected), 1);

        // Moving a stop too close to the reference is caught on modify too.
        let stop_intent = OrderIntent::stop_market(
            routing(),
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
        );
        let tighter = OrderChanges::default().with_stop_price(Price::new(dec!(99.9)));
        let err = f
            .validator
            .validate_modify(&stop_intent, &id, &tighter, Some(Price::new(dec!(100))))
            .unwrap_err();
        assert!(matches!(err, RejectReason::StopTooClose { .. }));
    }

    #[test]
    fn modify_does_not_touch_daily_counter() {
        let f = fixture(SafetyPolicy::default());
        let intent = market_intent(Qty::new(dec!(10)));
        let changes = OrderChanges::default().with_qty(Qty::new(dec!(5)));
        f.validator
            .validate_modify(&intent, &OrderId::new(), &changes, None)
            .unwrap();
        assert_eq!(f.daily.reserved_count_at(chrono::Utc::now()), 0);
        assert_eq!(f.rate.current_count(), 1);
    }
}
