//! The trading engine facade.
//!
//! One `TradingEngine` owns a session: it wires the validator, kill switch,
//! quota counters, registry, and dispatcher together and exposes the order
//! operations callers actually use. Every placement runs the same path:
//!
//! 1. resolve the symbol to a venue routing
//! 2. validate the intent (reserving quota on success)
//! 3. register the order
//! 4. hand it to the dispatcher and wait for the venue outcome
//!
//! Cancels bypass the validator entirely; flattening risk must work even
//! while the kill switch is triggered.

use std::sync::Arc;

use aegis_core::{
    AuditEvent, AuditSink, AuditSubject, BracketPrices, GroupId, OrderChanges, OrderId,
    OrderIntent, OrderSide, Price, Qty, RejectReason, Routing, SymbolResolver, TimeInForce,
    VenueConnector, VenueEvent,
};
use aegis_dispatch::{spawn_dispatcher, DispatcherHandle};
use aegis_registry::{
    BracketGroup, BracketSnapshot, CancelOutcome, FollowUp, LegRole, OrderRecord, OrderRegistry,
    OrderSnapshot,
};
use aegis_safety::{DailyCounter, KillSwitch, KillSwitchState, RateLimiter, Validator};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::EngineResult;

pub struct TradingEngine {
    account: String,
    validator: Validator,
    kill_switch: Arc<KillSwitch>,
    registry: Arc<OrderRegistry>,
    dispatcher: DispatcherHandle,
    resolver: Arc<dyn SymbolResolver>,
    audit: Arc<dyn AuditSink>,
    dispatcher_join: Mutex<Option<JoinHandle<()>>>,
}

impl TradingEngine {
    /// Wire a session from configuration and the external collaborators.
    ///
    /// `events_rx` is the venue event stream; its sender side belongs to the
    /// connector adapter. Spawns the dispatch loop, so a Tokio runtime must
    /// be running.
    pub fn new(
        config: AppConfig,
        resolver: Arc<dyn SymbolResolver>,
        connector: Arc<dyn VenueConnector>,
        audit: Arc<dyn AuditSink>,
        events_rx: mpsc::Receiver<VenueEvent>,
    ) -> EngineResult<Self> {
        config.safety.validate()?;

        let kill_switch = Arc::new(KillSwitch::new(
            config.safety.kill_switch_override.clone(),
            audit.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.safety.max_orders_per_minute));
        let daily = Arc::new(DailyCounter::new(config.safety.max_daily_orders));
        let registry = Arc::new(OrderRegistry::new(config.registry.clone(), audit.clone()));
        let validator = Validator::new(
            config.safety,
            kill_switch.clone(),
            rate_limiter,
            daily.clone(),
            audit.clone(),
        );
        let (dispatcher, join) = spawn_dispatcher(
            &config.dispatch,
            connector,
            registry.clone(),
            daily,
            events_rx,
        );

        info!(account = %config.account, "trading engine wired");
        Ok(Self {
            account: config.account,
            validator,
            kill_switch,
            registry,
            dispatcher,
            resolver,
            audit,
            dispatcher_join: Mutex::new(Some(join)),
        })
    }

    /// Account the session trades under.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    // ========================================================
    // Placement
    // ========================================================

    /// Place a market order. `reference_price` anchors the notional check
    /// since a market order has no price of its own.
    pub async fn place_market(
        &self,
        symbol: &str,
        exchange: Option<&str>,
        side: OrderSide,
        qty: Qty,
        reference_price: Price,
    ) -> EngineResult<OrderSnapshot> {
        let routing = self.resolve(symbol, exchange).await?;
        let intent = OrderIntent::market(routing, side, qty);
        self.place(intent, reference_price).await
    }

    /// Place a limit order. The limit price is the notional reference.
    pub async fn place_limit(
        &self,
        symbol: &str,
        exchange: Option<&str>,
        side: OrderSide,
        qty: Qty,
        limit_price: Price,
        tif: TimeInForce,
    ) -> EngineResult<OrderSnapshot> {
        let routing = self.resolve(symbol, exchange).await?;
        let intent = OrderIntent::limit(routing, side, qty, limit_price, tif);
        self.place(intent, limit_price).await
    }

    /// Place a protective stop: stop-market, or stop-limit when
    /// `limit_price` is given. `reference_price` is the price the stop
    /// protects against, used for the side and distance checks.
    pub async fn place_stop(
        &self,
        symbol: &str,
        exchange: Option<&str>,
        side: OrderSide,
        qty: Qty,
        stop_price: Price,
        limit_price: Option<Price>,
        reference_price: Price,
    ) -> EngineResult<OrderSnapshot> {
        let routing = self.resolve(symbol, exchange).await?;
        let intent = match limit_price {
            Some(limit) => OrderIntent::stop_limit(routing, side, qty, stop_price, limit),
            None => OrderIntent::stop_market(routing, side, qty, stop_price),
        };
        self.place(intent, reference_price).await
    }

    /// Place a bracket: a limit entry with a coupled protective stop and
    /// profit target. Validated as one unit and consuming one daily slot;
    /// the protective legs stay inactive until the entry fills.
    pub async fn place_bracket(
        &self,
        symbol: &str,
        exchange: Option<&str>,
        side: OrderSide,
        qty: Qty,
        prices: BracketPrices,
        tif: TimeInForce,
    ) -> EngineResult<BracketSnapshot> {
        let routing = self.resolve(symbol, exchange).await?;
        let intent = OrderIntent::bracket_entry(routing.clone(), side, qty, prices, tif);
        self.validator.validate(
            &intent,
            &self.account,
            prices.entry,
            self.registry.active_risk_order_count(),
        )?;

        let group_id = GroupId::new();
        let entry = OrderRecord::leg(intent, group_id.clone(), LegRole::Entry);
        let stop = OrderRecord::leg(
            OrderIntent::stop_market(routing.clone(), side.opposite(), qty, prices.stop),
            group_id.clone(),
            LegRole::Stop,
        );
        let target = OrderRecord::leg(
            OrderIntent::limit(
                routing,
                side.opposite(),
                qty,
                prices.target,
                TimeInForce::GoodTilCancelled,
            ),
            group_id.clone(),
            LegRole::Target,
        );
        let entry_id = entry.id.clone();
        let group = BracketGroup::new(
            group_id.clone(),
            entry_id.clone(),
            stop.id.clone(),
            target.id.clone(),
        );
        self.registry.insert_bracket(group, entry, stop, target);

        // A failed entry submission already cascaded the legs.
        self.submit(entry_id).await?;
        Ok(self.registry.group(&group_id)?)
    }

    async fn place(&self, intent: OrderIntent, reference_price: Price) -> EngineResult<OrderSnapshot> {
        self.validator.validate(
            &intent,
            &self.account,
            reference_price,
            self.registry.active_risk_order_count(),
        )?;
        let record = self.registry.insert_order(OrderRecord::new(intent));
        self.submit(record.id).await
    }

    async fn submit(&self, order_id: OrderId) -> EngineResult<OrderSnapshot> {
        Ok(self.dispatcher.submit(order_id).await?)
    }

    async fn resolve(&self, symbol: &str, exchange: Option<&str>) -> EngineResult<Routing> {
        match self.resolver.resolve(symbol, exchange).await {
            Ok(routing) => Ok(routing),
            Err(err) => {
                let reason = RejectReason::ResolutionFailed {
                    symbol: err.symbol,
                    detail: err.detail,
                };
                warn!(symbol, code = reason.code(), "symbol resolution failed: {reason}");
                self.audit.record(AuditEvent::rejection(
                    AuditSubject::Intent(format!("unresolved {symbol}")),
                    &reason,
                ));
                Err(reason.into())
            }
        }
    }

    // ========================================================
    // Modification
    // ========================================================

    /// Modify a working order. `reference_price` is needed when the stop
    /// price moves, for the side and distance checks.
    pub async fn modify(
        &self,
        order_id: &OrderId,
        changes: OrderChanges,
        reference_price: Option<Price>,
    ) -> EngineResult<OrderSnapshot> {
        let record = self.registry.require(order_id)?;
        self.validator
            .validate_modify(&record.intent, order_id, &changes, reference_price)?;
        self.registry.begin_modify(order_id, changes)?;
        Ok(self.dispatcher.modify(order_id.clone(), changes).await?)
    }

    /// Modify a protective stop. Refuses non-stop orders.
    pub async fn modify_stop(
        &self,
        order_id: &OrderId,
        changes: OrderChanges,
        reference_price: Option<Price>,
    ) -> EngineResult<OrderSnapshot> {
        self.require_stop(order_id)?;
        self.modify(order_id, changes, reference_price).await
    }

    // ========================================================
    // Cancellation
    // ========================================================

    /// Cancel an order. Idempotent: a terminal order returns its snapshot
    /// unchanged. Never gated by the kill switch.
    pub async fn cancel(&self, order_id: &OrderId) -> EngineResult<OrderSnapshot> {
        let (outcome, follow_ups) = self.registry.request_cancel(order_id)?;
        self.run_follow_ups(follow_ups);
        Ok(outcome.record().clone())
    }

    /// Cancel a protective stop. Refuses non-stop orders.
    pub async fn cancel_stop(&self, order_id: &OrderId) -> EngineResult<OrderSnapshot> {
        self.require_stop(order_id)?;
        self.cancel(order_id).await
    }

    /// Request cancellation of every open order. Returns the number of
    /// orders a cancel was initiated for.
    pub async fn cancel_all(&self) -> usize {
        let mut requested = 0;
        for record in self.registry.list_open() {
            match self.registry.request_cancel(&record.id) {
                // A bracket cascade may have beaten us to this leg.
                Ok((CancelOutcome::AlreadyTerminal(_), _)) => {}
                Ok((_, follow_ups)) => {
                    requested += 1;
                    self.run_follow_ups(follow_ups);
                }
                // In-flight submissions resolve through the dispatcher; a
                // later sweep can pick them up.
                Err(err) => {
                    warn!(order_id = %record.id, "cancel-all skipped order: {err}");
                }
            }
        }
        info!(requested, "cancel-all sweep complete");
        requested
    }

    fn run_follow_ups(&self, follow_ups: Vec<FollowUp>) {
        for follow_up in follow_ups {
            match follow_up {
                FollowUp::RequestCancel(order_id) => self.dispatcher.request_cancel(order_id),
                // Cancellation never activates legs.
                FollowUp::SubmitLeg(_) => {}
            }
        }
    }

    fn require_stop(&self, order_id: &OrderId) -> EngineResult<OrderRecord> {
        let record = self.registry.require(order_id)?;
        if !record.intent.is_risk_order() {
            return Err(RejectReason::NotAStopOrder {
                order_id: order_id.clone(),
            }
            .into());
        }
        Ok(record)
    }

    // ========================================================
    // Queries
    // ========================================================

    /// Snapshot of one order.
    pub fn get_status(&self, order_id: &OrderId) -> EngineResult<OrderSnapshot> {
        Ok(self.registry.require(order_id)?)
    }

    /// Snapshot of a bracket group and all three legs.
    pub fn get_group(&self, group_id: &GroupId) -> EngineResult<BracketSnapshot> {
        Ok(self.registry.group(group_id)?)
    }

    /// All live protective stops, oldest first.
    #[must_use]
    pub fn list_stops(&self) -> Vec<OrderSnapshot> {
        self.registry.list_active_stops()
    }

    /// All non-terminal orders, oldest first.
    #[must_use]
    pub fn list_open_orders(&self) -> Vec<OrderSnapshot> {
        self.registry.list_open()
    }

    // ========================================================
    // Kill switch
    // ========================================================

    /// Trigger the kill switch. No credential required.
    pub fn activate_kill_switch(&self, reason: &str) {
        self.kill_switch.activate(reason);
    }

    /// Rearm the kill switch with the policy's override credential.
    pub fn deactivate_kill_switch(&self, override_code: &str) -> EngineResult<()> {
        Ok(self.kill_switch.deactivate(override_code)?)
    }

    /// Current kill switch state.
    #[must_use]
    pub fn kill_switch_state(&self) -> KillSwitchState {
        self.kill_switch.state()
    }

    // ========================================================
    // Lifecycle
    // ========================================================

    /// Stop the dispatch loop and wait for it to drain. Jobs queued ahead
    /// of the shutdown marker are still processed.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown();
        let join = self.dispatcher_join.lock().take();
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}
