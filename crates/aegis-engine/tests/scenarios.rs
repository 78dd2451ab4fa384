//! End-to-end session scenarios against the paper venue.

use std::sync::Arc;
use std::time::Duration;

use aegis_core::{
    AuditKind, AuditSink, BracketPrices, MemoryAuditSink, OrderChanges, OrderId, OrderSide,
    OrderStatus, Price, Qty, RejectReason, TimeInForce,
};
use aegis_engine::{AppConfig, EngineError, PaperResolver, PaperVenue, TradingEngine};
use aegis_safety::KillSwitchState;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

struct Session {
    engine: TradingEngine,
    venue: Arc<PaperVenue>,
    sink: Arc<MemoryAuditSink>,
}

fn session(config: AppConfig) -> Session {
    let (events_tx, events_rx) = mpsc::channel(64);
    let venue = Arc::new(PaperVenue::new(events_tx));
    let sink = Arc::new(MemoryAuditSink::default());
    let engine = TradingEngine::new(
        config,
        Arc::new(PaperResolver::default()),
        venue.clone(),
        sink.clone() as Arc<dyn AuditSink>,
        events_rx,
    )
    .unwrap();
    Session {
        engine,
        venue,
        sink,
    }
}

async fn wait_for(engine: &TradingEngine, order_id: &OrderId, want: OrderStatus) {
    for _ in 0..200 {
        if engine.get_status(order_id).ok().map(|r| r.status) == Some(want) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("order {order_id} never reached {want}");
}

async fn place_market(s: &Session, qty: Qty) -> OrderId {
    s.engine
        .place_market("AAPL", None, OrderSide::Buy, qty, Price::new(dec!(100)))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn daily_limit_blocks_the_session_after_the_cap() {
    let mut config = AppConfig::default();
    config.safety.max_daily_orders = 2;
    let s = session(config);

    for _ in 0..2 {
        place_market(&s, Qty::new(dec!(10))).await;
    }

    let err = s
        .engine
        .place_market(
            "AAPL",
            None,
            OrderSide::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::DailyLimitExceeded { max_per_day: 2 })
    ));
    assert_eq!(s.engine.list_open_orders().len(), 2);
    assert_eq!(s.sink.count(AuditKind::Rejected), 1);
}

#[tokio::test]
async fn kill_switch_halts_placements_but_not_cancels() {
    let s = session(AppConfig::default());
    let working = place_market(&s, Qty::new(dec!(10))).await;

    s.engine.activate_kill_switch("manual panic button");
    assert!(matches!(
        s.engine.kill_switch_state(),
        KillSwitchState::Triggered { .. }
    ));

    let err = s
        .engine
        .place_limit(
            "AAPL",
            None,
            OrderSide::Buy,
            Qty::new(dec!(5)),
            Price::new(dec!(100)),
            TimeInForce::Day,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::KillSwitchTriggered { .. })
    ));

    // Flattening risk stays possible while halted.
    s.engine.cancel(&working).await.unwrap();
    wait_for(&s.engine, &working, OrderStatus::Cancelled).await;

    // Rearm requires the override credential.
    assert!(matches!(
        s.engine.deactivate_kill_switch("wrong-code"),
        Err(EngineError::Unauthorized)
    ));
    s.engine.deactivate_kill_switch("LIFT-HALT").unwrap();
    assert_eq!(s.engine.kill_switch_state(), KillSwitchState::Armed);

    s.engine
        .place_limit(
            "AAPL",
            None,
            OrderSide::Buy,
            Qty::new(dec!(5)),
            Price::new(dec!(100)),
            TimeInForce::Day,
        )
        .await
        .unwrap();
    assert_eq!(s.sink.count(AuditKind::KillSwitchActivated), 1);
    assert_eq!(s.sink.count(AuditKind::KillSwitchDeactivated), 1);
}

#[tokio::test]
async fn invalid_bracket_leaves_no_state_behind() {
    let s = session(AppConfig::default());

    // Stop above entry on a buy bracket is inverted.
    let err = s
        .engine
        .place_bracket(
            "AAPL",
            None,
            OrderSide::Buy,
            Qty::new(dec!(10)),
            BracketPrices {
                entry: Price::new(dec!(100)),
                stop: Price::new(dec!(110)),
                target: Price::new(dec!(95)),
            },
            TimeInForce::Day,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::InvalidBracketPricing { .. })
    ));
    assert!(s.engine.list_open_orders().is_empty());
    // One audit event for the whole rejected group.
    assert_eq!(s.sink.count(AuditKind::Rejected), 1);
}

#[tokio::test]
async fn bracket_round_trip_resolves_one_cancels_other() {
    let s = session(AppConfig::default());
    let qty = Qty::new(dec!(5));

    let bracket = s
        .engine
        .place_bracket(
            "MSFT",
            None,
            OrderSide::Buy,
            qty,
            BracketPrices {
                entry: Price::new(dec!(400)),
                stop: Price::new(dec!(392)),
                target: Price::new(dec!(412)),
            },
            TimeInForce::Day,
        )
        .await
        .unwrap();
    assert_eq!(bracket.entry.status, OrderStatus::Working);
    assert_eq!(bracket.stop.status, OrderStatus::PendingActivation);
    assert_eq!(bracket.target.status, OrderStatus::PendingActivation);
    // Protective legs flip to the exit side.
    assert_eq!(bracket.stop.intent.side, OrderSide::Sell);
    assert_eq!(bracket.target.intent.side, OrderSide::Sell);

    s.venue
        .fill(&bracket.entry.id, qty, Price::new(dec!(400)))
        .await;
    wait_for(&s.engine, &bracket.stop.id, OrderStatus::Working).await;
    wait_for(&s.engine, &bracket.target.id, OrderStatus::Working).await;
    assert_eq!(s.engine.list_stops().len(), 1);

    s.venue
        .fill(&bracket.target.id, qty, Price::new(dec!(412)))
        .await;
    wait_for(&s.engine, &bracket.target.id, OrderStatus::Filled).await;
    wait_for(&s.engine, &bracket.stop.id, OrderStatus::Cancelled).await;

    let group = s.engine.get_group(&bracket.group_id).unwrap();
    assert_eq!(group.entry.status, OrderStatus::Filled);
    assert_eq!(group.entry.avg_fill_price, Some(Price::new(dec!(400))));
    assert!(s.engine.list_open_orders().is_empty());
    assert!(s.engine.list_stops().is_empty());
}

#[tokio::test]
async fn unknown_symbol_is_rejected_before_validation() {
    let s = session(AppConfig::default());
    let err = s
        .engine
        .place_market(
            "ZZZZ",
            None,
            OrderSide::Buy,
            Qty::new(dec!(1)),
            Price::new(dec!(10)),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::ResolutionFailed { .. })
    ));
    assert!(s.engine.list_open_orders().is_empty());
    assert_eq!(s.sink.count(AuditKind::Rejected), 1);
    assert_eq!(s.sink.count(AuditKind::Validated), 0);
}

#[tokio::test]
async fn cancel_is_idempotent_on_terminal_orders() {
    let s = session(AppConfig::default());
    let qty = Qty::new(dec!(10));
    let id = place_market(&s, qty).await;
    s.venue.fill(&id, qty, Price::new(dec!(100))).await;
    wait_for(&s.engine, &id, OrderStatus::Filled).await;

    let snapshot = s.engine.cancel(&id).await.unwrap();
    assert_eq!(snapshot.status, OrderStatus::Filled);
    // No cancel was requested or confirmed for the filled order.
    assert_eq!(s.sink.count(AuditKind::CancelRequested), 0);
}

#[tokio::test]
async fn cancel_all_sweeps_every_open_order() {
    let s = session(AppConfig::default());
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(place_market(&s, Qty::new(dec!(10))).await);
    }

    let requested = s.engine.cancel_all().await;
    assert_eq!(requested, 3);
    for id in &ids {
        wait_for(&s.engine, id, OrderStatus::Cancelled).await;
    }
    assert!(s.engine.list_open_orders().is_empty());
}

#[tokio::test]
async fn stop_operations_guard_order_kind() {
    let s = session(AppConfig::default());
    let market_id = place_market(&s, Qty::new(dec!(10))).await;

    let stop = s
        .engine
        .place_stop(
            "AAPL",
            None,
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
            None,
            Price::new(dec!(100)),
        )
        .await
        .unwrap();
    assert_eq!(s.engine.list_stops().len(), 1);

    // Stop-specific operations refuse non-stop orders.
    let err = s.engine.cancel_stop(&market_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::NotAStopOrder { .. })
    ));
    let changes = OrderChanges::default().with_stop_price(Price::new(dec!(94)));
    let err = s
        .engine
        .modify_stop(&market_id, changes, Some(Price::new(dec!(100))))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::NotAStopOrder { .. })
    ));

    // Moving the real stop succeeds and survives the venue round trip.
    let updated = s
        .engine
        .modify_stop(&stop.id, changes, Some(Price::new(dec!(100))))
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Working);
    assert_eq!(updated.intent.stop_price, Some(Price::new(dec!(94))));

    let cancelled = s.engine.cancel_stop(&stop.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Working);
    wait_for(&s.engine, &stop.id, OrderStatus::Cancelled).await;
}

#[tokio::test]
async fn stop_toggle_blocks_standalone_stops_and_brackets() {
    let mut config = AppConfig::default();
    config.safety.stop_loss_enabled = false;
    let s = session(config);

    let err = s
        .engine
        .place_stop(
            "AAPL",
            None,
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(95)),
            None,
            Price::new(dec!(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::StopOrdersDisabled)
    ));

    // The bracket's stop leg must not sneak past the toggle via the
    // limit-kind entry.
    let err = s
        .engine
        .place_bracket(
            "MSFT",
            None,
            OrderSide::Buy,
            Qty::new(dec!(5)),
            BracketPrices {
                entry: Price::new(dec!(400)),
                stop: Price::new(dec!(392)),
                target: Price::new(dec!(412)),
            },
            TimeInForce::Day,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::StopOrdersDisabled)
    ));

    assert!(s.engine.list_stops().is_empty());
    assert!(s.engine.list_open_orders().is_empty());
    assert_eq!(s.sink.count(AuditKind::Rejected), 2);
}

#[tokio::test]
async fn bracket_consumes_one_daily_slot() {
    let mut config = AppConfig::default();
    config.safety.max_daily_orders = 1;
    let s = session(config);
    let qty = Qty::new(dec!(5));

    let bracket = s
        .engine
        .place_bracket(
            "MSFT",
            None,
            OrderSide::Buy,
            qty,
            BracketPrices {
                entry: Price::new(dec!(400)),
                stop: Price::new(dec!(392)),
                target: Price::new(dec!(412)),
            },
            TimeInForce::Day,
        )
        .await
        .unwrap();

    // Leg activation runs without quota even though the day's cap is spent.
    s.venue
        .fill(&bracket.entry.id, qty, Price::new(dec!(400)))
        .await;
    wait_for(&s.engine, &bracket.stop.id, OrderStatus::Working).await;
    wait_for(&s.engine, &bracket.target.id, OrderStatus::Working).await;

    let err = s
        .engine
        .place_market(
            "AAPL",
            None,
            OrderSide::Buy,
            Qty::new(dec!(1)),
            Price::new(dec!(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rejected(RejectReason::DailyLimitExceeded { .. })
    ));
}
