//! Paper-trading session driver.
//!
//! Wires a [`TradingEngine`] against the in-process paper venue, runs a
//! short scripted session (a market order, then a full bracket round trip),
//! and prints the collected metrics on exit.

use std::sync::Arc;
use std::time::Duration;

use aegis_core::{BracketPrices, OrderId, OrderSide, OrderStatus, Price, Qty, TimeInForce};
use aegis_engine::{AppConfig, PaperResolver, PaperVenue, TradingEngine};
use aegis_telemetry::{gather_metrics, init_logging, TracingAuditSink};
use anyhow::bail;
use clap::Parser;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "aegis", about = "Order safety engine, paper session driver")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;

    let config = AppConfig::load(args.config.as_deref())?;
    info!(
        account = %config.account,
        version = env!("CARGO_PKG_VERSION"),
        "starting paper session"
    );

    let (events_tx, events_rx) = mpsc::channel(config.dispatch.event_capacity);
    let venue = Arc::new(PaperVenue::new(events_tx));
    let resolver = Arc::new(PaperResolver::default());
    let audit = Arc::new(TracingAuditSink::new());
    let engine = TradingEngine::new(config, resolver, venue.clone(), audit, events_rx)?;

    // A market order, filled immediately by the paper venue.
    let qty = Qty::new(Decimal::from(10));
    let order = engine
        .place_market("AAPL", None, OrderSide::Buy, qty, price("190")?)
        .await?;
    info!(order_id = %order.id, venue_id = ?order.venue_id, "market order working");
    venue.fill(&order.id, qty, price("189.97")?).await;
    wait_for(&engine, &order.id, OrderStatus::Filled).await?;

    // A full bracket round trip: entry fills, both protective legs go
    // live, the target fills and the stop is cancelled one-cancels-other.
    let qty = Qty::new(Decimal::from(5));
    let bracket = engine
        .place_bracket(
            "MSFT",
            None,
            OrderSide::Buy,
            qty,
            BracketPrices {
                entry: price("400")?,
                stop: price("392")?,
                target: price("412")?,
            },
            TimeInForce::Day,
        )
        .await?;
    info!(group_id = %bracket.group_id, "bracket placed");

    venue.fill(&bracket.entry.id, qty, price("400")?).await;
    wait_for(&engine, &bracket.stop.id, OrderStatus::Working).await?;
    wait_for(&engine, &bracket.target.id, OrderStatus::Working).await?;

    venue.fill(&bracket.target.id, qty, price("412")?).await;
    wait_for(&engine, &bracket.target.id, OrderStatus::Filled).await?;
    wait_for(&engine, &bracket.stop.id, OrderStatus::Cancelled).await?;

    let group = engine.get_group(&bracket.group_id)?;
    info!(
        entry = %group.entry.status,
        stop = %group.stop.status,
        target = %group.target.status,
        open_orders = engine.list_open_orders().len(),
        "session complete"
    );

    engine.shutdown().await;
    println!("{}", gather_metrics()?);
    Ok(())
}

fn price(s: &str) -> anyhow::Result<Price> {
    Ok(Price::new(s.parse()?))
}

async fn wait_for(
    engine: &TradingEngine,
    order_id: &OrderId,
    want: OrderStatus,
) -> anyhow::Result<()> {
    for _ in 0..200 {
        if engine.get_status(order_id)?.status == want {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("order {order_id} never reached {want}")
}
