//! Paper venue and fixture symbol resolution.
//!
//! The paper venue acknowledges every submission, confirms cancels through
//! the event stream like a real venue would, and leaves fills to the caller
//! (a test or the session driver) to script through [`PaperVenue::fill`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use aegis_core::{
    AssetClass, FillEvent, OrderChanges, OrderId, Price, Qty, ResolveError, Routing, SubmitAck,
    SymbolResolver, VenueConnector, VenueError, VenueEvent, VenueOrder,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// In-process venue connector for paper sessions.
pub struct PaperVenue {
    events_tx: mpsc::Sender<VenueEvent>,
    next_id: AtomicU64,
    live: Mutex<HashSet<OrderId>>,
}

impl PaperVenue {
    pub fn new(events_tx: mpsc::Sender<VenueEvent>) -> Self {
        Self {
            events_tx,
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
        }
    }

    /// Script a fill for an acknowledged order.
    pub async fn fill(&self, order_id: &OrderId, qty: Qty, price: Price) {
        let event = VenueEvent::Fill(FillEvent::new(order_id.clone(), qty, price));
        let _ = self.events_tx.send(event).await;
    }

    /// Script an expiry for an acknowledged order.
    pub async fn expire(&self, order_id: &OrderId) {
        let _ = self
            .events_tx
            .send(VenueEvent::expired(order_id.clone()))
            .await;
    }
}

#[async_trait]
impl VenueConnector for PaperVenue {
    async fn submit(&self, order: VenueOrder) -> Result<SubmitAck, VenueError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(order.order_id.clone());
        debug!(order_id = %order.order_id, "paper venue accepted order");
        Ok(SubmitAck {
            order_id: order.order_id,
            venue_id: format!("PAPER-{n}"),
        })
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<(), VenueError> {
        if !self.live.lock().remove(order_id) {
            return Err(VenueError::rejected("unknown order"));
        }
        // Confirmation flows back through the event stream. try_send because
        // this runs inside the dispatch loop that also drains the channel.
        if let Err(err) = self
            .events_tx
            .try_send(VenueEvent::cancelled(order_id.clone()))
        {
            warn!(order_id = %order_id, "paper venue could not confirm cancel: {err}");
        }
        Ok(())
    }

    async fn modify(&self, order_id: &OrderId, _changes: OrderChanges) -> Result<(), VenueError> {
        if !self.live.lock().contains(order_id) {
            return Err(VenueError::rejected("unknown order"));
        }
        Ok(())
    }
}

/// Static symbol table standing in for a reference-data service.
pub struct PaperResolver {
    table: HashMap<String, Routing>,
}

impl Default for PaperResolver {
    fn default() -> Self {
        let mut table = HashMap::new();
        for symbol in ["AAPL", "MSFT", "TSLA", "SPY"] {
            table.insert(symbol.to_string(), Routing::equity(symbol, "SMART", "USD"));
        }
        table.insert(
            "BMW".to_string(),
            Routing::new("BMW", "IBIS", "EUR", AssetClass::Equity),
        );
        table.insert("EUR.USD".to_string(), Routing::forex("EUR.USD", "USD"));
        Self { table }
    }
}

#[async_trait]
impl SymbolResolver for PaperResolver {
    async fn resolve(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> Result<Routing, ResolveError> {
        let mut routing = self
            .table
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| ResolveError::new(symbol, "no matching instrument"))?;
        if let Some(exchange) = exchange {
            routing.exchange = exchange.to_string();
        }
        Ok(routing)
    }
}
