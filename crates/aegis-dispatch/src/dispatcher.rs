//! The venue dispatch loop.
//!
//! A single task owns every interaction with the venue connector: order
//! submissions, cancel requests, modifications, and the asynchronous venue
//! event stream. Serializing all of it through one loop means registry
//! updates for submissions never race updates for fills, and bracket
//! follow-up work (submitting activated legs, cancelling siblings) happens
//! in a deterministic order.
//!
//! Submission quota is settled here: an acknowledged submission commits the
//! daily reservation taken at validation time; a refused or timed-out one
//! releases it, so failed submissions never consume the day's allowance.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aegis_core::{
    OrderChanges, OrderId, OrderStatus, RejectReason, VenueConnector, VenueError, VenueEvent,
    VenueOrder,
};
use aegis_registry::{FollowUp, OrderRecord, OrderRegistry};
use aegis_safety::DailyCounter;
use aegis_telemetry::Metrics;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;

/// Reply channel for jobs whose caller waits for the venue outcome.
pub type DispatchReply = oneshot::Sender<Result<OrderRecord, RejectReason>>;

// ============================================================
// Jobs
// ============================================================

/// Work items consumed by the dispatch loop.
pub enum DispatchJob {
    /// Submit a registered order currently in `PendingSubmit`.
    ///
    /// `quota_reserved` is true for caller-initiated submissions that hold
    /// a daily reservation; protective-leg activations run with `false`
    /// and never touch the counters.
    Submit {
        order_id: OrderId,
        quota_reserved: bool,
        reply: Option<DispatchReply>,
    },
    /// Ask the venue to cancel an order. Confirmation arrives as a venue
    /// event, not as a reply.
    Cancel { order_id: OrderId },
    /// Send a modification for an order parked in `PendingModify`.
    Modify {
        order_id: OrderId,
        changes: OrderChanges,
        reply: DispatchReply,
    },
    /// Stop the loop.
    Shutdown,
}

impl std::fmt::Debug for DispatchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit {
                order_id,
                quota_reserved,
                ..
            } => f
                .debug_struct("Submit")
                .field("order_id", order_id)
                .field("quota_reserved", quota_reserved)
                .finish(),
            Self::Cancel { order_id } => {
                f.debug_struct("Cancel").field("order_id", order_id).finish()
            }
            Self::Modify { order_id, .. } => {
                f.debug_struct("Modify").field("order_id", order_id).finish()
            }
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

// ============================================================
// Handle
// ============================================================

/// Cloneable handle for enqueueing work on the dispatch loop.
#[derive(Clone)]
pub struct DispatcherHandle {
    jobs_tx: mpsc::UnboundedSender<DispatchJob>,
}

impl DispatcherHandle {
    /// Submit an order and wait for the venue outcome.
    ///
    /// The order must already be registered and hold its quota reservation.
    pub async fn submit(&self, order_id: OrderId) -> Result<OrderRecord, RejectReason> {
        let (tx, rx) = oneshot::channel();
        self.jobs_tx
            .send(DispatchJob::Submit {
                order_id,
                quota_reserved: true,
                reply: Some(tx),
            })
            .map_err(|_| dispatcher_gone())?;
        rx.await.map_err(|_| dispatcher_gone())?
    }

    /// Enqueue a venue cancel. Fire-and-forget; the cancellation confirms
    /// through the event stream.
    pub fn request_cancel(&self, order_id: OrderId) {
        let _ = self.jobs_tx.send(DispatchJob::Cancel { order_id });
    }

    /// Send a modification and wait for the venue outcome.
    pub async fn modify(
        &self,
        order_id: OrderId,
        changes: OrderChanges,
    ) -> Result<OrderRecord, RejectReason> {
        let (tx, rx) = oneshot::channel();
        self.jobs_tx
            .send(DispatchJob::Modify {
                order_id,
                changes,
                reply: tx,
            })
            .map_err(|_| dispatcher_gone())?;
        rx.await.map_err(|_| dispatcher_gone())?
    }

    /// Stop the dispatch loop. Jobs already queued ahead of the shutdown
    /// marker are still processed.
    pub fn shutdown(&self) {
        let _ = self.jobs_tx.send(DispatchJob::Shutdown);
    }
}

fn dispatcher_gone() -> RejectReason {
    RejectReason::ConnectivityFailure {
        detail: "dispatcher is not running".to_string(),
    }
}

// ============================================================
// Task
// ============================================================

/// The dispatch loop state. Constructed through [`spawn_dispatcher`].
pub struct DispatcherTask {
    jobs_rx: mpsc::UnboundedReceiver<DispatchJob>,
    /// Clone of the job sender for enqueueing registry follow-up work.
    jobs_tx: mpsc::UnboundedSender<DispatchJob>,
    events_rx: mpsc::Receiver<VenueEvent>,
    connector: Arc<dyn VenueConnector>,
    registry: Arc<OrderRegistry>,
    daily: Arc<DailyCounter>,
    ack_timeout: Duration,
}

impl DispatcherTask {
    /// Process jobs and venue events until shutdown.
    pub async fn run(mut self) {
        debug!("dispatcher started");
        loop {
            tokio::select! {
                Some(job) = self.jobs_rx.recv() => {
                    if matches!(job, DispatchJob::Shutdown) {
                        debug!("dispatcher shutting down");
                        break;
                    }
                    self.handle_job(job).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }
                else => {
                    debug!("dispatcher channels closed");
                    break;
                }
            }
        }
        debug!("dispatcher stopped");
    }

    async fn handle_job(&mut self, job: DispatchJob) {
        match job {
            DispatchJob::Submit {
                order_id,
                quota_reserved,
                reply,
            } => {
                let result = self.submit(&order_id, quota_reserved).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            DispatchJob::Cancel { order_id } => self.cancel(&order_id).await,
            DispatchJob::Modify {
                order_id,
                changes,
                reply,
            } => {
                let result = self.modify(&order_id, changes).await;
                let _ = reply.send(result);
            }
            DispatchJob::Shutdown => unreachable!("shutdown handled in run()"),
        }
    }

    fn handle_event(&self, event: VenueEvent) {
        debug!(order_id = %event.order_id(), "venue event received");
        for follow_up in self.registry.apply_event(&event) {
            let job = match follow_up {
                FollowUp::SubmitLeg(order_id) => DispatchJob::Submit {
                    order_id,
                    quota_reserved: false,
                    reply: None,
                },
                FollowUp::RequestCancel(order_id) => DispatchJob::Cancel { order_id },
            };
            let _ = self.jobs_tx.send(job);
        }
    }

    async fn submit(
        &self,
        order_id: &OrderId,
        quota_reserved: bool,
    ) -> Result<OrderRecord, RejectReason> {
        let record = self.registry.require(order_id)?;
        if record.status != OrderStatus::PendingSubmit {
            // A leg can be cancelled between activation and dispatch.
            debug!(order_id = %order_id, status = %record.status, "skipping stale submit job");
            if quota_reserved {
                self.daily.release();
            }
            return Ok(record);
        }

        let venue_order = VenueOrder::from_intent(record.id.clone(), &record.intent);
        self.registry.mark_submitted(order_id);
        info!(order_id = %order_id, intent = %record.intent.summary(), "submitting to venue");

        let started = Instant::now();
        match timeout(self.ack_timeout, self.connector.submit(venue_order)).await {
            Ok(Ok(ack)) => {
                Metrics::ack_latency(started.elapsed().as_secs_f64() * 1000.0);
                Metrics::submission("accepted");
                self.registry.on_venue_accepted(order_id, &ack.venue_id);
                if quota_reserved {
                    self.daily.commit();
                    Metrics::daily_confirmed(self.daily.confirmed_count());
                }
                self.registry.require(order_id)
            }
            Ok(Err(VenueError::Rejected { reason })) => {
                Metrics::submission("venue_rejected");
                self.fail_submit(order_id, RejectReason::VenueRejected { reason }, quota_reserved)
            }
            Ok(Err(VenueError::Transport { detail })) => {
                Metrics::submission("connectivity");
                self.fail_submit(order_id, RejectReason::ConnectivityFailure { detail }, quota_reserved)
            }
            Err(_) => {
                Metrics::submission("connectivity");
                self.fail_submit(
                    order_id,
                    RejectReason::ConnectivityFailure {
                        detail: format!(
                            "no acknowledgment within {} ms",
                            self.ack_timeout.as_millis()
                        ),
                    },
                    quota_reserved,
                )
            }
        }
    }

    fn fail_submit(
        &self,
        order_id: &OrderId,
        reason: RejectReason,
        quota_reserved: bool,
    ) -> Result<OrderRecord, RejectReason> {
        let follow_ups = self.registry.on_submit_rejected(order_id, &reason);
        if quota_reserved {
            self.daily.release();
        }
        for follow_up in follow_ups {
            let job = match follow_up {
                FollowUp::SubmitLeg(id) => DispatchJob::Submit {
                    order_id: id,
                    quota_reserved: false,
                    reply: None,
                },
                FollowUp::RequestCancel(id) => DispatchJob::Cancel { order_id: id },
            };
            let _ = self.jobs_tx.send(job);
        }
        Err(reason)
    }

    async fn cancel(&self, order_id: &OrderId) {
        match timeout(self.ack_timeout, self.connector.cancel(order_id)).await {
            Ok(Ok(())) => {
                debug!(order_id = %order_id, "venue accepted cancel request");
            }
            Ok(Err(err)) => {
                // The order keeps its current status; the caller can retry.
                warn!(order_id = %order_id, "venue cancel failed: {err}");
            }
            Err(_) => {
                warn!(
                    order_id = %order_id,
                    timeout_ms = self.ack_timeout.as_millis() as u64,
                    "venue cancel timed out, order state unchanged"
                );
            }
        }
    }

    async fn modify(
        &self,
        order_id: &OrderId,
        changes: OrderChanges,
    ) -> Result<OrderRecord, RejectReason> {
        match timeout(
            self.ack_timeout,
            self.connector.modify(order_id, changes),
        )
        .await
        {
            Ok(Ok(())) => self
                .registry
                .complete_modify(order_id)
                .ok_or_else(|| RejectReason::UnknownOrder {
                    order_id: order_id.clone(),
                }),
            Ok(Err(VenueError::Rejected { reason })) => {
                let reason = RejectReason::VenueRejected { reason };
                self.registry.fail_modify(order_id, &reason);
                Err(reason)
            }
            Ok(Err(VenueError::Transport { detail })) => {
                let reason = RejectReason::ConnectivityFailure { detail };
                self.registry.fail_modify(order_id, &reason);
                Err(reason)
            }
            Err(_) => {
                let reason = RejectReason::ConnectivityFailure {
                    detail: format!(
                        "modify not acknowledged within {} ms",
                        self.ack_timeout.as_millis()
                    ),
                };
                self.registry.fail_modify(order_id, &reason);
                Err(reason)
            }
        }
    }
}

// ============================================================
// Spawn
// ============================================================

/// Spawn the dispatch loop.
///
/// `events_rx` is the venue event stream; the same channel's sender side
/// belongs to the venue connector adapter.
#[must_use]
pub fn spawn_dispatcher(
    config: &DispatchConfig,
    connector: Arc<dyn VenueConnector>,
    registry: Arc<OrderRegistry>,
    daily: Arc<DailyCounter>,
    events_rx: mpsc::Receiver<VenueEvent>,
) -> (DispatcherHandle, JoinHandle<()>) {
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    let task = DispatcherTask {
        jobs_rx,
        jobs_tx: jobs_tx.clone(),
        events_rx,
        connector,
        registry,
        daily,
        ack_timeout: config.ack_timeout(),
    };
    let handle = DispatcherHandle { jobs_tx };
    let join_handle = tokio::spawn(task.run());
    (handle, join_handle)
}

// ============================================================
// Tests
// ============================================================
