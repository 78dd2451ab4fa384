//! Prometheus metrics for the order safety engine.
//!
//! Covers the hot paths an operator watches during a session:
//! - Validation outcomes and rejection codes
//! - Venue submissions and acknowledgment latency
//! - Order state transitions and dropped anomalous events
//! - Kill switch state and daily quota consumption
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_gauge,
    CounterVec, Encoder, Histogram, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Validation outcomes.
/// Labels: outcome (allowed/rejected)
pub static VALIDATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aegis_validations_total",
        "Total order intents validated",
        &["outcome"]
    )
    .unwrap()
});

/// Rejections by taxonomy code.
pub static REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aegis_rejections_total",
        "Total rejections by reason code",
        &["code"]
    )
    .unwrap()
});

/// Venue submission outcomes.
/// Labels: result (accepted/venue_rejected/connectivity)
pub static SUBMISSIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aegis_submissions_total",
        "Total venue submissions by outcome",
        &["result"]
    )
    .unwrap()
});

/// Venue acknowledgment latency in milliseconds.
pub static ACK_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "aegis_ack_latency_ms",
        "Venue acknowledgment latency in milliseconds",
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Order state transitions by destination status.
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aegis_order_transitions_total",
        "Total order state transitions by destination status",
        &["status"]
    )
    .unwrap()
});

/// Venue events dropped as anomalous (unknown order, impossible transition,
/// overfill).
pub static ANOMALIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "aegis_anomalous_events_total",
        "Total venue events dropped as anomalous"
    )
    .unwrap()
});

/// Kill switch state (1 = triggered, 0 = armed).
pub static KILL_SWITCH_TRIGGERED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "aegis_kill_switch_triggered",
        "Kill switch state (1=triggered)"
    )
    .unwrap()
});

/// Confirmed submissions against today's quota.
pub static DAILY_ORDERS_CONFIRMED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "aegis_daily_orders_confirmed",
        "Confirmed submissions counted against the daily limit"
    )
    .unwrap()
});

/// Audit events dropped by a backpressured sink.
pub static AUDIT_EVENTS_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "aegis_audit_events_dropped_total",
        "Audit events dropped because the sink channel was full"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a passed validation.
    pub fn validation_allowed() {
        VALIDATIONS_TOTAL.with_label_values(&["allowed"]).inc();
    }

    /// Record a rejected validation with its taxonomy code.
    pub fn validation_rejected(code: &str) {
        VALIDATIONS_TOTAL.with_label_values(&["rejected"]).inc();
        REJECTIONS_TOTAL.with_label_values(&[code]).inc();
    }

    /// Record a venue submission outcome.
    pub fn submission(result: &str) {
        SUBMISSIONS_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record venue acknowledgment latency.
    pub fn ack_latency(latency_ms: f64) {
        ACK_LATENCY_MS.observe(latency_ms);
    }

    /// Record an order state transition.
    pub fn transition(status: &str) {
        TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
    }

    /// Record a dropped anomalous venue event.
    pub fn anomaly() {
        ANOMALIES_TOTAL.inc();
    }

    /// Set kill switch state.
    pub fn kill_switch(triggered: bool) {
        KILL_SWITCH_TRIGGERED.set(if triggered { 1 } else { 0 });
    }

    /// Update the confirmed daily quota gauge.
    pub fn daily_confirmed(count: u32) {
        DAILY_ORDERS_CONFIRMED.set(i64::from(count));
    }

    /// Record an audit event dropped on sink overflow.
    pub fn audit_dropped() {
        AUDIT_EVENTS_DROPPED_TOTAL.inc();
    }
}

/// Encode every registered metric in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
