//! Telemetry: structured logging, Prometheus metrics, and audit sinks.
//!
//! Other crates record through the [`Metrics`] facade; binaries call
//! [`init_logging`] once at startup and expose [`gather_metrics`] output
//! wherever they report from.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_metrics, Metrics};
pub use sink::{ChannelAuditSink, TracingAuditSink};
