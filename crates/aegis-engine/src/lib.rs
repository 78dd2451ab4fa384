//! Engine wiring and the caller-facing trading facade.
//!
//! [`TradingEngine`] composes the safety validator, kill switch, quota
//! counters, order registry, and venue dispatcher into one session object.
//! [`PaperVenue`] and [`PaperResolver`] provide in-process collaborators for
//! paper sessions and tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod paper;

pub use config::AppConfig;
pub use engine::TradingEngine;
pub use error::{EngineError, EngineResult};
pub use paper::{PaperResolver, PaperVenue};
