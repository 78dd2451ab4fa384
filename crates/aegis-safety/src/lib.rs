//! Safety policy enforcement for the trading engine.
//!
//! This crate owns everything that can say "no" before an order reaches a
//! venue:
//!
//! - [`SafetyPolicy`]: configured limits and feature toggles
//! - [`KillSwitch`]: global halt latch with credentialed rearm
//! - [`RateLimiter`]: 60-second sliding-window submission cap
//! - [`DailyCounter`]: per-UTC-day cap with reserve/commit/release
//! - [`Validator`]: the fixed, short-circuiting checklist over all of the
//!   above, auditing every outcome
//!
//! The design principle throughout is to prefer refusing an order over
//! letting an uncertain one through.

pub mod daily;
pub mod error;
pub mod kill_switch;
pub mod policy;
pub mod rate_limit;
pub mod validator;

pub use daily::DailyCounter;
pub use error::{SafetyError, SafetyResult};
pub use kill_switch::{KillSwitch, KillSwitchState};
pub use policy::SafetyPolicy;
pub use rate_limit::RateLimiter;
pub use validator::Validator;
