//! Venue dispatch.
//!
//! One task, spawned by [`spawn_dispatcher`], is the only code path that
//! talks to the venue connector. Everything the engine needs from the venue
//! goes through a [`DispatcherHandle`]; everything the venue reports comes
//! back through the event channel and is reconciled into the registry by
//! the same task.

pub mod config;
pub mod dispatcher;

pub use config::DispatchConfig;
pub use dispatcher::{spawn_dispatcher, DispatchJob, DispatcherHandle, DispatcherTask};
