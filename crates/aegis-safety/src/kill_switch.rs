//! Global kill switch.
//!
//! The kill switch is a one-way latch: anyone (human or automated monitor)
//! may trigger it, and while triggered every new order is refused before any
//! other validation runs. Rearming is deliberately asymmetric and requires
//! the override credential from the safety policy.
//!
//! Cancellations are NOT gated by the switch. Flattening risk while halted
//! must always remain possible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aegis_core::{AuditEvent, AuditKind, AuditSink};
use aegis_telemetry::Metrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{SafetyError, SafetyResult};

// ============================================================
// State
// ============================================================

/// Observable state of the kill switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KillSwitchState {
    /// Normal operation, orders flow.
    Armed,
    /// Halted. New orders are refused until rearmed with the override code.
    Triggered {
        reason: String,
        since: DateTime<Utc>,
    },
}

impl KillSwitchState {
    /// True when the switch is in the triggered (halted) state.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self, KillSwitchState::Triggered { .. })
    }
}

#[derive(Debug, Clone)]
struct TriggerInfo {
    reason: String,
    since: DateTime<Utc>,
}

// ============================================================
// Kill switch
// ============================================================

/// One-way safety latch shared across the engine.
///
/// `triggered` is a lock-free fast path for the validator hot path. The
/// lock guards the trigger metadata and serializes state transitions so a
/// concurrent activate/deactivate pair cannot interleave.
pub struct KillSwitch {
    triggered: AtomicBool,
    info: RwLock<Option<TriggerInfo>>,
    override_code: String,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

impl KillSwitch {
    /// Create an armed kill switch.
    pub fn new(override_code: impl Into<String>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            triggered: AtomicBool::new(false),
            info: RwLock::new(None),
            override_code: override_code.into(),
            audit,
        }
    }

    /// Lock-free check for the validator hot path.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Current state with trigger metadata.
    #[must_use]
    pub fn state(&self) -> KillSwitchState {
        match self.info.read().as_ref() {
            Some(info) => KillSwitchState::Triggered {
                reason: info.reason.clone(),
                since: info.since,
            },
            None => KillSwitchState::Armed,
        }
    }

    /// Reason the switch was triggered, if it is.
    #[must_use]
    pub fn trigger_reason(&self) -> Option<String> {
        self.info.read().as_ref().map(|info| info.reason.clone())
    }

    /// Trigger the switch. No credential required.
    ///
    /// Idempotent: triggering an already-triggered switch keeps the original
    /// reason and timestamp.
    pub fn activate(&self, reason: &str) {
        let mut guard = self.info.write();
        if guard.is_some() {
            warn!(reason = %reason, "kill switch already triggered, ignoring repeat activation");
            return;
        }
        let since = Utc::now();
        *guard = Some(TriggerInfo {
            reason: reason.to_string(),
            since,
        });
        self.triggered.store(true, Ordering::SeqCst);
        drop(guard);

        Metrics::kill_switch(true);
        warn!(reason = %reason, "KILL SWITCH TRIGGERED, all new orders halted");
        self.audit.record(AuditEvent::system(
            AuditKind::KillSwitchActivated,
            format!("kill switch triggered: {reason}"),
        ));
    }

    /// Rearm the switch. Requires the override credential.
    ///
    /// A wrong credential leaves the switch triggered and returns
    /// [`SafetyError::Unauthorized`]. Rearming an already-armed switch is a
    /// no-op.
    pub fn deactivate(&self, override_code: &str) -> SafetyResult<()> {
        let mut guard = self.info.write();
        if guard.is_none() {
            return Ok(());
        }
        if override_code != self.override_code {
            warn!("kill switch rearm refused, override code mismatch");
            return Err(SafetyError::Unauthorized);
        }
        *guard = None;
        self.triggered.store(false, Ordering::SeqCst);
        drop(guard);

        Metrics::kill_switch(false);
        info!("kill switch rearmed, order flow restored");
        self.audit.record(AuditEvent::system(
            AuditKind::KillSwitchDeactivated,
            "kill switch rearmed with override".to_string(),
        ));
        Ok(())
    }
}
