//! Sliding-window order rate limiter.
//!
//! Tracks submission timestamps over a fixed 60-second window. A slot is
//! taken at validation time so two orders racing through the validator can
//! never both squeeze past the last remaining slot.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Width of the sliding window.
const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter over order submissions.
///
/// Prune, check and push happen under a single lock so the check-then-act
/// is atomic with respect to concurrent callers.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_minute: u32,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` acquisitions per window.
    #[must_use]
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            timestamps: Mutex::new(VecDeque::with_capacity(max_per_minute as usize + 1)),
        }
    }

    /// Configured ceiling.
    #[must_use]
    pub fn max_per_minute(&self) -> u32 {
        self.max_per_minute
    }

    /// Try to take a slot at `now`. Returns false when the window is full.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut timestamps = self.timestamps.lock();
        Self::prune(&mut timestamps, now);
        if timestamps.len() >= self.max_per_minute as usize {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Try to take a slot at the current time.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Give back the most recently taken slot.
    ///
    /// Used when a later validation step rejects the order after the rate
    /// slot was already reserved.
    pub fn release_one(&self) {
        self.timestamps.lock().pop_back();
    }

    /// Number of live entries in the window at `now`.
    pub fn current_count_at(&self, now: Instant) -> usize {
        let mut timestamps = self.timestamps.lock();
        Self::prune(&mut timestamps, now);
        timestamps.len()
    }

    /// Number of live entries in the window at the current time.
    pub fn current_count(&self) -> usize {
        self.current_count_at(Instant::now())
    }

    fn prune(timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= WINDOW {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
