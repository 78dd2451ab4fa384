//! Daily order counter with UTC-midnight reset.
//!
//! The counter distinguishes confirmed orders (venue acknowledged) from
//! in-flight reservations. A slot is reserved atomically at validation
//! time, committed when the venue acknowledges, and released when the
//! submission dies before acknowledgment. Only confirmed orders count
//! toward the published daily total, but reservations occupy capacity so
//! concurrent submissions cannot overshoot the cap.
//!
//! The reset is lazy: the first touch after UTC midnight rolls the window.
//! There is no background timer.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug)]
struct DayWindow {
    day: NaiveDate,
    confirmed: u32,
    reserved: u32,
}

impl DayWindow {
    fn roll(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.day {
            debug!(
                from = %self.day,
                to = %today,
                confirmed = self.confirmed,
                "daily counter rolled over"
            );
            self.day = today;
            self.confirmed = 0;
            self.reserved = 0;
        }
    }
}

/// Per-UTC-day order counter with reservation semantics.
#[derive(Debug)]
pub struct DailyCounter {
    max_per_day: u32,
    window: Mutex<DayWindow>,
}

impl DailyCounter {
    /// Create a counter capped at `max_per_day` confirmed orders.
    #[must_use]
    pub fn new(max_per_day: u32) -> Self {
        Self {
            max_per_day,
            window: Mutex::new(DayWindow {
                day: Utc::now().date_naive(),
                confirmed: 0,
                reserved: 0,
            }),
        }
    }

    /// Configured ceiling.
    #[must_use]
    pub fn max_per_day(&self) -> u32 {
        self.max_per_day
    }

    /// Atomically check capacity and reserve a slot at `now`.
    ///
    /// Returns false when confirmed plus reserved orders already fill the
    /// day's cap.
    pub fn check_and_reserve_at(&self, now: DateTime<Utc>) -> bool {
        let mut window = self.window.lock();
        window.roll(now);
        if window.confirmed + window.reserved >= self.max_per_day {
            return false;
        }
        window.reserved += 1;
        true
    }

    /// Atomically check capacity and reserve a slot at the current time.
    pub fn check_and_reserve(&self) -> bool {
        self.check_and_reserve_at(Utc::now())
    }

    /// Convert a reservation into a confirmed order at `now`.
    ///
    /// Called on venue acknowledgment. If the day rolled while the order was
    /// in flight the reservation is gone, but the acknowledgment still counts
    /// toward the new day.
    pub fn commit_at(&self, now: DateTime<Utc>) {
        let mut window = self.window.lock();
        window.roll(now);
        if window.reserved > 0 {
            window.reserved -= 1;
        } else {
            debug!("daily commit without live reservation, counting confirmed only");
        }
        window.confirmed += 1;
    }

    /// Convert a reservation into a confirmed order at the current time.
    pub fn commit(&self) {
        self.commit_at(Utc::now());
    }

    /// Drop a reservation without confirming, at `now`.
    ///
    /// Called when the submission fails before the venue acknowledges.
    pub fn release_at(&self, now: DateTime<Utc>) {
        let mut window = self.window.lock();
        window.roll(now);
        window.reserved = window.reserved.saturating_sub(1);
    }

    /// Drop a reservation without confirming, at the current time.
    pub fn release(&self) {
        self.release_at(Utc::now());
    }

    /// Confirmed order count for the day containing `now`.
    pub fn confirmed_count_at(&self, now: DateTime<Utc>) -> u32 {
        let mut window = self.window.lock();
        window.roll(now);
        window.confirmed
    }

    /// Confirmed order count for the current UTC day.
    pub fn confirmed_count(&self) -> u32 {
        self.confirmed_count_at(Utc::now())
    }

    /// Live reservation count for the day containing `now`.
    pub fn reserved_count_at(&self, now: DateTime<Utc>) -> u32 {
        let mut window = self.window.lock();
        window.roll(now);
        window.reserved
    }
}
