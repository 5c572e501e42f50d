//! Periodic flush schedule.
//!
//! The schedule owns no timer. Hosts feed it the current time through
//! `poll`, which makes tests deterministic and lets the host pick the clock.

use std::cell::Cell;

/// Cancellable fixed-interval schedule.
#[derive(Debug)]
pub struct SyncSchedule {
    interval_ms: u64,
    next_due_at_ms: Cell<Option<i64>>,
}

impl SyncSchedule {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            next_due_at_ms: Cell::new(None),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Arms the schedule; the first tick is due one interval after `now_ms`.
    pub fn start(&self, now_ms: i64) {
        self.next_due_at_ms.set(Some(self.due_after(now_ms)));
    }

    /// Cancels pending ticks. Does not interrupt a flush already running.
    pub fn stop(&self) {
        self.next_due_at_ms.set(None);
    }

    pub fn is_active(&self) -> bool {
        self.next_due_at_ms.get().is_some()
    }

    pub fn next_due_at_ms(&self) -> Option<i64> {
        self.next_due_at_ms.get()
    }

    /// Returns `true` when a tick is due at `now_ms` and re-arms for the next
    /// interval. Missed intervals collapse into a single tick.
    pub fn poll(&self, now_ms: i64) -> bool {
        match self.next_due_at_ms.get() {
            Some(due) if now_ms >= due => {
                self.next_due_at_ms.set(Some(self.due_after(now_ms)));
                true
            }
            _ => false,
        }
    }

    fn due_after(&self, now_ms: i64) -> i64 {
        let interval = i64::try_from(self.interval_ms).unwrap_or(i64::MAX);
        now_ms.saturating_add(interval)
    }
}
