//! Clock/timer facility.
//!
//! The reminder never sleeps or spawns. It arms timers through [`Clock`] and
//! the host pulls due timers back out through [`TimerSource`], routing each
//! [`Wakeup`] to the reminder it names. This keeps every transition on a
//! single cooperative timeline.

use chrono::Utc;

use super::queue::{Fired, TimerHandle, TimerQueue, Wakeup};
use super::TimerKind;
use crate::reminder::ReminderId;

/// Delayed single-shot and repeating callbacks with cancellation.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;

    fn schedule_once(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle;

    fn schedule_repeating(&mut self, interval_ms: u64, wakeup: Wakeup) -> TimerHandle;

    /// Cancelling a fired or already-cancelled handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// A clock whose due timers can be drained by the host loop.
pub trait TimerSource: Clock {
    /// Next timer due at or before `until_ms`, if any.
    fn next_due(&mut self, until_ms: u64) -> Option<Fired>;

    /// Earliest outstanding deadline.
    fn next_deadline(&self) -> Option<u64>;

    /// Move the clock forward after all due timers were drained.
    /// Real-time clocks ignore this.
    fn settle(&mut self, _now_ms: u64) {}
}

/// Simulated clock. Time only moves when the host drains timers or settles.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: u64,
    queue: TimerQueue,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms,
            queue: TimerQueue::new(),
        }
    }

    /// Total live timers across all reminders.
    pub fn live_handles(&self) -> usize {
        self.queue.len()
    }

    /// Live timers of one kind for one reminder.
    pub fn live_for(&self, reminder: ReminderId, kind: TimerKind) -> usize {
        self.queue.count_for(reminder, kind)
    }

    pub fn live_for_reminder(&self, reminder: ReminderId) -> usize {
        self.queue.count_reminder(reminder)
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.queue.is_live(handle)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule_once(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle {
        self.queue
            .arm(self.now_ms.saturating_add(delay_ms), None, wakeup)
    }

    fn schedule_repeating(&mut self, interval_ms: u64, wakeup: Wakeup) -> TimerHandle {
        self.queue.arm(
            self.now_ms.saturating_add(interval_ms),
            Some(interval_ms),
            wakeup,
        )
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }
}

impl TimerSource for ManualClock {
    fn next_due(&mut self, until_ms: u64) -> Option<Fired> {
        let fired = self.queue.pop_due(until_ms)?;
        self.now_ms = self.now_ms.max(fired.at_ms);
        Some(fired)
    }

    fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }

    fn settle(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}

/// Real-time clock in epoch milliseconds, for the interactive runner.
#[derive(Debug, Default)]
pub struct WallClock {
    queue: TimerQueue,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }

    fn schedule_once(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle {
        let due = self.now_ms().saturating_add(delay_ms);
        self.queue.arm(due, None, wakeup)
    }

    fn schedule_repeating(&mut self, interval_ms: u64, wakeup: Wakeup) -> TimerHandle {
        let due = self.now_ms().saturating_add(interval_ms);
        self.queue.arm(due, Some(interval_ms), wakeup)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }
}

impl TimerSource for WallClock {
    fn next_due(&mut self, until_ms: u64) -> Option<Fired> {
        self.queue.pop_due(until_ms.min(self.now_ms()))
    }

    fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }
}

/// Convert clock milliseconds to a UTC timestamp for events.
pub fn to_datetime(ms: u64) -> chrono::DateTime<Utc> {
    chrono::DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_default()
}
