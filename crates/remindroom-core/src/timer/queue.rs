//! Deadline-ordered timer queue shared by the clock implementations.
//!
//! Timers are ordered by `(due_ms, seq)` so that two timers due at the same
//! instant fire in the order they were armed. Repeating timers keep their
//! handle across firings.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::reminder::ReminderId;

/// Opaque reference to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Which transition a timer drives when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// One-shot end of a reminder cycle.
    Cycle,
    /// Fast recompute of the seconds left in the cycle.
    CycleCountdown,
    /// Fast recompute of the seconds since the last fire.
    SinceFire,
    /// Fast recompute of the seconds until auto-acknowledgement.
    AutoAcknowledgeCountdown,
    /// One-shot auto-acknowledgement.
    AutoAcknowledge,
}

/// Routing payload carried by a timer: the reminder it belongs to and the
/// transition to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wakeup {
    pub reminder: ReminderId,
    pub kind: TimerKind,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub wakeup: Wakeup,
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    key: (u64, u64),
    interval_ms: Option<u64>,
    wakeup: Wakeup,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_handle: u64,
    next_seq: u64,
    by_deadline: BTreeMap<(u64, u64), TimerHandle>,
    entries: HashMap<TimerHandle, Entry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, due_ms: u64, interval_ms: Option<u64>, wakeup: Wakeup) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let key = self.insert_key(due_ms, handle);
        // A zero interval would re-fire forever at the same instant.
        let interval_ms = interval_ms.map(|i| i.max(1));
        self.entries.insert(
            handle,
            Entry {
                key,
                interval_ms,
                wakeup,
            },
        );
        handle
    }

    /// Remove a timer. Unknown, fired or already-cancelled handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.entries.remove(&handle) {
            Some(entry) => {
                self.by_deadline.remove(&entry.key);
                true
            }
            None => false,
        }
    }

    /// Pop the earliest timer due at or before `until_ms`.
    ///
    /// One-shot timers are forgotten; repeating timers are re-armed one
    /// interval after their previous deadline.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired> {
        let (&key, &handle) = self.by_deadline.iter().next()?;
        if key.0 > until_ms {
            return None;
        }
        self.by_deadline.remove(&key);

        let entry = self.entries.get(&handle)?.clone();
        match entry.interval_ms {
            Some(interval) => {
                let next_key = self.insert_key(key.0.saturating_add(interval), handle);
                if let Some(e) = self.entries.get_mut(&handle) {
                    e.key = next_key;
                }
            }
            None => {
                self.entries.remove(&handle);
            }
        }

        Some(Fired {
            handle,
            wakeup: entry.wakeup,
            at_ms: key.0,
        })
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.by_deadline.keys().next().map(|(due, _)| *due)
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live timers for one reminder and kind.
    pub fn count_for(&self, reminder: ReminderId, kind: TimerKind) -> usize {
        self.entries
            .values()
            .filter(|e| e.wakeup.reminder == reminder && e.wakeup.kind == kind)
            .count()
    }

    /// Number of live timers owned by one reminder.
    pub fn count_reminder(&self, reminder: ReminderId) -> usize {
        self.entries
            .values()
            .filter(|e| e.wakeup.reminder == reminder)
            .count()
    }

    fn insert_key(&mut self, due_ms: u64, handle: TimerHandle) -> (u64, u64) {
        self.next_seq += 1;
        let key = (due_ms, self.next_seq);
        self.by_deadline.insert(key, handle);
        key
    }
}
