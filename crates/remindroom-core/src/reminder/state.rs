use serde::{Deserialize, Serialize};

use crate::notify::NotificationHandle;
use crate::timer::{TimerHandle, TimerKind};

/// Where a reminder is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPhase {
    Inactive,
    /// Cycle timer running.
    Counting,
    /// Fired, waiting for the user or the auto-acknowledge timer.
    AwaitingAcknowledgement,
}

/// Live countdown values derived from the runtime timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SecondsRemainingInCycle,
    SecondsSinceLastFire,
    SecondsUntilAutoAcknowledge,
}

/// Runtime part of a reminder. Never persisted; cleared on deactivation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeState {
    pub activated: bool,
    pub awaiting_acknowledgement: bool,
    pub cycle_started_at_ms: Option<u64>,
    pub last_fired_at_ms: Option<u64>,
    /// Duration the running cycle timer was armed with.
    pub cycle_armed_secs: u64,
    /// Delay the pending auto-acknowledge timer was armed with.
    pub auto_acknowledge_armed_secs: u64,
    pub seconds_remaining_in_cycle: u64,
    pub seconds_since_last_fire: u64,
    pub seconds_until_auto_acknowledge: u64,
    pub pending_notification: Option<NotificationHandle>,
}

impl RuntimeState {
    pub fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::SecondsRemainingInCycle => self.seconds_remaining_in_cycle,
            Metric::SecondsSinceLastFire => self.seconds_since_last_fire,
            Metric::SecondsUntilAutoAcknowledge => self.seconds_until_auto_acknowledge,
        }
    }

    pub(crate) fn metric_mut(&mut self, metric: Metric) -> &mut u64 {
        match metric {
            Metric::SecondsRemainingInCycle => &mut self.seconds_remaining_in_cycle,
            Metric::SecondsSinceLastFire => &mut self.seconds_since_last_fire,
            Metric::SecondsUntilAutoAcknowledge => &mut self.seconds_until_auto_acknowledge,
        }
    }
}

/// Every timer a reminder has armed, one slot per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveTimers {
    pub cycle: Option<TimerHandle>,
    pub cycle_countdown: Option<TimerHandle>,
    pub since_fire: Option<TimerHandle>,
    pub auto_acknowledge_countdown: Option<TimerHandle>,
    pub auto_acknowledge: Option<TimerHandle>,
}

impl ActiveTimers {
    pub fn get(&self, kind: TimerKind) -> Option<TimerHandle> {
        *self.slot(kind)
    }

    pub(crate) fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Cycle => &mut self.cycle,
            TimerKind::CycleCountdown => &mut self.cycle_countdown,
            TimerKind::SinceFire => &mut self.since_fire,
            TimerKind::AutoAcknowledgeCountdown => &mut self.auto_acknowledge_countdown,
            TimerKind::AutoAcknowledge => &mut self.auto_acknowledge,
        }
    }

    fn slot(&self, kind: TimerKind) -> &Option<TimerHandle> {
        match kind {
            TimerKind::Cycle => &self.cycle,
            TimerKind::CycleCountdown => &self.cycle_countdown,
            TimerKind::SinceFire => &self.since_fire,
            TimerKind::AutoAcknowledgeCountdown => &self.auto_acknowledge_countdown,
            TimerKind::AutoAcknowledge => &self.auto_acknowledge,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Seconds left of a `total_secs` countdown that started at `since_ms`.
///
/// `total - ceil(elapsed / 1000) + 1`, clamped to `0..=total` so the value
/// reads `total` at the instant the countdown starts.
pub fn countdown_secs(total_secs: u64, since_ms: u64, now_ms: u64) -> u64 {
    let elapsed_ms = now_ms.saturating_sub(since_ms);
    let elapsed_secs = elapsed_ms.div_ceil(1000);
    total_secs
        .saturating_add(1)
        .saturating_sub(elapsed_secs)
        .min(total_secs)
}

/// Whole seconds elapsed since `since_ms`.
pub fn elapsed_secs(since_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms) / 1000
}
