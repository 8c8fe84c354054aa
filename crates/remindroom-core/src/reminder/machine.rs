//! Reminder state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Inactive -> Counting -> (AwaitingAcknowledgement -> Counting | Counting) ...
//!     ^                                                             |
//!     +-------------------------- deactivate ----------------------+
//! ```
//!
//! The reminder owns no threads. It arms timers through the clock in its
//! [`ReminderContext`] and the host routes each fired timer back to
//! [`Reminder::on_timer`] and each closed notification back to
//! [`Reminder::on_notification_closed`].

use serde::{Deserialize, Serialize};

use super::config::{ReminderConfig, ReminderDefaults, ReminderId, ReminderPatch};
use super::state::{
    countdown_secs, elapsed_secs, ActiveTimers, Metric, ReminderPhase, RuntimeState,
};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{
    Channel, ClosedNotification, NotificationPayload, NotificationService, Outcome,
};
use crate::registry::Registry;
use crate::storage::ReminderStore;
use crate::timer::{to_datetime, Clock, TimerHandle, TimerKind, Wakeup};

/// Default granularity of the countdown recompute loops.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Collaborators a reminder needs for one operation.
pub struct ReminderContext<'a> {
    pub clock: &'a mut dyn Clock,
    pub notifier: &'a mut dyn NotificationService,
    pub store: &'a mut dyn ReminderStore,
    pub registry: &'a dyn Registry,
    pub events: &'a mut Vec<Event>,
    pub tick_interval_ms: u64,
}

impl ReminderContext<'_> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Read-only view of a reminder for listings and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSnapshot {
    pub config: ReminderConfig,
    pub phase: ReminderPhase,
    pub repeat: String,
    pub has_fired_before: bool,
    pub seconds_remaining_in_cycle: u64,
    pub seconds_since_last_fire: u64,
    pub seconds_until_auto_acknowledge: u64,
}

#[derive(Debug, Clone)]
pub struct Reminder {
    config: ReminderConfig,
    runtime: RuntimeState,
    timers: ActiveTimers,
}

impl Reminder {
    /// Create an inactive reminder with a fresh identity.
    pub fn new(defaults: &ReminderDefaults) -> Self {
        Self::from_config(ReminderConfig::from_defaults(defaults))
    }

    /// Rebuild an inactive reminder from a stored configuration.
    pub fn from_config(config: ReminderConfig) -> Self {
        Self {
            config,
            runtime: RuntimeState::default(),
            timers: ActiveTimers::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> ReminderId {
        self.config.id
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn timers(&self) -> &ActiveTimers {
        &self.timers
    }

    pub fn is_active(&self) -> bool {
        self.runtime.activated
    }

    pub fn is_awaiting_acknowledgement(&self) -> bool {
        self.runtime.awaiting_acknowledgement
    }

    pub fn has_fired_before(&self) -> bool {
        self.runtime.last_fired_at_ms.is_some()
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        self.runtime.metric(metric)
    }

    pub fn phase(&self) -> ReminderPhase {
        if !self.runtime.activated {
            ReminderPhase::Inactive
        } else if self.runtime.awaiting_acknowledgement {
            ReminderPhase::AwaitingAcknowledgement
        } else {
            ReminderPhase::Counting
        }
    }

    pub fn describe_repeat(&self) -> String {
        self.config.describe_repeat()
    }

    pub fn snapshot(&self) -> ReminderSnapshot {
        ReminderSnapshot {
            config: self.config.clone(),
            phase: self.phase(),
            repeat: self.describe_repeat(),
            has_fired_before: self.has_fired_before(),
            seconds_remaining_in_cycle: self.runtime.seconds_remaining_in_cycle,
            seconds_since_last_fire: self.runtime.seconds_since_last_fire,
            seconds_until_auto_acknowledge: self.runtime.seconds_until_auto_acknowledge,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start cycling. Activating an active reminder leaves the running
    /// cycle untouched.
    pub fn activate(&mut self, ctx: &mut ReminderContext<'_>) {
        if self.runtime.activated {
            tracing::warn!(reminder = %self.id(), "activate called on an active reminder; ignoring");
            return;
        }
        self.runtime.activated = true;
        ctx.emit(Event::ReminderActivated {
            reminder: self.id(),
            cycle_duration_secs: self.config.cycle_duration_secs,
            at: to_datetime(ctx.now_ms()),
        });
        self.start_cycle(ctx);
    }

    /// Stop cycling, cancel every timer and clear all runtime state.
    /// A notification this reminder still has open is minimized.
    pub fn deactivate(&mut self, ctx: &mut ReminderContext<'_>) {
        let was_active = self.runtime.activated;
        for kind in [
            TimerKind::Cycle,
            TimerKind::CycleCountdown,
            TimerKind::SinceFire,
            TimerKind::AutoAcknowledgeCountdown,
            TimerKind::AutoAcknowledge,
        ] {
            self.cancel_timer(kind, ctx);
        }
        if let Some(handle) = self.runtime.pending_notification {
            if ctx.notifier.is_open(handle) {
                ctx.notifier.close(handle, Outcome::Minimize);
            }
        }
        self.runtime = RuntimeState::default();

        if was_active {
            ctx.emit(Event::ReminderDeactivated {
                reminder: self.id(),
                at: to_datetime(ctx.now_ms()),
            });
        } else {
            tracing::debug!(reminder = %self.id(), "deactivate called on an inactive reminder");
        }
    }

    pub fn toggle_activation(&mut self, ctx: &mut ReminderContext<'_>) {
        if self.is_active() {
            self.deactivate(ctx);
        } else {
            self.activate(ctx);
        }
    }

    /// Clear a pending acknowledgement and, when the reminder waits for
    /// acknowledgements, start the next cycle.
    ///
    /// Returns `false` (and changes nothing) when nothing was awaiting.
    pub fn acknowledge(&mut self, ctx: &mut ReminderContext<'_>) -> bool {
        if !self.runtime.awaiting_acknowledgement {
            tracing::debug!(reminder = %self.id(), "acknowledge called while not awaiting");
            return false;
        }
        self.runtime.awaiting_acknowledgement = false;
        self.stop_auto_acknowledge(ctx);
        ctx.emit(Event::Acknowledged {
            reminder: self.id(),
            at: to_datetime(ctx.now_ms()),
        });

        if self.config.wait_for_acknowledgement {
            self.start_cycle(ctx);
        }
        true
    }

    /// Acknowledge through the open notification if there is one, so the
    /// dialog closes with the same outcome; otherwise acknowledge directly.
    pub fn acknowledge_via_notification(&mut self, ctx: &mut ReminderContext<'_>) {
        match self.runtime.pending_notification {
            Some(handle) if ctx.notifier.is_open(handle) => {
                ctx.notifier.close(handle, Outcome::Acknowledge);
            }
            _ => {
                self.acknowledge(ctx);
            }
        }
    }

    /// Dismiss the pending visual notification without acknowledging it.
    pub fn minimize(&mut self, ctx: &mut ReminderContext<'_>) -> bool {
        match self.runtime.pending_notification {
            Some(handle) if ctx.notifier.is_open(handle) => {
                ctx.notifier.close(handle, Outcome::Minimize);
                true
            }
            _ => false,
        }
    }

    // ── Callbacks ────────────────────────────────────────────────────

    /// Entry point for a fired timer. Timers this reminder no longer
    /// remembers are ignored.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        kind: TimerKind,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        if self.timers.get(kind) != Some(handle) {
            tracing::trace!(reminder = %self.id(), ?kind, ?handle, "stale timer ignored");
            return Ok(());
        }
        match kind {
            TimerKind::Cycle => self.on_cycle_timeout(ctx),
            TimerKind::CycleCountdown => {
                self.recompute_cycle_countdown(ctx);
                Ok(())
            }
            TimerKind::SinceFire => {
                self.recompute_since_fire(ctx);
                Ok(())
            }
            TimerKind::AutoAcknowledgeCountdown => {
                self.recompute_auto_acknowledge_countdown(ctx);
                Ok(())
            }
            TimerKind::AutoAcknowledge => {
                self.on_auto_acknowledge_timeout(ctx);
                Ok(())
            }
        }
    }

    /// Close handler of the visual notification.
    pub fn on_notification_closed(
        &mut self,
        closed: ClosedNotification,
        ctx: &mut ReminderContext<'_>,
    ) {
        if self.runtime.pending_notification == Some(closed.handle) {
            self.runtime.pending_notification = None;
        }
        match closed.outcome {
            Outcome::Acknowledge => {
                self.acknowledge(ctx);
            }
            Outcome::Minimize => ctx.emit(Event::NotificationMinimized {
                reminder: self.id(),
                at: to_datetime(ctx.now_ms()),
            }),
        }
    }

    /// End of a cycle: notify, then either wait for acknowledgement or
    /// start over. A notification failure is returned after the transition
    /// has completed.
    fn on_cycle_timeout(&mut self, ctx: &mut ReminderContext<'_>) -> Result<()> {
        self.cancel_timer(TimerKind::CycleCountdown, ctx);
        self.timers.cycle = None;
        if !self.runtime.activated {
            return Ok(());
        }

        let now = ctx.now_ms();
        self.runtime.seconds_remaining_in_cycle = 0;
        ctx.emit(Event::ReminderFired {
            reminder: self.id(),
            message: self.config.message.clone(),
            at: to_datetime(now),
        });
        let notified = self.notify(ctx);

        if self.config.wait_for_acknowledgement {
            self.runtime.awaiting_acknowledgement = true;
            ctx.emit(Event::AwaitingAcknowledgement {
                reminder: self.id(),
                auto_acknowledge_in_secs: self
                    .config
                    .auto_acknowledge
                    .then_some(self.config.auto_acknowledge_delay_secs),
                at: to_datetime(now),
            });
        } else {
            self.start_cycle(ctx);
        }

        self.runtime.last_fired_at_ms = Some(now);
        self.runtime.seconds_since_last_fire = 0;
        self.arm_repeating(TimerKind::SinceFire, ctx);

        if self.config.auto_acknowledge && self.runtime.awaiting_acknowledgement {
            self.runtime.seconds_until_auto_acknowledge = self.runtime.auto_acknowledge_armed_secs;
            self.arm_repeating(TimerKind::AutoAcknowledgeCountdown, ctx);
        }

        notified
    }

    fn on_auto_acknowledge_timeout(&mut self, ctx: &mut ReminderContext<'_>) {
        self.timers.auto_acknowledge = None;
        self.acknowledge_via_notification(ctx);
    }

    // ── Notification dispatch ────────────────────────────────────────

    /// Fan out to the enabled channels. Every channel is attempted; the
    /// first failure is returned.
    fn notify(&mut self, ctx: &mut ReminderContext<'_>) -> Result<()> {
        let mut failure: Option<CoreError> = None;
        let channels = self.config.channels;

        if channels.is_enabled(Channel::Console) {
            tracing::info!(
                target: "remindroom::console",
                reminder = %self.id(),
                name = %self.config.name,
                "{}",
                self.config.message
            );
        }
        if channels.is_enabled(Channel::Visual) {
            if let Err(e) = self.notify_visual(ctx) {
                tracing::warn!(reminder = %self.id(), error = %e, "visual notification failed");
                failure = failure.or(Some(e));
            }
        }
        if channels.is_enabled(Channel::Audio) {
            if let Err(e) = ctx.notifier.sound(&self.config.message, self.id()) {
                tracing::warn!(reminder = %self.id(), error = %e, "audio notification failed");
                failure = failure.or(Some(e.into()));
            }
        }

        let needs_auto_acknowledge = self.runtime.pending_notification.is_some()
            || self.config.wait_for_acknowledgement;
        if self.config.auto_acknowledge && needs_auto_acknowledge {
            self.cancel_timer(TimerKind::AutoAcknowledge, ctx);
            let delay_secs = self.config.auto_acknowledge_delay_secs;
            let handle = ctx.clock.schedule_once(
                delay_secs.saturating_mul(1000),
                self.wakeup(TimerKind::AutoAcknowledge),
            );
            self.timers.auto_acknowledge = Some(handle);
            self.runtime.auto_acknowledge_armed_secs = delay_secs;
        }

        failure.map_or(Ok(()), Err)
    }

    fn notify_visual(&mut self, ctx: &mut ReminderContext<'_>) -> Result<()> {
        self.runtime.pending_notification = None;
        if ctx.notifier.is_suppressed() {
            tracing::debug!(reminder = %self.id(), "visual notifications suppressed");
            return Ok(());
        }
        ctx.notifier.close_all();
        let handle = ctx.notifier.present(NotificationPayload {
            message: self.config.message.clone(),
            reminder: self.id(),
        })?;
        self.runtime.pending_notification = Some(handle);
        Ok(())
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn set_name(&mut self, name: impl Into<String>, ctx: &mut ReminderContext<'_>) -> Result<()> {
        self.update_config(
            ReminderPatch {
                name: Some(name.into()),
                ..Default::default()
            },
            ctx,
        )
    }

    pub fn set_message(
        &mut self,
        message: impl Into<String>,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.update_config(
            ReminderPatch {
                message: Some(message.into()),
                ..Default::default()
            },
            ctx,
        )
    }

    /// Takes effect from the next cycle.
    pub fn set_cycle_duration(&mut self, secs: u64, ctx: &mut ReminderContext<'_>) -> Result<()> {
        self.update_config(
            ReminderPatch {
                cycle_duration_secs: Some(secs),
                ..Default::default()
            },
            ctx,
        )
    }

    pub fn set_channel(
        &mut self,
        channel: Channel,
        enabled: bool,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.update_config(ReminderPatch::channel(channel, enabled), ctx)
    }

    pub fn set_wait_for_acknowledgement(
        &mut self,
        wait: bool,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.update_config(
            ReminderPatch {
                wait_for_acknowledgement: Some(wait),
                ..Default::default()
            },
            ctx,
        )
    }

    pub fn set_auto_acknowledge(
        &mut self,
        enabled: bool,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.update_config(
            ReminderPatch {
                auto_acknowledge: Some(enabled),
                ..Default::default()
            },
            ctx,
        )
    }

    pub fn set_auto_acknowledge_delay(
        &mut self,
        secs: u64,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.update_config(
            ReminderPatch {
                auto_acknowledge_delay_secs: Some(secs),
                ..Default::default()
            },
            ctx,
        )
    }

    /// Validate and apply `patch`, then persist once.
    ///
    /// An invalid patch changes nothing and saves nothing. A storage failure
    /// is returned but the new configuration stays applied.
    pub fn update_config(
        &mut self,
        patch: ReminderPatch,
        ctx: &mut ReminderContext<'_>,
    ) -> Result<()> {
        self.config = self.config.patched(&patch)?;
        self.reconcile_runtime(ctx);
        ctx.emit(Event::ConfigChanged {
            reminder: self.id(),
            at: to_datetime(ctx.now_ms()),
        });
        self.persist(ctx)
    }

    /// Save to storage if the registry tracks this reminder.
    pub fn persist(&self, ctx: &mut ReminderContext<'_>) -> Result<()> {
        if !ctx.registry.contains(self.id()) {
            tracing::trace!(reminder = %self.id(), "untracked reminder not persisted");
            return Ok(());
        }
        ctx.store.save(&self.config)?;
        Ok(())
    }

    /// Remove from storage.
    pub fn unpersist(&self, ctx: &mut ReminderContext<'_>) -> Result<()> {
        ctx.store.delete(self.id())?;
        Ok(())
    }

    /// Keep runtime invariants after a configuration change.
    fn reconcile_runtime(&mut self, ctx: &mut ReminderContext<'_>) {
        if !self.config.auto_acknowledge {
            self.stop_auto_acknowledge(ctx);
        }
        if self.runtime.awaiting_acknowledgement && !self.config.wait_for_acknowledgement {
            self.runtime.awaiting_acknowledgement = false;
            self.stop_auto_acknowledge(ctx);
            self.start_cycle(ctx);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_cycle(&mut self, ctx: &mut ReminderContext<'_>) {
        self.cancel_timer(TimerKind::Cycle, ctx);
        let now = ctx.now_ms();
        let secs = self.config.cycle_duration_secs;
        self.runtime.cycle_started_at_ms = Some(now);
        self.runtime.cycle_armed_secs = secs;
        self.runtime.seconds_remaining_in_cycle = secs;

        let handle = ctx
            .clock
            .schedule_once(secs.saturating_mul(1000), self.wakeup(TimerKind::Cycle));
        self.timers.cycle = Some(handle);
        self.arm_repeating(TimerKind::CycleCountdown, ctx);

        ctx.emit(Event::CycleStarted {
            reminder: self.id(),
            duration_secs: secs,
            at: to_datetime(now),
        });
    }

    fn stop_auto_acknowledge(&mut self, ctx: &mut ReminderContext<'_>) {
        self.cancel_timer(TimerKind::AutoAcknowledgeCountdown, ctx);
        self.cancel_timer(TimerKind::AutoAcknowledge, ctx);
        self.runtime.seconds_until_auto_acknowledge = 0;
        self.runtime.auto_acknowledge_armed_secs = 0;
    }

    fn recompute_cycle_countdown(&mut self, ctx: &mut ReminderContext<'_>) {
        if let Some(started) = self.runtime.cycle_started_at_ms {
            let value = countdown_secs(self.runtime.cycle_armed_secs, started, ctx.now_ms());
            self.write_metric(Metric::SecondsRemainingInCycle, value, ctx);
        }
    }

    fn recompute_since_fire(&mut self, ctx: &mut ReminderContext<'_>) {
        if let Some(fired) = self.runtime.last_fired_at_ms {
            let value = elapsed_secs(fired, ctx.now_ms());
            self.write_metric(Metric::SecondsSinceLastFire, value, ctx);
        }
    }

    fn recompute_auto_acknowledge_countdown(&mut self, ctx: &mut ReminderContext<'_>) {
        if let Some(fired) = self.runtime.last_fired_at_ms {
            let value =
                countdown_secs(self.runtime.auto_acknowledge_armed_secs, fired, ctx.now_ms());
            self.write_metric(Metric::SecondsUntilAutoAcknowledge, value, ctx);
        }
    }

    /// Store a recomputed metric, emitting an event only on change.
    fn write_metric(&mut self, metric: Metric, value: u64, ctx: &mut ReminderContext<'_>) {
        let slot = self.runtime.metric_mut(metric);
        if *slot == value {
            return;
        }
        *slot = value;
        ctx.emit(Event::CountdownChanged {
            reminder: self.config.id,
            metric,
            value,
            at: to_datetime(ctx.now_ms()),
        });
    }

    fn arm_repeating(&mut self, kind: TimerKind, ctx: &mut ReminderContext<'_>) {
        self.cancel_timer(kind, ctx);
        let handle = ctx
            .clock
            .schedule_repeating(ctx.tick_interval_ms, self.wakeup(kind));
        *self.timers.slot_mut(kind) = Some(handle);
    }

    fn cancel_timer(&mut self, kind: TimerKind, ctx: &mut ReminderContext<'_>) {
        if let Some(handle) = self.timers.slot_mut(kind).take() {
            ctx.clock.cancel(handle);
        }
    }

    fn wakeup(&self, kind: TimerKind) -> Wakeup {
        Wakeup {
            reminder: self.config.id,
            kind,
        }
    }
}
