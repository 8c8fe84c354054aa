//! The board: every reminder the process knows about, the set of tracked
//! ones, and the collaborators they share.
//!
//! Reminders never call back into each other or into the host. The board
//! pulls fired timers from its clock and closed notifications from its
//! notifier and hands each one to the reminder it belongs to.

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Channel, NotificationService};
use crate::reminder::{
    Reminder, ReminderConfig, ReminderContext, ReminderDefaults, ReminderId, ReminderPatch,
    ReminderSnapshot, DEFAULT_TICK_INTERVAL_MS,
};
use crate::storage::ReminderStore;
use crate::timer::{to_datetime, TimerSource, Wakeup};

/// What a [`Board::pump`] call did.
#[derive(Debug, Default)]
pub struct PumpReport {
    /// Timer wakeups dispatched, stale ones included.
    pub fired: usize,
    /// Failures raised by timer-driven transitions, in order.
    pub errors: Vec<CoreError>,
}

impl PumpReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Board<C, N, S> {
    clock: C,
    notifier: N,
    store: S,
    reminders: Vec<Reminder>,
    tracked: HashSet<ReminderId>,
    events: Vec<Event>,
    tick_interval_ms: u64,
}

impl<C, N, S> Board<C, N, S>
where
    C: TimerSource,
    N: NotificationService,
    S: ReminderStore,
{
    pub fn new(clock: C, notifier: N, store: S) -> Self {
        Self {
            clock,
            notifier,
            store,
            reminders: Vec::new(),
            tracked: HashSet::new(),
            events: Vec::new(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms.max(1);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get(&self, id: ReminderId) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id() == id)
    }

    /// Reminders in the order they were added.
    pub fn reminders(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter()
    }

    pub fn ids(&self) -> Vec<ReminderId> {
        self.reminders.iter().map(Reminder::id).collect()
    }

    pub fn is_tracked(&self, id: ReminderId) -> bool {
        self.tracked.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn snapshots(&self) -> Vec<ReminderSnapshot> {
        self.reminders.iter().map(Reminder::snapshot).collect()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.clock.next_deadline()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Queue a `StateSnapshot` event for every reminder.
    pub fn emit_snapshots(&mut self) {
        let now = self.clock.now_ms();
        for reminder in &self.reminders {
            self.events.push(Event::snapshot(reminder.snapshot(), now));
        }
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Add an untracked draft built from `defaults`. Drafts are never saved
    /// until they are registered.
    pub fn create(&mut self, defaults: &ReminderDefaults) -> ReminderId {
        let reminder = Reminder::new(defaults);
        let id = reminder.id();
        self.reminders.push(reminder);
        id
    }

    /// Track a draft and save it for the first time.
    pub fn register(&mut self, id: ReminderId) -> Result<()> {
        if self.get(id).is_none() {
            return Err(CoreError::UnknownReminder(id));
        }
        if !self.tracked.insert(id) {
            tracing::debug!(reminder = %id, "reminder already registered");
            return Ok(());
        }
        self.events.push(Event::ReminderRegistered {
            reminder: id,
            at: to_datetime(self.clock.now_ms()),
        });
        self.with_reminder(id, |r, ctx| r.persist(ctx))?
    }

    /// Add a reminder loaded from storage as tracked, without saving it.
    pub fn restore(&mut self, config: ReminderConfig) -> ReminderId {
        let id = config.id;
        if self.get(id).is_some() {
            tracing::warn!(reminder = %id, "reminder already on the board; ignoring restore");
            return id;
        }
        self.reminders.push(Reminder::from_config(config));
        self.tracked.insert(id);
        self.events.push(Event::ReminderRegistered {
            reminder: id,
            at: to_datetime(self.clock.now_ms()),
        });
        id
    }

    /// Force-deactivate, delete from storage and untrack.
    ///
    /// The reminder leaves the board even when the delete fails; the
    /// storage error is returned afterwards.
    pub fn remove(&mut self, id: ReminderId) -> Result<()> {
        let deleted = self.with_reminder(id, |r, ctx| {
            r.deactivate(ctx);
            r.unpersist(ctx)
        })?;
        self.reminders.retain(|r| r.id() != id);
        self.tracked.remove(&id);
        self.events.push(Event::ReminderRemoved {
            reminder: id,
            at: to_datetime(self.clock.now_ms()),
        });
        deleted
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn activate(&mut self, id: ReminderId) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.activate(ctx))
    }

    pub fn deactivate(&mut self, id: ReminderId) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.deactivate(ctx))
    }

    pub fn toggle(&mut self, id: ReminderId) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.toggle_activation(ctx))
    }

    /// Acknowledge through the reminder's open notification, if any.
    pub fn acknowledge(&mut self, id: ReminderId) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.acknowledge_via_notification(ctx))
    }

    /// Returns whether a notification was open to minimize.
    pub fn minimize(&mut self, id: ReminderId) -> Result<bool> {
        self.with_reminder(id, |r, ctx| r.minimize(ctx))
    }

    pub fn update(&mut self, id: ReminderId, patch: ReminderPatch) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.update_config(patch, ctx))?
    }

    pub fn set_channel(&mut self, id: ReminderId, channel: Channel, enabled: bool) -> Result<()> {
        self.with_reminder(id, |r, ctx| r.set_channel(channel, enabled, ctx))?
    }

    // ── Driving ──────────────────────────────────────────────────────

    /// Dispatch every timer due up to `until_ms`, then let the clock catch
    /// up to `until_ms`.
    pub fn pump(&mut self, until_ms: u64) -> PumpReport {
        let mut report = PumpReport::default();
        while let Some(fired) = self.clock.next_due(until_ms) {
            report.fired += 1;
            let Wakeup { reminder, kind } = fired.wakeup;
            match self.with_reminder(reminder, |r, ctx| r.on_timer(fired.handle, kind, ctx)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(%reminder, ?kind, error = %e, "timer-driven transition failed");
                    report.errors.push(e);
                }
                Err(_) => {
                    tracing::debug!(%reminder, ?kind, "wakeup for a reminder no longer on the board");
                }
            }
        }
        self.clock.settle(until_ms);
        report
    }

    /// Advance by `delta_ms` from the clock's current time.
    pub fn advance_by(&mut self, delta_ms: u64) -> PumpReport {
        let until = self.clock.now_ms().saturating_add(delta_ms);
        self.pump(until)
    }

    /// Route closed notifications back to their reminders until the
    /// notifier's outbox stays empty.
    pub fn deliver_outcomes(&mut self) {
        loop {
            let outcomes = self.notifier.take_outcomes();
            if outcomes.is_empty() {
                return;
            }
            for closed in outcomes {
                let Some(reminder) = self.reminders.iter_mut().find(|r| r.id() == closed.reminder)
                else {
                    tracing::debug!(reminder = %closed.reminder, "outcome for a removed reminder dropped");
                    continue;
                };
                let mut ctx = ReminderContext {
                    clock: &mut self.clock,
                    notifier: &mut self.notifier,
                    store: &mut self.store,
                    registry: &self.tracked,
                    events: &mut self.events,
                    tick_interval_ms: self.tick_interval_ms,
                };
                reminder.on_notification_closed(closed, &mut ctx);
            }
        }
    }

    /// Run `f` against one reminder with the shared collaborators, then
    /// deliver any notification outcomes it caused.
    fn with_reminder<T>(
        &mut self,
        id: ReminderId,
        f: impl FnOnce(&mut Reminder, &mut ReminderContext<'_>) -> T,
    ) -> Result<T> {
        let reminder = self
            .reminders
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(CoreError::UnknownReminder(id))?;
        let mut ctx = ReminderContext {
            clock: &mut self.clock,
            notifier: &mut self.notifier,
            store: &mut self.store,
            registry: &self.tracked,
            events: &mut self.events,
            tick_interval_ms: self.tick_interval_ms,
        };
        let out = f(reminder, &mut ctx);
        self.deliver_outcomes();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationCenter;
    use crate::storage::MemoryStore;
    use crate::timer::ManualClock;

    fn board() -> Board<ManualClock, NotificationCenter, MemoryStore> {
        Board::new(ManualClock::new(), NotificationCenter::new(), MemoryStore::new())
    }

    #[test]
    fn drafts_are_not_saved_until_registered() {
        let mut b = board();
        let id = b.create(&ReminderDefaults::default());
        b.update(
            id,
            ReminderPatch {
                name: Some("Posture".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(b.store().save_count(id), 0);
        assert!(!b.is_tracked(id));

        b.register(id).unwrap();
        assert!(b.is_tracked(id));
        assert_eq!(b.store().save_count(id), 1);
        assert_eq!(b.store().get(id).unwrap().name, "Posture");

        b.register(id).unwrap();
        assert_eq!(b.store().save_count(id), 1);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut b = board();
        let ghost = ReminderId::new();
        assert!(matches!(
            b.activate(ghost),
            Err(CoreError::UnknownReminder(id)) if id == ghost
        ));
        assert!(b.remove(ghost).is_err());
    }

    #[test]
    fn remove_cancels_timers_and_deletes() {
        let mut b = board();
        let id = b.create(&ReminderDefaults::default());
        b.register(id).unwrap();
        b.activate(id).unwrap();
        assert!(b.clock().live_for_reminder(id) > 0);

        b.remove(id).unwrap();
        assert_eq!(b.clock().live_for_reminder(id), 0);
        assert!(b.get(id).is_none());
        assert!(!b.is_tracked(id));
        assert_eq!(b.store().delete_count(id), 1);
        assert!(b.store().get(id).is_none());

        let report = b.advance_by(10_000);
        assert_eq!(report.fired, 0);
    }

    #[test]
    fn restore_tracks_without_saving() {
        let mut b = board();
        let cfg = ReminderConfig::from_defaults(&ReminderDefaults::default());
        let id = b.restore(cfg.clone());
        assert!(b.is_tracked(id));
        assert_eq!(b.store().save_count(id), 0);
        assert_eq!(b.restore(cfg), id);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn snapshots_follow_insertion_order() {
        let mut b = board();
        let first = b.create(&ReminderDefaults::default());
        let second = b.create(&ReminderDefaults::default());
        let ids: Vec<_> = b.snapshots().iter().map(|s| s.config.id).collect();
        assert_eq!(ids, vec![first, second]);

        b.drain_events();
        b.emit_snapshots();
        assert_eq!(b.drain_events().len(), 2);
    }
}
