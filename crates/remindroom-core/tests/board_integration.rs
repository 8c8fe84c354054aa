//! Integration tests for the board driving reminders on a simulated clock.
//!
//! These walk whole notify/acknowledge cycles through the public API and
//! check timer bookkeeping over random operation sequences.

use proptest::prelude::*;

use remindroom_core::notify::NotificationService;
use remindroom_core::reminder::RuntimeState;
use remindroom_core::{
    Board, Channel, CoreError, Event, ManualClock, MemoryStore, Metric, NotificationCenter,
    Outcome, ReminderDefaults, ReminderId, ReminderPatch, ReminderPhase, TimerKind,
    ValidationError, MAX_DURATION_SECS,
};

type TestBoard = Board<ManualClock, NotificationCenter, MemoryStore>;

fn board() -> TestBoard {
    Board::new(ManualClock::new(), NotificationCenter::new(), MemoryStore::new())
}

fn defaults(cycle: u64, wait: bool, auto_ack: Option<u64>) -> ReminderDefaults {
    ReminderDefaults {
        cycle_duration_secs: cycle,
        wait_for_acknowledgement: wait,
        auto_acknowledge: auto_ack.is_some(),
        auto_acknowledge_delay_secs: auto_ack.unwrap_or(3),
        ..ReminderDefaults::default()
    }
}

fn registered(b: &mut TestBoard, d: &ReminderDefaults) -> ReminderId {
    let id = b.create(d);
    b.register(id).unwrap();
    id
}

fn fired_at(events: &[Event], id: ReminderId) -> Vec<i64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ReminderFired { reminder, at, .. } if *reminder == id => {
                Some(at.timestamp_millis())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_auto_continue_cycle_repeats_every_five_seconds() {
    let mut b = board();
    let id = registered(&mut b, &defaults(5, false, Some(3)));
    b.activate(id).unwrap();

    assert!(b.pump(4_999).is_ok());
    assert!(b.notifier().presented().is_empty());
    assert_eq!(
        b.get(id).unwrap().metric(Metric::SecondsRemainingInCycle),
        1
    );

    assert!(b.pump(5_000).is_ok());
    let r = b.get(id).unwrap();
    assert_eq!(r.phase(), ReminderPhase::Counting);
    assert!(r.has_fired_before());
    assert_eq!(r.runtime().cycle_started_at_ms, Some(5_000));
    assert_eq!(b.notifier().presented().len(), 1);
    assert_eq!(b.notifier().sounds().len(), 1);

    // The dialog closes on its own after the delay even without waiting.
    b.pump(8_000);
    assert!(b.notifier().current().is_none());
    assert_eq!(b.notifier().closed()[0].outcome, Outcome::Acknowledge);

    b.pump(15_000);
    let events = b.drain_events();
    assert_eq!(fired_at(&events, id), vec![5_000, 10_000, 15_000]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::Acknowledged { .. })));
}

#[test]
fn test_wait_with_auto_acknowledge_resumes_after_delay() {
    let mut b = board();
    let id = registered(&mut b, &defaults(5, true, Some(3)));
    b.activate(id).unwrap();

    b.pump(5_000);
    let r = b.get(id).unwrap();
    assert_eq!(r.phase(), ReminderPhase::AwaitingAcknowledgement);
    assert_eq!(r.metric(Metric::SecondsUntilAutoAcknowledge), 3);
    assert_eq!(b.clock().live_for(id, TimerKind::Cycle), 0);
    assert_eq!(b.clock().live_for(id, TimerKind::AutoAcknowledge), 1);

    b.pump(6_500);
    assert_eq!(
        b.get(id).unwrap().metric(Metric::SecondsUntilAutoAcknowledge),
        2
    );
    assert_eq!(b.get(id).unwrap().metric(Metric::SecondsSinceLastFire), 1);

    b.pump(8_000);
    let r = b.get(id).unwrap();
    assert_eq!(r.phase(), ReminderPhase::Counting);
    assert_eq!(r.runtime().cycle_started_at_ms, Some(8_000));
    assert_eq!(r.metric(Metric::SecondsUntilAutoAcknowledge), 0);
    assert_eq!(b.clock().live_for(id, TimerKind::AutoAcknowledge), 0);
    assert_eq!(b.clock().live_for(id, TimerKind::AutoAcknowledgeCountdown), 0);

    b.pump(13_000);
    assert_eq!(fired_at(&b.drain_events(), id), vec![5_000, 13_000]);
}

#[test]
fn test_minimize_then_auto_acknowledge() {
    let mut b = board();
    let id = registered(&mut b, &defaults(5, true, Some(3)));
    b.activate(id).unwrap();
    b.pump(6_000);

    assert!(b.minimize(id).unwrap());
    assert!(b.notifier().current().is_none());
    let r = b.get(id).unwrap();
    assert!(r.is_awaiting_acknowledgement());
    assert!(r.runtime().pending_notification.is_none());
    assert!(!b.minimize(id).unwrap());

    b.pump(8_000);
    assert_eq!(b.get(id).unwrap().phase(), ReminderPhase::Counting);

    let events = b.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::NotificationMinimized { .. }))
            .count(),
        1
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::Acknowledged { .. }))
            .count(),
        1
    );
}

#[test]
fn test_wait_without_auto_acknowledge_blocks_until_user() {
    let mut b = board();
    let id = registered(&mut b, &defaults(2, true, None));
    b.activate(id).unwrap();

    b.pump(60_000);
    assert_eq!(fired_at(&b.drain_events(), id), vec![2_000]);
    assert_eq!(b.get(id).unwrap().metric(Metric::SecondsSinceLastFire), 58);

    b.acknowledge(id).unwrap();
    assert_eq!(b.get(id).unwrap().phase(), ReminderPhase::Counting);
    assert_eq!(b.notifier().closed()[0].outcome, Outcome::Acknowledge);

    b.pump(62_000);
    assert_eq!(fired_at(&b.drain_events(), id), vec![62_000]);
}

#[test]
fn test_second_reminder_takes_over_the_notification() {
    let mut b = board();
    let first = registered(&mut b, &defaults(2, true, None));
    let second = registered(&mut b, &defaults(3, true, None));
    b.activate(first).unwrap();
    b.activate(second).unwrap();

    b.pump(2_000);
    assert!(b.get(first).unwrap().runtime().pending_notification.is_some());

    b.pump(3_000);
    assert!(b.get(first).unwrap().runtime().pending_notification.is_none());
    assert!(b.get(first).unwrap().is_awaiting_acknowledgement());
    assert_eq!(
        b.notifier().current().map(|n| n.payload.reminder),
        Some(second)
    );
    assert!(b.drain_events().iter().any(|e| matches!(
        e,
        Event::NotificationMinimized { reminder, .. } if *reminder == first
    )));

    // Acknowledging the first one now goes straight to the reminder.
    b.acknowledge(first).unwrap();
    assert_eq!(b.get(first).unwrap().phase(), ReminderPhase::Counting);
    assert_eq!(
        b.get(second).unwrap().phase(),
        ReminderPhase::AwaitingAcknowledgement
    );
}

#[test]
fn test_presentation_failure_is_reported_and_cycle_continues() {
    let mut b = board();
    let id = registered(&mut b, &defaults(1, false, None));
    b.notifier_mut()
        .set_unavailable(Some("display unavailable".into()));
    b.activate(id).unwrap();

    let report = b.pump(3_000);
    assert_eq!(report.errors.len(), 3);
    assert!(report
        .errors
        .iter()
        .all(|e| matches!(e, CoreError::Notification(_))));
    assert_eq!(b.notifier().sounds().len(), 3);
    assert_eq!(b.get(id).unwrap().phase(), ReminderPhase::Counting);
}

#[test]
fn test_suppressed_wait_still_auto_acknowledges() {
    let mut b = board();
    let id = registered(&mut b, &defaults(5, true, Some(3)));
    b.notifier_mut().set_suppressed(true);
    b.activate(id).unwrap();

    b.pump(5_000);
    assert!(b.notifier().presented().is_empty());
    assert!(b.get(id).unwrap().is_awaiting_acknowledgement());

    b.pump(8_000);
    assert_eq!(b.get(id).unwrap().phase(), ReminderPhase::Counting);
}

#[test]
fn test_channel_toggle_is_persisted_and_respected() {
    let mut b = board();
    let id = registered(&mut b, &defaults(1, false, None));
    b.set_channel(id, Channel::Audio, false).unwrap();
    b.set_channel(id, Channel::Visual, false).unwrap();
    assert_eq!(b.store().save_count(id), 3);
    assert!(!b.store().get(id).unwrap().channels.audio);

    b.activate(id).unwrap();
    b.pump(2_000);
    assert!(b.notifier().presented().is_empty());
    assert!(b.notifier().sounds().is_empty());
    assert_eq!(fired_at(&b.drain_events(), id).len(), 2);
}

#[test]
fn test_removed_reminder_stops_firing() {
    let mut b = board();
    let id = registered(&mut b, &defaults(5, true, Some(3)));
    b.activate(id).unwrap();
    b.pump(5_000);
    let handle = b.get(id).unwrap().runtime().pending_notification.unwrap();

    b.remove(id).unwrap();
    assert!(!b.notifier().is_open(handle));
    assert_eq!(b.clock().live_handles(), 0);
    assert!(b.store().is_empty());
    assert_eq!(b.pump(60_000).fired, 0);
    assert!(matches!(
        b.acknowledge(id),
        Err(CoreError::UnknownReminder(_))
    ));
}

#[derive(Debug, Clone)]
enum Mutation {
    Name(String),
    Message(String),
    Cycle(u64),
    Channel(Channel, bool),
    Wait(bool),
    AutoAck(bool),
    AutoAckDelay(u64),
}

impl Mutation {
    fn patch(&self) -> ReminderPatch {
        let mut patch = ReminderPatch::default();
        match self {
            Mutation::Name(s) => patch.name = Some(s.clone()),
            Mutation::Message(s) => patch.message = Some(s.clone()),
            Mutation::Cycle(n) => patch.cycle_duration_secs = Some(*n),
            Mutation::Channel(ch, on) => return ReminderPatch::channel(*ch, *on),
            Mutation::Wait(w) => patch.wait_for_acknowledgement = Some(*w),
            Mutation::AutoAck(a) => patch.auto_acknowledge = Some(*a),
            Mutation::AutoAckDelay(n) => patch.auto_acknowledge_delay_secs = Some(*n),
        }
        patch
    }

    fn is_valid(&self) -> bool {
        match self {
            Mutation::Name(s) | Mutation::Message(s) => !s.trim().is_empty(),
            Mutation::Cycle(n) | Mutation::AutoAckDelay(n) => (1..=MAX_DURATION_SECS).contains(n),
            _ => true,
        }
    }
}

fn channel() -> impl Strategy<Value = Channel> {
    prop_oneof![
        Just(Channel::Console),
        Just(Channel::Visual),
        Just(Channel::Audio)
    ]
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        "[ a-z]{0,6}".prop_map(Mutation::Name),
        "[ a-z]{0,6}".prop_map(Mutation::Message),
        prop_oneof![0u64..5, Just(u64::MAX)].prop_map(Mutation::Cycle),
        (channel(), any::<bool>()).prop_map(|(c, on)| Mutation::Channel(c, on)),
        any::<bool>().prop_map(Mutation::Wait),
        any::<bool>().prop_map(Mutation::AutoAck),
        prop_oneof![0u64..5, Just(u64::MAX)].prop_map(Mutation::AutoAckDelay),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    Deactivate(usize),
    Toggle(usize),
    Acknowledge(usize),
    Minimize(usize),
    Advance(u64),
    Wait(usize, bool),
    AutoAck(usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2).prop_map(Op::Activate),
        (0usize..2).prop_map(Op::Deactivate),
        (0usize..2).prop_map(Op::Toggle),
        (0usize..2).prop_map(Op::Acknowledge),
        (0usize..2).prop_map(Op::Minimize),
        (1u64..7_000).prop_map(Op::Advance),
        (0usize..2, any::<bool>()).prop_map(|(i, w)| Op::Wait(i, w)),
        (0usize..2, any::<bool>()).prop_map(|(i, a)| Op::AutoAck(i, a)),
    ]
}

proptest! {
    #[test]
    fn saves_match_successful_mutations(
        mutations in prop::collection::vec(mutation(), 0..24),
        track in any::<bool>(),
    ) {
        let mut b = board();
        let id = b.create(&defaults(5, false, Some(3)));
        if track {
            b.register(id).unwrap();
        }
        let baseline = b.store().save_count(id);

        let mut applied = 0;
        for m in &mutations {
            let result = b.update(id, m.patch());
            prop_assert_eq!(result.is_ok(), m.is_valid());
            if result.is_ok() {
                applied += 1;
            }
        }

        let saves = b.store().save_count(id) - baseline;
        if track {
            prop_assert_eq!(saves, applied);
        } else {
            prop_assert_eq!(saves, 0);
        }
    }

    #[test]
    fn any_typed_duration_is_rejected_or_counts_down(
        every in prop_oneof![any::<u64>(), (MAX_DURATION_SECS - 2)..=u64::MAX, 0u64..10],
        advance in 1u64..5_000,
    ) {
        let mut b = board();
        let id = registered(&mut b, &defaults(5, true, Some(3)));
        let patch = ReminderPatch::from_key_value("every", &every.to_string()).unwrap();

        match b.update(id, patch) {
            Ok(()) => {
                prop_assert!((1..=MAX_DURATION_SECS).contains(&every));
            }
            Err(CoreError::Validation(ValidationError::NotPositive(_))) => {
                prop_assert_eq!(every, 0);
            }
            Err(CoreError::Validation(ValidationError::TooLarge { max, .. })) => {
                prop_assert!(every > max);
                prop_assert_eq!(max, MAX_DURATION_SECS);
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }

        b.activate(id).unwrap();
        b.pump(advance);
        let r = b.get(id).unwrap();
        let duration = r.config().cycle_duration_secs;
        prop_assert!(r.metric(Metric::SecondsRemainingInCycle) <= duration);
        if advance < duration.saturating_mul(1000) {
            // Countdown ticks land on multiples of 100 ms.
            let last_tick = advance / 100 * 100;
            prop_assert!(!r.has_fired_before());
            prop_assert_eq!(
                r.metric(Metric::SecondsRemainingInCycle),
                (duration + 1).saturating_sub(last_tick.div_ceil(1000)).min(duration)
            );
        }
    }

    #[test]
    fn at_most_one_cycle_and_auto_ack_timer(ops in prop::collection::vec(op(), 1..40)) {
        let mut b = board();
        let ids = [
            registered(&mut b, &defaults(2, true, Some(1))),
            registered(&mut b, &defaults(3, false, Some(2))),
        ];

        for op in ops {
            match op {
                Op::Activate(i) => b.activate(ids[i]).unwrap(),
                Op::Deactivate(i) => b.deactivate(ids[i]).unwrap(),
                Op::Toggle(i) => b.toggle(ids[i]).unwrap(),
                Op::Acknowledge(i) => b.acknowledge(ids[i]).unwrap(),
                Op::Minimize(i) => {
                    b.minimize(ids[i]).unwrap();
                }
                Op::Advance(ms) => {
                    b.advance_by(ms);
                }
                Op::Wait(i, w) => b
                    .update(ids[i], ReminderPatch { wait_for_acknowledgement: Some(w), ..Default::default() })
                    .unwrap(),
                Op::AutoAck(i, a) => b
                    .update(ids[i], ReminderPatch { auto_acknowledge: Some(a), ..Default::default() })
                    .unwrap(),
            }

            for id in ids {
                let clock = b.clock();
                prop_assert!(clock.live_for(id, TimerKind::Cycle) <= 1);
                prop_assert!(clock.live_for(id, TimerKind::AutoAcknowledge) <= 1);

                let r = b.get(id).unwrap();
                if !r.is_active() {
                    prop_assert_eq!(clock.live_for_reminder(id), 0);
                    prop_assert_eq!(r.runtime(), &RuntimeState::default());
                }
                if r.is_awaiting_acknowledgement() {
                    prop_assert!(r.config().wait_for_acknowledgement);
                    prop_assert_eq!(clock.live_for(id, TimerKind::Cycle), 0);
                } else if r.is_active() {
                    prop_assert_eq!(clock.live_for(id, TimerKind::Cycle), 1);
                }
                if !r.config().auto_acknowledge {
                    prop_assert_eq!(clock.live_for(id, TimerKind::AutoAcknowledge), 0);
                }
            }
        }
    }
}
