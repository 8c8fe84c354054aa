use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::{Metric, ReminderId, ReminderSnapshot};
use crate::timer::to_datetime;

/// Every state change of a reminder produces an Event.
/// The CLI prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderRegistered {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    ReminderRemoved {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    ReminderActivated {
        reminder: ReminderId,
        cycle_duration_secs: u64,
        at: DateTime<Utc>,
    },
    ReminderDeactivated {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    CycleStarted {
        reminder: ReminderId,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// The cycle ran out and the channels were notified.
    ReminderFired {
        reminder: ReminderId,
        message: String,
        at: DateTime<Utc>,
    },
    AwaitingAcknowledgement {
        reminder: ReminderId,
        /// Seconds until auto-acknowledgement, if enabled.
        auto_acknowledge_in_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    Acknowledged {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    NotificationMinimized {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    /// A derived countdown changed value.
    CountdownChanged {
        reminder: ReminderId,
        metric: Metric,
        value: u64,
        at: DateTime<Utc>,
    },
    ConfigChanged {
        reminder: ReminderId,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: ReminderSnapshot,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The reminder the event is about.
    pub fn reminder(&self) -> ReminderId {
        match self {
            Event::ReminderRegistered { reminder, .. }
            | Event::ReminderRemoved { reminder, .. }
            | Event::ReminderActivated { reminder, .. }
            | Event::ReminderDeactivated { reminder, .. }
            | Event::CycleStarted { reminder, .. }
            | Event::ReminderFired { reminder, .. }
            | Event::AwaitingAcknowledgement { reminder, .. }
            | Event::Acknowledged { reminder, .. }
            | Event::NotificationMinimized { reminder, .. }
            | Event::CountdownChanged { reminder, .. }
            | Event::ConfigChanged { reminder, .. } => *reminder,
            Event::StateSnapshot { snapshot, .. } => snapshot.config.id,
        }
    }

    pub fn snapshot(snapshot: ReminderSnapshot, now_ms: u64) -> Self {
        Event::StateSnapshot {
            snapshot,
            at: to_datetime(now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let id = ReminderId::new();
        let event = Event::CountdownChanged {
            reminder: id,
            metric: Metric::SecondsSinceLastFire,
            value: 3,
            at: to_datetime(8_000),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CountdownChanged");
        assert_eq!(json["metric"], "seconds_since_last_fire");
        assert_eq!(json["value"], 3);
        assert_eq!(event.reminder(), id);
    }
}
