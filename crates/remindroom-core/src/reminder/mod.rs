//! The reminder: configuration, runtime state and the state machine that
//! drives its notify/acknowledge cycle.

mod config;
mod machine;
mod state;


pub use config::{
    ChannelSet, ReminderConfig, ReminderDefaults, ReminderId, ReminderPatch, MAX_DURATION_SECS,
};
pub use machine::{Reminder, ReminderContext, ReminderSnapshot, DEFAULT_TICK_INTERVAL_MS};
pub use state::{countdown_secs, elapsed_secs, ActiveTimers, Metric, ReminderPhase, RuntimeState};
