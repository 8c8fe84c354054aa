//! # Remindroom Core Library
//!
//! This library provides the core logic for Remindroom, a recurring reminder
//! engine. Every operation is available through the standalone CLI binary,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Reminder**: a state machine that fires on a fixed cycle, notifies its
//!   channels and optionally waits for acknowledgement
//! - **Timer**: simulated and wall-clock timer sources; fired timers are
//!   routed back to reminders as [`Wakeup`] values
//! - **Notify**: the notification service owning the single open visual
//!   notification
//! - **Storage**: SQLite reminder storage and TOML-based configuration
//! - **Board**: the set of reminders plus the dispatcher between them and
//!   their collaborators
//!
//! ## Key Components
//!
//! - [`Reminder`]: reminder state machine
//! - [`Board`]: registry and dispatcher
//! - [`SqliteStore`]: reminder persistence
//! - [`Config`]: application configuration management

pub mod board;
pub mod error;
pub mod events;
pub mod notify;
pub mod registry;
pub mod reminder;
pub mod storage;
pub mod timer;

pub use board::{Board, PumpReport};
pub use error::{ConfigError, CoreError, NotificationError, StorageError, ValidationError};
pub use events::Event;
pub use notify::{Channel, NotificationCenter, NotificationService, Outcome};
pub use registry::Registry;
pub use reminder::{
    Metric, Reminder, ReminderConfig, ReminderDefaults, ReminderId, ReminderPatch, ReminderPhase,
    ReminderSnapshot, MAX_DURATION_SECS,
};
pub use storage::{Config, MemoryStore, ReminderStore, SqliteStore};
pub use timer::{Clock, ManualClock, TimerKind, TimerSource, WallClock, Wakeup};
