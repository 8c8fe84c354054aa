//! Notification delivery: the service contract and the in-memory center.

mod center;
mod service;

pub use center::{NotificationCenter, OpenNotification};
pub use service::{
    Channel, ClosedNotification, NotificationHandle, NotificationPayload, NotificationService,
    Outcome,
};
