use serde::{Deserialize, Serialize};

use crate::error::NotificationError;
use crate::reminder::ReminderId;

/// Notification channel a reminder can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Log line
    Console,
    /// Dialog that can be acknowledged or minimized
    Visual,
    /// Sound
    Audio,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Console, Channel::Visual, Channel::Audio];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Console => "console",
            Channel::Visual => "visual",
            Channel::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Some(Channel::Console),
            "visual" => Some(Channel::Visual),
            "audio" => Some(Channel::Audio),
            _ => None,
        }
    }
}

/// How a visual notification was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Acknowledge,
    Minimize,
}

/// Opaque reference to a presented visual notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationHandle(pub(crate) u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub message: String,
    pub reminder: ReminderId,
}

/// Outcome report for a closed notification, delivered back to its reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedNotification {
    pub handle: NotificationHandle,
    pub reminder: ReminderId,
    pub outcome: Outcome,
}

/// Presents notifications and reports how they were closed.
///
/// The service owns the single "currently open" visual notification. A
/// reminder keeps only the handle it was given and uses it for liveness
/// checks and close requests.
pub trait NotificationService {
    /// Global switch: when suppressed, the visual channel is skipped.
    fn is_suppressed(&self) -> bool;

    fn present(
        &mut self,
        payload: NotificationPayload,
    ) -> Result<NotificationHandle, NotificationError>;

    /// Close `handle` with `outcome`. Closing a notification that is no
    /// longer open is a no-op.
    fn close(&mut self, handle: NotificationHandle, outcome: Outcome);

    fn is_open(&self, handle: NotificationHandle) -> bool;

    /// Minimize whatever notification is currently open.
    fn close_all(&mut self);

    /// Audio channel.
    fn sound(&mut self, message: &str, reminder: ReminderId) -> Result<(), NotificationError>;

    /// Drain outcomes of notifications closed since the last call.
    fn take_outcomes(&mut self) -> Vec<ClosedNotification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parse_roundtrip() {
        for ch in Channel::ALL {
            assert_eq!(Channel::parse(ch.as_str()), Some(ch));
        }
        assert_eq!(Channel::parse("VISUAL"), Some(Channel::Visual));
        assert_eq!(Channel::parse("smoke"), None);
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Outcome::Acknowledge).unwrap(),
            "\"acknowledge\""
        );
    }
}
