//! In-memory notification center.
//!
//! Holds the single system-wide visual notification slot, the suppression
//! switch and the outbox of close outcomes. Presentation itself is left to
//! whoever renders the center's state (the CLI prints it).

use std::collections::VecDeque;

use super::service::{
    ClosedNotification, NotificationHandle, NotificationPayload, NotificationService, Outcome,
};
use crate::error::NotificationError;
use crate::reminder::ReminderId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenNotification {
    pub handle: NotificationHandle,
    pub payload: NotificationPayload,
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_handle: u64,
    open: Option<OpenNotification>,
    suppressed: bool,
    unavailable: Option<String>,
    outbox: VecDeque<ClosedNotification>,
    presented: Vec<NotificationPayload>,
    closed: Vec<ClosedNotification>,
    sounds: Vec<(ReminderId, String)>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    /// Make every presentation fail with `reason` until cleared with `None`.
    pub fn set_unavailable(&mut self, reason: Option<String>) {
        self.unavailable = reason;
    }

    pub fn current(&self) -> Option<&OpenNotification> {
        self.open.as_ref()
    }

    /// Every payload presented so far, oldest first.
    pub fn presented(&self) -> &[NotificationPayload] {
        &self.presented
    }

    /// Every close performed so far, oldest first.
    pub fn closed(&self) -> &[ClosedNotification] {
        &self.closed
    }

    pub fn sounds(&self) -> &[(ReminderId, String)] {
        &self.sounds
    }

    /// Closes recorded for one handle.
    pub fn closes_of(&self, handle: NotificationHandle) -> usize {
        self.closed.iter().filter(|c| c.handle == handle).count()
    }
}

impl NotificationService for NotificationCenter {
    fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    fn present(
        &mut self,
        payload: NotificationPayload,
    ) -> Result<NotificationHandle, NotificationError> {
        if let Some(reason) = &self.unavailable {
            return Err(NotificationError::PresentFailed {
                reminder: payload.reminder,
                message: reason.clone(),
            });
        }

        // One visible notification at a time, whoever asks.
        self.close_all();

        self.next_handle += 1;
        let handle = NotificationHandle(self.next_handle);
        tracing::debug!(reminder = %payload.reminder, ?handle, "presenting notification");
        self.presented.push(payload.clone());
        self.open = Some(OpenNotification { handle, payload });
        Ok(handle)
    }

    fn close(&mut self, handle: NotificationHandle, outcome: Outcome) {
        if !self.is_open(handle) {
            tracing::debug!(?handle, "close requested for a notification that is not open");
            return;
        }
        let Some(open) = self.open.take() else {
            return;
        };
        let closed = ClosedNotification {
            handle,
            reminder: open.payload.reminder,
            outcome,
        };
        tracing::debug!(reminder = %closed.reminder, ?handle, ?outcome, "notification closed");
        self.closed.push(closed);
        self.outbox.push_back(closed);
    }

    fn is_open(&self, handle: NotificationHandle) -> bool {
        self.open.as_ref().is_some_and(|o| o.handle == handle)
    }

    fn close_all(&mut self) {
        if let Some(handle) = self.open.as_ref().map(|o| o.handle) {
            self.close(handle, Outcome::Minimize);
        }
    }

    fn sound(&mut self, message: &str, reminder: ReminderId) -> Result<(), NotificationError> {
        tracing::info!(target: "remindroom::audio", %reminder, "{message}");
        self.sounds.push((reminder, message.to_string()));
        Ok(())
    }

    fn take_outcomes(&mut self) -> Vec<ClosedNotification> {
        self.outbox.drain(..).collect()
    }
}
