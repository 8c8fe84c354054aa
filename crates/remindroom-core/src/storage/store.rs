use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::reminder::{ReminderConfig, ReminderId};

/// Persistence service: durably stores or removes a reminder's configuration.
///
/// Writes are fire-and-forget from the reminder's point of view. A failure is
/// reported to the caller of the mutation that triggered it, but the
/// in-memory state is already updated.
pub trait ReminderStore {
    fn save(&mut self, config: &ReminderConfig) -> Result<(), StorageError>;

    fn delete(&mut self, id: ReminderId) -> Result<(), StorageError>;
}

/// Recorded call on a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Save(ReminderId),
    Delete(ReminderId),
}

/// In-memory store that records every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<ReminderId, ReminderConfig>,
    calls: Vec<StoreCall>,
    failing: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call with `reason` until cleared with `None`.
    pub fn set_failing(&mut self, reason: Option<String>) {
        self.failing = reason;
    }

    pub fn get(&self, id: ReminderId) -> Option<&ReminderConfig> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn save_count(&self, id: ReminderId) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == StoreCall::Save(id))
            .count()
    }

    pub fn delete_count(&self, id: ReminderId) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == StoreCall::Delete(id))
            .count()
    }
}

impl ReminderStore for MemoryStore {
    fn save(&mut self, config: &ReminderConfig) -> Result<(), StorageError> {
        self.calls.push(StoreCall::Save(config.id));
        if let Some(reason) = &self.failing {
            return Err(StorageError::Rejected(reason.clone()));
        }
        self.records.insert(config.id, config.clone());
        Ok(())
    }

    fn delete(&mut self, id: ReminderId) -> Result<(), StorageError> {
        self.calls.push(StoreCall::Delete(id));
        if let Some(reason) = &self.failing {
            return Err(StorageError::Rejected(reason.clone()));
        }
        self.records.remove(&id);
        Ok(())
    }
}
