//! Registry membership, consulted by the persistence-on-change hook.
//!
//! Only reminders the registry tracks are written to storage; drafts that
//! were never registered stay in memory.

use std::collections::HashSet;

use crate::reminder::ReminderId;

pub trait Registry {
    fn contains(&self, id: ReminderId) -> bool;
}

impl Registry for HashSet<ReminderId> {
    fn contains(&self, id: ReminderId) -> bool {
        HashSet::contains(self, &id)
    }
}
