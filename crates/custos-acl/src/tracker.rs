//! Per-ACL change tracking with cancel-out.
//!
//! The tracker records the first old value and the latest new value of every
//! property changed since the last commit. A property changed back to its
//! original value drops out of the change set entirely.

use crate::change::{
    AclKey, AclProperty, EntryKey, EntryProperty, PropertyChange, PropertyChangedListener,
    PropertyValue,
};
use crate::error::{Error, Result};
use std::collections::btree_map::Entry as Slot;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// First old value and latest new value of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// Value at the start of the batch.
    pub old: PropertyValue,
    /// Current value.
    pub new: PropertyValue,
}

/// Pending changes of one ACL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclChangeSet {
    /// ACL-level diffs.
    pub properties: BTreeMap<AclProperty, Diff>,
    /// Entry-level diffs keyed by entry.
    pub entries: BTreeMap<EntryKey, BTreeMap<EntryProperty, Diff>>,
}

impl AclChangeSet {
    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.entries.is_empty()
    }
}

fn merge<K: Ord>(diffs: &mut BTreeMap<K, Diff>, property: K, old: &PropertyValue, new: &PropertyValue) {
    match diffs.entry(property) {
        Slot::Occupied(mut slot) => {
            if slot.get().old == *new {
                slot.remove();
            } else {
                slot.get_mut().new = new.clone();
            }
        }
        Slot::Vacant(slot) => {
            if old != new {
                slot.insert(Diff {
                    old: old.clone(),
                    new: new.clone(),
                });
            }
        }
    }
}

/// Collects pending changes for the ACLs it manages.
#[derive(Debug, Default)]
pub struct MutationTracker {
    sets: Mutex<HashMap<AclKey, AclChangeSet>>,
}

impl MutationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, HashMap<AclKey, AclChangeSet>> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts managing an ACL. Returns `false` if it was already managed.
    pub fn manage(&self, acl: AclKey) -> bool {
        let mut sets = self.sets();
        if sets.contains_key(&acl) {
            return false;
        }
        sets.insert(acl, AclChangeSet::default());
        true
    }

    /// Stops managing an ACL and drops its pending changes.
    pub fn release(&self, acl: AclKey) {
        self.sets().remove(&acl);
    }

    /// Whether the ACL is managed.
    pub fn is_managed(&self, acl: AclKey) -> bool {
        self.sets().contains_key(&acl)
    }

    /// Pending changes of a managed ACL.
    pub fn change_set(&self, acl: AclKey) -> Option<AclChangeSet> {
        self.sets().get(&acl).cloned()
    }

    /// Whether a managed ACL has pending changes.
    pub fn has_changes(&self, acl: AclKey) -> bool {
        self.sets().get(&acl).is_some_and(|set| !set.is_empty())
    }

    /// Forgets pending changes after a successful commit.
    pub fn clear(&self, acl: AclKey) {
        if let Some(set) = self.sets().get_mut(&acl) {
            *set = AclChangeSet::default();
        }
    }

    /// Records one change.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the ACL is not managed.
    pub fn record(&self, change: &PropertyChange) -> Result<()> {
        let mut sets = self.sets();
        let set = sets.get_mut(&change.acl()).ok_or_else(|| {
            Error::invalid_argument(format!("{} is not managed by this tracker", change.acl()))
        })?;

        match change {
            PropertyChange::Acl {
                property, old, new, ..
            } => {
                // Entries leaving a bucket take their pending diffs with them.
                if let (PropertyValue::Entries(before), PropertyValue::Entries(after)) = (old, new) {
                    for gone in before.iter().filter(|r| !after.iter().any(|a| a.key == r.key)) {
                        set.entries.remove(&gone.key);
                    }
                }
                merge(&mut set.properties, property.clone(), old, new);
            }
            PropertyChange::Entry {
                entry,
                property,
                old,
                new,
                ..
            } => {
                let diffs = set.entries.entry(*entry).or_default();
                merge(diffs, *property, old, new);
                if diffs.is_empty() {
                    set.entries.remove(entry);
                }
            }
        }
        Ok(())
    }
}

impl PropertyChangedListener for MutationTracker {
    fn property_changed(&self, change: &PropertyChange) -> Result<()> {
        self.record(change)
    }
}
