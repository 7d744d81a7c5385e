//! Applying one ACL's change set to the tables.
//!
//! Every write is guarded by the old value the tracker recorded: the stored
//! value must still equal it, otherwise the commit fails with
//! [`Error::ConcurrentModification`] naming the property. The caller runs
//! this inside [`MemoryAclStore::transaction`](super::MemoryAclStore), so a
//! failure leaves the tables untouched.

use super::tables::{EntryRow, Tables, address};
use crate::acl::{Acl, Bucket};
use crate::change::{AclProperty, EntryKey, PropertyValue};
use crate::error::{Error, Result};
use crate::tracker::{AclChangeSet, Diff};
use custos_core::{AclId, EntryId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Class-scoped buckets a change set touches, either as a whole or through
/// one of their entries.
pub(crate) fn class_buckets(acl: &Acl, changes: &AclChangeSet) -> BTreeSet<Bucket> {
    let mut out: BTreeSet<Bucket> = changes
        .properties
        .keys()
        .filter_map(Bucket::from_property)
        .filter(Bucket::is_class_scoped)
        .collect();
    for (bucket, entries) in acl.buckets() {
        if bucket.is_class_scoped() && entries.iter().any(|e| changes.entries.contains_key(&e.key())) {
            out.insert(bucket);
        }
    }
    out
}

/// Writes `changes` for `acl` into `tables`.
///
/// Returns the ids given to newly inserted entries.
///
/// # Errors
///
/// [`Error::InvalidState`] if a pending entry diff names an entry the ACL no
/// longer holds; the diff could not be written anywhere.
pub(crate) fn apply(
    tables: &mut Tables,
    acl: &Acl,
    acl_id: AclId,
    changes: &AclChangeSet,
) -> Result<HashMap<EntryKey, EntryId>> {
    let object_type = acl.object_identity().object_type().to_string();

    for (property, diff) in &changes.properties {
        match property {
            AclProperty::EntriesInheriting => apply_inheriting(tables, acl_id, diff)?,
            AclProperty::ParentAcl => apply_parent(tables, acl_id, diff)?,
            _ => {
                let Some(bucket) = Bucket::from_property(property) else {
                    continue;
                };
                let expected = diff.old.entry_ids();
                if tables.bucket_ids(&object_type, acl_id, &bucket) != expected {
                    return Err(Error::concurrent(property.clone()));
                }
                let keep: HashSet<EntryId> = diff.new.entry_ids().into_iter().collect();
                for id in expected.iter().filter(|id| !keep.contains(id)) {
                    tables.remove_entry(*id);
                }
            }
        }
    }

    for (key, diffs) in &changes.entries {
        let Some(entry) = acl.find_entry(*key) else {
            return Err(Error::invalid_state(format!(
                "pending changes of {key} refer to an entry {} no longer holds",
                acl.object_identity()
            )));
        };
        // New entries are written with the buckets below.
        let Some(id) = entry.id() else {
            continue;
        };
        let Some(row) = tables.entry_mut(id) else {
            let property = diffs.keys().next().copied();
            return Err(match property {
                Some(property) => Error::concurrent(property),
                None => Error::invalid_state(format!("entry {id} vanished")),
            });
        };
        for (property, diff) in diffs {
            if row.value(*property) != diff.old {
                return Err(Error::concurrent(*property));
            }
            row.set(*property, &diff.new)?;
        }
    }

    let mut inserted = HashMap::new();
    for property in changes.properties.keys() {
        let Some(bucket) = Bucket::from_property(property) else {
            continue;
        };
        let (object, field) = address(acl_id, &bucket);
        for (order, entry) in acl.entries(&bucket).iter().enumerate() {
            match entry.id() {
                Some(id) => {
                    if let Some(row) = tables.entry_mut(id) {
                        row.order = order;
                    }
                }
                None => {
                    let id = tables.insert_entry(EntryRow {
                        object_type: object_type.clone(),
                        object,
                        field: field.map(str::to_string),
                        order,
                        record: entry.to_record(),
                    });
                    inserted.insert(entry.key(), id);
                }
            }
        }
    }
    Ok(inserted)
}

fn apply_inheriting(tables: &mut Tables, acl_id: AclId, diff: &Diff) -> Result<()> {
    let row = tables.oid_mut(acl_id)?;
    if PropertyValue::Bool(row.entries_inheriting) != diff.old {
        return Err(Error::concurrent(AclProperty::EntriesInheriting));
    }
    if let PropertyValue::Bool(inheriting) = diff.new {
        row.entries_inheriting = inheriting;
    }
    Ok(())
}

fn apply_parent(tables: &mut Tables, acl_id: AclId, diff: &Diff) -> Result<()> {
    if PropertyValue::Parent(tables.oid(acl_id)?.parent) != diff.old {
        return Err(Error::concurrent(AclProperty::ParentAcl));
    }
    let PropertyValue::Parent(parent) = diff.new else {
        return Err(Error::invalid_state("parent change carries no parent id"));
    };
    if let Some(parent) = parent {
        tables.oid(parent)?;
        if tables.would_cycle(acl_id, parent) {
            return Err(Error::invalid_state(format!(
                "setting ACL {parent} as parent of ACL {acl_id} would create a cycle"
            )));
        }
    }
    tables.oid_mut(acl_id)?.parent = parent;
    Ok(())
}
