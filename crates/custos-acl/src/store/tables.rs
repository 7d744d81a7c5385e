//! Row tables behind [`MemoryAclStore`](super::MemoryAclStore).

use crate::acl::Bucket;
use crate::change::{EntryProperty, PropertyValue};
use crate::entry::EntryRecord;
use crate::error::{Error, Result};
use custos_core::{AclId, EntryId, ObjectIdentity, SecurityIdentity, UserIdentity};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub(crate) struct OidRow {
    pub identity: ObjectIdentity,
    pub parent: Option<AclId>,
    pub entries_inheriting: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EntryRow {
    pub object_type: String,
    pub object: Option<AclId>,
    pub field: Option<String>,
    pub order: usize,
    pub record: EntryRecord,
}

impl EntryRow {
    fn bucket(&self) -> Bucket {
        match (self.object, &self.field) {
            (None, None) => Bucket::Class,
            (None, Some(f)) => Bucket::ClassField(f.clone()),
            (Some(_), None) => Bucket::Object,
            (Some(_), Some(f)) => Bucket::ObjectField(f.clone()),
        }
    }

    /// Stored value of an entry property.
    pub fn value(&self, property: EntryProperty) -> PropertyValue {
        match property {
            EntryProperty::Mask => PropertyValue::Mask(self.record.mask),
            EntryProperty::Strategy => PropertyValue::Strategy(self.record.strategy),
            EntryProperty::AuditSuccess => PropertyValue::Bool(self.record.audit_success),
            EntryProperty::AuditFailure => PropertyValue::Bool(self.record.audit_failure),
            EntryProperty::AceOrder => PropertyValue::Order(self.order),
        }
    }

    /// Writes an entry property.
    pub fn set(&mut self, property: EntryProperty, value: &PropertyValue) -> Result<()> {
        match (property, value) {
            (EntryProperty::Mask, PropertyValue::Mask(m)) => self.record.mask = *m,
            (EntryProperty::Strategy, PropertyValue::Strategy(s)) => self.record.strategy = *s,
            (EntryProperty::AuditSuccess, PropertyValue::Bool(b)) => self.record.audit_success = *b,
            (EntryProperty::AuditFailure, PropertyValue::Bool(b)) => self.record.audit_failure = *b,
            (EntryProperty::AceOrder, PropertyValue::Order(o)) => self.order = *o,
            (property, value) => {
                return Err(Error::invalid_state(format!(
                    "value {value:?} does not fit property {property}"
                )));
            }
        }
        Ok(())
    }
}

/// Where a bucket's rows live: the owning object (none for class scope)
/// and the field.
pub(crate) fn address(acl_id: AclId, bucket: &Bucket) -> (Option<AclId>, Option<&str>) {
    match bucket {
        Bucket::Class => (None, None),
        Bucket::ClassField(f) => (None, Some(f)),
        Bucket::Object => (Some(acl_id), None),
        Bucket::ObjectField(f) => (Some(acl_id), Some(f)),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    next_acl_id: u64,
    next_entry_id: u64,
    identities: HashMap<ObjectIdentity, AclId>,
    oids: BTreeMap<AclId, OidRow>,
    entries: BTreeMap<EntryId, EntryRow>,
}

impl Tables {
    pub fn acl_count(&self) -> usize {
        self.oids.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    // ------------------------------------------------------------------------
    // Object identities
    // ------------------------------------------------------------------------

    pub fn insert_oid(
        &mut self,
        identity: ObjectIdentity,
        parent: Option<AclId>,
        entries_inheriting: bool,
    ) -> AclId {
        self.next_acl_id += 1;
        let id = AclId::new(self.next_acl_id);
        self.identities.insert(identity.clone(), id);
        self.oids.insert(
            id,
            OidRow {
                identity,
                parent,
                entries_inheriting,
            },
        );
        id
    }

    pub fn acl_id(&self, identity: &ObjectIdentity) -> Option<AclId> {
        self.identities.get(identity).copied()
    }

    pub fn oid(&self, id: AclId) -> Result<&OidRow> {
        self.oids
            .get(&id)
            .ok_or_else(|| Error::invalid_state(format!("no stored ACL with id {id}")))
    }

    pub fn oid_mut(&mut self, id: AclId) -> Result<&mut OidRow> {
        self.oids
            .get_mut(&id)
            .ok_or_else(|| Error::invalid_state(format!("no stored ACL with id {id}")))
    }

    pub fn children(&self, parent: AclId) -> Vec<AclId> {
        self.oids
            .iter()
            .filter(|(_, row)| row.parent == Some(parent))
            .map(|(id, _)| *id)
            .collect()
    }

    /// All descendants, breadth first.
    pub fn descendants(&self, root: AclId) -> Vec<AclId> {
        let mut out = Vec::new();
        let mut frontier = vec![root];
        while let Some(id) = frontier.pop() {
            for child in self.children(id) {
                if child != root && !out.contains(&child) {
                    out.push(child);
                    frontier.push(child);
                }
            }
        }
        out
    }

    /// Whether making `parent` the parent of `child` closes a cycle.
    pub fn would_cycle(&self, child: AclId, parent: AclId) -> bool {
        let mut current = Some(parent);
        let mut steps = 0;
        while let Some(id) = current {
            if id == child || steps > self.oids.len() {
                return true;
            }
            current = self.oids.get(&id).and_then(|row| row.parent);
            steps += 1;
        }
        false
    }

    /// Deletes an ACL, its descendants and their object-scope entries.
    /// Returns the removed identities, descendants first.
    pub fn delete_cascade(&mut self, root: AclId) -> Vec<ObjectIdentity> {
        let mut doomed = self.descendants(root);
        doomed.reverse();
        doomed.push(root);

        let mut removed = Vec::new();
        for id in doomed {
            self.entries.retain(|_, row| row.object != Some(id));
            if let Some(row) = self.oids.remove(&id) {
                self.identities.remove(&row.identity);
                removed.push(row.identity);
            }
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    pub fn insert_entry(&mut self, mut row: EntryRow) -> EntryId {
        self.next_entry_id += 1;
        let id = EntryId::new(self.next_entry_id);
        row.record.id = Some(id);
        self.entries.insert(id, row);
        id
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut EntryRow> {
        self.entries.get_mut(&id)
    }

    pub fn remove_entry(&mut self, id: EntryId) {
        self.entries.remove(&id);
    }

    fn bucket_rows(
        &self,
        object_type: &str,
        acl_id: AclId,
        bucket: &Bucket,
    ) -> Vec<(EntryId, &EntryRow)> {
        let (object, field) = address(acl_id, bucket);
        let mut rows: Vec<(EntryId, &EntryRow)> = self
            .entries
            .iter()
            .filter(|(_, row)| {
                row.object_type == object_type && row.object == object && row.field.as_deref() == field
            })
            .map(|(id, row)| (*id, row))
            .collect();
        rows.sort_by_key(|(id, row)| (row.order, *id));
        rows
    }

    /// Ids of a bucket's rows in order.
    pub fn bucket_ids(&self, object_type: &str, acl_id: AclId, bucket: &Bucket) -> Vec<EntryId> {
        self.bucket_rows(object_type, acl_id, bucket)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Records of a bucket's rows in order.
    pub fn bucket_records(
        &self,
        object_type: &str,
        acl_id: AclId,
        bucket: &Bucket,
    ) -> Vec<EntryRecord> {
        self.bucket_rows(object_type, acl_id, bucket)
            .into_iter()
            .map(|(_, row)| row.record.clone())
            .collect()
    }

    /// Entry records visible to one ACL, grouped by bucket in order.
    ///
    /// A non-empty `sids` restricts the result to those identities.
    pub fn entry_records(
        &self,
        acl_id: AclId,
        object_type: &str,
        sids: &[SecurityIdentity],
    ) -> Vec<(Bucket, EntryRecord)> {
        let mut rows: Vec<(Bucket, usize, EntryRecord)> = self
            .entries
            .values()
            .filter(|row| row.object_type == object_type)
            .filter(|row| row.object.is_none() || row.object == Some(acl_id))
            .filter(|row| sids.is_empty() || sids.contains(&row.record.sid))
            .map(|row| (row.bucket(), row.order, row.record.clone()))
            .collect();
        rows.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        rows.into_iter()
            .map(|(bucket, _, record)| (bucket, record))
            .collect()
    }

    /// Renames a user identity in every entry. Returns the number of rows changed.
    pub fn rename_user(&mut self, user: &UserIdentity, old_username: &str) -> usize {
        let mut changed = 0;
        for row in self.entries.values_mut() {
            let matches = row.record.sid.as_user().is_some_and(|u| {
                u.username() == old_username && u.user_type() == user.user_type()
            });
            if matches {
                row.record.sid = SecurityIdentity::User(user.clone());
                changed += 1;
            }
        }
        changed
    }
}
