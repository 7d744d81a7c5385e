//! The ACL aggregate and its shared handle.
//!
//! An [`Acl`] holds four ordered entry buckets for one object identity:
//! class-scope, object-scope and the per-field variants of each. Position
//! in a bucket is the entry's order and evaluation visits entries in that
//! order. Every mutation is validated, announced to the registered
//! [`PropertyChangedListener`]s and only then applied, so a rejected
//! notification leaves the ACL untouched.

use crate::change::{
    AclKey, AclProperty, EntryKey, EntryProperty, EntryRef, PropertyChange,
    PropertyChangedListener, PropertyValue,
};
use crate::entry::{Entry, EntryRecord};
use crate::error::{Error, Result};
use crate::mask::{GrantingStrategy, Mask};
use crate::strategy::PermissionGrantingStrategy;
use custos_core::{AclId, EntryId, ObjectIdentity, SecurityIdentity};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Address of one entry bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Bucket {
    Class,
    Object,
    ClassField(String),
    ObjectField(String),
}

impl Bucket {
    pub(crate) fn property(&self) -> AclProperty {
        match self {
            Self::Class => AclProperty::ClassAces,
            Self::Object => AclProperty::ObjectAces,
            Self::ClassField(f) => AclProperty::ClassFieldAces(f.clone()),
            Self::ObjectField(f) => AclProperty::ObjectFieldAces(f.clone()),
        }
    }

    pub(crate) fn from_property(property: &AclProperty) -> Option<Self> {
        match property {
            AclProperty::ClassAces => Some(Self::Class),
            AclProperty::ObjectAces => Some(Self::Object),
            AclProperty::ClassFieldAces(f) => Some(Self::ClassField(f.clone())),
            AclProperty::ObjectFieldAces(f) => Some(Self::ObjectField(f.clone())),
            AclProperty::EntriesInheriting | AclProperty::ParentAcl => None,
        }
    }

    pub(crate) fn field(&self) -> Option<&str> {
        match self {
            Self::Class | Self::Object => None,
            Self::ClassField(f) | Self::ObjectField(f) => Some(f),
        }
    }

    pub(crate) fn is_class_scoped(&self) -> bool {
        matches!(self, Self::Class | Self::ClassField(_))
    }
}

fn refs(entries: &[Entry]) -> Vec<EntryRef> {
    entries.iter().map(Entry::entry_ref).collect()
}

// ============================================================================
// Acl
// ============================================================================

/// Access control list of one object identity.
pub struct Acl {
    key: AclKey,
    id: Option<AclId>,
    object_identity: ObjectIdentity,
    strategy: Arc<dyn PermissionGrantingStrategy>,
    parent: Option<SharedAcl>,
    parent_id: Option<AclId>,
    entries_inheriting: bool,
    loaded_sids: Vec<SecurityIdentity>,
    class_aces: Vec<Entry>,
    class_field_aces: BTreeMap<String, Vec<Entry>>,
    object_aces: Vec<Entry>,
    object_field_aces: BTreeMap<String, Vec<Entry>>,
    listeners: Vec<Arc<dyn PropertyChangedListener>>,
}

impl Acl {
    /// Creates an empty ACL.
    ///
    /// `loaded_sids` lists the security identities whose entries were loaded;
    /// an empty list means all of them.
    pub fn new(
        id: Option<AclId>,
        object_identity: ObjectIdentity,
        strategy: Arc<dyn PermissionGrantingStrategy>,
        loaded_sids: Vec<SecurityIdentity>,
        entries_inheriting: bool,
    ) -> Self {
        Self {
            key: AclKey::next(),
            id,
            object_identity,
            strategy,
            parent: None,
            parent_id: None,
            entries_inheriting,
            loaded_sids,
            class_aces: Vec::new(),
            class_field_aces: BTreeMap::new(),
            object_aces: Vec::new(),
            object_field_aces: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// In-memory handle.
    pub fn key(&self) -> AclKey {
        self.key
    }

    /// Persisted id; `None` while the ACL is transient.
    pub fn id(&self) -> Option<AclId> {
        self.id
    }

    /// The protected object.
    pub fn object_identity(&self) -> &ObjectIdentity {
        &self.object_identity
    }

    /// Parent ACL, if any.
    pub fn parent_acl(&self) -> Option<&SharedAcl> {
        self.parent.as_ref()
    }

    /// Id of the parent ACL, if any.
    pub fn parent_id(&self) -> Option<AclId> {
        self.parent_id
    }

    /// Whether evaluation may fall through to the parent.
    pub fn is_entries_inheriting(&self) -> bool {
        self.entries_inheriting
    }

    /// Security identities whose entries were loaded (empty means all).
    pub fn loaded_sids(&self) -> &[SecurityIdentity] {
        &self.loaded_sids
    }

    /// Class-scope entries in order.
    pub fn class_aces(&self) -> &[Entry] {
        &self.class_aces
    }

    /// Object-scope entries in order.
    pub fn object_aces(&self) -> &[Entry] {
        &self.object_aces
    }

    /// Class-scope entries of one field; empty if the field has none.
    pub fn class_field_aces(&self, field: &str) -> &[Entry] {
        self.class_field_aces.get(field).map_or(&[], Vec::as_slice)
    }

    /// Object-scope entries of one field; empty if the field has none.
    pub fn object_field_aces(&self, field: &str) -> &[Entry] {
        self.object_field_aces.get(field).map_or(&[], Vec::as_slice)
    }

    /// The strategy used by [`is_granted`](Self::is_granted).
    pub fn strategy(&self) -> &Arc<dyn PermissionGrantingStrategy> {
        &self.strategy
    }

    /// Returns whether the entries of every given identity were loaded.
    pub fn is_sid_loaded(&self, sids: &[SecurityIdentity]) -> bool {
        self.loaded_sids.is_empty() || sids.iter().all(|sid| self.loaded_sids.contains(sid))
    }

    /// Registers a listener for property changes.
    pub fn add_property_changed_listener(&mut self, listener: Arc<dyn PropertyChangedListener>) {
        self.listeners.push(listener);
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Decides whether any of `sids` holds any of `masks` on the object.
    ///
    /// # Errors
    ///
    /// [`Error::NoApplicableEntry`] when no entry in this ACL or the
    /// inherited chain applies.
    pub fn is_granted(
        &self,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool> {
        self.strategy.is_granted(self, masks, sids, administrative_mode)
    }

    /// Like [`is_granted`](Self::is_granted) for one field of the object.
    pub fn is_field_granted(
        &self,
        field: &str,
        masks: &[Mask],
        sids: &[SecurityIdentity],
        administrative_mode: bool,
    ) -> Result<bool> {
        self.strategy
            .is_field_granted(self, field, masks, sids, administrative_mode)
    }

    // ------------------------------------------------------------------------
    // Mutation: inserts
    // ------------------------------------------------------------------------

    /// Inserts a class-scope entry at `index`.
    ///
    /// `strategy` defaults to `All` for grants and `Any` for denials.
    pub fn insert_class_ace(
        &mut self,
        sid: SecurityIdentity,
        mask: Mask,
        index: usize,
        granting: bool,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.insert_ace(Bucket::Class, sid, mask, index, granting, strategy)
    }

    /// Inserts an object-scope entry at `index`.
    pub fn insert_object_ace(
        &mut self,
        sid: SecurityIdentity,
        mask: Mask,
        index: usize,
        granting: bool,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.insert_ace(Bucket::Object, sid, mask, index, granting, strategy)
    }

    /// Inserts a class-scope entry for `field` at `index`.
    pub fn insert_class_field_ace(
        &mut self,
        field: &str,
        sid: SecurityIdentity,
        mask: Mask,
        index: usize,
        granting: bool,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        let bucket = Bucket::ClassField(field.to_string());
        self.insert_ace(bucket, sid, mask, index, granting, strategy)
    }

    /// Inserts an object-scope entry for `field` at `index`.
    pub fn insert_object_field_ace(
        &mut self,
        field: &str,
        sid: SecurityIdentity,
        mask: Mask,
        index: usize,
        granting: bool,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        let bucket = Bucket::ObjectField(field.to_string());
        self.insert_ace(bucket, sid, mask, index, granting, strategy)
    }

    // ------------------------------------------------------------------------
    // Mutation: updates
    // ------------------------------------------------------------------------

    /// Changes the mask (and optionally the strategy) of a class entry.
    pub fn update_class_ace(
        &mut self,
        index: usize,
        mask: Mask,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.update_ace(&Bucket::Class, index, mask, strategy)
    }

    /// Changes the mask (and optionally the strategy) of an object entry.
    pub fn update_object_ace(
        &mut self,
        index: usize,
        mask: Mask,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.update_ace(&Bucket::Object, index, mask, strategy)
    }

    /// Changes a class-field entry.
    pub fn update_class_field_ace(
        &mut self,
        index: usize,
        field: &str,
        mask: Mask,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.update_ace(&Bucket::ClassField(field.to_string()), index, mask, strategy)
    }

    /// Changes an object-field entry.
    pub fn update_object_field_ace(
        &mut self,
        index: usize,
        field: &str,
        mask: Mask,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        self.update_ace(&Bucket::ObjectField(field.to_string()), index, mask, strategy)
    }

    /// Sets the audit flags of a class entry.
    pub fn update_class_auditing(
        &mut self,
        index: usize,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        self.update_auditing(&Bucket::Class, index, audit_success, audit_failure)
    }

    /// Sets the audit flags of an object entry.
    pub fn update_object_auditing(
        &mut self,
        index: usize,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        self.update_auditing(&Bucket::Object, index, audit_success, audit_failure)
    }

    /// Sets the audit flags of a class-field entry.
    pub fn update_class_field_auditing(
        &mut self,
        index: usize,
        field: &str,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        let bucket = Bucket::ClassField(field.to_string());
        self.update_auditing(&bucket, index, audit_success, audit_failure)
    }

    /// Sets the audit flags of an object-field entry.
    pub fn update_object_field_auditing(
        &mut self,
        index: usize,
        field: &str,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        let bucket = Bucket::ObjectField(field.to_string());
        self.update_auditing(&bucket, index, audit_success, audit_failure)
    }

    // ------------------------------------------------------------------------
    // Mutation: deletes
    // ------------------------------------------------------------------------

    /// Removes the class entry at `index`.
    pub fn delete_class_ace(&mut self, index: usize) -> Result<()> {
        self.delete_ace(&Bucket::Class, index)
    }

    /// Removes the object entry at `index`.
    pub fn delete_object_ace(&mut self, index: usize) -> Result<()> {
        self.delete_ace(&Bucket::Object, index)
    }

    /// Removes the class-field entry at `index`.
    pub fn delete_class_field_ace(&mut self, index: usize, field: &str) -> Result<()> {
        self.delete_ace(&Bucket::ClassField(field.to_string()), index)
    }

    /// Removes the object-field entry at `index`.
    pub fn delete_object_field_ace(&mut self, index: usize, field: &str) -> Result<()> {
        self.delete_ace(&Bucket::ObjectField(field.to_string()), index)
    }

    // ------------------------------------------------------------------------
    // Mutation: ACL properties
    // ------------------------------------------------------------------------

    /// Sets or clears the parent ACL.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the parent has no id yet or is this ACL.
    pub fn set_parent_acl(&mut self, parent: Option<SharedAcl>) -> Result<()> {
        let new_id = match &parent {
            Some(p) if p.key() == self.key => {
                return Err(Error::invalid_input("an ACL cannot be its own parent"));
            }
            Some(p) => Some(p.id().ok_or_else(|| {
                Error::invalid_input("the parent ACL must have an id (persist it first)")
            })?),
            None => None,
        };
        let old_key = self.parent.as_ref().map(SharedAcl::key);
        let new_key = parent.as_ref().map(SharedAcl::key);
        if old_key == new_key {
            return Ok(());
        }

        self.notify(&[self.acl_change(
            AclProperty::ParentAcl,
            PropertyValue::Parent(self.parent_id),
            PropertyValue::Parent(new_id),
        )])?;
        self.parent = parent;
        self.parent_id = new_id;
        Ok(())
    }

    /// Sets whether evaluation may fall through to the parent.
    pub fn set_entries_inheriting(&mut self, inheriting: bool) -> Result<()> {
        if self.entries_inheriting == inheriting {
            return Ok(());
        }
        self.notify(&[self.acl_change(
            AclProperty::EntriesInheriting,
            PropertyValue::Bool(self.entries_inheriting),
            PropertyValue::Bool(inheriting),
        )])?;
        self.entries_inheriting = inheriting;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    pub(crate) fn entries(&self, bucket: &Bucket) -> &[Entry] {
        match bucket {
            Bucket::Class => &self.class_aces,
            Bucket::Object => &self.object_aces,
            Bucket::ClassField(f) => self.class_field_aces(f),
            Bucket::ObjectField(f) => self.object_field_aces(f),
        }
    }

    fn entries_mut(&mut self, bucket: &Bucket) -> Option<&mut Vec<Entry>> {
        match bucket {
            Bucket::Class => Some(&mut self.class_aces),
            Bucket::Object => Some(&mut self.object_aces),
            Bucket::ClassField(f) => self.class_field_aces.get_mut(f),
            Bucket::ObjectField(f) => self.object_field_aces.get_mut(f),
        }
    }

    fn entries_mut_or_insert(&mut self, bucket: &Bucket) -> &mut Vec<Entry> {
        match bucket {
            Bucket::Class => &mut self.class_aces,
            Bucket::Object => &mut self.object_aces,
            Bucket::ClassField(f) => self.class_field_aces.entry(f.clone()).or_default(),
            Bucket::ObjectField(f) => self.object_field_aces.entry(f.clone()).or_default(),
        }
    }

    /// Every non-empty bucket with its entries.
    pub(crate) fn buckets(&self) -> Vec<(Bucket, &[Entry])> {
        let mut out: Vec<(Bucket, &[Entry])> = Vec::new();
        if !self.class_aces.is_empty() {
            out.push((Bucket::Class, self.class_aces.as_slice()));
        }
        for (field, entries) in &self.class_field_aces {
            out.push((Bucket::ClassField(field.clone()), entries.as_slice()));
        }
        if !self.object_aces.is_empty() {
            out.push((Bucket::Object, self.object_aces.as_slice()));
        }
        for (field, entries) in &self.object_field_aces {
            out.push((Bucket::ObjectField(field.clone()), entries.as_slice()));
        }
        out
    }

    pub(crate) fn find_entry(&self, key: EntryKey) -> Option<&Entry> {
        self.buckets()
            .into_iter()
            .flat_map(|(_, entries)| entries.iter())
            .find(|e| e.key() == key)
    }

    fn check_field(bucket: &Bucket) -> Result<()> {
        match bucket.field() {
            Some("") => Err(Error::invalid_input("field must not be empty")),
            _ => Ok(()),
        }
    }

    fn entry_at(&self, bucket: &Bucket, index: usize) -> Result<&Entry> {
        Self::check_field(bucket)?;
        let entries = self.entries(bucket);
        entries.get(index).ok_or(Error::OutOfRange {
            index,
            len: entries.len(),
        })
    }

    fn entry_at_mut(&mut self, bucket: &Bucket, index: usize) -> Result<&mut Entry> {
        let len = self.entries(bucket).len();
        self.entries_mut(bucket)
            .and_then(|entries| entries.get_mut(index))
            .ok_or(Error::OutOfRange { index, len })
    }

    fn acl_change(&self, property: AclProperty, old: PropertyValue, new: PropertyValue) -> PropertyChange {
        PropertyChange::Acl {
            acl: self.key,
            property,
            old,
            new,
        }
    }

    fn entry_change(
        &self,
        entry: &Entry,
        property: EntryProperty,
        old: PropertyValue,
        new: PropertyValue,
    ) -> PropertyChange {
        PropertyChange::Entry {
            acl: self.key,
            entry: entry.key(),
            property,
            old,
            new,
        }
    }

    fn notify(&self, changes: &[PropertyChange]) -> Result<()> {
        for change in changes {
            for listener in &self.listeners {
                listener.property_changed(change)?;
            }
        }
        Ok(())
    }

    fn insert_ace(
        &mut self,
        bucket: Bucket,
        sid: SecurityIdentity,
        mask: Mask,
        index: usize,
        granting: bool,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        Self::check_field(&bucket)?;
        let current = self.entries(&bucket);
        if index > current.len() {
            return Err(Error::OutOfRange {
                index,
                len: current.len(),
            });
        }

        let entry = Entry::new(
            self.key,
            bucket.field().map(str::to_string),
            sid,
            mask,
            granting,
            strategy.unwrap_or_else(|| GrantingStrategy::default_for(granting)),
        );

        let old_refs = refs(current);
        let mut new_refs = old_refs.clone();
        new_refs.insert(index, entry.entry_ref());

        let mut changes: Vec<PropertyChange> = current[index..]
            .iter()
            .zip(index..)
            .map(|(e, order)| {
                self.entry_change(
                    e,
                    EntryProperty::AceOrder,
                    PropertyValue::Order(order),
                    PropertyValue::Order(order + 1),
                )
            })
            .collect();
        changes.push(self.acl_change(
            bucket.property(),
            PropertyValue::Entries(old_refs),
            PropertyValue::Entries(new_refs),
        ));

        self.notify(&changes)?;
        self.entries_mut_or_insert(&bucket).insert(index, entry);
        Ok(())
    }

    fn update_ace(
        &mut self,
        bucket: &Bucket,
        index: usize,
        mask: Mask,
        strategy: Option<GrantingStrategy>,
    ) -> Result<()> {
        let entry = self.entry_at(bucket, index)?;
        let mut changes = Vec::new();
        if entry.mask() != mask {
            changes.push(self.entry_change(
                entry,
                EntryProperty::Mask,
                PropertyValue::Mask(entry.mask()),
                PropertyValue::Mask(mask),
            ));
        }
        if let Some(strategy) = strategy
            && strategy != entry.strategy()
        {
            changes.push(self.entry_change(
                entry,
                EntryProperty::Strategy,
                PropertyValue::Strategy(entry.strategy()),
                PropertyValue::Strategy(strategy),
            ));
        }
        if changes.is_empty() {
            return Ok(());
        }

        self.notify(&changes)?;
        let entry = self.entry_at_mut(bucket, index)?;
        entry.set_mask(mask);
        if let Some(strategy) = strategy {
            entry.set_strategy(strategy);
        }
        Ok(())
    }

    fn update_auditing(
        &mut self,
        bucket: &Bucket,
        index: usize,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        let entry = self.entry_at(bucket, index)?;
        let mut changes = Vec::new();
        if entry.is_audit_success() != audit_success {
            changes.push(self.entry_change(
                entry,
                EntryProperty::AuditSuccess,
                PropertyValue::Bool(entry.is_audit_success()),
                PropertyValue::Bool(audit_success),
            ));
        }
        if entry.is_audit_failure() != audit_failure {
            changes.push(self.entry_change(
                entry,
                EntryProperty::AuditFailure,
                PropertyValue::Bool(entry.is_audit_failure()),
                PropertyValue::Bool(audit_failure),
            ));
        }
        if changes.is_empty() {
            return Ok(());
        }

        self.notify(&changes)?;
        let entry = self.entry_at_mut(bucket, index)?;
        entry.set_audit_success(audit_success);
        entry.set_audit_failure(audit_failure);
        Ok(())
    }

    fn delete_ace(&mut self, bucket: &Bucket, index: usize) -> Result<()> {
        self.entry_at(bucket, index)?;
        let current = self.entries(bucket);

        let old_refs = refs(current);
        let mut new_refs = old_refs.clone();
        new_refs.remove(index);

        let mut changes = vec![self.acl_change(
            bucket.property(),
            PropertyValue::Entries(old_refs),
            PropertyValue::Entries(new_refs),
        )];
        changes.extend(current[index + 1..].iter().zip(index..).map(|(e, order)| {
            self.entry_change(
                e,
                EntryProperty::AceOrder,
                PropertyValue::Order(order + 1),
                PropertyValue::Order(order),
            )
        }));

        self.notify(&changes)?;
        if let Some(entries) = self.entries_mut(bucket) {
            entries.remove(index);
        }
        match bucket {
            Bucket::ClassField(f) if self.class_field_aces(f).is_empty() => {
                self.class_field_aces.remove(f);
            }
            Bucket::ObjectField(f) if self.object_field_aces(f).is_empty() => {
                self.object_field_aces.remove(f);
            }
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Store hooks (no notifications)
    // ------------------------------------------------------------------------

    pub(crate) fn attach_parent(&mut self, parent: Option<SharedAcl>, parent_id: Option<AclId>) {
        self.parent = parent;
        self.parent_id = parent_id;
    }

    pub(crate) fn set_loaded_sids(&mut self, sids: Vec<SecurityIdentity>) {
        self.loaded_sids = sids;
    }

    pub(crate) fn push_loaded(&mut self, bucket: &Bucket, record: EntryRecord) {
        let entry = Entry::from_record(self.key, bucket.field().map(str::to_string), record);
        self.entries_mut_or_insert(bucket).push(entry);
    }

    pub(crate) fn clear_entries(&mut self) {
        self.class_aces.clear();
        self.class_field_aces.clear();
        self.object_aces.clear();
        self.object_field_aces.clear();
    }

    /// Replaces a bucket with entries built from stored records.
    pub(crate) fn replace_bucket(&mut self, bucket: &Bucket, records: Vec<EntryRecord>) {
        let field = bucket.field().map(str::to_string);
        let copies: Vec<Entry> = records
            .into_iter()
            .map(|record| Entry::from_record(self.key, field.clone(), record))
            .collect();
        match bucket {
            Bucket::Class => self.class_aces = copies,
            Bucket::Object => self.object_aces = copies,
            Bucket::ClassField(f) if copies.is_empty() => {
                self.class_field_aces.remove(f);
            }
            Bucket::ClassField(f) => {
                self.class_field_aces.insert(f.clone(), copies);
            }
            Bucket::ObjectField(f) if copies.is_empty() => {
                self.object_field_aces.remove(f);
            }
            Bucket::ObjectField(f) => {
                self.object_field_aces.insert(f.clone(), copies);
            }
        }
    }

    pub(crate) fn assign_entry_ids(&mut self, ids: &HashMap<EntryKey, EntryId>) {
        let buckets = [&mut self.class_aces, &mut self.object_aces];
        let fields = self
            .class_field_aces
            .values_mut()
            .chain(self.object_field_aces.values_mut());
        for entry in buckets.into_iter().chain(fields).flat_map(|v| v.iter_mut()) {
            if let Some(id) = ids.get(&entry.key()) {
                entry.set_id(*id);
            }
        }
    }
}

impl fmt::Debug for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acl")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("object_identity", &self.object_identity)
            .field("parent_id", &self.parent_id)
            .field("entries_inheriting", &self.entries_inheriting)
            .field("class_aces", &self.class_aces.len())
            .field("object_aces", &self.object_aces.len())
            .field("class_fields", &self.class_field_aces.keys().collect::<Vec<_>>())
            .field("object_fields", &self.object_field_aces.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// SharedAcl
// ============================================================================

/// Shared, lockable handle to an [`Acl`].
///
/// Parents and providers hold ACLs through this handle. Lock poisoning is
/// recovered from since ACL mutations never leave partial state behind.
///
/// The key and id never change after construction and are readable without
/// taking the lock.
#[derive(Clone)]
pub struct SharedAcl {
    key: AclKey,
    id: Option<AclId>,
    inner: Arc<RwLock<Acl>>,
}

impl SharedAcl {
    /// Wraps an ACL.
    pub fn new(acl: Acl) -> Self {
        Self {
            key: acl.key,
            id: acl.id,
            inner: Arc::new(RwLock::new(acl)),
        }
    }

    /// Key of the wrapped ACL, readable without locking.
    pub fn key(&self) -> AclKey {
        self.key
    }

    /// Persisted id of the wrapped ACL, readable without locking.
    pub fn id(&self) -> Option<AclId> {
        self.id
    }

    /// Acquires shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, Acl> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, Acl> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles point at the same ACL instance.
    pub fn ptr_eq(&self, other: &SharedAcl) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedAcl({})", self.key)
    }
}
