//! Access control entries.

use crate::change::{AclKey, EntryKey, EntryRef};
use crate::mask::{GrantingStrategy, Mask};
use custos_core::{EntryId, SecurityIdentity};
use serde::{Deserialize, Serialize};

/// One access control entry (ACE).
///
/// Entries are created and changed only through their owning
/// [`Acl`](crate::Acl), which announces every change to its listeners.
/// An entry refers back to its ACL by [`AclKey`] rather than by reference.
#[derive(Debug, Clone)]
pub struct Entry {
    key: EntryKey,
    id: Option<EntryId>,
    acl: AclKey,
    sid: SecurityIdentity,
    strategy: GrantingStrategy,
    mask: Mask,
    granting: bool,
    audit_success: bool,
    audit_failure: bool,
    field: Option<String>,
}

/// Stored attributes of an entry, used to rebuild it from persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    pub id: Option<EntryId>,
    pub sid: SecurityIdentity,
    pub strategy: GrantingStrategy,
    pub mask: Mask,
    pub granting: bool,
    pub audit_success: bool,
    pub audit_failure: bool,
}

impl Entry {
    pub(crate) fn new(
        acl: AclKey,
        field: Option<String>,
        sid: SecurityIdentity,
        mask: Mask,
        granting: bool,
        strategy: GrantingStrategy,
    ) -> Self {
        Self::from_record(
            acl,
            field,
            EntryRecord {
                id: None,
                sid,
                strategy,
                mask,
                granting,
                audit_success: false,
                audit_failure: false,
            },
        )
    }

    pub(crate) fn from_record(acl: AclKey, field: Option<String>, record: EntryRecord) -> Self {
        Self {
            key: EntryKey::next(),
            id: record.id,
            acl,
            sid: record.sid,
            strategy: record.strategy,
            mask: record.mask,
            granting: record.granting,
            audit_success: record.audit_success,
            audit_failure: record.audit_failure,
            field,
        }
    }

    pub(crate) fn to_record(&self) -> EntryRecord {
        EntryRecord {
            id: self.id,
            sid: self.sid.clone(),
            strategy: self.strategy,
            mask: self.mask,
            granting: self.granting,
            audit_success: self.audit_success,
            audit_failure: self.audit_failure,
        }
    }

    /// In-memory handle.
    pub fn key(&self) -> EntryKey {
        self.key
    }

    /// Persisted id; `None` until the entry is committed.
    pub fn id(&self) -> Option<EntryId> {
        self.id
    }

    /// Handle of the owning ACL.
    pub fn acl(&self) -> AclKey {
        self.acl
    }

    /// The security identity this entry applies to.
    pub fn security_identity(&self) -> &SecurityIdentity {
        &self.sid
    }

    /// How the mask is compared.
    pub fn strategy(&self) -> GrantingStrategy {
        self.strategy
    }

    /// Permission mask.
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// `true` for a grant, `false` for a denial.
    pub fn is_granting(&self) -> bool {
        self.granting
    }

    /// Whether a grant decided by this entry is audited.
    pub fn is_audit_success(&self) -> bool {
        self.audit_success
    }

    /// Whether a denial decided by this entry is audited.
    pub fn is_audit_failure(&self) -> bool {
        self.audit_failure
    }

    /// Field name for field-scoped entries.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub(crate) fn entry_ref(&self) -> EntryRef {
        EntryRef {
            key: self.key,
            id: self.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: EntryId) {
        self.id = Some(id);
    }

    pub(crate) fn set_mask(&mut self, mask: Mask) {
        self.mask = mask;
    }

    pub(crate) fn set_strategy(&mut self, strategy: GrantingStrategy) {
        self.strategy = strategy;
    }

    pub(crate) fn set_audit_success(&mut self, audit: bool) {
        self.audit_success = audit;
    }

    pub(crate) fn set_audit_failure(&mut self, audit: bool) {
        self.audit_failure = audit;
    }
}
