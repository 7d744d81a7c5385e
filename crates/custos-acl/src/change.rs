//! Property change notifications.
//!
//! Every mutation of an [`Acl`](crate::Acl) is announced to its registered
//! [`PropertyChangedListener`]s as one or more [`PropertyChange`] values
//! before the ACL's own state is touched. A listener can veto the mutation
//! by returning an error.

use crate::error::Result;
use crate::mask::{GrantingStrategy, Mask};
use custos_core::{AclId, EntryId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ACL_KEY: AtomicU64 = AtomicU64::new(1);
static NEXT_ENTRY_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-local handle of an in-memory ACL. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AclKey(u64);

impl AclKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_ACL_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acl#{}", self.0)
    }
}

/// Process-local handle of an in-memory entry. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey(u64);

impl EntryKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_ENTRY_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ace#{}", self.0)
    }
}

// ============================================================================
// Properties
// ============================================================================

/// ACL-level properties that can change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AclProperty {
    /// The entries-inheriting flag.
    EntriesInheriting,
    /// The parent ACL link.
    ParentAcl,
    /// The class-scope bucket.
    ClassAces,
    /// The object-scope bucket.
    ObjectAces,
    /// The class-field bucket of one field.
    ClassFieldAces(String),
    /// The object-field bucket of one field.
    ObjectFieldAces(String),
}

impl AclProperty {
    /// Whether the property lives in rows shared by every ACL of a type.
    pub fn is_class_scoped(&self) -> bool {
        matches!(self, Self::ClassAces | Self::ClassFieldAces(_))
    }

    /// Whether the property is an entry bucket.
    pub fn is_bucket(&self) -> bool {
        !matches!(self, Self::EntriesInheriting | Self::ParentAcl)
    }
}

impl fmt::Display for AclProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntriesInheriting => f.write_str("entriesInheriting"),
            Self::ParentAcl => f.write_str("parentAcl"),
            Self::ClassAces => f.write_str("classAces"),
            Self::ObjectAces => f.write_str("objectAces"),
            Self::ClassFieldAces(field) => write!(f, "classFieldAces[{field}]"),
            Self::ObjectFieldAces(field) => write!(f, "objectFieldAces[{field}]"),
        }
    }
}

/// Entry-level properties that can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryProperty {
    /// Permission mask.
    Mask,
    /// Granting strategy.
    Strategy,
    /// Audit-on-grant flag.
    AuditSuccess,
    /// Audit-on-deny flag.
    AuditFailure,
    /// Position in the bucket.
    AceOrder,
}

impl fmt::Display for EntryProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mask => "mask",
            Self::Strategy => "strategy",
            Self::AuditSuccess => "auditSuccess",
            Self::AuditFailure => "auditFailure",
            Self::AceOrder => "aceOrder",
        })
    }
}

/// Name of any tracked property, used in conflict errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyName {
    /// An ACL-level property.
    Acl(AclProperty),
    /// An entry-level property.
    Entry(EntryProperty),
}

impl From<AclProperty> for PropertyName {
    fn from(property: AclProperty) -> Self {
        Self::Acl(property)
    }
}

impl From<EntryProperty> for PropertyName {
    fn from(property: EntryProperty) -> Self {
        Self::Entry(property)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acl(p) => p.fmt(f),
            Self::Entry(p) => p.fmt(f),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// Reference to an entry inside a bucket value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    /// In-memory handle.
    pub key: EntryKey,
    /// Persisted id, if any.
    pub id: Option<EntryId>,
}

/// Old or new value of a changed property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A flag.
    Bool(bool),
    /// A permission mask.
    Mask(Mask),
    /// A granting strategy.
    Strategy(GrantingStrategy),
    /// A bucket position.
    Order(usize),
    /// The id of a parent ACL.
    Parent(Option<AclId>),
    /// The ordered contents of a bucket.
    Entries(Vec<EntryRef>),
}

impl PropertyValue {
    /// Persisted ids of a bucket value, in order. Empty for non-bucket values.
    pub fn entry_ids(&self) -> Vec<EntryId> {
        match self {
            Self::Entries(refs) => refs.iter().filter_map(|r| r.id).collect(),
            _ => Vec::new(),
        }
    }
}

/// One property change, addressed either to an ACL or to one of its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyChange {
    /// An ACL-level property changed.
    Acl {
        /// The ACL.
        acl: AclKey,
        /// Which property.
        property: AclProperty,
        /// Value before.
        old: PropertyValue,
        /// Value after.
        new: PropertyValue,
    },
    /// An entry-level property changed.
    Entry {
        /// The ACL owning the entry.
        acl: AclKey,
        /// The entry.
        entry: EntryKey,
        /// Which property.
        property: EntryProperty,
        /// Value before.
        old: PropertyValue,
        /// Value after.
        new: PropertyValue,
    },
}

impl PropertyChange {
    /// The ACL the change belongs to.
    pub fn acl(&self) -> AclKey {
        match self {
            Self::Acl { acl, .. } | Self::Entry { acl, .. } => *acl,
        }
    }

    /// Name of the changed property.
    pub fn property_name(&self) -> PropertyName {
        match self {
            Self::Acl { property, .. } => PropertyName::Acl(property.clone()),
            Self::Entry { property, .. } => PropertyName::Entry(*property),
        }
    }
}

/// Receives property change notifications from ACLs.
///
/// Returning an error aborts the mutation that caused the change.
pub trait PropertyChangedListener: Send + Sync {
    /// Called synchronously before the ACL applies the change.
    fn property_changed(&self, change: &PropertyChange) -> Result<()>;
}
