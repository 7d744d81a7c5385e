//! # custos-acl
//!
//! Object-level access control lists.
//!
//! An [`Acl`] protects one domain object, identified by an
//! [`ObjectIdentity`](custos_core::ObjectIdentity). It holds ordered entries
//! in four buckets: class scope, object scope, and per-field variants of
//! both. A [`PermissionGrantingStrategy`] decides checks against those
//! entries, falling back to the parent ACL when entries are inherited.
//!
//! Mutations notify registered listeners. The [`MutationTracker`] collects
//! them into per-ACL change sets which a [`MutableAclProvider`] commits
//! transactionally, rejecting writes whose recorded old values no longer
//! match storage.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use custos_acl::{AclProvider, DefaultPermissionGrantingStrategy, MaskBuilder,
//!     MemoryAclProvider, MemoryAclStore, MutableAclProvider};
//! use custos_core::{ObjectIdentity, SecurityIdentity};
//!
//! let provider = MemoryAclProvider::new(
//!     MemoryAclStore::new(),
//!     Arc::new(DefaultPermissionGrantingStrategy::new()),
//! );
//! let oid = ObjectIdentity::new("42", "Post").unwrap();
//! let editor = SecurityIdentity::role("ROLE_EDITOR").unwrap();
//!
//! let acl = provider.create_acl(&oid).unwrap();
//! acl.write()
//!     .insert_object_ace(editor.clone(), MaskBuilder::EDIT, 0, true, None)
//!     .unwrap();
//! provider.update_acl(&acl).unwrap();
//!
//! let acl = provider.find_acl(&oid, &[]).unwrap();
//! assert!(acl.read().is_granted(&[MaskBuilder::EDIT], &[editor], false).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod acl;
pub mod audit;
pub mod cache;
pub mod change;
pub mod entry;
pub mod error;
pub mod mask;
pub mod permission;
pub mod provider;
pub mod retrieval;
pub mod snapshot;
pub mod store;
pub mod strategy;
pub mod tracker;

mod proptests;

pub use acl::{Acl, SharedAcl};
pub use audit::{AuditLogger, LogAuditLogger};
pub use cache::{AclCache, MemoryAclCache};
pub use change::{
    AclKey, AclProperty, EntryKey, EntryProperty, EntryRef, PropertyChange,
    PropertyChangedListener, PropertyName, PropertyValue,
};
pub use entry::Entry;
pub use error::{Error, Result};
pub use mask::{GrantingStrategy, Mask};
pub use permission::{BasicPermissionMap, MaskBuilder, PermissionMap, permissions};
pub use provider::{AclMap, AclProvider, MutableAclProvider};
pub use retrieval::{
    AuthenticationContext, DefaultSecurityIdentityRetrieval, DomainObjectIdentityRetrieval,
    MapRoleHierarchy, ObjectIdentityRetrieval, RoleHierarchy, SecurityIdentityRetrieval,
    TrustLevel,
};
pub use snapshot::AclSnapshot;
pub use store::{MemoryAclProvider, MemoryAclStore};
pub use strategy::{DefaultPermissionGrantingStrategy, PermissionGrantingStrategy};
pub use tracker::{AclChangeSet, Diff, MutationTracker};
