//! Provider traits: how ACLs are found, created, deleted and committed.

use crate::acl::SharedAcl;
use crate::error::Result;
use custos_core::{ObjectIdentity, SecurityIdentity};
use std::collections::HashMap;

/// ACLs found by a batch lookup, keyed by object identity.
pub type AclMap = HashMap<ObjectIdentity, SharedAcl>;

/// Read access to ACLs.
pub trait AclProvider: Send + Sync {
    /// Finds the ACL of one object identity.
    ///
    /// Only entries for `sids` need to be loaded; an empty slice loads all.
    ///
    /// # Errors
    ///
    /// [`Error::AclNotFound`](crate::Error::AclNotFound) if the object has no ACL.
    fn find_acl(&self, oid: &ObjectIdentity, sids: &[SecurityIdentity]) -> Result<SharedAcl> {
        match self.find_acls(std::slice::from_ref(oid), sids) {
            Ok(mut found) => found
                .remove(oid)
                .ok_or_else(|| crate::Error::AclNotFound(oid.clone())),
            Err(crate::Error::NotAllAclsFound { .. }) => {
                Err(crate::Error::AclNotFound(oid.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Finds the ACLs of several object identities.
    ///
    /// # Errors
    ///
    /// [`Error::NotAllAclsFound`](crate::Error::NotAllAclsFound) carrying the
    /// partial result if any identity has no ACL.
    fn find_acls(&self, oids: &[ObjectIdentity], sids: &[SecurityIdentity]) -> Result<AclMap>;

    /// Identities whose ACL has `parent` as parent (or ancestor unless
    /// `direct_only`).
    fn find_children(&self, parent: &ObjectIdentity, direct_only: bool)
    -> Result<Vec<ObjectIdentity>>;
}

/// Write access to ACLs.
pub trait MutableAclProvider: AclProvider {
    /// Creates an empty, entries-inheriting ACL for `oid`.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyExists`](crate::Error::AlreadyExists) if one exists.
    fn create_acl(&self, oid: &ObjectIdentity) -> Result<SharedAcl>;

    /// Deletes the ACL of `oid` and, recursively, of its children.
    fn delete_acl(&self, oid: &ObjectIdentity) -> Result<()>;

    /// Persists the pending changes of an ACL handed out by this provider.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentModification`](crate::Error::ConcurrentModification)
    /// if stored state no longer matches the values the changes started from.
    fn update_acl(&self, acl: &SharedAcl) -> Result<()>;
}
