//! Serializable snapshots of persisted ACLs.
//!
//! A snapshot keeps everything needed to rebuild an ACL except what is
//! process-local: the strategy, listeners, in-memory keys and the parent
//! handle. The parent is kept by id and resolved again when restoring.

use crate::acl::{Acl, Bucket, SharedAcl};
use crate::entry::EntryRecord;
use crate::error::{Error, Result};
use crate::strategy::PermissionGrantingStrategy;
use custos_core::{AclId, ObjectIdentity, SecurityIdentity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Detached, serializable copy of a persisted ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSnapshot {
    id: AclId,
    object_identity: ObjectIdentity,
    parent_id: Option<AclId>,
    entries_inheriting: bool,
    #[serde(default)]
    loaded_sids: Vec<SecurityIdentity>,
    #[serde(default)]
    class_aces: Vec<EntryRecord>,
    #[serde(default)]
    class_field_aces: BTreeMap<String, Vec<EntryRecord>>,
    #[serde(default)]
    object_aces: Vec<EntryRecord>,
    #[serde(default)]
    object_field_aces: BTreeMap<String, Vec<EntryRecord>>,
}

impl AclSnapshot {
    /// Captures a persisted ACL.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the ACL has no id.
    pub fn capture(acl: &Acl) -> Result<Self> {
        let id = acl
            .id()
            .ok_or_else(|| Error::invalid_argument("transient ACLs cannot be snapshotted"))?;
        let mut snapshot = Self {
            id,
            object_identity: acl.object_identity().clone(),
            parent_id: acl.parent_id(),
            entries_inheriting: acl.is_entries_inheriting(),
            loaded_sids: acl.loaded_sids().to_vec(),
            class_aces: Vec::new(),
            class_field_aces: BTreeMap::new(),
            object_aces: Vec::new(),
            object_field_aces: BTreeMap::new(),
        };
        for (bucket, entries) in acl.buckets() {
            let records: Vec<EntryRecord> = entries.iter().map(|e| e.to_record()).collect();
            match bucket {
                Bucket::Class => snapshot.class_aces = records,
                Bucket::Object => snapshot.object_aces = records,
                Bucket::ClassField(f) => {
                    snapshot.class_field_aces.insert(f, records);
                }
                Bucket::ObjectField(f) => {
                    snapshot.object_field_aces.insert(f, records);
                }
            }
        }
        Ok(snapshot)
    }

    /// Id of the captured ACL.
    pub fn id(&self) -> AclId {
        self.id
    }

    /// Object identity of the captured ACL.
    pub fn object_identity(&self) -> &ObjectIdentity {
        &self.object_identity
    }

    /// Id of the captured ACL's parent.
    pub fn parent_id(&self) -> Option<AclId> {
        self.parent_id
    }

    /// Rebuilds the ACL with a strategy and an already resolved parent.
    ///
    /// Entries are re-owned by the new ACL instance.
    pub fn restore(
        self,
        strategy: Arc<dyn PermissionGrantingStrategy>,
        parent: Option<SharedAcl>,
    ) -> Acl {
        let mut acl = Acl::new(
            Some(self.id),
            self.object_identity,
            strategy,
            self.loaded_sids,
            self.entries_inheriting,
        );
        acl.attach_parent(parent, self.parent_id);

        let fields = self
            .class_field_aces
            .into_iter()
            .map(|(f, records)| (Bucket::ClassField(f), records))
            .chain(
                self.object_field_aces
                    .into_iter()
                    .map(|(f, records)| (Bucket::ObjectField(f), records)),
            );
        let buckets = [(Bucket::Class, self.class_aces), (Bucket::Object, self.object_aces)]
            .into_iter()
            .chain(fields);
        for (bucket, records) in buckets {
            for record in records {
                acl.push_loaded(&bucket, record);
            }
        }
        acl
    }
}
