//! ACL caching.
//!
//! The cache stores detached [`AclSnapshot`]s, never live ACL instances.
//! Each entry is reachable by object identity and, through an alias key,
//! by ACL id. Restoring an entry resolves its parent from the cache too, so
//! a cached ACL whose parent has been evicted is treated as a miss.

use crate::acl::SharedAcl;
use crate::error::{Error, Result};
use crate::snapshot::AclSnapshot;
use crate::strategy::PermissionGrantingStrategy;
use custos_core::{AclId, CacheConfig, ObjectIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cache of persisted ACLs.
pub trait AclCache: Send + Sync {
    /// Looks up by ACL id.
    fn get_by_id(&self, id: AclId) -> Option<SharedAcl>;

    /// Looks up by object identity.
    fn get_by_identity(&self, oid: &ObjectIdentity) -> Option<SharedAcl>;

    /// Stores an ACL and its ancestors.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a transient ACL.
    fn put(&self, acl: &SharedAcl) -> Result<()>;

    /// Removes the ACL with this id.
    fn evict_by_id(&self, id: AclId);

    /// Removes the ACL of this object identity.
    fn evict_by_identity(&self, oid: &ObjectIdentity);

    /// Removes everything.
    fn clear(&self);
}

/// In-process [`AclCache`] holding JSON-encoded snapshots.
pub struct MemoryAclCache {
    prefix: String,
    strategy: Arc<dyn PermissionGrantingStrategy>,
    items: Mutex<HashMap<String, String>>,
}

impl MemoryAclCache {
    /// Creates a cache; restored ACLs get `strategy`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `prefix` is empty.
    pub fn new(
        prefix: impl Into<String>,
        strategy: Arc<dyn PermissionGrantingStrategy>,
    ) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(Error::invalid_input("cache prefix must not be empty"));
        }
        Ok(Self {
            prefix,
            strategy,
            items: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a cache from the `[cache]` config section.
    pub fn from_config(
        config: &CacheConfig,
        strategy: Arc<dyn PermissionGrantingStrategy>,
    ) -> Result<Self> {
        Self::new(config.prefix.clone(), strategy)
    }

    /// Number of stored keys, aliases included.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn data_key(&self, oid: &ObjectIdentity) -> String {
        format!(
            "{}{}_{}",
            self.prefix,
            blake3::hash(oid.object_type().as_bytes()).to_hex(),
            blake3::hash(oid.identifier().as_bytes()).to_hex()
        )
    }

    fn alias_key(&self, id: AclId) -> String {
        format!("{}{id}", self.prefix)
    }

    fn load(&self, data_key: &str) -> Option<AclSnapshot> {
        let json = self.items().get(data_key).cloned()?;
        match serde_json::from_str(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("dropping undecodable cache entry {data_key}: {e}");
                self.items().remove(data_key);
                None
            }
        }
    }

    fn restore(&self, snapshot: AclSnapshot) -> Option<SharedAcl> {
        let parent = match snapshot.parent_id() {
            Some(parent_id) => match self.get_by_id(parent_id) {
                Some(parent) => Some(parent),
                None => {
                    log::debug!(
                        "parent {parent_id} of {} is not cached",
                        snapshot.object_identity()
                    );
                    return None;
                }
            },
            None => None,
        };
        Some(SharedAcl::new(snapshot.restore(Arc::clone(&self.strategy), parent)))
    }
}

impl AclCache for MemoryAclCache {
    fn get_by_id(&self, id: AclId) -> Option<SharedAcl> {
        let data_key = self.items().get(&self.alias_key(id)).cloned()?;
        let snapshot = self.load(&data_key)?;
        self.restore(snapshot)
    }

    fn get_by_identity(&self, oid: &ObjectIdentity) -> Option<SharedAcl> {
        let snapshot = self.load(&self.data_key(oid))?;
        self.restore(snapshot)
    }

    fn put(&self, acl: &SharedAcl) -> Result<()> {
        let acl = acl.read();
        if let Some(parent) = acl.parent_acl() {
            self.put(parent)?;
        }
        let snapshot = AclSnapshot::capture(&acl)?;
        let json = serde_json::to_string(&snapshot)?;
        let data_key = self.data_key(acl.object_identity());

        let mut items = self.items();
        items.insert(self.alias_key(snapshot.id()), data_key.clone());
        items.insert(data_key, json);
        Ok(())
    }

    fn evict_by_id(&self, id: AclId) {
        let mut items = self.items();
        if let Some(data_key) = items.remove(&self.alias_key(id)) {
            items.remove(&data_key);
        }
    }

    fn evict_by_identity(&self, oid: &ObjectIdentity) {
        let data_key = self.data_key(oid);
        if let Some(snapshot) = self.load(&data_key) {
            self.items().remove(&self.alias_key(snapshot.id()));
        }
        self.items().remove(&data_key);
    }

    fn clear(&self) {
        self.items().clear();
    }
}
