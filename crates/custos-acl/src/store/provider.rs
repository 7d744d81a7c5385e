//! [`MutableAclProvider`] over a [`MemoryAclStore`].

use super::MemoryAclStore;
use super::commit;
use super::tables::Tables;
use crate::acl::{Acl, Bucket, SharedAcl};
use crate::cache::AclCache;
use crate::change::AclProperty;
use crate::error::{Error, Result};
use crate::provider::{AclMap, AclProvider, MutableAclProvider};
use crate::strategy::PermissionGrantingStrategy;
use crate::tracker::MutationTracker;
use custos_core::{AclId, ObjectIdentity, SecurityIdentity, UserIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Loaded = HashMap<ObjectIdentity, SharedAcl>;

/// Whether `acl` holds every entry a lookup for `sids` needs. An empty
/// `sids` asks for all identities.
fn covers(acl: &Acl, sids: &[SecurityIdentity]) -> bool {
    if sids.is_empty() {
        acl.loaded_sids().is_empty()
    } else {
        acl.is_sid_loaded(sids)
    }
}

/// Loads, creates, deletes and commits ACLs against a [`MemoryAclStore`].
///
/// The provider keeps an identity map: within one provider, every lookup of
/// an object identity yields the same [`SharedAcl`]. Every ACL it hands out
/// is registered with its [`MutationTracker`] so that
/// [`update_acl`](MutableAclProvider::update_acl) knows what to write.
///
/// Every operation that touches both the tables and loaded ACLs holds the
/// identity map lock first, which serializes them.
pub struct MemoryAclProvider {
    store: MemoryAclStore,
    strategy: Arc<dyn PermissionGrantingStrategy>,
    cache: Option<Arc<dyn AclCache>>,
    tracker: Arc<MutationTracker>,
    loaded: Mutex<Loaded>,
}

impl MemoryAclProvider {
    /// Creates a provider; loaded ACLs evaluate through `strategy`.
    pub fn new(store: MemoryAclStore, strategy: Arc<dyn PermissionGrantingStrategy>) -> Self {
        Self {
            store,
            strategy,
            cache: None,
            tracker: Arc::new(MutationTracker::new()),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a cache consulted before the store.
    pub fn with_cache(mut self, cache: Arc<dyn AclCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &MemoryAclStore {
        &self.store
    }

    /// The tracker collecting changes of loaded ACLs.
    pub fn tracker(&self) -> &Arc<MutationTracker> {
        &self.tracker
    }

    /// Renames a user identity in every stored entry.
    ///
    /// ACLs already loaded keep the old name until they are loaded by a
    /// fresh provider. The cache is cleared. Returns the number of entries
    /// changed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the username is unchanged.
    pub fn update_user_security_identity(
        &self,
        user: &UserIdentity,
        old_username: &str,
    ) -> Result<usize> {
        if user.username() == old_username {
            return Err(Error::invalid_argument("there are no changes"));
        }
        let changed = self.store.lock().rename_user(user, old_username);
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        log::debug!("renamed user {old_username} to {} in {changed} entries", user.username());
        Ok(changed)
    }

    fn loaded(&self) -> MutexGuard<'_, Loaded> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts an ACL under tracking and into the identity map.
    fn register(&self, loaded: &mut Loaded, acl: &SharedAcl) {
        if self.tracker.manage(acl.key()) {
            acl.write()
                .add_property_changed_listener(self.tracker.clone());
        }
        let oid = acl.read().object_identity().clone();
        loaded.insert(oid, acl.clone());
    }

    /// Builds an ACL and its missing ancestors from stored rows.
    fn hydrate(
        &self,
        tables: &Tables,
        loaded: &mut Loaded,
        id: AclId,
        sids: &[SecurityIdentity],
        depth: usize,
    ) -> Result<SharedAcl> {
        let row = tables.oid(id)?;
        if let Some(existing) = loaded.get(&row.identity).cloned() {
            self.ensure_covers(tables, &existing, sids)?;
            return Ok(existing);
        }
        if depth > tables.acl_count() {
            return Err(Error::invalid_state(format!(
                "stored ancestry of {} is cyclic",
                row.identity
            )));
        }
        let parent = row
            .parent
            .map(|parent| self.hydrate(tables, loaded, parent, sids, depth + 1))
            .transpose()?;

        let mut acl = Acl::new(
            Some(id),
            row.identity.clone(),
            self.strategy.clone(),
            sids.to_vec(),
            row.entries_inheriting,
        );
        acl.attach_parent(parent, row.parent);
        for (bucket, record) in tables.entry_records(id, row.identity.object_type(), sids) {
            acl.push_loaded(&bucket, record);
        }
        log::debug!("hydrated ACL {id} for {}", row.identity);

        let shared = SharedAcl::new(acl);
        self.register(loaded, &shared);
        Ok(shared)
    }

    /// Reloads `acl` for every identity unless it already holds what `sids`
    /// need. Returns whether it was reloaded.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if a reload is needed but the ACL has
    /// uncommitted changes.
    fn ensure_covers(
        &self,
        tables: &Tables,
        acl: &SharedAcl,
        sids: &[SecurityIdentity],
    ) -> Result<bool> {
        if covers(&acl.read(), sids) {
            return Ok(false);
        }
        if self.tracker.has_changes(acl.key()) {
            return Err(Error::invalid_state(format!(
                "{} has uncommitted changes and cannot be reloaded",
                acl.read().object_identity()
            )));
        }
        self.reload(tables, acl)?;
        Ok(true)
    }

    /// Refills an already loaded ACL with the entries of every identity.
    fn reload(&self, tables: &Tables, acl: &SharedAcl) -> Result<()> {
        let mut acl = acl.write();
        let id = acl
            .id()
            .ok_or_else(|| Error::invalid_state("loaded ACL has no id"))?;
        let object_type = acl.object_identity().object_type().to_string();
        acl.clear_entries();
        acl.set_loaded_sids(Vec::new());
        for (bucket, record) in tables.entry_records(id, &object_type, &[]) {
            acl.push_loaded(&bucket, record);
        }
        log::debug!("reloaded ACL {id} for all security identities");
        Ok(())
    }

    /// Takes over an ACL restored from the cache, linking its ancestors to
    /// instances already in the identity map. Ancestors that lack entries
    /// `sids` need are reloaded.
    fn adopt(&self, loaded: &mut Loaded, acl: &SharedAcl, sids: &[SecurityIdentity]) -> Result<()> {
        let parent = acl.read().parent_acl().cloned();
        if let Some(parent) = parent {
            let parent_oid = parent.read().object_identity().clone();
            let resolved = match loaded.get(&parent_oid) {
                Some(existing) => existing.clone(),
                None => {
                    self.adopt(loaded, &parent, sids)?;
                    parent
                }
            };
            if self.ensure_covers(&self.store.lock(), &resolved, sids)? {
                self.cache_put(&resolved);
            }
            let parent_id = resolved.id();
            acl.write().attach_parent(Some(resolved), parent_id);
        }
        self.register(loaded, acl);
        Ok(())
    }

    /// Whether `acl` has uncommitted changes to `bucket` or its entries.
    fn has_pending(&self, acl: &Acl, bucket: &Bucket) -> bool {
        self.tracker.change_set(acl.key()).is_some_and(|changes| {
            changes.properties.contains_key(&bucket.property())
                || acl
                    .entries(bucket)
                    .iter()
                    .any(|e| changes.entries.contains_key(&e.key()))
        })
    }

    fn cache_put(&self, acl: &SharedAcl) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.put(acl)
        {
            log::warn!("could not cache {acl:?}: {e}");
        }
    }
}

impl AclProvider for MemoryAclProvider {
    fn find_acls(&self, oids: &[ObjectIdentity], sids: &[SecurityIdentity]) -> Result<AclMap> {
        let mut loaded = self.loaded();
        let mut found = AclMap::new();
        let mut missing = Vec::new();

        for oid in oids {
            if found.contains_key(oid) {
                continue;
            }

            if let Some(existing) = loaded.get(oid).cloned() {
                if self.ensure_covers(&self.store.lock(), &existing, sids)? {
                    self.cache_put(&existing);
                }
                found.insert(oid.clone(), existing);
                continue;
            }

            if let Some(cached) = self.cache.as_ref().and_then(|c| c.get_by_identity(oid)) {
                let complete = covers(&cached.read(), sids);
                if complete {
                    log::trace!("cache hit for {oid}");
                    self.adopt(&mut loaded, &cached, sids)?;
                    found.insert(oid.clone(), cached);
                    continue;
                }
            }

            let hydrated = {
                let tables = self.store.lock();
                match tables.acl_id(oid) {
                    Some(id) => Some(self.hydrate(&tables, &mut loaded, id, sids, 0)?),
                    None => None,
                }
            };
            match hydrated {
                Some(acl) => {
                    self.cache_put(&acl);
                    found.insert(oid.clone(), acl);
                }
                None => missing.push(oid.clone()),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            log::debug!("{} of {} ACLs not found", missing.len(), oids.len());
            Err(Error::NotAllAclsFound { found, missing })
        }
    }

    fn find_children(
        &self,
        parent: &ObjectIdentity,
        direct_only: bool,
    ) -> Result<Vec<ObjectIdentity>> {
        let tables = self.store.lock();
        let Some(id) = tables.acl_id(parent) else {
            return Ok(Vec::new());
        };
        let ids = if direct_only {
            tables.children(id)
        } else {
            tables.descendants(id)
        };
        ids.into_iter()
            .map(|id| tables.oid(id).map(|row| row.identity.clone()))
            .collect()
    }
}

impl MutableAclProvider for MemoryAclProvider {
    fn create_acl(&self, oid: &ObjectIdentity) -> Result<SharedAcl> {
        {
            let mut tables = self.store.lock();
            if tables.acl_id(oid).is_some() {
                return Err(Error::AlreadyExists(oid.clone()));
            }
            tables.insert_oid(oid.clone(), None, true);
        }
        log::debug!("created ACL for {oid}");
        self.find_acl(oid, &[])
    }

    fn delete_acl(&self, oid: &ObjectIdentity) -> Result<()> {
        let mut loaded = self.loaded();
        let removed = {
            let mut tables = self.store.lock();
            let Some(id) = tables.acl_id(oid) else {
                log::debug!("no ACL stored for {oid}, nothing to delete");
                return Ok(());
            };
            tables.delete_cascade(id)
        };
        for oid in &removed {
            if let Some(acl) = loaded.remove(oid) {
                self.tracker.release(acl.key());
            }
            if let Some(cache) = &self.cache {
                cache.evict_by_identity(oid);
            }
        }
        log::debug!("deleted {} ACLs rooted at {oid}", removed.len());
        Ok(())
    }

    fn update_acl(&self, acl: &SharedAcl) -> Result<()> {
        let key = acl.key();
        if !self.tracker.is_managed(key) {
            return Err(Error::invalid_argument(
                "the ACL was not loaded by this provider",
            ));
        }
        let changes = self.tracker.change_set(key).unwrap_or_default();
        if changes.is_empty() {
            return Ok(());
        }

        let loaded = self.loaded();
        let object_type = acl.read().object_identity().object_type().to_string();
        let siblings: Vec<SharedAcl> = loaded
            .values()
            .filter(|other| other.key() != key)
            .filter(|other| {
                let other = other.read();
                other.object_identity().object_type() == object_type
                    && other.loaded_sids().is_empty()
            })
            .cloned()
            .collect();

        let mut guard = acl.write();
        let id = guard
            .id()
            .ok_or_else(|| Error::invalid_state("a tracked ACL has no id"))?;
        let touches_entries =
            changes.properties.keys().any(AclProperty::is_bucket) || !changes.entries.is_empty();
        if touches_entries && !guard.loaded_sids().is_empty() {
            return Err(Error::invalid_state(format!(
                "{} was loaded for a subset of security identities, load it for all before changing entries",
                guard.object_identity()
            )));
        }
        let class_buckets = commit::class_buckets(&guard, &changes);
        let inserted = self
            .store
            .transaction(|tables| commit::apply(tables, &guard, id, &changes))
            .inspect_err(|e| log::warn!("commit of {} rejected: {e}", guard.object_identity()))?;

        guard.assign_entry_ids(&inserted);
        self.tracker.clear(key);

        // Class rows are shared by the whole type: refresh every loaded copy
        // from storage, except copies with edits of their own still pending.
        if !class_buckets.is_empty() {
            let tables = self.store.lock();
            for bucket in &class_buckets {
                guard.replace_bucket(bucket, tables.bucket_records(&object_type, id, bucket));
                for sibling in &siblings {
                    let mut sibling = sibling.write();
                    if self.has_pending(&sibling, bucket) {
                        log::debug!(
                            "{} keeps its uncommitted copy of {}",
                            sibling.object_identity(),
                            bucket.property()
                        );
                        continue;
                    }
                    sibling.replace_bucket(bucket, tables.bucket_records(&object_type, id, bucket));
                }
            }
        }

        if let Some(cache) = &self.cache {
            if class_buckets.is_empty() {
                cache.evict_by_identity(guard.object_identity());
            } else {
                cache.clear();
            }
        }
        log::debug!(
            "committed {} ACL and {} entry changes for {}",
            changes.properties.len(),
            changes.entries.len(),
            guard.object_identity()
        );
        Ok(())
    }
}
