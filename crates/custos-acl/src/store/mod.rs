//! Reference in-memory storage.
//!
//! [`MemoryAclStore`] holds the persisted rows: one row per object identity
//! and one row per entry. Class-scope entry rows carry no object id and are
//! shared by every ACL of the same object type. Any number of
//! [`MemoryAclProvider`]s can work against one store; each keeps its own
//! identity map of loaded ACLs and its own change tracker.

mod commit;
mod provider;
mod tables;

pub use provider::MemoryAclProvider;

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tables::Tables;

/// Cloneable handle to shared in-memory ACL tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryAclStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryAclStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored ACLs.
    pub fn acl_count(&self) -> usize {
        self.lock().acl_count()
    }

    /// Number of stored entries, class-scope entries included.
    pub fn entry_count(&self) -> usize {
        self.lock().entry_count()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against a copy of the tables and keeps the copy only if `f`
    /// succeeds.
    pub(crate) fn transaction<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self.lock();
        let mut working = tables.clone();
        let out = f(&mut working)?;
        *tables = working;
        Ok(out)
    }
}
