//! Common test utilities and harness for custos-acl integration tests.

use custos_acl::{
    DefaultPermissionGrantingStrategy, MemoryAclProvider, MemoryAclStore,
    PermissionGrantingStrategy,
};
use custos_core::{GrantingConfig, ObjectIdentity, SecurityIdentity};
use std::sync::Arc;

/// Test harness for integration tests.
///
/// Owns one store so that several providers can work against the same
/// persisted state, the way separate requests would.
pub struct TestHarness {
    /// Shared storage
    pub store: MemoryAclStore,
    /// Strategy handed to every provider
    pub strategy: Arc<dyn PermissionGrantingStrategy>,
    /// Default provider
    pub provider: MemoryAclProvider,
}

impl TestHarness {
    /// Creates a harness with an empty store and the default strategy.
    pub fn new() -> Self {
        Self::with_strategy(Arc::new(DefaultPermissionGrantingStrategy::new()))
    }

    /// Creates a harness whose strategy uses `config`.
    pub fn with_config(config: GrantingConfig) -> Self {
        Self::with_strategy(Arc::new(DefaultPermissionGrantingStrategy::with_config(
            config,
        )))
    }

    fn with_strategy(strategy: Arc<dyn PermissionGrantingStrategy>) -> Self {
        let store = MemoryAclStore::new();
        let provider = MemoryAclProvider::new(store.clone(), strategy.clone());
        Self {
            store,
            strategy,
            provider,
        }
    }

    /// A second provider over the same store, with an empty identity map.
    pub fn fresh_provider(&self) -> MemoryAclProvider {
        MemoryAclProvider::new(self.store.clone(), self.strategy.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Object identity of type `Post`.
pub fn post(id: &str) -> ObjectIdentity {
    ObjectIdentity::new(id, "Post").unwrap()
}

/// Object identity of type `Blog`.
pub fn blog(id: &str) -> ObjectIdentity {
    ObjectIdentity::new(id, "Blog").unwrap()
}

/// Role security identity.
pub fn role(name: &str) -> SecurityIdentity {
    SecurityIdentity::role(name).unwrap()
}

/// User security identity of type `App\User`.
pub fn user(name: &str) -> SecurityIdentity {
    SecurityIdentity::user(name, "App\\User").unwrap()
}
