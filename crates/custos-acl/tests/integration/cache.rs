//! Integration tests for a provider backed by a cache.

use custos_acl::{
    AclCache, AclProvider, MaskBuilder, MemoryAclCache, MemoryAclProvider, MemoryAclStore,
    MutableAclProvider,
};
use std::sync::Arc;

use crate::common::{TestHarness, blog, post, role, user};

fn cached(harness: &TestHarness) -> (MemoryAclProvider, Arc<MemoryAclCache>) {
    let cache = Arc::new(MemoryAclCache::new("custos_test_", harness.strategy.clone()).unwrap());
    let provider = harness.fresh_provider().with_cache(cache.clone());
    (provider, cache)
}

/// Commits `post 1` with an object entry under `blog 1`.
fn seed(provider: &MemoryAclProvider) {
    let parent = provider.create_acl(&blog("1")).unwrap();
    let child = provider.create_acl(&post("1")).unwrap();
    {
        let mut child = child.write();
        child.set_parent_acl(Some(parent)).unwrap();
        child
            .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
    }
    provider.update_acl(&child).unwrap();
}

#[test]
fn test_lookup_caches_acl_and_ancestors() {
    let harness = TestHarness::new();
    seed(&harness.provider);
    let (provider, cache) = cached(&harness);

    provider.find_acl(&post("1"), &[]).unwrap();
    assert!(cache.get_by_identity(&post("1")).is_some());
    assert!(cache.get_by_identity(&blog("1")).is_some());
    assert_eq!(cache.len(), 4);
}

#[test]
fn test_cache_serves_a_provider_without_rows() {
    let harness = TestHarness::new();
    seed(&harness.provider);
    let (provider, cache) = cached(&harness);
    provider.find_acl(&post("1"), &[]).unwrap();

    let detached = MemoryAclProvider::new(MemoryAclStore::new(), harness.strategy.clone())
        .with_cache(cache);
    let child = detached.find_acl(&post("1"), &[]).unwrap();
    let parent = detached.find_acl(&blog("1"), &[]).unwrap();

    let child = child.read();
    assert!(child.parent_acl().unwrap().ptr_eq(&parent));
    assert!(child
        .is_granted(&[MaskBuilder::VIEW], &[user("alice")], false)
        .unwrap());
}

#[test]
fn test_commit_evicts_the_acl() {
    let harness = TestHarness::new();
    seed(&harness.provider);
    let (provider, cache) = cached(&harness);

    let acl = provider.find_acl(&post("1"), &[]).unwrap();
    acl.write()
        .update_object_ace(0, MaskBuilder::EDIT, None)
        .unwrap();
    provider.update_acl(&acl).unwrap();

    assert!(cache.get_by_identity(&post("1")).is_none());
    assert!(cache.get_by_identity(&blog("1")).is_some());
}

#[test]
fn test_class_commit_clears_the_cache() {
    let harness = TestHarness::new();
    seed(&harness.provider);
    let (provider, cache) = cached(&harness);

    let acl = provider.find_acl(&post("1"), &[]).unwrap();
    acl.write()
        .insert_class_ace(role("ROLE_ADMIN"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    provider.update_acl(&acl).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_delete_evicts_descendants() {
    let harness = TestHarness::new();
    seed(&harness.provider);
    let (provider, cache) = cached(&harness);
    provider.find_acl(&post("1"), &[]).unwrap();

    provider.delete_acl(&blog("1")).unwrap();
    assert!(cache.is_empty());
}
