//! Integration tests for the in-memory provider: lookup, lifecycle and
//! conflict detection on commit.

use custos_acl::{
    Acl, AclProvider, EntryProperty, Error, MaskBuilder, MutableAclProvider, PropertyName,
    SharedAcl,
};
use custos_core::UserIdentity;

use crate::common::{TestHarness, blog, post, role, user};

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_same_identity_yields_same_instance() {
    let harness = TestHarness::new();
    let created = harness.provider.create_acl(&post("1")).unwrap();
    let found = harness.provider.find_acl(&post("1"), &[]).unwrap();
    assert!(created.ptr_eq(&found));

    let other = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    assert!(!created.ptr_eq(&other));
}

#[test]
fn test_create_twice_fails() {
    let harness = TestHarness::new();
    harness.provider.create_acl(&post("1")).unwrap();
    let err = harness.provider.create_acl(&post("1")).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(oid) if oid == post("1")));
}

#[test]
fn test_created_acl_is_persisted_and_inheriting() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    let acl = acl.read();
    assert!(acl.id().is_some());
    assert!(acl.is_entries_inheriting());
    assert!(acl.parent_acl().is_none());
    assert_eq!(harness.store.acl_count(), 1);
}

#[test]
fn test_find_missing_acl() {
    let harness = TestHarness::new();
    let err = harness.provider.find_acl(&post("404"), &[]).unwrap_err();
    assert!(matches!(err, Error::AclNotFound(oid) if oid == post("404")));
}

#[test]
fn test_partial_batch_reports_found_and_missing() {
    let harness = TestHarness::new();
    harness.provider.create_acl(&post("1")).unwrap();

    let err = harness
        .fresh_provider()
        .find_acls(&[post("1"), post("2")], &[])
        .unwrap_err();
    match err {
        Error::NotAllAclsFound { found, missing } => {
            assert!(found.contains_key(&post("1")));
            assert_eq!(missing, vec![post("2")]);
        }
        other => unreachable!("unexpected error: {other}"),
    }
}

#[test]
fn test_loading_for_fewer_identities_then_all() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut acl = acl.write();
        acl.insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
        acl.insert_object_ace(user("bob"), MaskBuilder::VIEW, 1, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&acl).unwrap();

    let provider = harness.fresh_provider();
    let partial = provider.find_acl(&post("1"), &[user("alice")]).unwrap();
    assert_eq!(partial.read().object_aces().len(), 1);
    assert!(partial.read().is_sid_loaded(&[user("alice")]));
    assert!(!partial.read().is_sid_loaded(&[user("bob")]));

    let full = provider.find_acl(&post("1"), &[]).unwrap();
    assert!(partial.ptr_eq(&full));
    assert_eq!(full.read().object_aces().len(), 2);
}

#[test]
fn test_partially_loaded_acl_rejects_entry_commit() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let provider = harness.fresh_provider();
    let partial = provider.find_acl(&post("1"), &[user("alice")]).unwrap();
    partial
        .write()
        .update_object_ace(0, MaskBuilder::EDIT, None)
        .unwrap();
    let err = provider.update_acl(&partial).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));

    let err = provider.find_acl(&post("1"), &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}

#[test]
fn test_parent_shared_by_lookups_for_different_identities() {
    let harness = TestHarness::new();
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    {
        let mut parent = parent.write();
        parent
            .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
        parent
            .insert_object_ace(user("bob"), MaskBuilder::VIEW, 1, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&parent).unwrap();
    for id in ["1", "2"] {
        let child = harness.provider.create_acl(&post(id)).unwrap();
        child.write().set_parent_acl(Some(parent.clone())).unwrap();
        harness.provider.update_acl(&child).unwrap();
    }

    let provider = harness.fresh_provider();
    let first = provider.find_acl(&post("1"), &[user("alice")]).unwrap();
    assert!(first
        .read()
        .is_granted(&[MaskBuilder::VIEW], &[user("alice")], false)
        .unwrap());

    let second = provider.find_acl(&post("2"), &[user("bob")]).unwrap();
    let second = second.read();
    let shared_parent = second.parent_acl().unwrap();
    assert!(shared_parent.ptr_eq(first.read().parent_acl().unwrap()));
    assert!(shared_parent
        .read()
        .is_granted(&[MaskBuilder::VIEW], &[user("bob")], false)
        .unwrap());
    assert!(second
        .is_granted(&[MaskBuilder::VIEW], &[user("bob")], false)
        .unwrap());
}

#[test]
fn test_partially_loaded_parent_with_pending_changes_blocks_lookup() {
    let harness = TestHarness::new();
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    for id in ["1", "2"] {
        let child = harness.provider.create_acl(&post(id)).unwrap();
        child.write().set_parent_acl(Some(parent.clone())).unwrap();
        harness.provider.update_acl(&child).unwrap();
    }

    let provider = harness.fresh_provider();
    let first = provider.find_acl(&post("1"), &[user("alice")]).unwrap();
    let loaded_parent = first.read().parent_acl().unwrap().clone();
    loaded_parent.write().set_entries_inheriting(false).unwrap();

    let err = provider.find_acl(&post("2"), &[user("bob")]).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_commit_assigns_entry_ids() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(role("ROLE_USER"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    assert!(acl.read().object_aces()[0].id().is_none());

    harness.provider.update_acl(&acl).unwrap();
    assert!(acl.read().object_aces()[0].id().is_some());
    assert!(!harness.provider.tracker().has_changes(acl.key()));
    assert_eq!(harness.store.entry_count(), 1);
}

#[test]
fn test_commit_without_changes_is_a_no_op() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(role("ROLE_USER"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    acl.write().delete_object_ace(0).unwrap();
    assert!(!harness.provider.tracker().has_changes(acl.key()));
    harness.provider.update_acl(&acl).unwrap();
    assert_eq!(harness.store.entry_count(), 0);
}

#[test]
fn test_update_of_foreign_acl_is_rejected() {
    let harness = TestHarness::new();
    let transient = SharedAcl::new(Acl::new(
        None,
        post("1"),
        harness.strategy.clone(),
        Vec::new(),
        true,
    ));
    let err = harness.provider.update_acl(&transient).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test]
fn test_reordering_and_updates_persist() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut acl = acl.write();
        acl.insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
        acl.insert_object_ace(user("bob"), MaskBuilder::VIEW, 1, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&acl).unwrap();

    {
        let mut acl = acl.write();
        acl.insert_object_ace(user("carol"), MaskBuilder::EDIT, 0, true, None)
            .unwrap();
        acl.update_object_ace(2, MaskBuilder::DELETE, None).unwrap();
        acl.update_object_auditing(1, true, false).unwrap();
        acl.delete_object_ace(1).unwrap();
    }
    harness.provider.update_acl(&acl).unwrap();

    let reloaded = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    let reloaded = reloaded.read();
    let aces = reloaded.object_aces();
    assert_eq!(aces.len(), 2);
    assert_eq!(aces[0].security_identity(), &user("carol"));
    assert_eq!(aces[1].security_identity(), &user("bob"));
    assert_eq!(aces[1].mask(), MaskBuilder::DELETE);
    assert_eq!(harness.store.entry_count(), 2);
}

#[test]
fn test_delete_cascades_to_children() {
    let harness = TestHarness::new();
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    let child = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut child = child.write();
        child.set_parent_acl(Some(parent.clone())).unwrap();
        child
            .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&child).unwrap();

    harness.provider.delete_acl(&blog("1")).unwrap();
    assert_eq!(harness.store.acl_count(), 0);
    assert_eq!(harness.store.entry_count(), 0);
    assert!(matches!(
        harness.provider.find_acl(&post("1"), &[]),
        Err(Error::AclNotFound(_))
    ));
    assert!(!harness.provider.tracker().is_managed(child.key()));

    harness.provider.delete_acl(&blog("1")).unwrap();
}

#[test]
fn test_delete_keeps_class_entries() {
    let harness = TestHarness::new();
    let first = harness.provider.create_acl(&post("1")).unwrap();
    harness.provider.create_acl(&post("2")).unwrap();
    first
        .write()
        .insert_class_ace(role("ROLE_ADMIN"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    harness.provider.delete_acl(&post("1")).unwrap();
    let second = harness.fresh_provider().find_acl(&post("2"), &[]).unwrap();
    assert_eq!(second.read().class_aces().len(), 1);
}

#[test]
fn test_find_children() {
    let harness = TestHarness::new();
    let root = harness.provider.create_acl(&blog("1")).unwrap();
    let child = harness.provider.create_acl(&post("1")).unwrap();
    let grandchild = harness.provider.create_acl(&post("2")).unwrap();
    child.write().set_parent_acl(Some(root.clone())).unwrap();
    harness.provider.update_acl(&child).unwrap();
    grandchild.write().set_parent_acl(Some(child.clone())).unwrap();
    harness.provider.update_acl(&grandchild).unwrap();

    let direct = harness.provider.find_children(&blog("1"), true).unwrap();
    assert_eq!(direct, vec![post("1")]);

    let mut all = harness.provider.find_children(&blog("1"), false).unwrap();
    all.sort_by(|a, b| a.identifier().cmp(b.identifier()));
    assert_eq!(all, vec![post("1"), post("2")]);

    assert!(harness.provider.find_children(&blog("404"), true).unwrap().is_empty());
}

#[test]
fn test_parent_cycle_is_rejected_on_commit() {
    let harness = TestHarness::new();
    let a = harness.provider.create_acl(&blog("a")).unwrap();
    let b = harness.provider.create_acl(&blog("b")).unwrap();
    a.write().set_parent_acl(Some(b.clone())).unwrap();
    harness.provider.update_acl(&a).unwrap();

    b.write().set_parent_acl(Some(a.clone())).unwrap();
    let err = harness.provider.update_acl(&b).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}

#[test]
fn test_rename_user_identity() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let renamed = UserIdentity::new("alicia", "App\\User").unwrap();
    assert_eq!(
        harness
            .provider
            .update_user_security_identity(&renamed, "alice")
            .unwrap(),
        1
    );

    let reloaded = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    assert_eq!(
        reloaded.read().object_aces()[0].security_identity(),
        &user("alicia")
    );

    let err = harness
        .provider
        .update_user_security_identity(&renamed, "alicia")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

// ============================================================================
// Conflicts
// ============================================================================

#[test]
fn test_concurrent_class_bucket_change_is_rejected() {
    let harness = TestHarness::new();
    harness.provider.create_acl(&post("1")).unwrap();

    let first = harness.fresh_provider();
    let second = harness.fresh_provider();
    let a = first.find_acl(&post("1"), &[]).unwrap();
    let b = second.find_acl(&post("1"), &[]).unwrap();

    a.write()
        .insert_class_ace(role("ROLE_A"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    first.update_acl(&a).unwrap();

    b.write()
        .insert_class_ace(role("ROLE_B"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    let err = second.update_acl(&b).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "The \"classAces\" property has been modified concurrently"
    );
    assert_eq!(harness.store.entry_count(), 1);
    assert!(second.tracker().has_changes(b.key()));
}

#[test]
fn test_concurrent_entry_change_is_rejected() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let first = harness.fresh_provider();
    let second = harness.fresh_provider();
    let a = first.find_acl(&post("1"), &[]).unwrap();
    let b = second.find_acl(&post("1"), &[]).unwrap();

    a.write().update_object_ace(0, MaskBuilder::EDIT, None).unwrap();
    first.update_acl(&a).unwrap();

    b.write().update_object_ace(0, MaskBuilder::DELETE, None).unwrap();
    match second.update_acl(&b).unwrap_err() {
        Error::ConcurrentModification { property } => {
            assert_eq!(property, PropertyName::Entry(EntryProperty::Mask));
        }
        other => unreachable!("unexpected error: {other}"),
    }

    let stored = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    assert_eq!(stored.read().object_aces()[0].mask(), MaskBuilder::EDIT);
}

#[test]
fn test_class_change_syncs_loaded_siblings() {
    let harness = TestHarness::new();
    let first = harness.provider.create_acl(&post("1")).unwrap();
    let second = harness.provider.create_acl(&post("2")).unwrap();

    first
        .write()
        .insert_class_ace(role("ROLE_ADMIN"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    let synced = second.read();
    assert_eq!(synced.class_aces().len(), 1);
    assert_eq!(synced.class_aces()[0].id(), first.read().class_aces()[0].id());
    assert!(synced
        .is_granted(&[MaskBuilder::EDIT], &[role("ROLE_ADMIN")], false)
        .unwrap());
}

#[test]
fn test_class_entry_removed_elsewhere_blocks_commit() {
    let harness = TestHarness::new();
    let first = harness.provider.create_acl(&post("1")).unwrap();
    let second = harness.provider.create_acl(&post("2")).unwrap();
    first
        .write()
        .insert_class_ace(role("ROLE_A"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    // Another provider removes the shared class entry.
    let other = harness.fresh_provider();
    let foreign = other.find_acl(&post("2"), &[]).unwrap();
    foreign.write().delete_class_ace(0).unwrap();
    other.update_acl(&foreign).unwrap();

    second.write().update_class_ace(0, MaskBuilder::EDIT, None).unwrap();
    let err = harness.provider.update_acl(&second).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn test_class_commit_keeps_pending_class_edit_of_sibling() {
    let harness = TestHarness::new();
    let first = harness.provider.create_acl(&post("1")).unwrap();
    let second = harness.provider.create_acl(&post("2")).unwrap();
    first
        .write()
        .insert_class_ace(role("ROLE_A"), MaskBuilder::VIEW, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    second
        .write()
        .update_class_ace(0, MaskBuilder::EDIT, None)
        .unwrap();
    first
        .write()
        .insert_class_ace(role("ROLE_B"), MaskBuilder::VIEW, 1, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    {
        let pending = second.read();
        assert_eq!(pending.class_aces().len(), 1);
        assert_eq!(pending.class_aces()[0].mask(), MaskBuilder::EDIT);
    }
    assert!(harness.provider.tracker().has_changes(second.key()));

    harness.provider.update_acl(&second).unwrap();
    let stored = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    let masks: Vec<_> = stored.read().class_aces().iter().map(|e| e.mask()).collect();
    assert_eq!(masks, vec![MaskBuilder::EDIT, MaskBuilder::VIEW]);

    for acl in [&first, &second] {
        let masks: Vec<_> = acl.read().class_aces().iter().map(|e| e.mask()).collect();
        assert_eq!(masks, vec![MaskBuilder::EDIT, MaskBuilder::VIEW]);
    }
}
