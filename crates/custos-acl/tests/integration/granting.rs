//! Integration tests for permission decisions on committed ACLs.

use custos_acl::{AclProvider, Error, GrantingStrategy, MaskBuilder, MutableAclProvider};
use custos_core::GrantingConfig;

use crate::common::{TestHarness, blog, post, role, user};

#[test]
fn test_object_entry_grants_after_reload() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_ace(user("alice"), MaskBuilder::OWNER, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let reloaded = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    let reloaded = reloaded.read();
    assert!(reloaded
        .is_granted(&[MaskBuilder::OWNER], &[user("alice")], false)
        .unwrap());
    assert!(matches!(
        reloaded.is_granted(&[MaskBuilder::OWNER], &[user("bob")], false),
        Err(Error::NoApplicableEntry)
    ));
}

#[test]
fn test_class_entry_applies_to_every_object_of_the_type() {
    let harness = TestHarness::new();
    let first = harness.provider.create_acl(&post("1")).unwrap();
    harness.provider.create_acl(&post("2")).unwrap();
    harness.provider.create_acl(&blog("1")).unwrap();

    first
        .write()
        .insert_class_ace(role("ROLE_ADMIN"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&first).unwrap();

    let provider = harness.fresh_provider();
    let second = provider.find_acl(&post("2"), &[]).unwrap();
    assert!(second
        .read()
        .is_granted(&[MaskBuilder::EDIT], &[role("ROLE_ADMIN")], false)
        .unwrap());
    let other_type = provider.find_acl(&blog("1"), &[]).unwrap();
    assert!(other_type.read().class_aces().is_empty());
}

#[test]
fn test_object_entry_takes_precedence_over_class_entry() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut acl = acl.write();
        acl.insert_class_ace(role("ROLE_USER"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
        acl.insert_object_ace(role("ROLE_USER"), MaskBuilder::VIEW, 0, false, None)
            .unwrap();
    }
    harness.provider.update_acl(&acl).unwrap();

    let acl = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    assert!(!acl
        .read()
        .is_granted(&[MaskBuilder::VIEW], &[role("ROLE_USER")], false)
        .unwrap());
}

#[test]
fn test_child_without_entries_inherits_from_parent() {
    let harness = TestHarness::new();
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    parent
        .write()
        .insert_object_ace(role("ROLE_EDITOR"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&parent).unwrap();

    let child = harness.provider.create_acl(&post("1")).unwrap();
    child.write().set_parent_acl(Some(parent.clone())).unwrap();
    harness.provider.update_acl(&child).unwrap();

    let provider = harness.fresh_provider();
    let child = provider.find_acl(&post("1"), &[]).unwrap();
    let child = child.read();
    assert_eq!(child.parent_id(), parent.read().id());
    assert!(child
        .is_granted(&[MaskBuilder::EDIT], &[role("ROLE_EDITOR")], false)
        .unwrap());
}

#[test]
fn test_unmatched_local_entries_stop_inheritance_by_default() {
    let harness = TestHarness::new();
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    parent
        .write()
        .insert_object_ace(role("ROLE_EDITOR"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&parent).unwrap();

    let child = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut child = child.write();
        child.set_parent_acl(Some(parent.clone())).unwrap();
        child
            .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&child).unwrap();

    let result = child
        .read()
        .is_granted(&[MaskBuilder::EDIT], &[role("ROLE_EDITOR")], false);
    assert!(matches!(result, Err(Error::NoApplicableEntry)));
}

#[test]
fn test_unmatched_local_entries_inherit_when_configured() {
    let harness = TestHarness::with_config(GrantingConfig {
        inherit_when_unmatched: true,
        ..GrantingConfig::default()
    });
    let parent = harness.provider.create_acl(&blog("1")).unwrap();
    parent
        .write()
        .insert_object_ace(role("ROLE_EDITOR"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&parent).unwrap();

    let child = harness.provider.create_acl(&post("1")).unwrap();
    {
        let mut child = child.write();
        child.set_parent_acl(Some(parent.clone())).unwrap();
        child
            .insert_object_ace(user("alice"), MaskBuilder::VIEW, 0, true, None)
            .unwrap();
    }
    harness.provider.update_acl(&child).unwrap();

    assert!(child
        .read()
        .is_granted(&[MaskBuilder::EDIT], &[role("ROLE_EDITOR")], false)
        .unwrap());
}

#[test]
fn test_field_entries_survive_commit() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    acl.write()
        .insert_object_field_ace("title", user("alice"), MaskBuilder::EDIT, 0, true, None)
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let acl = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    let acl = acl.read();
    assert_eq!(acl.object_field_aces("title").len(), 1);
    assert!(acl
        .is_field_granted("title", &[MaskBuilder::EDIT], &[user("alice")], false)
        .unwrap());
    assert!(matches!(
        acl.is_granted(&[MaskBuilder::EDIT], &[user("alice")], false),
        Err(Error::NoApplicableEntry)
    ));
}

#[test]
fn test_equal_strategy_requires_exact_mask() {
    let harness = TestHarness::new();
    let acl = harness.provider.create_acl(&post("1")).unwrap();
    let mask = MaskBuilder::VIEW | MaskBuilder::EDIT;
    acl.write()
        .insert_object_ace(user("alice"), mask, 0, true, Some(GrantingStrategy::Equal))
        .unwrap();
    harness.provider.update_acl(&acl).unwrap();

    let acl = harness.fresh_provider().find_acl(&post("1"), &[]).unwrap();
    let acl = acl.read();
    assert_eq!(acl.object_aces()[0].strategy(), GrantingStrategy::Equal);
    assert!(acl.is_granted(&[mask], &[user("alice")], false).unwrap());
    assert!(matches!(
        acl.is_granted(&[MaskBuilder::VIEW], &[user("alice")], false),
        Err(Error::NoApplicableEntry)
    ));
}
