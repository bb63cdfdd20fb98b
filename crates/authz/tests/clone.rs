//! Integration tests for cloning repositories, users and groups

mod common;

use ::authz::config::{DocumentConfig, RepositoryCloneMode};
use ::authz::model::{AccessLevel, DocumentError};

#[test]
fn test_clone_repository_name_only() {
    let mut doc = common::setup_document();
    common::add_rules(&mut doc);
    let rules = doc.tree().rule_count();

    doc.clone_repository("project", "copy").unwrap();

    let copy = doc.find_repository_by_name("copy").unwrap().unwrap();
    let root = doc.node(copy.root()).unwrap();
    assert!(root.children().is_empty());
    assert!(root.rules().is_empty());
    assert_eq!(doc.tree().rule_count(), rules);

    let err = doc.clone_repository("copy", "project").unwrap_err();
    assert_eq!(err, DocumentError::RepositoryAlreadyExists("project".to_string()));
    common::assert_consistent(&doc);
}

#[test]
fn test_clone_repository_with_rules() {
    let config = DocumentConfig {
        repository_clone: RepositoryCloneMode::WithRules,
        ..Default::default()
    };
    let mut doc = common::setup_document_with(config);
    common::add_rules(&mut doc);

    doc.clone_repository("project", "copy").unwrap();

    let rule = doc
        .find_access_rule_for_user_at_path(Some("copy"), "trunk/src", "alice")
        .unwrap()
        .unwrap();
    assert_eq!(rule.access_level(), AccessLevel::ReadWrite);
    assert_eq!(doc.repository_of(rule.node()).unwrap().name(), "copy");

    let branches = doc
        .find_access_rule_for_user_group_at_path(Some("copy"), "branches", "dev")
        .unwrap()
        .unwrap();
    assert_eq!(branches.access_level(), AccessLevel::DenyAccess);
    assert!(branches.is_exclusion());

    // Subjects know about the copies; server-wide rules are not repository rules
    assert_eq!(doc.access_rules_for_user("alice").unwrap().len(), 3);
    assert_eq!(doc.access_rules_for_user_group("dev").unwrap().len(), 4);
    common::assert_consistent(&doc);
}

#[test]
fn test_clone_user() {
    let mut doc = common::setup_document();
    common::add_rules(&mut doc);

    let id = doc.clone_user("alice", "carol", Some("c1")).unwrap();

    let carol = doc.user(id).unwrap();
    assert_eq!(carol.name(), "carol");
    assert_eq!(carol.alias(), Some("c1"));
    let dev = doc.find_user_group_by_name("dev").unwrap().unwrap();
    assert!(carol.is_member_of(dev.id()));
    assert!(dev.has_user_member(id));

    let rule = doc
        .find_access_rule_for_user_at_path(Some("project"), "trunk/src", "carol")
        .unwrap()
        .unwrap();
    assert_eq!(rule.access_level(), AccessLevel::ReadWrite);
    assert!(doc
        .find_access_rule_for_user_at_path(None, "/", "carol")
        .unwrap()
        .is_some());

    // The source keeps its own rules
    assert_eq!(doc.access_rules_for_user("alice").unwrap().len(), 2);
    common::assert_consistent(&doc);
}

#[test]
fn test_clone_user_collisions() {
    let mut doc = common::setup_document();

    let err = doc.clone_user("alice", "bob", None).unwrap_err();
    assert_eq!(err, DocumentError::UserAlreadyExists("bob".to_string()));

    let err = doc.clone_user("alice", "carol", Some("a1")).unwrap_err();
    assert_eq!(err, DocumentError::UserAliasAlreadyExists("a1".to_string()));

    let err = doc.clone_user("ghost", "carol", None).unwrap_err();
    assert_eq!(err, DocumentError::UserNotFound("ghost".to_string()));

    assert!(doc.find_user_by_name("carol").unwrap().is_none());
    common::assert_consistent(&doc);
}

#[test]
fn test_clone_user_group() {
    let mut doc = common::setup_document();
    common::add_rules(&mut doc);
    doc.create_user_group("core").unwrap();
    doc.add_user_group_to_user_group("core", "dev").unwrap();

    let id = doc.clone_user_group("dev", "dev2").unwrap();

    let clone = doc.user_group(id).unwrap();
    let alice = doc.find_user_by_name("alice").unwrap().unwrap();
    let core = doc.find_user_group_by_name("core").unwrap().unwrap();
    assert!(clone.has_user_member(alice.id()));
    assert!(alice.is_member_of(id));
    assert!(clone.has_user_group_member(core.id()));
    assert!(core.user_groups().contains(&id));

    // Parents are not copied
    assert!(clone.user_groups().is_empty());

    assert_eq!(doc.access_rules_for_user_group("dev2").unwrap().len(), 2);
    assert!(doc
        .find_access_rule_for_user_group_at_path(Some("project"), "branches", "dev2")
        .unwrap()
        .is_some());
    common::assert_consistent(&doc);
}
