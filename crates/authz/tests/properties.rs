//! Randomized operation sequences that must keep every link consistent

mod common;

use ::authz::config::{CyclePolicy, DocumentConfig, RepositoryCloneMode};
use ::authz::model::{AccessLevel, Document, PathTree, UserGroupId};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Who {
    User(&'static str),
    UserGroup(&'static str),
}

#[derive(Debug, Clone)]
enum Op {
    CreateRepository(&'static str),
    RenameRepository(&'static str, &'static str),
    DeleteRepository(&'static str),
    CloneRepository(&'static str, &'static str),
    CreateUser(&'static str, Option<&'static str>),
    RenameUser(&'static str, &'static str, Option<&'static str>),
    DeleteUser(&'static str),
    CloneUser(&'static str, &'static str, Option<&'static str>),
    CreateUserGroup(&'static str),
    RenameUserGroup(&'static str, &'static str),
    DeleteUserGroup(&'static str),
    CloneUserGroup(&'static str, &'static str),
    AddUser(&'static str, &'static str),
    RemoveUser(&'static str, &'static str),
    AddUserGroup(&'static str, &'static str),
    RemoveUserGroup(&'static str, &'static str),
    CreateRule(Option<&'static str>, &'static str, Who, AccessLevel, bool),
    UpdateRule(Option<&'static str>, &'static str, Who, AccessLevel, bool),
    DeleteRule(Option<&'static str>, &'static str, Who),
}

fn repository() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("r1"), Just("r2")]
}

fn user() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("u1"), Just("u2"), Just("u3")]
}

fn alias() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("a1")), Just(Some("a2")), Just(Some("u1"))]
}

fn user_group() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("g1"), Just("g2"), Just("g3")]
}

fn rule_root() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("r1")), Just(Some("r2")), Just(Some(""))]
}

fn rule_path() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("/"),
        Just("trunk"),
        Just("trunk/src"),
        Just("branches"),
        Just("branches/b1"),
    ]
}

fn who() -> impl Strategy<Value = Who> {
    prop_oneof![user().prop_map(Who::User), user_group().prop_map(Who::UserGroup)]
}

fn level() -> impl Strategy<Value = AccessLevel> {
    prop_oneof![
        Just(AccessLevel::ReadOnly),
        Just(AccessLevel::ReadWrite),
        Just(AccessLevel::DenyAccess),
    ]
}

fn repository_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        repository().prop_map(Op::CreateRepository),
        (repository(), repository()).prop_map(|(a, b)| Op::RenameRepository(a, b)),
        repository().prop_map(Op::DeleteRepository),
        (repository(), repository()).prop_map(|(a, b)| Op::CloneRepository(a, b)),
    ]
}

fn user_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (user(), alias()).prop_map(|(name, alias)| Op::CreateUser(name, alias)),
        (user(), user(), alias()).prop_map(|(a, b, alias)| Op::RenameUser(a, b, alias)),
        user().prop_map(Op::DeleteUser),
        (user(), user(), alias()).prop_map(|(a, b, alias)| Op::CloneUser(a, b, alias)),
    ]
}

fn user_group_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        user_group().prop_map(Op::CreateUserGroup),
        (user_group(), user_group()).prop_map(|(a, b)| Op::RenameUserGroup(a, b)),
        user_group().prop_map(Op::DeleteUserGroup),
        (user_group(), user_group()).prop_map(|(a, b)| Op::CloneUserGroup(a, b)),
    ]
}

fn membership_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (user(), user_group()).prop_map(|(u, g)| Op::AddUser(u, g)),
        (user(), user_group()).prop_map(|(u, g)| Op::RemoveUser(u, g)),
        (user_group(), user_group()).prop_map(|(m, g)| Op::AddUserGroup(m, g)),
        (user_group(), user_group()).prop_map(|(m, g)| Op::RemoveUserGroup(m, g)),
    ]
}

fn rule_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (rule_root(), rule_path(), who(), level(), any::<bool>())
            .prop_map(|(r, p, w, l, x)| Op::CreateRule(r, p, w, l, x)),
        (rule_root(), rule_path(), who(), level(), any::<bool>())
            .prop_map(|(r, p, w, l, x)| Op::UpdateRule(r, p, w, l, x)),
        (rule_root(), rule_path(), who()).prop_map(|(r, p, w)| Op::DeleteRule(r, p, w)),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => repository_op(),
        1 => user_op(),
        1 => user_group_op(),
        2 => membership_op(),
        3 => rule_op(),
    ]
}

fn config() -> impl Strategy<Value = DocumentConfig> {
    let clone = prop_oneof![
        Just(RepositoryCloneMode::NameOnly),
        Just(RepositoryCloneMode::WithRules),
    ];
    let cycles = prop_oneof![Just(CyclePolicy::Reject), Just(CyclePolicy::Allow)];
    (clone, cycles).prop_map(|(repository_clone, membership_cycles)| DocumentConfig {
        repository_clone,
        membership_cycles,
    })
}

fn valid_path() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/".to_string()),
        proptest::collection::vec("[a-z]{1,4}", 1..=4).prop_map(|segments| segments.join("/")),
    ]
}

// Whether `to` is reachable from `from` through group members.
fn contains_transitively(doc: &Document, from: UserGroupId, to: UserGroupId) -> bool {
    let mut seen = Vec::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        if let Some(group) = doc.user_group(id) {
            for member in group.user_group_members() {
                if *member == to {
                    return true;
                }
                stack.push(*member);
            }
        }
    }
    false
}

// Failures are expected here; only the resulting state matters.
fn apply(doc: &mut Document, op: &Op) {
    match *op {
        Op::CreateRepository(name) => {
            let _ = doc.create_repository(name);
        }
        Op::RenameRepository(name, new_name) => {
            let _ = doc.rename_repository(name, new_name);
        }
        Op::DeleteRepository(name) => {
            let _ = doc.delete_repository(name);
        }
        Op::CloneRepository(name, new_name) => {
            let _ = doc.clone_repository(name, new_name);
        }
        Op::CreateUser(name, alias) => {
            let _ = doc.create_user(name, alias);
        }
        Op::RenameUser(name, new_name, alias) => {
            let _ = doc.rename_user(name, new_name, alias);
        }
        Op::DeleteUser(name) => {
            let _ = doc.delete_user(name);
        }
        Op::CloneUser(name, new_name, alias) => {
            let _ = doc.clone_user(name, new_name, alias);
        }
        Op::CreateUserGroup(name) => {
            let _ = doc.create_user_group(name);
        }
        Op::RenameUserGroup(name, new_name) => {
            let _ = doc.rename_user_group(name, new_name);
        }
        Op::DeleteUserGroup(name) => {
            let _ = doc.delete_user_group(name);
        }
        Op::CloneUserGroup(name, new_name) => {
            let _ = doc.clone_user_group(name, new_name);
        }
        Op::AddUser(user, group) => {
            let _ = doc.add_user_to_user_group(user, group);
        }
        Op::RemoveUser(user, group) => {
            let _ = doc.remove_user_from_user_group(user, group);
        }
        Op::AddUserGroup(member, group) => {
            let _ = doc.add_user_group_to_user_group(member, group);
        }
        Op::RemoveUserGroup(member, group) => {
            let _ = doc.remove_user_group_from_user_group(member, group);
        }
        Op::CreateRule(repository, path, Who::User(name), level, exclusion) => {
            let _ = doc.create_access_rule_for_user(repository, path, name, level, exclusion);
        }
        Op::CreateRule(repository, path, Who::UserGroup(name), level, exclusion) => {
            let _ = doc.create_access_rule_for_user_group(repository, path, name, level, exclusion);
        }
        Op::UpdateRule(repository, path, Who::User(name), level, exclusion) => {
            let _ = doc.update_access_rule_for_user(repository, path, name, level, exclusion);
        }
        Op::UpdateRule(repository, path, Who::UserGroup(name), level, exclusion) => {
            let _ = doc.update_access_rule_for_user_group(repository, path, name, level, exclusion);
        }
        Op::DeleteRule(repository, path, Who::User(name)) => {
            let _ = doc.delete_access_rule_for_user(repository, path, name);
        }
        Op::DeleteRule(repository, path, Who::UserGroup(name)) => {
            let _ = doc.delete_access_rule_for_user_group(repository, path, name);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn operation_sequences_keep_document_consistent(
        config in config(),
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        common::init_tracing();
        let mut doc = Document::with_config(config);
        for (step, op) in ops.iter().enumerate() {
            apply(&mut doc, op);
            prop_assert_eq!(doc.check_integrity(), Ok(()), "step {}: {:?}", step, op);
        }
    }

    #[test]
    fn rejected_cycles_never_appear(ops in proptest::collection::vec(membership_op(), 1..40)) {
        let mut doc = Document::new();
        for name in ["g1", "g2", "g3"] {
            doc.create_user_group(name).unwrap();
        }
        for op in &ops {
            apply(&mut doc, op);
        }

        for group in doc.user_groups() {
            prop_assert!(!contains_transitively(&doc, group.id(), group.id()), "{}", group.name());
        }
        prop_assert_eq!(doc.check_integrity(), Ok(()));
    }

    #[test]
    fn resolved_paths_round_trip(path in valid_path()) {
        let mut tree = PathTree::new();
        let root = tree.create_root();

        let created = tree.resolve_or_create(root, &path).unwrap();
        prop_assert_eq!(tree.resolve_or_create(root, &path).unwrap(), created);
        prop_assert_eq!(tree.resolve_existing(root, &path).unwrap(), Some(created));
    }

    #[test]
    fn resolving_paths_in_any_order_is_idempotent(
        paths in proptest::collection::vec(valid_path(), 1..8),
    ) {
        let mut tree = PathTree::new();
        let root = tree.create_root();

        let first: Vec<_> = paths
            .iter()
            .map(|p| tree.resolve_or_create(root, p).unwrap())
            .collect();
        let nodes = tree.node_count();
        for (path, node) in paths.iter().zip(&first).rev() {
            prop_assert_eq!(tree.resolve_or_create(root, path).unwrap(), *node);
            prop_assert_eq!(tree.resolve_existing(root, path).unwrap(), Some(*node));
        }
        prop_assert_eq!(tree.node_count(), nodes);
    }
}
