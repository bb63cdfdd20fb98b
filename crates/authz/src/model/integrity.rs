use std::collections::{HashMap, HashSet};

use super::access::Subject;
use super::document::Document;
use super::error::EntityKind;
use super::handle::{NodeId, RepositoryId, RuleId, UserGroupId, UserId};

/// One broken invariant found by [`Document::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("{entity} name '{name}' is used more than once")]
    DuplicateName { entity: EntityKind, name: String },
    #[error("user alias '{0}' is used more than once")]
    DuplicateAlias(String),
    #[error("{entity} '{name}' cannot be found by its own name")]
    StaleIndex { entity: EntityKind, name: String },
    #[error("membership of {user} in {group} is recorded on one side only")]
    UserMembership { user: UserId, group: UserGroupId },
    #[error("membership of {member} in {group} is recorded on one side only")]
    UserGroupMembership {
        member: UserGroupId,
        group: UserGroupId,
    },
    #[error("{rule} is not indexed by both its node and its subject")]
    RuleIndex { rule: RuleId },
    #[error("{rule} is referenced but does not exist")]
    DanglingRule { rule: RuleId },
    #[error("{node} disagrees with its parent about their link")]
    NodeLink { node: NodeId },
    #[error("{node} belongs to no repository and is not the server-wide root")]
    OrphanNode { node: NodeId },
    #[error("{repository} does not own a root of its own")]
    RepositoryRoot { repository: RepositoryId },
}

impl Document {
    /// Verify every structural invariant, reporting all violations found.
    ///
    /// Nothing reachable through the public operations should ever fail this;
    /// it exists for tests and for callers that load state from elsewhere.
    pub fn check_integrity(&self) -> Result<(), Vec<IntegrityViolation>> {
        let mut violations = Vec::new();
        self.check_names(&mut violations);
        self.check_memberships(&mut violations);
        self.check_rules(&mut violations);
        self.check_nodes(&mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::warn!("integrity check found {} violations", violations.len());
            Err(violations)
        }
    }

    fn check_names(&self, violations: &mut Vec<IntegrityViolation>) {
        let repositories = self.repositories().map(|r| r.name());
        duplicates(repositories, EntityKind::Repository, violations);
        duplicates(self.users().map(|u| u.name()), EntityKind::User, violations);
        duplicates(
            self.user_groups().map(|g| g.name()),
            EntityKind::UserGroup,
            violations,
        );

        let mut aliases = HashSet::new();
        for alias in self.users().filter_map(|u| u.alias()) {
            if !aliases.insert(alias) {
                violations.push(IntegrityViolation::DuplicateAlias(alias.to_string()));
            }
        }

        for repository in self.repositories() {
            let found = self.find_repository_by_name(repository.name());
            if !matches!(found, Ok(Some(r)) if r.id() == repository.id()) {
                violations.push(stale(EntityKind::Repository, repository.name()));
            }
        }
        for user in self.users() {
            let by_name = self.find_user_by_name(user.name());
            let by_alias = user.alias().map(|alias| self.find_user_by_alias(alias));
            let name_ok = matches!(by_name, Ok(Some(u)) if u.id() == user.id());
            let alias_ok = match by_alias {
                Some(found) => matches!(found, Ok(Some(u)) if u.id() == user.id()),
                None => true,
            };
            if !name_ok || !alias_ok {
                violations.push(stale(EntityKind::User, user.name()));
            }
        }
        for group in self.user_groups() {
            let found = self.find_user_group_by_name(group.name());
            if !matches!(found, Ok(Some(g)) if g.id() == group.id()) {
                violations.push(stale(EntityKind::UserGroup, group.name()));
            }
        }
    }

    fn check_memberships(&self, violations: &mut Vec<IntegrityViolation>) {
        for user in self.users() {
            for group in user.user_groups() {
                let linked = self
                    .user_group(*group)
                    .map_or(false, |g| g.has_user_member(user.id()));
                if !linked {
                    violations.push(IntegrityViolation::UserMembership {
                        user: user.id(),
                        group: *group,
                    });
                }
            }
        }

        for group in self.user_groups() {
            for user in group.user_members() {
                let linked = self.user(*user).map_or(false, |u| u.is_member_of(group.id()));
                if !linked {
                    violations.push(IntegrityViolation::UserMembership {
                        user: *user,
                        group: group.id(),
                    });
                }
            }
            for member in group.user_group_members() {
                let linked = self
                    .user_group(*member)
                    .map_or(false, |m| m.user_groups().contains(&group.id()));
                if !linked {
                    violations.push(IntegrityViolation::UserGroupMembership {
                        member: *member,
                        group: group.id(),
                    });
                }
            }
            for parent in group.user_groups() {
                let linked = self
                    .user_group(*parent)
                    .map_or(false, |p| p.has_user_group_member(group.id()));
                if !linked {
                    violations.push(IntegrityViolation::UserGroupMembership {
                        member: group.id(),
                        group: *parent,
                    });
                }
            }
        }
    }

    fn check_rules(&self, violations: &mut Vec<IntegrityViolation>) {
        let tree = self.tree();

        for rule in tree.rules() {
            let on_node = tree
                .node(rule.node())
                .and_then(|node| node.rule_for(rule.subject()))
                == Some(rule.id());
            let on_subject = match rule.subject() {
                Subject::User(id) => self
                    .user(id)
                    .map_or(false, |u| u.access_rules().contains(&rule.id())),
                Subject::UserGroup(id) => self
                    .user_group(id)
                    .map_or(false, |g| g.access_rules().contains(&rule.id())),
            };
            if !on_node || !on_subject {
                violations.push(IntegrityViolation::RuleIndex { rule: rule.id() });
            }
        }

        for node in tree.nodes() {
            for (subject, id) in node.rules() {
                let matches = tree
                    .rule(*id)
                    .map_or(false, |r| r.node() == node.id() && r.subject() == *subject);
                if !matches {
                    violations.push(IntegrityViolation::DanglingRule { rule: *id });
                }
            }
        }

        let user_rules = self
            .users()
            .flat_map(|u| u.access_rules().iter().map(move |r| (*r, Subject::User(u.id()))));
        let group_rules = self.user_groups().flat_map(|g| {
            g.access_rules()
                .iter()
                .map(move |r| (*r, Subject::UserGroup(g.id())))
        });
        for (id, subject) in user_rules.chain(group_rules) {
            if tree.rule(id).map(|r| r.subject()) != Some(subject) {
                violations.push(IntegrityViolation::DanglingRule { rule: id });
            }
        }
    }

    fn check_nodes(&self, violations: &mut Vec<IntegrityViolation>) {
        let tree = self.tree();

        let mut owners: HashMap<NodeId, usize> = HashMap::new();
        for repository in self.repositories() {
            *owners.entry(repository.root()).or_default() += 1;
        }
        for repository in self.repositories() {
            let root = repository.root();
            let owns_root = tree.node(root).map_or(false, |n| n.is_root())
                && root != self.root()
                && owners.get(&root) == Some(&1);
            if !owns_root {
                violations.push(IntegrityViolation::RepositoryRoot {
                    repository: repository.id(),
                });
            }
        }

        for node in tree.nodes() {
            match node.parent() {
                Some(parent) => {
                    let linked = tree
                        .node(parent)
                        .and_then(|p| p.child(node.name()))
                        == Some(node.id());
                    if !linked {
                        violations.push(IntegrityViolation::NodeLink { node: node.id() });
                    }
                }
                None => {
                    if node.id() != self.root() && !owners.contains_key(&node.id()) {
                        violations.push(IntegrityViolation::OrphanNode { node: node.id() });
                    }
                }
            }
            for child in node.children().values() {
                if tree.node(*child).and_then(|c| c.parent()) != Some(node.id()) {
                    violations.push(IntegrityViolation::NodeLink { node: *child });
                }
            }
        }
    }
}

fn duplicates<'a>(
    names: impl Iterator<Item = &'a str>,
    entity: EntityKind,
    violations: &mut Vec<IntegrityViolation>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            violations.push(IntegrityViolation::DuplicateName {
                entity,
                name: name.to_string(),
            });
        }
    }
}

fn stale(entity: EntityKind, name: &str) -> IntegrityViolation {
    IntegrityViolation::StaleIndex {
        entity,
        name: name.to_string(),
    }
}
