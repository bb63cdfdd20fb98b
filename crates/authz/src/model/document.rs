use std::collections::{BTreeMap, HashMap};

use crate::config::{CyclePolicy, DocumentConfig, RepositoryCloneMode};
use crate::validate::{check_alias, check_entity_name, check_not_blank, check_path, is_blank, NameKind};

use super::access::{AccessLevel, AccessRule, Subject};
use super::error::{DocumentError, RuleLocation, SubjectRef};
use super::handle::{HandleAllocator, NodeId, RepositoryId, RuleId, UserGroupId, UserId};
use super::membership::would_create_cycle;
use super::repository::Repository;
use super::tree::{PathTree, TreeNode};
use super::user::User;
use super::user_group::UserGroup;

/// The whole authorization state of one authz file.
///
/// Every mutation goes through here. Names are resolved first, every check
/// runs before anything changes, and both halves of each link are updated
/// together, so a failed call leaves the document exactly as it was.
#[derive(Debug, Clone)]
pub struct Document {
    config: DocumentConfig,
    tree: PathTree,
    // server-wide rules, `[/path]` sections
    root: NodeId,
    repositories: BTreeMap<RepositoryId, Repository>,
    users: BTreeMap<UserId, User>,
    user_groups: BTreeMap<UserGroupId, UserGroup>,
    repository_names: HashMap<String, RepositoryId>,
    user_names: HashMap<String, UserId>,
    user_aliases: HashMap<String, UserId>,
    user_group_names: HashMap<String, UserGroupId>,
    handles: HandleAllocator,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_config(DocumentConfig::default())
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        let mut tree = PathTree::new();
        let root = tree.create_root();
        Self {
            config,
            tree,
            root,
            repositories: BTreeMap::new(),
            users: BTreeMap::new(),
            user_groups: BTreeMap::new(),
            repository_names: HashMap::new(),
            user_names: HashMap::new(),
            user_aliases: HashMap::new(),
            user_group_names: HashMap::new(),
            handles: HandleAllocator::default(),
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Root of the server-wide tree
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> Option<&TreeNode> {
        self.tree.node(self.root)
    }

    /// Every node and rule of every root, read-only
    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.values()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn user_groups(&self) -> impl Iterator<Item = &UserGroup> {
        self.user_groups.values()
    }

    pub fn repository(&self, id: RepositoryId) -> Option<&Repository> {
        self.repositories.get(&id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_group(&self, id: UserGroupId) -> Option<&UserGroup> {
        self.user_groups.get(&id)
    }

    pub fn access_rule(&self, id: RuleId) -> Option<&AccessRule> {
        self.tree.rule(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.tree.node(id)
    }

    /// Full path of a node from its own root
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        self.tree.path_of(id)
    }

    /// The repository whose tree holds `node`, or `None` for the server-wide tree
    pub fn repository_of(&self, node: NodeId) -> Option<&Repository> {
        let root = self.tree.root_of(node)?;
        self.repositories.values().find(|r| r.root() == root)
    }

    // Lookups

    pub fn find_repository_by_name(&self, name: &str) -> Result<Option<&Repository>, DocumentError> {
        check_not_blank(name, "Repository name")?;
        Ok(self
            .repository_names
            .get(name)
            .and_then(|id| self.repositories.get(id)))
    }

    pub fn find_user_by_name(&self, name: &str) -> Result<Option<&User>, DocumentError> {
        check_not_blank(name, "User name")?;
        Ok(self.user_names.get(name).and_then(|id| self.users.get(id)))
    }

    pub fn find_user_by_alias(&self, alias: &str) -> Result<Option<&User>, DocumentError> {
        check_not_blank(alias, "User alias")?;
        Ok(self.user_aliases.get(alias).and_then(|id| self.users.get(id)))
    }

    pub fn find_user_group_by_name(&self, name: &str) -> Result<Option<&UserGroup>, DocumentError> {
        check_not_blank(name, "User group name")?;
        Ok(self
            .user_group_names
            .get(name)
            .and_then(|id| self.user_groups.get(id)))
    }

    // Repositories

    pub fn create_repository(&mut self, name: &str) -> Result<RepositoryId, DocumentError> {
        check_entity_name(name, NameKind::Repository)?;
        if self.repository_names.contains_key(name) {
            return Err(DocumentError::RepositoryAlreadyExists(name.to_string()));
        }

        let id = RepositoryId::new(self.handles.next());
        let root = self.tree.create_root();
        self.repositories
            .insert(id, Repository::new(id, name.to_string(), root));
        self.repository_names.insert(name.to_string(), id);
        tracing::debug!("created repository '{}' ({}, root {})", name, id, root);
        Ok(id)
    }

    pub fn rename_repository(&mut self, name: &str, new_name: &str) -> Result<(), DocumentError> {
        let id = self.require_repository(name)?.id();
        check_entity_name(new_name, NameKind::Repository)?;
        if taken_by_other(&self.repository_names, new_name, id) {
            return Err(DocumentError::RepositoryAlreadyExists(new_name.to_string()));
        }

        if let Some(repository) = self.repositories.get_mut(&id) {
            repository.set_name(new_name.to_string());
        }
        self.repository_names.remove(name);
        self.repository_names.insert(new_name.to_string(), id);
        tracing::debug!("renamed repository '{}' to '{}'", name, new_name);
        Ok(())
    }

    /// Drop a repository together with its whole path tree.
    pub fn delete_repository(&mut self, name: &str) -> Result<(), DocumentError> {
        let repository = self.require_repository(name)?;
        let (id, root) = (repository.id(), repository.root());

        let removed = self.tree.discard_root(root)?;
        for rule in &removed {
            self.unlink_rule(rule.subject(), rule.id());
        }
        self.repositories.remove(&id);
        self.repository_names.remove(name);
        tracing::debug!(
            "deleted repository '{}' with {} access rules",
            name,
            removed.len()
        );
        Ok(())
    }

    /// Create `new_name` next to `name`.
    ///
    /// With [`RepositoryCloneMode::WithRules`] every rule of the source tree is
    /// re-created at the same path in the clone; otherwise the clone is empty.
    pub fn clone_repository(&mut self, name: &str, new_name: &str) -> Result<RepositoryId, DocumentError> {
        let source_root = self.require_repository(name)?.root();
        let id = self.create_repository(new_name)?;

        if self.config.repository_clone == RepositoryCloneMode::WithRules {
            let target_root = self
                .repositories
                .get(&id)
                .map(Repository::root)
                .ok_or_else(|| DocumentError::RepositoryNotFound(new_name.to_string()))?;
            let created = self.tree.clone_subtree_rules(source_root, target_root)?;
            for rule in &created {
                if let Some(subject) = self.tree.rule(*rule).map(AccessRule::subject) {
                    self.link_rule(subject, *rule);
                }
            }
            tracing::debug!(
                "cloned {} access rules from '{}' to '{}'",
                created.len(),
                name,
                new_name
            );
        }
        tracing::debug!("cloned repository '{}' as '{}'", name, new_name);
        Ok(id)
    }

    // Users

    pub fn create_user(&mut self, name: &str, alias: Option<&str>) -> Result<UserId, DocumentError> {
        check_entity_name(name, NameKind::User)?;
        let alias = check_alias(alias)?;
        if self.user_names.contains_key(name) {
            return Err(DocumentError::UserAlreadyExists(name.to_string()));
        }
        if let Some(alias) = alias.filter(|a| self.user_aliases.contains_key(*a)) {
            return Err(DocumentError::UserAliasAlreadyExists(alias.to_string()));
        }

        let id = UserId::new(self.handles.next());
        self.users.insert(
            id,
            User::new(id, name.to_string(), alias.map(str::to_string)),
        );
        self.user_names.insert(name.to_string(), id);
        if let Some(alias) = alias {
            self.user_aliases.insert(alias.to_string(), id);
        }
        tracing::debug!("created user '{}' ({}) alias {:?}", name, id, alias);
        Ok(id)
    }

    /// Rename a user and replace its alias. A `None` or blank alias clears it.
    pub fn rename_user(
        &mut self,
        name: &str,
        new_name: &str,
        new_alias: Option<&str>,
    ) -> Result<(), DocumentError> {
        let id = self.require_user(name)?.id();
        check_entity_name(new_name, NameKind::User)?;
        let new_alias = check_alias(new_alias)?;
        if taken_by_other(&self.user_names, new_name, id) {
            return Err(DocumentError::UserAlreadyExists(new_name.to_string()));
        }
        if let Some(alias) = new_alias.filter(|a| taken_by_other(&self.user_aliases, a, id)) {
            return Err(DocumentError::UserAliasAlreadyExists(alias.to_string()));
        }

        let user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DocumentError::UserNotFound(name.to_string()))?;
        let old_alias = user.alias().map(str::to_string);
        user.set_name(new_name.to_string());
        user.set_alias(new_alias.map(str::to_string));

        self.user_names.remove(name);
        self.user_names.insert(new_name.to_string(), id);
        if let Some(old_alias) = old_alias {
            self.user_aliases.remove(&old_alias);
        }
        if let Some(alias) = new_alias {
            self.user_aliases.insert(alias.to_string(), id);
        }
        tracing::debug!(
            "renamed user '{}' to '{}' alias {:?}",
            name,
            new_name,
            new_alias
        );
        Ok(())
    }

    /// Remove a user from every group and every rule, then unregister it.
    pub fn delete_user(&mut self, name: &str) -> Result<(), DocumentError> {
        let user = self.require_user(name)?;
        let id = user.id();
        let groups: Vec<UserGroupId> = user.user_groups().iter().copied().collect();
        let rules: Vec<RuleId> = user.access_rules().iter().copied().collect();

        for group in groups {
            self.unlink_user(id, group);
        }
        for rule in &rules {
            self.drop_rule(*rule)?;
        }
        if let Some(user) = self.users.remove(&id) {
            self.user_names.remove(user.name());
            if let Some(alias) = user.alias() {
                self.user_aliases.remove(alias);
            }
        }
        tracing::debug!("deleted user '{}' with {} access rules", name, rules.len());
        Ok(())
    }

    /// Create `new_name` with the same group memberships and rules as `name`.
    pub fn clone_user(
        &mut self,
        name: &str,
        new_name: &str,
        new_alias: Option<&str>,
    ) -> Result<UserId, DocumentError> {
        let source = self.require_user(name)?;
        let groups: Vec<UserGroupId> = source.user_groups().iter().copied().collect();
        let rules = self.rule_templates(source.access_rules().iter().copied());

        let id = self.create_user(new_name, new_alias)?;
        for group in groups {
            self.link_user(id, group);
        }
        for (node, level, exclusion) in rules {
            self.attach_and_link(node, Subject::User(id), level, exclusion)?;
        }
        tracing::debug!("cloned user '{}' as '{}'", name, new_name);
        Ok(id)
    }

    // User groups

    pub fn create_user_group(&mut self, name: &str) -> Result<UserGroupId, DocumentError> {
        check_entity_name(name, NameKind::UserGroup)?;
        if self.user_group_names.contains_key(name) {
            return Err(DocumentError::UserGroupAlreadyExists(name.to_string()));
        }

        let id = UserGroupId::new(self.handles.next());
        self.user_groups
            .insert(id, UserGroup::new(id, name.to_string()));
        self.user_group_names.insert(name.to_string(), id);
        tracing::debug!("created user group '{}' ({})", name, id);
        Ok(id)
    }

    pub fn rename_user_group(&mut self, name: &str, new_name: &str) -> Result<(), DocumentError> {
        let id = self.require_user_group(name)?.id();
        check_entity_name(new_name, NameKind::UserGroup)?;
        if taken_by_other(&self.user_group_names, new_name, id) {
            return Err(DocumentError::UserGroupAlreadyExists(new_name.to_string()));
        }

        if let Some(group) = self.user_groups.get_mut(&id) {
            group.set_name(new_name.to_string());
        }
        self.user_group_names.remove(name);
        self.user_group_names.insert(new_name.to_string(), id);
        tracing::debug!("renamed user group '{}' to '{}'", name, new_name);
        Ok(())
    }

    /// Detach a group from its parents, its members and its rules, then
    /// unregister it.
    pub fn delete_user_group(&mut self, name: &str) -> Result<(), DocumentError> {
        let group = self.require_user_group(name)?;
        let id = group.id();
        let parents: Vec<UserGroupId> = group.user_groups().iter().copied().collect();
        let users: Vec<UserId> = group.user_members().iter().copied().collect();
        let members: Vec<UserGroupId> = group.user_group_members().iter().copied().collect();
        let rules: Vec<RuleId> = group.access_rules().iter().copied().collect();

        for parent in parents {
            self.unlink_group(id, parent);
        }
        for user in users {
            self.unlink_user(user, id);
        }
        for member in members {
            self.unlink_group(member, id);
        }
        for rule in &rules {
            self.drop_rule(*rule)?;
        }
        if let Some(group) = self.user_groups.remove(&id) {
            self.user_group_names.remove(group.name());
        }
        tracing::debug!(
            "deleted user group '{}' with {} access rules",
            name,
            rules.len()
        );
        Ok(())
    }

    /// Create `new_name` holding the same member users, member groups and
    /// rules as `name`. The clone does not join the groups `name` belongs to.
    pub fn clone_user_group(&mut self, name: &str, new_name: &str) -> Result<UserGroupId, DocumentError> {
        let source = self.require_user_group(name)?;
        let users: Vec<UserId> = source.user_members().iter().copied().collect();
        let members: Vec<UserGroupId> = source.user_group_members().iter().copied().collect();
        let rules = self.rule_templates(source.access_rules().iter().copied());

        let id = self.create_user_group(new_name)?;
        for user in users {
            self.link_user(user, id);
        }
        // A fresh group has no parents, so none of these can close a cycle.
        for member in members {
            self.link_group(member, id);
        }
        for (node, level, exclusion) in rules {
            self.attach_and_link(node, Subject::UserGroup(id), level, exclusion)?;
        }
        tracing::debug!("cloned user group '{}' as '{}'", name, new_name);
        Ok(id)
    }

    // Membership

    /// Returns `false` if the user already was a member.
    pub fn add_user_to_user_group(&mut self, user_name: &str, user_group_name: &str) -> Result<bool, DocumentError> {
        let user = self.require_user(user_name)?.id();
        let group = self.require_user_group(user_group_name)?.id();
        let added = self.link_user(user, group);
        if added {
            tracing::debug!("added user '{}' to '{}'", user_name, user_group_name);
        }
        Ok(added)
    }

    /// Returns `false` if the user was not a member.
    pub fn remove_user_from_user_group(
        &mut self,
        user_name: &str,
        user_group_name: &str,
    ) -> Result<bool, DocumentError> {
        let user = self.require_user(user_name)?.id();
        let group = self.require_user_group(user_group_name)?.id();
        let removed = self.unlink_user(user, group);
        if removed {
            tracing::debug!("removed user '{}' from '{}'", user_name, user_group_name);
        }
        Ok(removed)
    }

    /// Make `member_name` a member of `user_group_name`.
    ///
    /// Under [`CyclePolicy::Reject`] a membership that would let a group
    /// contain itself fails with [`DocumentError::MembershipCycle`].
    pub fn add_user_group_to_user_group(
        &mut self,
        member_name: &str,
        user_group_name: &str,
    ) -> Result<bool, DocumentError> {
        let member = self.require_user_group(member_name)?.id();
        let target = self.require_user_group(user_group_name)?;
        if target.has_user_group_member(member) {
            return Ok(false);
        }
        let target = target.id();

        if self.config.membership_cycles == CyclePolicy::Reject
            && would_create_cycle(self.user_groups.values(), member, target)
        {
            return Err(DocumentError::MembershipCycle {
                member: member_name.to_string(),
                target: user_group_name.to_string(),
            });
        }

        let added = self.link_group(member, target);
        if added {
            tracing::debug!("added user group '{}' to '{}'", member_name, user_group_name);
        }
        Ok(added)
    }

    pub fn remove_user_group_from_user_group(
        &mut self,
        member_name: &str,
        user_group_name: &str,
    ) -> Result<bool, DocumentError> {
        let member = self.require_user_group(member_name)?.id();
        let target = self.require_user_group(user_group_name)?.id();
        let removed = self.unlink_group(member, target);
        if removed {
            tracing::debug!(
                "removed user group '{}' from '{}'",
                member_name,
                user_group_name
            );
        }
        Ok(removed)
    }

    // Access rules

    /// Attach a rule for a user at `path`.
    ///
    /// `repository` selects the tree; `None` or a blank name means the
    /// server-wide tree. Missing path segments are created.
    pub fn create_access_rule_for_user(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_name: &str,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        let target = self.rule_target(repository, path, SubjectRef::User(user_name.to_string()))?;
        self.create_access_rule(target, level, exclusion)
    }

    pub fn create_access_rule_for_user_group(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_group_name: &str,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        let subject = SubjectRef::UserGroup(user_group_name.to_string());
        let target = self.rule_target(repository, path, subject)?;
        self.create_access_rule(target, level, exclusion)
    }

    pub fn delete_access_rule_for_user(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_name: &str,
    ) -> Result<AccessRule, DocumentError> {
        let target = self.rule_target(repository, path, SubjectRef::User(user_name.to_string()))?;
        self.delete_access_rule(target)
    }

    pub fn delete_access_rule_for_user_group(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_group_name: &str,
    ) -> Result<AccessRule, DocumentError> {
        let subject = SubjectRef::UserGroup(user_group_name.to_string());
        let target = self.rule_target(repository, path, subject)?;
        self.delete_access_rule(target)
    }

    /// Change the level and exclusion flag of an existing rule in place.
    pub fn update_access_rule_for_user(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_name: &str,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        let target = self.rule_target(repository, path, SubjectRef::User(user_name.to_string()))?;
        self.update_access_rule(target, level, exclusion)
    }

    pub fn update_access_rule_for_user_group(
        &mut self,
        repository: Option<&str>,
        path: &str,
        user_group_name: &str,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        let subject = SubjectRef::UserGroup(user_group_name.to_string());
        let target = self.rule_target(repository, path, subject)?;
        self.update_access_rule(target, level, exclusion)
    }

    /// The rule attached exactly at `path`, ignoring rules on ancestors.
    pub fn find_access_rule_for_user_at_path(
        &self,
        repository: Option<&str>,
        path: &str,
        user_name: &str,
    ) -> Result<Option<&AccessRule>, DocumentError> {
        let target = self.rule_target(repository, path, SubjectRef::User(user_name.to_string()))?;
        self.find_access_rule(&target)
    }

    pub fn find_access_rule_for_user_group_at_path(
        &self,
        repository: Option<&str>,
        path: &str,
        user_group_name: &str,
    ) -> Result<Option<&AccessRule>, DocumentError> {
        let subject = SubjectRef::UserGroup(user_group_name.to_string());
        let target = self.rule_target(repository, path, subject)?;
        self.find_access_rule(&target)
    }

    /// Every rule naming the user directly, in creation order
    pub fn access_rules_for_user(&self, user_name: &str) -> Result<Vec<&AccessRule>, DocumentError> {
        let user = self.require_user(user_name)?;
        Ok(user
            .access_rules()
            .iter()
            .filter_map(|id| self.tree.rule(*id))
            .collect())
    }

    pub fn access_rules_for_user_group(&self, user_group_name: &str) -> Result<Vec<&AccessRule>, DocumentError> {
        let group = self.require_user_group(user_group_name)?;
        Ok(group
            .access_rules()
            .iter()
            .filter_map(|id| self.tree.rule(*id))
            .collect())
    }

    fn require_repository(&self, name: &str) -> Result<&Repository, DocumentError> {
        self.find_repository_by_name(name)?
            .ok_or_else(|| DocumentError::RepositoryNotFound(name.to_string()))
    }

    fn require_user(&self, name: &str) -> Result<&User, DocumentError> {
        self.find_user_by_name(name)?
            .ok_or_else(|| DocumentError::UserNotFound(name.to_string()))
    }

    fn require_user_group(&self, name: &str) -> Result<&UserGroup, DocumentError> {
        self.find_user_group_by_name(name)?
            .ok_or_else(|| DocumentError::UserGroupNotFound(name.to_string()))
    }

    fn rule_root(&self, repository: Option<&str>) -> Result<NodeId, DocumentError> {
        match repository {
            Some(name) if !is_blank(Some(name)) => Ok(self.require_repository(name)?.root()),
            _ => Ok(self.root),
        }
    }

    /// Resolve the tree root, then the subject, then check the path shape.
    fn rule_target(
        &self,
        repository: Option<&str>,
        path: &str,
        subject_ref: SubjectRef,
    ) -> Result<RuleTarget, DocumentError> {
        let root = self.rule_root(repository)?;
        let subject = match &subject_ref {
            SubjectRef::User(name) => Subject::User(self.require_user(name)?.id()),
            SubjectRef::UserGroup(name) => Subject::UserGroup(self.require_user_group(name)?.id()),
        };
        check_path(path, "Path")?;
        Ok(RuleTarget {
            root,
            location: location(repository, path),
            subject,
            subject_ref,
        })
    }

    fn create_access_rule(
        &mut self,
        target: RuleTarget,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        if self.find_access_rule(&target)?.is_some() {
            return Err(target.already_exists());
        }

        let node = self.tree.resolve_or_create(target.root, &target.location.path)?;
        let id = self
            .tree
            .attach_rule(node, target.subject, level, exclusion)?
            .ok_or_else(|| target.already_exists())?;
        self.link_rule(target.subject, id);
        tracing::debug!(
            "created {:?} access rule for {} at {}",
            level,
            target.subject_ref,
            target.location
        );
        Ok(id)
    }

    fn delete_access_rule(&mut self, target: RuleTarget) -> Result<AccessRule, DocumentError> {
        let node = self
            .find_access_rule(&target)?
            .map(AccessRule::node)
            .ok_or_else(|| target.not_found())?;

        let rule = self.tree.detach_rule(node, target.subject)?;
        self.unlink_rule(target.subject, rule.id());
        tracing::debug!(
            "deleted access rule for {} at {}",
            target.subject_ref,
            target.location
        );
        Ok(rule)
    }

    fn update_access_rule(
        &mut self,
        target: RuleTarget,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<RuleId, DocumentError> {
        let id = self
            .find_access_rule(&target)?
            .map(AccessRule::id)
            .ok_or_else(|| target.not_found())?;

        if let Some(rule) = self.tree.rule_mut(id) {
            rule.set_access_level(level);
            rule.set_exclusion(exclusion);
        }
        tracing::debug!(
            "updated access rule for {} at {} to {:?} (exclusion {})",
            target.subject_ref,
            target.location,
            level,
            exclusion
        );
        Ok(id)
    }

    fn find_access_rule(&self, target: &RuleTarget) -> Result<Option<&AccessRule>, DocumentError> {
        Ok(self
            .tree
            .resolve_existing(target.root, &target.location.path)?
            .and_then(|node| self.tree.find_rule(node, target.subject)))
    }

    // Node, level and exclusion of each rule, for re-creating them elsewhere.
    fn rule_templates<I>(&self, rules: I) -> Vec<(NodeId, AccessLevel, bool)>
    where
        I: IntoIterator<Item = RuleId>,
    {
        rules
            .into_iter()
            .filter_map(|id| self.tree.rule(id))
            .map(|rule| (rule.node(), rule.access_level(), rule.is_exclusion()))
            .collect()
    }

    fn attach_and_link(
        &mut self,
        node: NodeId,
        subject: Subject,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<Option<RuleId>, DocumentError> {
        let id = self.tree.attach_rule(node, subject, level, exclusion)?;
        if let Some(id) = id {
            self.link_rule(subject, id);
        }
        Ok(id)
    }

    // Remove a rule from its node and from its subject.
    fn drop_rule(&mut self, id: RuleId) -> Result<Option<AccessRule>, DocumentError> {
        let Some((node, subject)) = self.tree.rule(id).map(|r| (r.node(), r.subject())) else {
            return Ok(None);
        };
        let rule = self.tree.detach_rule(node, subject)?;
        self.unlink_rule(subject, id);
        Ok(Some(rule))
    }

    fn link_rule(&mut self, subject: Subject, rule: RuleId) {
        match subject {
            Subject::User(id) => {
                if let Some(user) = self.users.get_mut(&id) {
                    user.add_access_rule(rule);
                }
            }
            Subject::UserGroup(id) => {
                if let Some(group) = self.user_groups.get_mut(&id) {
                    group.add_access_rule(rule);
                }
            }
        }
    }

    fn unlink_rule(&mut self, subject: Subject, rule: RuleId) {
        match subject {
            Subject::User(id) => {
                if let Some(user) = self.users.get_mut(&id) {
                    user.remove_access_rule(rule);
                }
            }
            Subject::UserGroup(id) => {
                if let Some(group) = self.user_groups.get_mut(&id) {
                    group.remove_access_rule(rule);
                }
            }
        }
    }

    // The membership helpers below are the only places either side of a
    // membership link is written.

    fn link_user(&mut self, user: UserId, group: UserGroupId) -> bool {
        let on_group = self
            .user_groups
            .get_mut(&group)
            .map_or(false, |g| g.add_user_member(user));
        let on_user = self
            .users
            .get_mut(&user)
            .map_or(false, |u| u.add_user_group(group));
        on_group || on_user
    }

    fn unlink_user(&mut self, user: UserId, group: UserGroupId) -> bool {
        let on_group = self
            .user_groups
            .get_mut(&group)
            .map_or(false, |g| g.remove_user_member(user));
        let on_user = self
            .users
            .get_mut(&user)
            .map_or(false, |u| u.remove_user_group(group));
        on_group || on_user
    }

    fn link_group(&mut self, member: UserGroupId, group: UserGroupId) -> bool {
        let on_group = self
            .user_groups
            .get_mut(&group)
            .map_or(false, |g| g.add_user_group_member(member));
        let on_member = self
            .user_groups
            .get_mut(&member)
            .map_or(false, |m| m.add_user_group(group));
        on_group || on_member
    }

    fn unlink_group(&mut self, member: UserGroupId, group: UserGroupId) -> bool {
        let on_group = self
            .user_groups
            .get_mut(&group)
            .map_or(false, |g| g.remove_user_group_member(member));
        let on_member = self
            .user_groups
            .get_mut(&member)
            .map_or(false, |m| m.remove_user_group(group));
        on_group || on_member
    }
}

// Raw access for tests that need to break one side of a link.
#[cfg(test)]
impl Document {
    pub(crate) fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub(crate) fn user_group_mut(&mut self, id: UserGroupId) -> Option<&mut UserGroup> {
        self.user_groups.get_mut(&id)
    }

    pub(crate) fn tree_mut(&mut self) -> &mut PathTree {
        &mut self.tree
    }
}

// Where a rule lives and whom it names, resolved from caller-supplied names.
struct RuleTarget {
    root: NodeId,
    location: RuleLocation,
    subject: Subject,
    subject_ref: SubjectRef,
}

impl RuleTarget {
    fn already_exists(&self) -> DocumentError {
        DocumentError::AccessRuleAlreadyExists {
            location: self.location.clone(),
            subject: self.subject_ref.clone(),
        }
    }

    fn not_found(&self) -> DocumentError {
        DocumentError::AccessRuleNotFound {
            location: self.location.clone(),
            subject: self.subject_ref.clone(),
        }
    }
}

fn taken_by_other<K: Copy + PartialEq>(index: &HashMap<String, K>, name: &str, owner: K) -> bool {
    index.get(name).map_or(false, |id| *id != owner)
}

fn location(repository: Option<&str>, path: &str) -> RuleLocation {
    RuleLocation {
        repository: repository
            .filter(|name| !is_blank(Some(*name)))
            .map(str::to_string),
        path: path.to_string(),
    }
}
