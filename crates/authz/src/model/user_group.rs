use std::collections::BTreeSet;

use super::handle::{RuleId, UserGroupId, UserId};

/// A named group of users and other groups.
///
/// Like [`User`](super::User), every set here is one half of a two-sided
/// link. Mutators only report whether the set changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroup {
    id: UserGroupId,
    name: String,
    // groups this group is a member of
    user_groups: BTreeSet<UserGroupId>,
    user_members: BTreeSet<UserId>,
    user_group_members: BTreeSet<UserGroupId>,
    access_rules: BTreeSet<RuleId>,
}

impl UserGroup {
    pub(crate) fn new(id: UserGroupId, name: String) -> Self {
        Self {
            id,
            name,
            user_groups: BTreeSet::new(),
            user_members: BTreeSet::new(),
            user_group_members: BTreeSet::new(),
            access_rules: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> UserGroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Groups this group is a direct member of
    pub fn user_groups(&self) -> &BTreeSet<UserGroupId> {
        &self.user_groups
    }

    /// Users that are direct members of this group
    pub fn user_members(&self) -> &BTreeSet<UserId> {
        &self.user_members
    }

    /// Groups that are direct members of this group
    pub fn user_group_members(&self) -> &BTreeSet<UserGroupId> {
        &self.user_group_members
    }

    /// Rules naming this group directly
    pub fn access_rules(&self) -> &BTreeSet<RuleId> {
        &self.access_rules
    }

    pub fn has_user_member(&self, user: UserId) -> bool {
        self.user_members.contains(&user)
    }

    pub fn has_user_group_member(&self, group: UserGroupId) -> bool {
        self.user_group_members.contains(&group)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn add_user_group(&mut self, group: UserGroupId) -> bool {
        self.user_groups.insert(group)
    }

    pub(crate) fn remove_user_group(&mut self, group: UserGroupId) -> bool {
        self.user_groups.remove(&group)
    }

    pub(crate) fn add_user_member(&mut self, user: UserId) -> bool {
        self.user_members.insert(user)
    }

    pub(crate) fn remove_user_member(&mut self, user: UserId) -> bool {
        self.user_members.remove(&user)
    }

    pub(crate) fn add_user_group_member(&mut self, group: UserGroupId) -> bool {
        self.user_group_members.insert(group)
    }

    pub(crate) fn remove_user_group_member(&mut self, group: UserGroupId) -> bool {
        self.user_group_members.remove(&group)
    }

    pub(crate) fn add_access_rule(&mut self, rule: RuleId) -> bool {
        self.access_rules.insert(rule)
    }

    pub(crate) fn remove_access_rule(&mut self, rule: RuleId) -> bool {
        self.access_rules.remove(&rule)
    }
}
