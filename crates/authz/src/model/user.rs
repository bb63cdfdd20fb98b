use std::collections::BTreeSet;

use super::handle::{RuleId, UserGroupId, UserId};

/// A user, optionally known by an alias as well.
///
/// The group and rule sets are back-references. Their mutators only report
/// whether the set changed; the matching update on the group or tree side is
/// made by [`Document`](super::Document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    alias: Option<String>,
    user_groups: BTreeSet<UserGroupId>,
    access_rules: BTreeSet<RuleId>,
}

impl User {
    pub(crate) fn new(id: UserId, name: String, alias: Option<String>) -> Self {
        Self {
            id,
            name,
            alias,
            user_groups: BTreeSet::new(),
            access_rules: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Groups this user is a direct member of
    pub fn user_groups(&self) -> &BTreeSet<UserGroupId> {
        &self.user_groups
    }

    pub fn is_member_of(&self, group: UserGroupId) -> bool {
        self.user_groups.contains(&group)
    }

    /// Rules naming this user directly
    pub fn access_rules(&self) -> &BTreeSet<RuleId> {
        &self.access_rules
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_alias(&mut self, alias: Option<String>) {
        self.alias = alias;
    }

    pub(crate) fn add_user_group(&mut self, group: UserGroupId) -> bool {
        self.user_groups.insert(group)
    }

    pub(crate) fn remove_user_group(&mut self, group: UserGroupId) -> bool {
        self.user_groups.remove(&group)
    }

    pub(crate) fn add_access_rule(&mut self, rule: RuleId) -> bool {
        self.access_rules.insert(rule)
    }

    pub(crate) fn remove_access_rule(&mut self, rule: RuleId) -> bool {
        self.access_rules.remove(&rule)
    }
}
