//! # Access rules
//!
//! An access rule grants (or denies) a single subject a level of access at
//! exactly one node of a path tree.
//!
//! Each rule has:
//! - A **subject**: either a [`User`](super::User) or a
//!   [`UserGroup`](super::UserGroup), never both
//! - An **access level** ([`AccessLevel`])
//! - An **exclusion** flag; an exclusion rule applies to everyone *except* the
//!   subject (`~user` / `~@group` in an authz file)
//!
//! Rules are owned by the [`PathTree`](super::PathTree) and indexed a second
//! time by their subject. Keeping both sides in step is the job of
//! [`Document`](super::Document).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::handle::{NodeId, RuleId, UserGroupId, UserId};

/// Level of access a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// `r` in an authz file
    ReadOnly,
    /// `rw` in an authz file
    ReadWrite,
    /// An empty grant in an authz file
    DenyAccess,
}

impl AccessLevel {
    /// The token this level is written as in an authz file
    pub fn token(&self) -> &'static str {
        match self {
            AccessLevel::ReadOnly => "r",
            AccessLevel::ReadWrite => "rw",
            AccessLevel::DenyAccess => "",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access level: {0:?}")]
pub struct ParseAccessLevelError(String);

impl FromStr for AccessLevel {
    type Err = ParseAccessLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "r" => Ok(AccessLevel::ReadOnly),
            "rw" => Ok(AccessLevel::ReadWrite),
            "" => Ok(AccessLevel::DenyAccess),
            other => Err(ParseAccessLevelError(other.to_string())),
        }
    }
}

/// Who an access rule or membership edge refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    User(UserId),
    UserGroup(UserGroupId),
}

impl Subject {
    pub fn user(&self) -> Option<UserId> {
        match self {
            Subject::User(id) => Some(*id),
            Subject::UserGroup(_) => None,
        }
    }

    pub fn user_group(&self) -> Option<UserGroupId> {
        match self {
            Subject::User(_) => None,
            Subject::UserGroup(id) => Some(*id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "{}", id),
            Subject::UserGroup(id) => write!(f, "{}", id),
        }
    }
}

impl From<UserId> for Subject {
    fn from(id: UserId) -> Self {
        Subject::User(id)
    }
}

impl From<UserGroupId> for Subject {
    fn from(id: UserGroupId) -> Self {
        Subject::UserGroup(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    id: RuleId,
    node: NodeId,
    subject: Subject,
    level: AccessLevel,
    exclusion: bool,
}

impl AccessRule {
    pub(crate) fn new(
        id: RuleId,
        node: NodeId,
        subject: Subject,
        level: AccessLevel,
        exclusion: bool,
    ) -> Self {
        Self {
            id,
            node,
            subject,
            level,
            exclusion,
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    /// The tree node this rule is attached to
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    /// The user this rule names, if it is a user rule
    pub fn user(&self) -> Option<UserId> {
        self.subject.user()
    }

    /// The user group this rule names, if it is a group rule
    pub fn user_group(&self) -> Option<UserGroupId> {
        self.subject.user_group()
    }

    pub fn access_level(&self) -> AccessLevel {
        self.level
    }

    pub fn is_exclusion(&self) -> bool {
        self.exclusion
    }

    pub(crate) fn set_access_level(&mut self, level: AccessLevel) {
        self.level = level;
    }

    pub(crate) fn set_exclusion(&mut self, exclusion: bool) {
        self.exclusion = exclusion;
    }
}
