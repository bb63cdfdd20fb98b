use std::fmt;

use crate::validate::ValidationError;

use super::tree::TreeError;

/// The four ways a document operation can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Blank or malformed argument, or a refused membership cycle
    InvalidArgument,
    /// A name, alias or (node, subject) rule is already taken
    EntityAlreadyExists,
    /// A referenced repository, user, group or rule is not registered
    EntityDoesNotExist,
    /// A name or alias does not have the shape of an authz identifier
    InvalidEntityName,
}

/// Which registry an error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Repository,
    User,
    UserGroup,
    AccessRule,
    TreeNode,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Repository => write!(f, "repository"),
            EntityKind::User => write!(f, "user"),
            EntityKind::UserGroup => write!(f, "user group"),
            EntityKind::AccessRule => write!(f, "access rule"),
            EntityKind::TreeNode => write!(f, "tree node"),
        }
    }
}

/// A rule subject as the caller named it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectRef {
    User(String),
    UserGroup(String),
}

impl SubjectRef {
    pub fn name(&self) -> &str {
        match self {
            SubjectRef::User(name) | SubjectRef::UserGroup(name) => name,
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRef::User(name) => write!(f, "user '{}'", name),
            SubjectRef::UserGroup(name) => write!(f, "user group '@{}'", name),
        }
    }
}

/// Where a rule lives: a repository, or the server-wide tree when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleLocation {
    pub repository: Option<String>,
    pub path: String,
}

impl fmt::Display for RuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repository {
            Some(repository) => write!(f, "[{}:{}]", repository, self.path),
            None => write!(f, "[{}]", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid argument: {0}")]
    Validation(#[from] ValidationError),
    #[error("path tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),
    #[error("repository already exists: {0}")]
    RepositoryAlreadyExists(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("user alias already in use: {0}")]
    UserAliasAlreadyExists(String),
    #[error("user group not found: {0}")]
    UserGroupNotFound(String),
    #[error("user group already exists: {0}")]
    UserGroupAlreadyExists(String),
    #[error("no access rule for {subject} at {location}")]
    AccessRuleNotFound {
        location: RuleLocation,
        subject: SubjectRef,
    },
    #[error("access rule for {subject} already exists at {location}")]
    AccessRuleAlreadyExists {
        location: RuleLocation,
        subject: SubjectRef,
    },
    #[error("adding user group '{member}' to '{target}' would create a membership cycle")]
    MembershipCycle { member: String, target: String },
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::Validation(ValidationError::InvalidName { .. }) => {
                ErrorKind::InvalidEntityName
            }
            DocumentError::Validation(_) => ErrorKind::InvalidArgument,
            DocumentError::Tree(TreeError::Validation(_)) => ErrorKind::InvalidArgument,
            DocumentError::Tree(TreeError::NotRoot(_)) => ErrorKind::InvalidArgument,
            DocumentError::Tree(TreeError::NodeNotFound(_))
            | DocumentError::Tree(TreeError::RuleNotFound { .. }) => ErrorKind::EntityDoesNotExist,
            DocumentError::RepositoryNotFound(_)
            | DocumentError::UserNotFound(_)
            | DocumentError::UserGroupNotFound(_)
            | DocumentError::AccessRuleNotFound { .. } => ErrorKind::EntityDoesNotExist,
            DocumentError::RepositoryAlreadyExists(_)
            | DocumentError::UserAlreadyExists(_)
            | DocumentError::UserAliasAlreadyExists(_)
            | DocumentError::UserGroupAlreadyExists(_)
            | DocumentError::AccessRuleAlreadyExists { .. } => ErrorKind::EntityAlreadyExists,
            DocumentError::MembershipCycle { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// The registry this error is about, if it names one
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            DocumentError::Validation(_) | DocumentError::MembershipCycle { .. } => None,
            DocumentError::Tree(TreeError::Validation(_)) => None,
            DocumentError::Tree(TreeError::NodeNotFound(_) | TreeError::NotRoot(_)) => {
                Some(EntityKind::TreeNode)
            }
            DocumentError::Tree(TreeError::RuleNotFound { .. }) => Some(EntityKind::AccessRule),
            DocumentError::RepositoryNotFound(_) | DocumentError::RepositoryAlreadyExists(_) => {
                Some(EntityKind::Repository)
            }
            DocumentError::UserNotFound(_)
            | DocumentError::UserAlreadyExists(_)
            | DocumentError::UserAliasAlreadyExists(_) => Some(EntityKind::User),
            DocumentError::UserGroupNotFound(_) | DocumentError::UserGroupAlreadyExists(_) => {
                Some(EntityKind::UserGroup)
            }
            DocumentError::AccessRuleNotFound { .. }
            | DocumentError::AccessRuleAlreadyExists { .. } => Some(EntityKind::AccessRule),
        }
    }
}
