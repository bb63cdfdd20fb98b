//! Authorization entities and the document that owns them
//!
//! This module defines the in-memory form of an authz file:
//!
//! - **[`Document`]**: Aggregate root holding every entity and all cross-entity operations
//! - **[`Repository`]**: Named repository owning the root of its own path tree
//! - **[`User`]** / **[`UserGroup`]**: Subjects of access rules, linked by membership
//! - **[`PathTree`]** / **[`TreeNode`]**: Path segments and the rules attached to them
//! - **[`AccessRule`]**: One subject, one access level, one node
//!
//! # Architecture
//!
//! ## Arena and handles
//!
//! Entities live in registries keyed by stable handles ([`UserId`],
//! [`UserGroupId`], [`RepositoryId`], [`NodeId`], [`RuleId`]). Names and
//! aliases are secondary indexes pointing at those handles, so renaming
//! never touches a relationship.
//!
//! ```text
//! Document
//!   |-- root (server-wide) --> TreeNode "root" --> "trunk" --> "src"
//!   |                                                            |
//!   |                                                     AccessRule(@dev, rw)
//!   |-- Repository "project" --> TreeNode "root" --> ...
//!   |-- User "alice" <--member--> UserGroup "dev" <--member--> UserGroup "all"
//! ```
//!
//! ## Two-sided links
//!
//! Every relationship is stored on both ends:
//! - a user lists its groups, and each group lists its member users
//! - a group lists the groups it belongs to, and each of those lists it as a member
//! - a node lists its rules by subject, and each subject lists its rules
//!
//! Only [`Document`] writes these links, always both sides at once.
//! [`Document::check_integrity`] verifies that they agree.

mod access;
mod document;
mod error;
mod handle;
mod integrity;
mod membership;
mod repository;
mod tree;
mod user;
mod user_group;

pub use access::{AccessLevel, AccessRule, ParseAccessLevelError, Subject};
pub use document::Document;
pub use error::{DocumentError, EntityKind, ErrorKind, RuleLocation, SubjectRef};
pub use handle::{NodeId, RepositoryId, RuleId, UserGroupId, UserId};
pub use integrity::IntegrityViolation;
pub use repository::Repository;
pub use tree::{PathTree, TreeError, TreeNode};
pub use user::User;
pub use user_group::UserGroup;
