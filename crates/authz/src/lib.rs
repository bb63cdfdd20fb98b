/**
 * Document configuration.
 *  Clone and membership-cycle policies,
 *  loadable from a TOML file.
 */
pub mod config;
/**
 * Repositories, users, user groups, path trees
 *  and access rules, all owned by a single
 *  `Document` that keeps every link consistent.
 */
pub mod model;
/**
 * Shape checks for names, aliases and paths.
 *  Pure functions, no document state.
 */
pub mod validate;

pub mod prelude {
    pub use crate::config::{ConfigError, CyclePolicy, DocumentConfig, RepositoryCloneMode};
    pub use crate::model::{
        AccessLevel, AccessRule, Document, DocumentError, ErrorKind, Repository, Subject, User,
        UserGroup,
    };
    pub use crate::validate::ValidationError;
}
