use std::fmt;

use serde::{Deserialize, Serialize};

// Handles are arena keys. They are never reused within one document, so a
// stale handle simply stops resolving once its entity is gone.
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw arena index behind this handle
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Stable handle of a [`Repository`](super::Repository).
    RepositoryId,
    "repository"
);
handle!(
    /// Stable handle of a [`User`](super::User).
    UserId,
    "user"
);
handle!(
    /// Stable handle of a [`UserGroup`](super::UserGroup).
    UserGroupId,
    "group"
);
handle!(
    /// Position of a [`TreeNode`](super::TreeNode) in a [`PathTree`](super::PathTree).
    NodeId,
    "node"
);
handle!(
    /// Stable handle of an [`AccessRule`](super::AccessRule).
    RuleId,
    "rule"
);

/// Monotonic allocator for raw handle values.
#[derive(Debug, Clone, Default)]
pub(crate) struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}
