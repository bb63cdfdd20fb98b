use super::handle::{NodeId, RepositoryId};

/// A Subversion repository and the root of its own path tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    id: RepositoryId,
    name: String,
    root: NodeId,
}

impl Repository {
    pub(crate) fn new(id: RepositoryId, name: String, root: NodeId) -> Self {
        Self { id, name, root }
    }

    pub fn id(&self) -> RepositoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root node of this repository's paths and rules
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
}
