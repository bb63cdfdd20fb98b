use std::collections::BTreeMap;

use crate::validate::{check_path, join_path, split_path, ValidationError};

use super::access::{AccessLevel, AccessRule, Subject};
use super::handle::{HandleAllocator, NodeId, RuleId};

/**
 * Path Trees
 * ==========
 * A path tree maps the `/`-separated paths of an authz file onto nodes.
 *  Every repository owns one root, and the document owns one more root
 *  for rules that apply to all repositories.
 * All roots of a document live in the same arena:
 *  - Nodes are addressed by [`NodeId`], never by name, since two roots
 *    may each have a child called `trunk`
 *  - A node owns its children top-down; the parent link is only a lookup
 *  - Nodes are created on first use of a path and only go away when the
 *    whole tree of their root is discarded
 * Rules live in the same arena as the nodes they are attached to. A node
 *  holds at most one rule per subject.
 */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    id: NodeId,
    name: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    rules: BTreeMap<Subject, RuleId>,
}

impl TreeNode {
    /// Name carried by every root node
    pub const ROOT_NAME: &'static str = "root";

    fn new(id: NodeId, name: String, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name,
            parent,
            children: BTreeMap::new(),
            rules: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The path segment this node stands for, or [`TreeNode::ROOT_NAME`]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Direct children, keyed by segment name
    pub fn children(&self) -> &BTreeMap<String, NodeId> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Rules attached directly to this node, keyed by subject
    pub fn rules(&self) -> &BTreeMap<Subject, RuleId> {
        &self.rules
    }

    pub fn rule_for(&self, subject: Subject) -> Option<RuleId> {
        self.rules.get(&subject).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("tree node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("tree node is not a root: {0}")]
    NotRoot(NodeId),
    #[error("no access rule for {subject} at {node}")]
    RuleNotFound { node: NodeId, subject: Subject },
}

#[derive(Debug, Clone, Default)]
pub struct PathTree {
    nodes: BTreeMap<NodeId, TreeNode>,
    rules: BTreeMap<RuleId, AccessRule>,
    handles: HandleAllocator,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty root node
    pub fn create_root(&mut self) -> NodeId {
        let id = NodeId::new(self.handles.next());
        self.nodes
            .insert(id, TreeNode::new(id, TreeNode::ROOT_NAME.to_string(), None));
        tracing::trace!("created root {}", id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&AccessRule> {
        self.rules.get(&id)
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut AccessRule> {
        self.rules.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    pub fn rules(&self) -> impl Iterator<Item = &AccessRule> {
        self.rules.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Follow parent links up to the root of `id`'s tree
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
        }
        Some(current.id)
    }

    /// Full path of a node relative to its root; `/` for a root
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.nodes.get(&parent)?;
        }
        segments.reverse();
        Some(join_path(segments))
    }

    /// Every node below `id`, including `id` itself, parents before children
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.values().rev());
            }
        }
        out
    }

    /// Walk `path` from `root`, creating every missing segment on the way.
    ///
    /// This is the only way nodes other than roots come into existence.
    /// Calling it again with the same path returns the same node.
    pub fn resolve_or_create(&mut self, root: NodeId, path: &str) -> Result<NodeId, TreeError> {
        check_path(path, "Path")?;
        self.require_node(root)?;

        let mut current = root;
        for segment in split_path(path) {
            let existing = self
                .nodes
                .get(&current)
                .and_then(|node| node.child(segment));
            current = match existing {
                Some(child) => child,
                None => self.create_child(current, segment),
            };
        }
        Ok(current)
    }

    /// Walk `path` from `root` without creating anything.
    ///
    /// Returns `None` as soon as a segment is missing.
    pub fn resolve_existing(&self, root: NodeId, path: &str) -> Result<Option<NodeId>, TreeError> {
        check_path(path, "Path")?;
        let mut current = self.require_node(root)?;
        for segment in split_path(path) {
            match current.child(segment).and_then(|id| self.nodes.get(&id)) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current.id))
    }

    pub fn find_rule(&self, node: NodeId, subject: Subject) -> Option<&AccessRule> {
        let id = self.nodes.get(&node)?.rule_for(subject)?;
        self.rules.get(&id)
    }

    /// Attach a new rule for `subject` to `node`.
    ///
    /// Returns `None` and leaves the node untouched if it already holds a
    /// rule for `subject`. The subject side of the rule is not touched here.
    pub fn attach_rule(
        &mut self,
        node: NodeId,
        subject: Subject,
        level: AccessLevel,
        exclusion: bool,
    ) -> Result<Option<RuleId>, TreeError> {
        let raw = self.handles.next();
        let target = self
            .nodes
            .get_mut(&node)
            .ok_or(TreeError::NodeNotFound(node))?;
        if target.rules.contains_key(&subject) {
            return Ok(None);
        }

        let id = RuleId::new(raw);
        target.rules.insert(subject, id);
        self.rules
            .insert(id, AccessRule::new(id, node, subject, level, exclusion));
        Ok(Some(id))
    }

    /// Detach the rule for `subject` from `node` and hand it back.
    ///
    /// The subject side of the rule is not touched here.
    pub fn detach_rule(&mut self, node: NodeId, subject: Subject) -> Result<AccessRule, TreeError> {
        let target = self
            .nodes
            .get_mut(&node)
            .ok_or(TreeError::NodeNotFound(node))?;
        let id = target
            .rules
            .remove(&subject)
            .ok_or(TreeError::RuleNotFound { node, subject })?;
        self.rules
            .remove(&id)
            .ok_or(TreeError::RuleNotFound { node, subject })
    }

    /// Re-create every rule found under `source_root` at the same relative
    /// path under `target_root`.
    ///
    /// Target segments are created as needed. Subjects that already hold a
    /// rule at the target node keep it. Returns the rules that were created.
    pub fn clone_subtree_rules(
        &mut self,
        source_root: NodeId,
        target_root: NodeId,
    ) -> Result<Vec<RuleId>, TreeError> {
        self.require_node(source_root)?;
        self.require_node(target_root)?;

        // Snapshot first; the target may share nodes with the source.
        let mut pending = Vec::new();
        for id in self.descendants(source_root) {
            let relative = self.relative_segments(source_root, id)?;
            if let Some(node) = self.nodes.get(&id) {
                for rule_id in node.rules.values() {
                    if let Some(rule) = self.rules.get(rule_id) {
                        pending.push((
                            relative.clone(),
                            rule.subject(),
                            rule.access_level(),
                            rule.is_exclusion(),
                        ));
                    }
                }
            }
        }

        let mut created = Vec::new();
        for (segments, subject, level, exclusion) in pending {
            let path = join_path(segments.iter().map(String::as_str));
            let node = self.resolve_or_create(target_root, &path)?;
            if let Some(id) = self.attach_rule(node, subject, level, exclusion)? {
                created.push(id);
            }
        }
        tracing::trace!(
            "cloned {} rules from {} to {}",
            created.len(),
            source_root,
            target_root
        );
        Ok(created)
    }

    /// Drop a whole tree, returning the rules it held.
    pub fn discard_root(&mut self, root: NodeId) -> Result<Vec<AccessRule>, TreeError> {
        if !self.require_node(root)?.is_root() {
            return Err(TreeError::NotRoot(root));
        }

        let mut removed = Vec::new();
        for id in self.descendants(root) {
            if let Some(node) = self.nodes.remove(&id) {
                removed.extend(node.rules.values().filter_map(|r| self.rules.remove(r)));
            }
        }
        tracing::trace!("discarded {} with {} rules", root, removed.len());
        Ok(removed)
    }

    fn require_node(&self, id: NodeId) -> Result<&TreeNode, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId::new(self.handles.next());
        self.nodes
            .insert(id, TreeNode::new(id, name.to_string(), Some(parent)));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(name.to_string(), id);
        }
        tracing::trace!("created {} '{}' under {}", id, name, parent);
        id
    }

    // Segment names from `ancestor` (exclusive) down to `id` (inclusive).
    fn relative_segments(&self, ancestor: NodeId, id: NodeId) -> Result<Vec<String>, TreeError> {
        let mut segments = Vec::new();
        let mut current = self.require_node(id)?;
        while current.id != ancestor {
            segments.push(current.name.clone());
            let parent = current.parent.ok_or(TreeError::NodeNotFound(ancestor))?;
            current = self.require_node(parent)?;
        }
        segments.reverse();
        Ok(segments)
    }
}
