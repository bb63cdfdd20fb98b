//! Group containment as a directed graph.
//!
//! Edges point from a containing group to its member group. The graph is
//! rebuilt from the adjacency sets on demand; it is never the source of truth.

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use super::handle::UserGroupId;
use super::user_group::UserGroup;

pub(crate) fn containment_graph<'a, I>(groups: I) -> DiGraphMap<UserGroupId, ()>
where
    I: IntoIterator<Item = &'a UserGroup>,
{
    let mut graph = DiGraphMap::new();
    for group in groups {
        graph.add_node(group.id());
        for member in group.user_group_members() {
            graph.add_edge(group.id(), *member, ());
        }
    }
    graph
}

/// True when `to` is reachable from `from` by following containment edges.
pub(crate) fn has_path(graph: &DiGraphMap<UserGroupId, ()>, from: UserGroupId, to: UserGroupId) -> bool {
    if !graph.contains_node(from) {
        return false;
    }
    let mut dfs = Dfs::new(graph, from);
    while let Some(next) = dfs.next(graph) {
        if next == to {
            return true;
        }
    }
    false
}

/// Would making `member` a member of `target` let a group contain itself?
pub(crate) fn would_create_cycle<'a, I>(groups: I, member: UserGroupId, target: UserGroupId) -> bool
where
    I: IntoIterator<Item = &'a UserGroup>,
{
    if member == target {
        return true;
    }
    let graph = containment_graph(groups);
    // Adding target -> member closes a loop iff member already reaches target.
    has_path(&graph, member, target)
}

#[cfg(test)]
mod test {
    use super::*;

    fn group(id: u64) -> UserGroup {
        UserGroup::new(UserGroupId::new(id), format!("g{}", id))
    }

    fn id(raw: u64) -> UserGroupId {
        UserGroupId::new(raw)
    }

    #[test]
    fn test_self_membership_is_a_cycle() {
        let groups = vec![group(1)];
        assert!(would_create_cycle(&groups, id(1), id(1)));
    }

    #[test]
    fn test_transitive_cycle() {
        // 1 contains 2, 2 contains 3
        let mut one = group(1);
        let mut two = group(2);
        let three = group(3);
        one.add_user_group_member(id(2));
        two.add_user_group_member(id(3));
        let groups = vec![one, two, three];

        assert!(would_create_cycle(&groups, id(1), id(3)));
        assert!(would_create_cycle(&groups, id(2), id(3)));
        assert!(!would_create_cycle(&groups, id(3), id(1)));

        let graph = containment_graph(&groups);
        assert!(has_path(&graph, id(1), id(3)));
        assert!(!has_path(&graph, id(3), id(1)));
        assert!(!has_path(&graph, id(9), id(1)));
    }

    #[test]
    fn test_siblings_are_not_cycles() {
        let mut one = group(1);
        one.add_user_group_member(id(2));
        let groups = vec![one, group(2), group(3)];
        assert!(!would_create_cycle(&groups, id(3), id(2)));
        assert!(!would_create_cycle(&groups, id(2), id(3)));
    }
}
