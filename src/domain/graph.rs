use crate::domain::error::GraphResult;
use crate::domain::ids::{IdAllocator, NodeId};
use crate::domain::node::{NodeData, NodeRecord};
use crate::domain::payload::Payload;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Rooted directed graph.
///
/// The arena may hold entries that are no longer connected to the root (for
/// example nodes merged away by [`Graph::regularize`]); those are not part of
/// the graph. The node set is always derived by traversal from `root`.
#[derive(Debug)]
pub struct Graph {
    pub(crate) arena: StableDiGraph<NodeData, ()>,
    pub(crate) root: NodeIndex,
}

/// Result of [`Graph::clone_map`]: the copy and the old -> new correspondence.
#[derive(Debug)]
pub struct GraphCopy {
    pub graph: Graph,
    pub map: HashMap<NodeIndex, NodeIndex>,
}

impl Graph {
    /// Graph holding a single plain root node.
    pub fn new(ids: &mut IdAllocator) -> Self {
        Self::with_root(NodeData::new(ids))
    }

    pub fn with_root_payload(ids: &mut IdAllocator, payload: Box<dyn Payload>) -> Self {
        Self::with_root(NodeData::with_payload(ids, payload))
    }

    pub(crate) fn with_root(data: NodeData) -> Self {
        let mut arena = StableDiGraph::new();
        let root = arena.add_node(data);
        Self { arena, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn set_root(&mut self, root: NodeIndex) -> GraphResult<()> {
        self.ensure_node(root)?;
        self.root = root;
        Ok(())
    }

    /// Insert a node into the arena. It joins the graph once wired to it.
    pub fn add_node(&mut self, data: NodeData) -> NodeIndex {
        self.arena.add_node(data)
    }

    pub fn create_node(&mut self, ids: &mut IdAllocator) -> NodeIndex {
        self.add_node(NodeData::new(ids))
    }

    pub fn node(&self, node: NodeIndex) -> Option<&NodeData> {
        self.arena.node_weight(node)
    }

    pub fn id(&self, node: NodeIndex) -> Option<NodeId> {
        self.node(node).map(|data| data.id)
    }

    /// Handle of the reachable node carrying `id`.
    pub fn find(&self, id: NodeId) -> Option<NodeIndex> {
        self.traverse()
            .into_iter()
            .find(|&node| self.arena[node].id == id)
    }

    /// Every node reachable from the root along child or parent edges, each
    /// exactly once. Order is deterministic for a given arena but carries no
    /// meaning.
    pub fn traverse(&self) -> Vec<NodeIndex> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.root];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);

            let neighbours = self.neighbours(node);
            for next in neighbours
                .parents
                .into_iter()
                .chain(neighbours.children.into_iter().rev())
            {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }

        order
    }

    pub fn reachable(&self) -> HashSet<NodeIndex> {
        self.traverse().into_iter().collect()
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.reachable().contains(&node)
    }

    pub fn node_count(&self) -> usize {
        self.traverse().len()
    }

    pub fn edge_count(&self) -> usize {
        self.traverse()
            .into_iter()
            .map(|node| self.child_count(node))
            .sum()
    }

    /// Reachable nodes without children.
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.traverse()
            .into_iter()
            .filter(|&node| self.child_count(node) == 0)
            .collect()
    }

    /// Reachable nodes without parents.
    pub fn sources(&self) -> Vec<NodeIndex> {
        self.traverse()
            .into_iter()
            .filter(|&node| self.parent_count(node) == 0)
            .collect()
    }

    /// Check `b in a.children <=> a in b.parents` over the reachable node set.
    pub fn check_edge_symmetry(&self) -> bool {
        self.traverse().into_iter().all(|a| {
            self.children(a).iter().all(|b| self.parents(*b).contains(&a))
                && self.parents(a).iter().all(|b| self.children(*b).contains(&a))
        })
    }

    /// Give every reachable node a fresh id. Returns old id -> new id.
    pub fn reindex(&mut self, ids: &mut IdAllocator) -> HashMap<NodeId, NodeId> {
        let mut renamed = HashMap::new();
        for node in self.traverse() {
            let data = &mut self.arena[node];
            let fresh = ids.allocate();
            renamed.insert(data.id, fresh);
            data.id = fresh;
        }
        renamed
    }

    /// Approximate structural comparison.
    ///
    /// Starting from both roots, two nodes match when they have the same
    /// number of children and every child on this side matches *some* child
    /// on the other side. One visited set, keyed by this side's nodes, is
    /// shared across the whole recursion and a visited node matches
    /// trivially. This is not an isomorphism test: no bijection is enforced
    /// and sibling branches observe each other's visited marks, so two graphs
    /// that are only locally matchable can compare equal.
    pub fn structural_equals(&self, other: &Graph) -> bool {
        let mut visited = HashSet::new();
        self.nodes_match(other, self.root, other.root, &mut visited)
    }

    fn nodes_match(
        &self,
        other: &Graph,
        left: NodeIndex,
        right: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        if !self.arena.contains_node(left) || !other.arena.contains_node(right) {
            return false;
        }

        let left_children = self.children(left);
        let right_children = other.children(right);
        if left_children.len() != right_children.len() {
            return false;
        }

        if !visited.insert(left) {
            return true;
        }

        left_children.iter().all(|&child| {
            right_children
                .iter()
                .any(|&candidate| self.nodes_match(other, child, candidate, visited))
        })
    }

    /// Structural comparison against an arbitrary value; anything that is not
    /// a `Graph` is simply unequal.
    pub fn equals_any(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Graph>()
            .is_some_and(|graph| self.structural_equals(graph))
    }

    /// Copy every reachable node, payload included, under fresh ids.
    /// Edges are copied only when `preserve_edges` is set.
    pub fn clone_map(&self, preserve_edges: bool, ids: &mut IdAllocator) -> GraphCopy {
        let mut arena = StableDiGraph::new();
        let mut map = HashMap::new();
        let order = self.traverse();

        for &node in &order {
            let copy = arena.add_node(self.arena[node].duplicate(ids));
            map.insert(node, copy);
        }

        if preserve_edges {
            for &node in &order {
                for child in self.children(node) {
                    arena.update_edge(map[&node], map[&child], ());
                }
            }
        }

        let root = map[&self.root];
        GraphCopy {
            graph: Graph { arena, root },
            map,
        }
    }

    /// Independent copy with all edges.
    pub fn deep_clone(&self, ids: &mut IdAllocator) -> Graph {
        self.clone_map(true, ids).graph
    }

    /// Transpose: every edge flipped.
    ///
    /// If exactly one node ends up without parents it becomes the root. If
    /// several do, a synthetic plain root is created with those nodes as its
    /// children. If none do (every node sits on a cycle), the image of the
    /// current root stays the root.
    pub fn reverse(&self, ids: &mut IdAllocator) -> Graph {
        let GraphCopy { mut graph, map } = self.clone_map(false, ids);
        let order = self.traverse();

        for &node in &order {
            for child in self.children(node) {
                graph.arena.update_edge(map[&child], map[&node], ());
            }
        }

        let roots: Vec<NodeIndex> = order
            .iter()
            .map(|node| map[node])
            .filter(|&copy| graph.parent_count(copy) == 0)
            .collect();

        graph.root = match roots.as_slice() {
            [single] => *single,
            [] => map[&self.root],
            many => {
                let synthetic = graph.create_node(ids);
                for &root in many {
                    graph.arena.update_edge(synthetic, root, ());
                }
                debug!(roots = many.len(), "reverse: synthesized root");
                synthetic
            }
        };
        graph
    }

    /// Path contraction of degree-1 chains. See [`Graph::regularize_map`].
    pub fn regularize(&self, ids: &mut IdAllocator) -> Graph {
        self.regularize_map(ids).graph
    }

    /// Collapse degree-1 chains and report where every original node ended up.
    ///
    /// Nodes are visited in traversal order. A node whose single parent has
    /// it as its only child is merged into that parent; otherwise a node whose
    /// single child has it as its only parent is merged into that child. The
    /// returned map resolves each original node through any chain of merges
    /// made during the same pass, so it always names a live node.
    pub fn regularize_map(&self, ids: &mut IdAllocator) -> GraphCopy {
        let GraphCopy { mut graph, map } = self.clone_map(true, ids);
        let order: Vec<NodeIndex> = self.traverse().iter().map(|node| map[node]).collect();
        let mut replaced: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for node in order {
            if let Some(parent) = sole(&graph.parents(node))
                && parent != node
                && graph.child_count(parent) == 1
            {
                let former = graph.detach(node, true);
                for child in former.children.into_iter().filter(|&c| c != node) {
                    graph.arena.update_edge(parent, child, ());
                }
                replaced.insert(node, parent);
            } else if let Some(child) = sole(&graph.children(node))
                && child != node
                && graph.parent_count(child) == 1
            {
                let former = graph.detach(node, true);
                for parent in former.parents.into_iter().filter(|&p| p != node) {
                    graph.arena.update_edge(parent, child, ());
                }
                replaced.insert(node, child);
            }
        }

        graph.root = resolve(&replaced, map[&self.root]);
        let removed = graph.compact();
        debug!(merged = replaced.len(), removed, "regularize: contracted chains");

        let map = map
            .into_iter()
            .map(|(original, copy)| (original, resolve(&replaced, copy)))
            .collect();
        GraphCopy { graph, map }
    }

    /// Drop arena entries that are not reachable from the root.
    pub fn compact(&mut self) -> usize {
        let keep = self.reachable();
        let stale: Vec<NodeIndex> = self
            .arena
            .node_indices()
            .filter(|node| !keep.contains(node))
            .collect();
        for &node in &stale {
            self.arena.remove_node(node);
        }
        stale.len()
    }

    /// Shortest distance from `from` to each of its ancestors, walking parent
    /// edges only. `from` itself is at distance 0.
    pub fn ancestor_distances(&self, from: NodeIndex) -> GraphResult<HashMap<NodeIndex, usize>> {
        self.ensure_node(from)?;
        let mut distances = HashMap::from([(from, 0)]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            let distance = distances[&node];
            for parent in self.parents(node) {
                if distances.contains_key(&parent) {
                    continue;
                }
                distances.insert(parent, distance + 1);
                queue.push_back(parent);
            }
        }
        Ok(distances)
    }

    /// One record per reachable node. Consumers must index by id; record
    /// order is not meaningful.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.traverse()
            .into_iter()
            .map(|node| self.record(node))
            .collect()
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.structural_equals(other)
    }
}

fn sole(set: &BTreeSet<NodeIndex>) -> Option<NodeIndex> {
    match set.len() {
        1 => set.iter().next().copied(),
        _ => None,
    }
}

fn resolve(replaced: &HashMap<NodeIndex, NodeIndex>, mut node: NodeIndex) -> NodeIndex {
    while let Some(&next) = replaced.get(&node) {
        node = next;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload::Operation;

    /// root -> a -> b, returning (graph, [root, a, b])
    fn chain(ids: &mut IdAllocator) -> (Graph, Vec<NodeIndex>) {
        let mut graph = Graph::new(ids);
        let root = graph.root();
        let a = graph.create_node(ids);
        let b = graph.create_node(ids);
        graph.add_child(root, a).unwrap();
        graph.add_child(a, b).unwrap();
        (graph, vec![root, a, b])
    }

    /// root -> {a, b}
    fn fork(ids: &mut IdAllocator) -> (Graph, Vec<NodeIndex>) {
        let mut graph = Graph::new(ids);
        let root = graph.root();
        let a = graph.create_node(ids);
        let b = graph.create_node(ids);
        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        (graph, vec![root, a, b])
    }

    #[test]
    fn test_traverse_visits_each_node_once_in_cycle() {
        let mut ids = IdAllocator::new();
        let (mut graph, nodes) = chain(&mut ids);
        graph.add_child(nodes[2], nodes[0]).unwrap();
        graph.add_child(nodes[1], nodes[1]).unwrap();

        let order = graph.traverse();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], graph.root());
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_traverse_follows_parent_edges() {
        let mut ids = IdAllocator::new();
        let (mut graph, nodes) = chain(&mut ids);
        // A second source reachable only through its child
        let side = graph.create_node(&mut ids);
        graph.add_child(side, nodes[2]).unwrap();
        assert!(graph.contains(side));
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.sources().len(), 2);
    }

    #[test]
    fn test_orphans_are_not_part_of_graph() {
        let mut ids = IdAllocator::new();
        let (mut graph, _) = chain(&mut ids);
        let orphan = graph.create_node(&mut ids);
        assert!(!graph.contains(orphan));
        assert_eq!(graph.compact(), 1);
        assert!(graph.node(orphan).is_none());
    }

    #[test]
    fn test_reindex_assigns_distinct_fresh_ids() {
        let mut ids = IdAllocator::new();
        let (mut graph, _) = chain(&mut ids);
        let before: HashSet<_> = graph.traverse().iter().map(|&n| graph.arena[n].id).collect();
        let renamed = graph.reindex(&mut ids);
        let after: HashSet<_> = graph.traverse().iter().map(|&n| graph.arena[n].id).collect();
        assert_eq!(renamed.len(), 3);
        assert_eq!(after.len(), 3);
        assert!(before.is_disjoint(&after));
    }

    #[test]
    fn test_structural_equals_chain_vs_fork() {
        let mut ids = IdAllocator::new();
        let (chain_graph, _) = chain(&mut ids);
        let (fork_graph, _) = fork(&mut ids);
        let (other_chain, _) = chain(&mut ids);
        assert!(chain_graph.structural_equals(&other_chain));
        assert!(!chain_graph.structural_equals(&fork_graph));
        assert!(chain_graph == other_chain);
    }

    #[test]
    fn test_structural_equals_ignores_parent_only_nodes() {
        // Only child edges from the root are compared, so an extra source
        // attached below the root goes unnoticed.
        let mut ids = IdAllocator::new();
        let (plain, _) = chain(&mut ids);
        let (mut extended, nodes) = chain(&mut ids);
        let side = extended.create_node(&mut ids);
        extended.add_child(side, nodes[2]).unwrap();
        assert!(plain.structural_equals(&extended));
    }

    #[test]
    fn test_equals_any_rejects_non_graph() {
        let mut ids = IdAllocator::new();
        let (graph, _) = chain(&mut ids);
        assert!(!graph.equals_any(&42_u32));
        assert!(!graph.equals_any(&"graph"));
        let copy = graph.deep_clone(&mut ids);
        assert!(graph.equals_any(&copy));
    }

    #[test]
    fn test_clone_map_preserves_payload_and_edges() {
        let mut ids = IdAllocator::new();
        let mut graph = Graph::with_root_payload(&mut ids, Box::new(Operation::new("placeholder")));
        let child = graph.create_node(&mut ids);
        graph.add_child(graph.root(), child).unwrap();

        let copy = graph.clone_map(true, &mut ids);
        let new_root = copy.map[&graph.root()];
        assert_eq!(copy.graph.root(), new_root);
        assert_eq!(
            copy.graph.node(new_root).unwrap().operation(),
            Some(&Operation::new("placeholder"))
        );
        assert_ne!(copy.graph.id(new_root), graph.id(graph.root()));
        assert!(copy.graph.has_edge(new_root, copy.map[&child]));
        assert!(graph.structural_equals(&copy.graph));
    }

    #[test]
    fn test_clone_without_edges_is_disconnected() {
        let mut ids = IdAllocator::new();
        let (graph, _) = chain(&mut ids);
        let copy = graph.clone_map(false, &mut ids);
        assert_eq!(copy.map.len(), 3);
        assert_eq!(copy.graph.node_count(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ids = IdAllocator::new();
        let (graph, nodes) = chain(&mut ids);
        let GraphCopy { graph: mut copy, map } = graph.clone_map(true, &mut ids);
        copy.remove_child(map[&nodes[0]], map[&nodes[1]]).unwrap();
        assert!(graph.has_edge(nodes[0], nodes[1]));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_reverse_chain_picks_single_root() {
        let mut ids = IdAllocator::new();
        let (graph, _) = chain(&mut ids);
        let reversed = graph.reverse(&mut ids);
        assert_eq!(reversed.node_count(), 3);
        assert_eq!(reversed.parent_count(reversed.root()), 0);
        assert_eq!(reversed.leaves().len(), 1);
        assert!(reversed.reverse(&mut ids).structural_equals(&graph));
    }

    #[test]
    fn test_reverse_with_several_sinks_synthesizes_root() {
        let mut ids = IdAllocator::new();
        let (graph, _) = fork(&mut ids);
        let reversed = graph.reverse(&mut ids);
        assert_eq!(reversed.node_count(), 4);
        assert_eq!(reversed.child_count(reversed.root()), 2);
        assert!(reversed.check_edge_symmetry());
    }

    #[test]
    fn test_reverse_of_full_cycle_keeps_root_image() {
        let mut ids = IdAllocator::new();
        let (mut graph, nodes) = chain(&mut ids);
        graph.add_child(nodes[2], nodes[0]).unwrap();
        let reversed = graph.reverse(&mut ids);
        assert_eq!(reversed.node_count(), 3);
        assert_eq!(reversed.parent_count(reversed.root()), 1);
    }

    #[test]
    fn test_regularize_collapses_chain() {
        let mut ids = IdAllocator::new();
        let (graph, nodes) = chain(&mut ids);
        let GraphCopy { graph: regular, map } = graph.regularize_map(&mut ids);
        assert_eq!(regular.node_count(), 1);
        for node in nodes {
            assert_eq!(map[&node], regular.root());
        }
    }

    #[test]
    fn test_regularize_keeps_branching_nodes() {
        // root -> {a, b}, a -> c: only the a -> c link is a degree-1 chain
        let mut ids = IdAllocator::new();
        let (mut graph, nodes) = fork(&mut ids);
        let c = graph.create_node(&mut ids);
        graph.add_child(nodes[1], c).unwrap();

        let GraphCopy { graph: regular, map } = graph.regularize_map(&mut ids);
        assert_eq!(regular.node_count(), 3);
        assert_eq!(regular.child_count(regular.root()), 2);
        assert_eq!(map[&nodes[1]], map[&c]);
        assert!(regular.check_edge_symmetry());
        // The source graph is untouched
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_ancestor_distances_walks_parents_only() {
        let mut ids = IdAllocator::new();
        let (mut graph, nodes) = chain(&mut ids);
        let shortcut = graph.create_node(&mut ids);
        graph.add_child(nodes[0], shortcut).unwrap();
        graph.add_child(shortcut, nodes[2]).unwrap();

        let distances = graph.ancestor_distances(nodes[2]).unwrap();
        assert_eq!(distances[&nodes[2]], 0);
        assert_eq!(distances[&nodes[1]], 1);
        assert_eq!(distances[&nodes[0]], 2);
        assert_eq!(distances.len(), 4);

        let from_root = graph.ancestor_distances(nodes[0]).unwrap();
        assert_eq!(from_root.len(), 1);
    }

    #[test]
    fn test_records_carry_adjacency_and_payload() {
        let mut ids = IdAllocator::new();
        let mut graph = Graph::new(&mut ids);
        let op = graph.add_node(NodeData::with_payload(&mut ids, Box::new(Operation::new("relu"))));
        graph.add_child(graph.root(), op).unwrap();

        let records = graph.records();
        assert_eq!(records.len(), 2);
        let child = records.iter().find(|r| r.id == graph.arena[op].id).unwrap();
        assert_eq!(child.parents, vec![graph.arena[graph.root()].id]);
        assert_eq!(child.payload["operation"], "relu");
        let text = graph.serialize().unwrap();
        assert!(text.contains("\"relu\""));
    }
}
