//! Rule fixtures and graph invariants shared by the integration tests.

use shadow_graph::domain::graph::Graph;
use shadow_graph::domain::ids::IdAllocator;
use shadow_graph::domain::rules::NodeRule;
use std::collections::{BTreeSet, HashSet};

/// 0 -> 1 -> 2
pub fn chain_rules() -> Vec<NodeRule> {
    vec![
        NodeRule::new(0, vec![1]),
        NodeRule::new(1, vec![2]),
        NodeRule::new(2, vec![]),
    ]
}

/// Small computation graph: an input fanning out to two ops that join again.
///
/// ```text
///         0 placeholder
///        /  \
///   1 conv   2 linear
///        \  /
///         3 add
///         |
///         4 output
/// ```
pub fn diamond_rules() -> Vec<NodeRule> {
    vec![
        NodeRule::new(0, vec![1, 2]).with_operation("placeholder"),
        NodeRule::new(1, vec![3]).with_operation("conv"),
        NodeRule::new(2, vec![3]).with_operation("linear"),
        NodeRule::new(3, vec![4]).with_operation("add"),
        NodeRule::new(4, vec![]).with_operation("output"),
    ]
}

/// Diamond below the root with a back edge from the join to the fork.
pub fn cyclic_rules() -> Vec<NodeRule> {
    vec![
        NodeRule::new(0, vec![1]),
        NodeRule::new(1, vec![2, 3]),
        NodeRule::new(2, vec![4]),
        NodeRule::new(3, vec![4]),
        NodeRule::new(4, vec![1]),
    ]
}

/// Shared children, two sinks and a trailing chain.
pub fn wide_rules() -> Vec<NodeRule> {
    vec![
        NodeRule::new(0, vec![1, 2, 3]),
        NodeRule::new(1, vec![4, 5]),
        NodeRule::new(2, vec![5, 6]),
        NodeRule::new(3, vec![6]),
        NodeRule::new(4, vec![7]),
        NodeRule::new(5, vec![7]),
        NodeRule::new(6, vec![8]),
        NodeRule::new(7, vec![]),
        NodeRule::new(8, vec![9]),
        NodeRule::new(9, vec![10]),
        NodeRule::new(10, vec![]),
    ]
}

pub fn all_rules() -> Vec<Vec<NodeRule>> {
    vec![chain_rules(), diamond_rules(), cyclic_rules(), wide_rules()]
}

pub fn build(rules: &[NodeRule]) -> (Graph, IdAllocator) {
    let mut ids = IdAllocator::new();
    let graph = Graph::from_rules(rules, &mut ids).expect("fixture rules are valid");
    (graph, ids)
}

pub fn rules_json(rules: &[NodeRule]) -> String {
    serde_json::to_string_pretty(rules).expect("rules serialize")
}

/// Properties every graph handed out by the engine must have.
pub fn assert_well_formed(graph: &Graph) {
    assert!(graph.check_edge_symmetry(), "edge symmetry violated");

    let order = graph.traverse();
    let unique: BTreeSet<_> = order.iter().copied().collect();
    assert_eq!(unique.len(), order.len(), "traversal repeated a node");
    assert_eq!(order.len(), graph.node_count());

    let ids: HashSet<_> = order.iter().map(|&n| graph.id(n)).collect();
    assert_eq!(ids.len(), order.len(), "duplicate node ids");

    // Closure: neighbours of reached nodes are reached too
    for &node in &order {
        assert!(graph.children(node).is_subset(&unique));
        assert!(graph.parents(node).is_subset(&unique));
    }
}
