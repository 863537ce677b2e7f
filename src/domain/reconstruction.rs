//! Types exchanged with reconstruction collaborators.
//!
//! A reconstruction receives the two graphs of a [`Derivation`] and either
//! rebuilds their common ancestor or states which node groups of A and B it
//! believes stand for the same ancestor node.
//!
//! [`Derivation`]: crate::domain::derive::Derivation

use crate::domain::graph::Graph;
use petgraph::stable_graph::NodeIndex;
use std::collections::BTreeSet;

/// Node groups of graph A (`left`) and graph B (`right`) believed to come
/// from the same ancestor node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeMapping {
    pub left: BTreeSet<NodeIndex>,
    pub right: BTreeSet<NodeIndex>,
}

impl NodeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Outcome of a reconstruction
#[derive(Debug)]
pub enum Reconstruction {
    Graph(Graph),
    Mappings(Vec<NodeMapping>),
}

impl Reconstruction {
    pub fn kind(&self) -> &'static str {
        match self {
            Reconstruction::Graph(_) => "graph",
            Reconstruction::Mappings(_) => "mappings",
        }
    }
}

/// Number of `predicted` mappings that appear verbatim in `truth`.
pub fn matching_mappings(predicted: &[NodeMapping], truth: &[NodeMapping]) -> usize {
    predicted.iter().filter(|m| truth.contains(m)).count()
}
