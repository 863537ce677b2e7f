use crate::domain::ids::NodeId;
use petgraph::stable_graph::NodeIndex;
use thiserror::Error;

/// Errors raised by graph operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("no edge {from} -> {to}")]
    MissingEdge { from: NodeId, to: NodeId },

    #[error("node {} is not part of this graph", .0.index())]
    UnknownNode(NodeIndex),

    #[error("rule set is empty")]
    EmptyRules,

    #[error("duplicate node id {0}")]
    DuplicateId(u64),

    #[error("node {parent} references unknown child {child}")]
    UnknownChild { parent: u64, child: u64 },

    #[error("no root: every node id appears as some node's child")]
    NoRoot,

    #[error("ambiguous root: {0:?} never appear as a child")]
    AmbiguousRoot(Vec<u64>),

    #[error("nodes {0:?} are not reachable from the root")]
    Disconnected(Vec<u64>),

    #[error("node id {0} leaves no room for fresh ids")]
    IdSpaceExhausted(u64),

    #[error("invalid rule document: {0}")]
    InvalidRules(String),

    #[error("max_splits must be at least 1")]
    InvalidSplitCount,
}

pub type GraphResult<T> = Result<T, GraphError>;
