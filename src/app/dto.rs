use crate::domain::derive::Side;
use crate::domain::ids::NodeId;
use crate::domain::node::NodeRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub root: NodeId,
    pub node_count: usize,
    pub edge_count: usize,
    pub leaf_count: usize,
    pub source_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResponse {
    pub summary: GraphSummary,
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRecordDto {
    /// Id of the node in the source graph.
    pub original: NodeId,
    pub side: Side,
    /// Ids in graph A standing for `original`.
    pub left: Vec<NodeId>,
    /// Ids in graph B standing for `original`.
    pub right: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationReport {
    pub seed: Option<u64>,
    pub max_splits: usize,
    pub allow_interconnect: bool,
    pub original: GraphSummary,
    pub a: GraphResponse,
    pub b: GraphResponse,
    pub splits: Vec<SplitRecordDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    pub solver: String,
    pub reconstruction: String,
    /// Set when the solver rebuilt a graph: structural comparison against
    /// the source graph.
    pub matches_original: Option<bool>,
    /// Set when the solver answered with mappings: how many of them are
    /// exactly right.
    pub correct_mappings: Option<usize>,
    pub expected_mappings: usize,
    pub split_in_a: usize,
    pub split_in_b: usize,
}
