//! Graph construction from `{id, children}` rule records.

use crate::domain::error::{GraphError, GraphResult};
use crate::domain::graph::Graph;
use crate::domain::ids::{IdAllocator, NodeId};
use crate::domain::node::NodeData;
use crate::domain::payload::Operation;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// One node of rule input. Serialized graph records parse as rules too:
/// `parents` and payload fields other than `operation` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRule {
    pub id: u64,
    #[serde(default)]
    pub children: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl NodeRule {
    pub fn new(id: u64, children: Vec<u64>) -> Self {
        Self {
            id,
            children,
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// Entry of the node-editor export layout
#[derive(Debug, Clone, Deserialize)]
struct EditorEntry {
    #[serde(default)]
    children: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Records(Vec<NodeRule>),
    Editor(BTreeMap<String, EditorEntry>),
}

/// Parse rule JSON: either an array of `{id, children}` records or an
/// object keyed by decimal id with `{children, position}` values.
pub fn parse_rules(json: &str) -> GraphResult<Vec<NodeRule>> {
    let document: RuleDocument =
        serde_json::from_str(json).map_err(|e| GraphError::InvalidRules(e.to_string()))?;

    match document {
        RuleDocument::Records(rules) => Ok(rules),
        RuleDocument::Editor(entries) => {
            let mut rules = entries
                .into_iter()
                .map(|(key, entry)| {
                    let id = key.trim().parse::<u64>().map_err(|_| {
                        GraphError::InvalidRules(format!("node key {key:?} is not an integer id"))
                    })?;
                    Ok(NodeRule::new(id, entry.children))
                })
                .collect::<GraphResult<Vec<_>>>()?;
            rules.sort_by_key(|rule| rule.id);
            Ok(rules)
        }
    }
}

impl Graph {
    /// Build a graph from rules, keeping the rule ids as node ids.
    ///
    /// The root is the single id that never appears as a child. Input with
    /// no such id, with more than one, with duplicate ids, with references to
    /// unknown ids, or with nodes the root cannot reach is rejected.
    pub fn from_rules(rules: &[NodeRule], ids: &mut IdAllocator) -> GraphResult<Graph> {
        if rules.is_empty() {
            return Err(GraphError::EmptyRules);
        }

        let mut arena = StableDiGraph::new();
        let mut by_id: HashMap<u64, NodeIndex> = HashMap::with_capacity(rules.len());
        for rule in rules {
            let mut data = NodeData::with_id(NodeId(rule.id));
            if let Some(operation) = &rule.operation {
                data.payload = Some(Box::new(Operation::new(operation.clone())));
            }
            if by_id.insert(rule.id, arena.add_node(data)).is_some() {
                return Err(GraphError::DuplicateId(rule.id));
            }
            ids.reserve(NodeId(rule.id))?;
        }

        let mut referenced: HashSet<u64> = HashSet::new();
        for rule in rules {
            let parent = by_id[&rule.id];
            for &child_id in &rule.children {
                let child = by_id.get(&child_id).ok_or(GraphError::UnknownChild {
                    parent: rule.id,
                    child: child_id,
                })?;
                arena.update_edge(parent, *child, ());
                referenced.insert(child_id);
            }
        }

        let candidates: Vec<u64> = rules
            .iter()
            .map(|rule| rule.id)
            .filter(|id| !referenced.contains(id))
            .collect();
        let root = match candidates.as_slice() {
            [] => return Err(GraphError::NoRoot),
            [single] => by_id[single],
            _ => return Err(GraphError::AmbiguousRoot(candidates)),
        };

        let graph = Graph { arena, root };
        let reachable = graph.reachable();
        if reachable.len() != rules.len() {
            let mut unreached: Vec<u64> = rules
                .iter()
                .filter(|rule| !reachable.contains(&by_id[&rule.id]))
                .map(|rule| rule.id)
                .collect();
            unreached.sort_unstable();
            return Err(GraphError::Disconnected(unreached));
        }

        debug!(nodes = rules.len(), root = candidates[0], "built graph from rules");
        Ok(graph)
    }

    /// Parse serialized graph records (the output of [`Graph::serialize`])
    /// back into a graph.
    pub fn from_records(json: &str, ids: &mut IdAllocator) -> GraphResult<Graph> {
        let rules = parse_rules(json)?;
        Graph::from_rules(&rules, ids)
    }

    /// Rules describing the reachable graph.
    pub fn to_rules(&self) -> Vec<NodeRule> {
        self.traverse()
            .into_iter()
            .map(|node| {
                let data = &self.arena[node];
                NodeRule {
                    id: data.id.value(),
                    children: self
                        .children(node)
                        .iter()
                        .map(|&c| self.arena[c].id.value())
                        .collect(),
                    operation: data.operation().and_then(|op| op.operation.clone()),
                }
            })
            .collect()
    }
}
