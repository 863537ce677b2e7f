use crate::domain::error::{GraphError, GraphResult};
use crate::domain::graph::Graph;
use crate::domain::ids::{IdAllocator, NodeId};
use crate::domain::payload::{Operation, Payload};
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Node weight stored in the graph arena.
///
/// Adjacency lives in the arena edges, not here: an edge `a -> b` is one
/// arena entry, so `b` is a child of `a` exactly when `a` is a parent of `b`.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: NodeId,
    pub payload: Option<Box<dyn Payload>>,
}

impl NodeData {
    /// Plain node with a fresh id.
    pub fn new(ids: &mut IdAllocator) -> Self {
        Self {
            id: ids.allocate(),
            payload: None,
        }
    }

    pub fn with_payload(ids: &mut IdAllocator, payload: Box<dyn Payload>) -> Self {
        Self {
            id: ids.allocate(),
            payload: Some(payload),
        }
    }

    /// Node carrying an externally assigned id (rule input).
    pub fn with_id(id: NodeId) -> Self {
        Self { id, payload: None }
    }

    /// Same kind and payload under a fresh id.
    pub fn duplicate(&self, ids: &mut IdAllocator) -> Self {
        Self {
            id: ids.allocate(),
            payload: self.payload.clone(),
        }
    }

    pub fn kind(&self) -> &str {
        self.payload.as_deref().map(|p| p.kind()).unwrap_or("node")
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.payload
            .as_deref()
            .and_then(|p| p.as_any().downcast_ref::<Operation>())
    }
}

impl PartialEq for NodeData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeData {}

impl Hash for NodeData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Snapshot of a node's adjacency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbours {
    pub parents: BTreeSet<NodeIndex>,
    pub children: BTreeSet<NodeIndex>,
}

/// Serialized form of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub parents: Vec<NodeId>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

// Node-level adjacency operations. They live on `Graph` because the graph
// arena owns every edge.
impl Graph {
    pub fn children(&self, node: NodeIndex) -> BTreeSet<NodeIndex> {
        self.arena
            .neighbors_directed(node, Direction::Outgoing)
            .collect()
    }

    pub fn parents(&self, node: NodeIndex) -> BTreeSet<NodeIndex> {
        self.arena
            .neighbors_directed(node, Direction::Incoming)
            .collect()
    }

    pub fn neighbours(&self, node: NodeIndex) -> Neighbours {
        Neighbours {
            parents: self.parents(node),
            children: self.children(node),
        }
    }

    pub fn child_count(&self, node: NodeIndex) -> usize {
        self.children(node).len()
    }

    pub fn parent_count(&self, node: NodeIndex) -> usize {
        self.parents(node).len()
    }

    pub fn has_edge(&self, parent: NodeIndex, child: NodeIndex) -> bool {
        self.arena.find_edge(parent, child).is_some()
    }

    /// Add edge `node -> child`. Adding an existing edge is a no-op.
    pub fn add_child(&mut self, node: NodeIndex, child: NodeIndex) -> GraphResult<()> {
        self.ensure_node(node)?;
        self.ensure_node(child)?;
        self.arena.update_edge(node, child, ());
        Ok(())
    }

    /// Add edge `parent -> node`. Adding an existing edge is a no-op.
    pub fn add_parent(&mut self, node: NodeIndex, parent: NodeIndex) -> GraphResult<()> {
        self.add_child(parent, node)
    }

    /// Remove edge `node -> child`, failing if it does not exist.
    pub fn remove_child(&mut self, node: NodeIndex, child: NodeIndex) -> GraphResult<()> {
        self.ensure_node(node)?;
        self.ensure_node(child)?;
        match self.arena.find_edge(node, child) {
            Some(edge) => {
                self.arena.remove_edge(edge);
                Ok(())
            }
            None => Err(GraphError::MissingEdge {
                from: self.arena[node].id,
                to: self.arena[child].id,
            }),
        }
    }

    /// Remove edge `parent -> node`, failing if it does not exist.
    pub fn remove_parent(&mut self, node: NodeIndex, parent: NodeIndex) -> GraphResult<()> {
        self.remove_child(parent, node)
    }

    /// Disconnect `node` from all of its neighbours and return them.
    ///
    /// With `keep_self` the node stays in the arena, so its handle and payload
    /// remain valid while the caller rewires the returned neighbours. Without
    /// it the node is removed outright. Detaching never fails on a missing
    /// reciprocal edge; a node that is not in the arena yields no neighbours.
    pub fn detach(&mut self, node: NodeIndex, keep_self: bool) -> Neighbours {
        if !self.arena.contains_node(node) {
            return Neighbours::default();
        }
        let former = self.neighbours(node);
        if keep_self {
            let edges: Vec<_> = self
                .arena
                .edges_directed(node, Direction::Outgoing)
                .chain(self.arena.edges_directed(node, Direction::Incoming))
                .map(|e| e.id())
                .collect();
            for edge in edges {
                self.arena.remove_edge(edge);
            }
        } else {
            self.arena.remove_node(node);
        }
        former
    }

    pub(crate) fn ensure_node(&self, node: NodeIndex) -> GraphResult<()> {
        if self.arena.contains_node(node) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    pub(crate) fn record(&self, node: NodeIndex) -> NodeRecord {
        let data = &self.arena[node];
        NodeRecord {
            id: data.id,
            children: self.children(node).iter().map(|&c| self.arena[c].id).collect(),
            parents: self.parents(node).iter().map(|&p| self.arena[p].id).collect(),
            payload: data
                .payload
                .as_deref()
                .map(|p| p.fields())
                .unwrap_or_default(),
        }
    }
}
