use crate::domain::error::{GraphError, GraphResult};
use crate::domain::graph::Graph;
use crate::domain::ids::IdAllocator;
use petgraph::stable_graph::NodeIndex;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Split parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOptions {
    /// Upper bound (inclusive) of the number of shadows per split.
    pub max_splits: usize,
    /// Wire random edges between the shadows of one split.
    #[serde(default)]
    pub allow_interconnect: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SplitOptions {
    pub fn new(max_splits: usize) -> Self {
        Self {
            max_splits,
            allow_interconnect: false,
        }
    }

    pub fn with_interconnect(mut self, allow_interconnect: bool) -> Self {
        self.allow_interconnect = allow_interconnect;
        self
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.max_splits == 0 {
            return Err(GraphError::InvalidSplitCount);
        }
        Ok(())
    }
}

/// Replace `node` with `k` shadow nodes, `k` uniform in `1..=max_splits`.
///
/// Every shadow gets every former parent and every former child of `node`
/// (a self-loop on `node` is dropped along with it), plus a copy of its
/// payload. With interconnect enabled each shadow additionally points at a
/// random subset of the other shadows. `node` is then removed.
///
/// If `node` was the root, a fresh plain root is created with the shadows as
/// its children, so the graph stays single-rooted.
pub fn split_node<R: Rng + ?Sized>(
    graph: &mut Graph,
    node: NodeIndex,
    options: &SplitOptions,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> GraphResult<Vec<NodeIndex>> {
    options.validate()?;
    graph.ensure_node(node)?;

    let count = rng.gen_range(1..=options.max_splits);
    let template = graph.arena[node].clone();
    let former = graph.neighbours(node);

    let shadows: Vec<NodeIndex> = (0..count)
        .map(|_| graph.add_node(template.duplicate(ids)))
        .collect();

    for &shadow in &shadows {
        if options.allow_interconnect {
            let others: Vec<NodeIndex> = shadows.iter().copied().filter(|&s| s != shadow).collect();
            let amount = rng.gen_range(0..count);
            for &other in others.choose_multiple(rng, amount) {
                graph.add_child(shadow, other)?;
            }
        }

        for &parent in former.parents.iter().filter(|&&p| p != node) {
            graph.add_child(parent, shadow)?;
        }
        for &child in former.children.iter().filter(|&&c| c != node) {
            graph.add_child(shadow, child)?;
        }
    }

    let was_root = graph.root == node;
    if was_root {
        let root = graph.create_node(ids);
        for &shadow in &shadows {
            graph.add_child(root, shadow)?;
        }
        graph.root = root;
    }
    graph.detach(node, false);

    trace!(shadows = count, was_root, "split node");
    Ok(shadows)
}
