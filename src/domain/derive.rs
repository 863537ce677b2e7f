//! Derived-graph generation: splitting every node of a graph, either in one
//! copy or exclusively across two copies.

use crate::domain::error::{GraphError, GraphResult};
use crate::domain::graph::{Graph, GraphCopy};
use crate::domain::ids::IdAllocator;
use crate::domain::reconstruction::NodeMapping;
use crate::domain::split::{SplitOptions, split_node};
use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, info};

/// Run configuration for derivations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveConfig {
    #[serde(default)]
    pub split: SplitOptions,
    /// Fixed RNG seed; `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DeriveConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Which derived graph a node position was split in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

/// What became of one original node in an exclusive derivation.
///
/// `left` holds the node(s) in graph A standing for `original`, `right`
/// those in graph B. On the split side that is the set of shadows, on the
/// other side the single untouched copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecord {
    pub original: NodeIndex,
    pub side: Side,
    pub left: BTreeSet<NodeIndex>,
    pub right: BTreeSet<NodeIndex>,
}

/// Two exclusively split copies of one graph
#[derive(Debug)]
pub struct Derivation {
    pub a: Graph,
    pub b: Graph,
    /// One record per original node, in the original's traversal order.
    pub splits: Vec<SplitRecord>,
}

impl Derivation {
    /// The true correspondence between A and B, in the form a
    /// reconstruction is expected to produce.
    pub fn ground_truth(&self) -> Vec<NodeMapping> {
        self.splits
            .iter()
            .map(|record| NodeMapping {
                left: record.left.clone(),
                right: record.right.clone(),
            })
            .collect()
    }

    pub fn split_count(&self, side: Side) -> usize {
        self.splits.iter().filter(|r| r.side == side).count()
    }
}

/// Clone `graph` and split every node of the copy exactly once.
///
/// The root is split first and a synthetic root is placed above its shadows.
/// The rest of the copy is then discovered outward from the shadows, each
/// node being split when first reached; shadows and the synthetic root are
/// never split again.
pub fn generate_subgraph<R: Rng + ?Sized>(
    graph: &Graph,
    options: &SplitOptions,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> GraphResult<Graph> {
    options.validate()?;
    let mut derived = graph.deep_clone(ids);

    let root = derived.root();
    let shadows = split_node(&mut derived, root, options, ids, rng)?;

    let mut settled: HashSet<NodeIndex> = shadows.iter().copied().collect();
    settled.insert(derived.root());
    let mut queue: VecDeque<NodeIndex> = shadows
        .iter()
        .flat_map(|&shadow| {
            let around = derived.neighbours(shadow);
            around.children.into_iter().chain(around.parents)
        })
        .filter(|node| !settled.contains(node))
        .collect();

    let mut split = 1;
    while let Some(node) = queue.pop_front() {
        if !settled.insert(node) {
            continue;
        }
        let around = derived.neighbours(node);
        settled.extend(split_node(&mut derived, node, options, ids, rng)?);
        split += 1;

        queue.extend(
            around
                .children
                .into_iter()
                .chain(around.parents)
                .filter(|next| !settled.contains(next)),
        );
    }

    debug!(split, nodes = derived.node_count(), "generated subgraph");
    Ok(derived)
}

/// Derive graphs A and B from `graph` so that every original node is split
/// in exactly one of them and left untouched in the other. A fair coin picks
/// the side per node. Both results are reindexed afterwards.
pub fn exclusive_subgraphs<R: Rng + ?Sized>(
    graph: &Graph,
    options: &SplitOptions,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> GraphResult<Derivation> {
    options.validate()?;
    let GraphCopy { graph: mut a, map: map_a } = graph.clone_map(true, ids);
    let GraphCopy { graph: mut b, map: map_b } = graph.clone_map(true, ids);

    let mut splits = Vec::new();
    for original in graph.traverse() {
        let in_a = *map_a.get(&original).ok_or(GraphError::UnknownNode(original))?;
        let in_b = *map_b.get(&original).ok_or(GraphError::UnknownNode(original))?;

        let record = if rng.gen_bool(0.5) {
            let shadows = split_node(&mut a, in_a, options, ids, rng)?;
            SplitRecord {
                original,
                side: Side::A,
                left: shadows.into_iter().collect(),
                right: BTreeSet::from([in_b]),
            }
        } else {
            let shadows = split_node(&mut b, in_b, options, ids, rng)?;
            SplitRecord {
                original,
                side: Side::B,
                left: BTreeSet::from([in_a]),
                right: shadows.into_iter().collect(),
            }
        };
        splits.push(record);
    }

    a.reindex(ids);
    b.reindex(ids);

    let derivation = Derivation { a, b, splits };
    info!(
        positions = derivation.splits.len(),
        split_in_a = derivation.split_count(Side::A),
        split_in_b = derivation.split_count(Side::B),
        "derived exclusive subgraphs"
    );
    Ok(derivation)
}
