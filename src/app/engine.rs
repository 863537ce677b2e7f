use crate::adapters::fs::reader::FileRuleSource;
use crate::app::dto::*;
use crate::domain::derive::{Derivation, DeriveConfig, Side, exclusive_subgraphs, generate_subgraph};
use crate::domain::graph::Graph;
use crate::domain::ids::{IdAllocator, NodeId};
use crate::domain::ports::{Reconstructor, RuleSource};
use crate::domain::reconstruction::{Reconstruction, matching_mappings};
use crate::domain::rules::NodeRule;
use anyhow::{Context as _, Result};
use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Owns a source graph together with the id allocator and random source
/// every derivation draws from.
pub struct GraphEngine {
    graph: Graph,
    ids: IdAllocator,
    rng: StdRng,
    config: DeriveConfig,
}

impl GraphEngine {
    /// Construct an engine from an already-built graph.
    ///
    /// `ids` must be the allocator the graph was built with, so later
    /// derivations never reuse one of its ids.
    pub fn from_graph(graph: Graph, ids: IdAllocator, config: DeriveConfig) -> Self {
        let rng = config.rng();
        Self {
            graph,
            ids,
            rng,
            config,
        }
    }

    pub fn from_rules(rules: &[NodeRule], config: DeriveConfig) -> Result<Self> {
        let mut ids = IdAllocator::new();
        let graph = Graph::from_rules(rules, &mut ids).context("Failed to build graph from rules")?;
        Ok(Self::from_graph(graph, ids, config))
    }

    pub fn load(source: &dyn RuleSource, config: DeriveConfig) -> Result<Self> {
        let rules = source.load()?;
        Self::from_rules(&rules, config)
    }

    pub fn load_from_path(path: &Path, config: DeriveConfig) -> Result<Self> {
        let engine = Self::load(&FileRuleSource::new(path), config)?;
        info!(
            path = %path.display(),
            nodes = engine.graph.node_count(),
            edges = engine.graph.edge_count(),
            "loaded graph"
        );
        Ok(engine)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn summary(&self) -> GraphSummary {
        summarize(&self.graph)
    }

    pub fn show(&self) -> GraphResponse {
        respond(&self.graph)
    }

    pub fn reverse(&mut self) -> GraphResponse {
        respond(&self.graph.reverse(&mut self.ids))
    }

    pub fn regularize(&mut self) -> GraphResponse {
        respond(&self.graph.regularize(&mut self.ids))
    }

    /// Single derivation of the source graph.
    pub fn subgraph(&mut self) -> Result<GraphResponse> {
        let derived = generate_subgraph(&self.graph, &self.config.split, &mut self.ids, &mut self.rng)
            .context("Failed to generate subgraph")?;
        Ok(respond(&derived))
    }

    /// Exclusive pair of derived graphs.
    pub fn derive(&mut self) -> Result<Derivation> {
        exclusive_subgraphs(&self.graph, &self.config.split, &mut self.ids, &mut self.rng)
            .context("Failed to derive exclusive subgraphs")
    }

    pub fn derive_report(&mut self) -> Result<DerivationReport> {
        let derivation = self.derive()?;
        let splits = derivation
            .splits
            .iter()
            .map(|record| SplitRecordDto {
                original: id_of(&self.graph, record.original),
                side: record.side,
                left: ids_of(&derivation.a, &record.left),
                right: ids_of(&derivation.b, &record.right),
            })
            .collect();

        Ok(DerivationReport {
            seed: self.config.seed,
            max_splits: self.config.split.max_splits,
            allow_interconnect: self.config.split.allow_interconnect,
            original: self.summary(),
            a: respond(&derivation.a),
            b: respond(&derivation.b),
            splits,
        })
    }

    /// Derive a pair, hand it to `solver` and score the answer: a rebuilt
    /// graph is compared structurally with the source graph, mappings are
    /// checked against the derivation's ground truth.
    pub fn trial(&mut self, solver: &dyn Reconstructor) -> Result<TrialReport> {
        let derivation = self.derive()?;
        let truth = derivation.ground_truth();
        let answer = solver
            .reconstruct(&derivation.a, &derivation.b, &mut self.ids)
            .with_context(|| format!("Solver {} failed", solver.name()))?;

        let (matches_original, correct_mappings) = match &answer {
            Reconstruction::Graph(graph) => (Some(self.graph.structural_equals(graph)), None),
            Reconstruction::Mappings(mappings) => (None, Some(matching_mappings(mappings, &truth))),
        };

        let report = TrialReport {
            solver: solver.name().to_string(),
            reconstruction: answer.kind().to_string(),
            matches_original,
            correct_mappings,
            expected_mappings: truth.len(),
            split_in_a: derivation.split_count(Side::A),
            split_in_b: derivation.split_count(Side::B),
        };
        info!(solver = %report.solver, ?matches_original, ?correct_mappings, "trial finished");
        Ok(report)
    }
}

fn summarize(graph: &Graph) -> GraphSummary {
    GraphSummary {
        root: id_of(graph, graph.root()),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        leaf_count: graph.leaves().len(),
        source_count: graph.sources().len(),
    }
}

fn respond(graph: &Graph) -> GraphResponse {
    GraphResponse {
        summary: summarize(graph),
        nodes: graph.records(),
    }
}

fn id_of(graph: &Graph, node: NodeIndex) -> NodeId {
    graph.arena[node].id
}

fn ids_of(graph: &Graph, nodes: &BTreeSet<NodeIndex>) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = nodes.iter().map(|&node| id_of(graph, node)).collect();
    ids.sort_unstable();
    ids
}
