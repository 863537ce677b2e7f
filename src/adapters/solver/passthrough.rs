use crate::domain::graph::Graph;
use crate::domain::ids::IdAllocator;
use crate::domain::ports::Reconstructor;
use crate::domain::reconstruction::Reconstruction;
use anyhow::Result;

/// Baseline reconstruction: answers with a copy of graph A.
///
/// Exists to exercise the reconstruction port end to end; it only recovers
/// the ancestor when nothing ended up split in A.
#[derive(Debug, Default)]
pub struct PassthroughSolver;

impl Reconstructor for PassthroughSolver {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn reconstruct(&self, a: &Graph, _b: &Graph, ids: &mut IdAllocator) -> Result<Reconstruction> {
        Ok(Reconstruction::Graph(a.deep_clone(ids)))
    }
}
