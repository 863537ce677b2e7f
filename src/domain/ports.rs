use crate::domain::graph::Graph;
use crate::domain::ids::IdAllocator;
use crate::domain::reconstruction::Reconstruction;
use crate::domain::rules::NodeRule;
use anyhow::Result;

/// Rule input port (implemented by Infrastructure)
pub trait RuleSource {
    fn load(&self) -> Result<Vec<NodeRule>>;
}

/// Reconstruction port, implemented by solver collaborators.
///
/// `a` and `b` are exclusive derivations of one ancestor graph. The engine
/// only guarantees exclusivity; how recoverable the ancestor is (notably
/// after interconnected splits) is the implementor's concern. Any node an
/// implementor creates takes its id from `ids`.
pub trait Reconstructor {
    fn name(&self) -> &str;

    fn reconstruct(&self, a: &Graph, b: &Graph, ids: &mut IdAllocator) -> Result<Reconstruction>;
}
