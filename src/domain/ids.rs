use crate::domain::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Monotonic node id source.
///
/// Every operation that creates nodes or reassigns ids takes the allocator
/// explicitly, so independent graphs (and independent tests) never share an
/// id space by accident. Ids handed out by one allocator are never reused
/// for its lifetime.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id is `next`.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// `u64::MAX` is never handed out.
    ///
    /// # Panics
    ///
    /// Panics once every other `u64` id has been handed out.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next = self.next.checked_add(1).expect("node id space exhausted");
        id
    }

    /// Mark an externally supplied id as taken so later allocations skip it.
    ///
    /// Fails for `u64::MAX`, which would leave no id to allocate after it.
    pub fn reserve(&mut self, id: NodeId) -> GraphResult<()> {
        if id.0 >= self.next {
            self.next = id.0.checked_add(1).ok_or(GraphError::IdSpaceExhausted(id.0))?;
        }
        Ok(())
    }

    /// The id the next call to [`IdAllocator::allocate`] returns.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}
