//! Reconstruction collaborators.

pub mod passthrough;

pub use passthrough::PassthroughSolver;
