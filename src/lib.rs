//! shadow-graph library: rooted directed graphs, node splitting and
//! exclusive derived-graph generation.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
