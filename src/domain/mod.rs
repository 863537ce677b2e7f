pub mod derive;
pub mod error;
pub mod graph;
pub mod ids;
pub mod node;
pub mod payload;
pub mod ports;
pub mod reconstruction;
pub mod rules;
pub mod split;
