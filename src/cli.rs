use crate::adapters::solver::PassthroughSolver;
use crate::app::engine::GraphEngine;
use crate::domain::derive::DeriveConfig;
use crate::domain::split::SplitOptions;
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sgtool",
    version,
    about = "Split, reverse, regularize and derive rooted directed graphs"
)]
pub struct Cli {
    /// Rules file: `{id, children}` records, a serialized graph, or a
    /// node-editor export
    pub rules: PathBuf,

    /// Seed for every random choice (split counts, coin flips)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Maximum number of shadows per split
    #[arg(long, default_value_t = 10, global = true)]
    pub max_splits: usize,

    /// Add random edges between the shadows of one split
    #[arg(long, global = true)]
    pub interconnect: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the graph summary and node records
    Show,
    /// Print the transposed graph
    Reverse,
    /// Print the graph with degree-1 chains contracted
    Regularize,
    /// Split every node once and print the derived graph
    Subgraph,
    /// Derive two exclusively split graphs
    Derive,
    /// Derive a pair and check the baseline reconstruction against the source
    Trial,
}

impl Cli {
    pub fn derive_config(&self) -> DeriveConfig {
        DeriveConfig {
            split: SplitOptions::new(self.max_splits).with_interconnect(self.interconnect),
            seed: self.seed,
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let mut engine = GraphEngine::load_from_path(&cli.rules, cli.derive_config())?;

    match cli.command {
        Command::Show => print_json(&engine.show()),
        Command::Reverse => print_json(&engine.reverse()),
        Command::Regularize => print_json(&engine.regularize()),
        Command::Subgraph => print_json(&engine.subgraph()?),
        Command::Derive => print_json(&engine.derive_report()?),
        Command::Trial => print_json(&engine.trial(&PassthroughSolver)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
