//! `simulate` command: build a deck, run the simulator, convert the results

use anyhow::{Context, Result};
use clap::Args;
use simdeck_core::{CircuitGraph, Dialect, DirectoryLibrary, NoSubcircuits, SubcircuitLibrary};
use std::path::PathBuf;

use crate::{load_config, print_diagnostics, write_dataset};

/// Arguments for the `simulate` command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Circuit graph exported by the schematic editor (JSON)
    #[arg(value_name = "CIRCUIT", value_hint = clap::ValueHint::FilePath)]
    pub circuit: PathBuf,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulator dialect (overrides the configuration)
    #[arg(short, long)]
    pub dialect: Option<Dialect>,

    /// Directory holding referenced subcircuit definitions
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub subckt_dir: Option<PathBuf>,

    /// Keep deck and simulator output in this directory
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Wall-clock limit in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Dataset output file (prints to stdout if omitted)
    #[arg(short, long, value_name = "DATASET")]
    pub output: Option<PathBuf>,

    /// Write the dataset as JSON instead of the text format
    #[arg(long)]
    pub json: bool,
}

/// Execute the `simulate` command
pub fn execute(args: SimulateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), args.dialect)?;
    if args.workdir.is_some() {
        config.workdir = args.workdir;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if !config.dialect.is_simulator() {
        anyhow::bail!("{} decks cannot be simulated", config.dialect);
    }

    let graph = CircuitGraph::parse(&args.circuit)
        .with_context(|| format!("Failed to read circuit: {}", args.circuit.display()))?;

    let library: Box<dyn SubcircuitLibrary> = match args.subckt_dir {
        Some(dir) => Box::new(DirectoryLibrary::new(dir)),
        None => Box::new(NoSubcircuits),
    };

    eprintln!("Simulating {} with {}", args.circuit.display(), config.dialect);
    let (deck, dataset) = simdeck_core::simulate(&graph, &config, library.as_ref())
        .with_context(|| format!("Simulation of {} failed", args.circuit.display()))?;
    print_diagnostics(&deck.diagnostics);
    log::info!(
        "{} deck lines, {} dataset vectors",
        deck.lines().count(),
        dataset.vectors.len()
    );

    write_dataset(&dataset, args.output.as_deref(), args.json)
}
