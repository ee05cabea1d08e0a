//! `netlist` command: translate a circuit graph into a deck

use anyhow::{Context, Result};
use clap::Args;
use simdeck_core::{
    emit_deck, CircuitGraph, Dialect, DirectoryLibrary, NoSubcircuits, Severity, SubcircuitLibrary,
};
use std::path::PathBuf;

use crate::{load_config, print_diagnostics};

/// Arguments for the `netlist` command
#[derive(Args, Debug)]
pub struct NetlistArgs {
    /// Circuit graph exported by the schematic editor (JSON)
    #[arg(value_name = "CIRCUIT", value_hint = clap::ValueHint::FilePath)]
    pub circuit: PathBuf,

    /// Target dialect (qucsator, ngspice, xyce, spiceopus, cdl, veriloga)
    #[arg(short, long)]
    pub dialect: Option<Dialect>,

    /// Output file (defaults to the circuit name with the dialect's extension)
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Print to stdout instead of writing to file
    #[arg(long)]
    pub stdout: bool,

    /// Directory holding referenced subcircuit definitions
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub subckt_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deck title (defaults to the schematic title)
    #[arg(long)]
    pub title: Option<String>,
}

/// Execute the `netlist` command
pub fn execute(args: NetlistArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), args.dialect)?;
    if let Some(title) = args.title {
        config.title = title;
    }

    let graph = CircuitGraph::parse(&args.circuit)
        .with_context(|| format!("Failed to read circuit: {}", args.circuit.display()))?;

    let library: Box<dyn SubcircuitLibrary> = match args.subckt_dir {
        Some(dir) => Box::new(DirectoryLibrary::new(dir)),
        None => Box::new(NoSubcircuits),
    };
    let deck = emit_deck(&graph, &config, library.as_ref());
    print_diagnostics(&deck.diagnostics);

    if args.stdout {
        print!("{deck}");
    } else {
        let output_path = args
            .output
            .unwrap_or_else(|| args.circuit.with_extension(config.dialect.extension()));
        deck.write_to(&output_path)
            .with_context(|| format!("Failed to write deck: {}", output_path.display()))?;
        eprintln!("Wrote {} deck {}", config.dialect, output_path.display());
    }

    if deck.diagnostics.has_errors() {
        let errors = deck
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        anyhow::bail!("deck has {errors} error(s); the affected components were left out");
    }
    Ok(())
}
