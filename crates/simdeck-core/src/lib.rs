//! Netlist translation and simulation-result parsing
//!
//! Translates a schematic circuit graph into decks for Qucsator, ngspice,
//! Xyce, SpiceOpus, CDL and Verilog-A, runs the simulators and converts
//! their output into a dialect-neutral dataset.

pub mod cdl;
pub mod config;
pub mod dataset;
pub mod emit;
pub mod equation;
pub mod error;
pub mod launch;
pub mod mapping;
pub mod parser;
pub mod results;

pub use cdl::{resolve_prefixes, PrefixResolver};
pub use config::{ByteOrder, Dialect, RawFormat, SimConfig};
pub use dataset::{DataVector, Dataset, Values};
pub use emit::{emit_deck, Diagnostic, Diagnostics, NetlistDeck, ParamSweep, Severity};
pub use error::{Error, Result};
pub use launch::{Launcher, SimulationRun};
pub use parser::{CircuitGraph, Component, DirectoryLibrary, NoSubcircuits, SubcircuitLibrary};
pub use results::{AnalysisKind, Plot};

/// Emit a deck for `graph`, run the configured simulator on it and collect
/// the results of every analysis the circuit requests
pub fn simulate(
    graph: &CircuitGraph,
    config: &SimConfig,
    library: &dyn SubcircuitLibrary,
) -> Result<(NetlistDeck, Dataset)> {
    let deck = emit_deck(graph, config, library);
    let run = Launcher::new(config).run(&deck)?;
    let analyses = AnalysisKind::requested(graph);
    if analyses.is_empty() {
        log::warn!("'{}' requests no analysis", graph.title);
    }
    let sweep = ParamSweep::from_graph(graph);
    let dataset = Dataset::from_run(&run, &analyses, sweep.as_ref(), config)?;
    Ok((deck, dataset))
}
