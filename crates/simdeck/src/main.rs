use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use simdeck_core::{Dataset, Dialect, Diagnostics, Severity, SimConfig};
use std::fs;
use std::path::Path;

mod cdl_fix;
mod netlist;
mod parse;
mod simulate;

#[derive(Parser)]
#[command(name = "simdeck")]
#[command(about = "Netlist generation and simulator driving for schematic circuits", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a circuit into a simulator deck
    Netlist(netlist::NetlistArgs),

    /// Build a deck, run the simulator and convert its results
    Simulate(simulate::SimulateArgs),

    /// Convert an existing simulator output file into a dataset
    Parse(parse::ParseArgs),

    /// Strip call prefixes from subcircuit instances of a CDL deck
    CdlFix(cdl_fix::CdlFixArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Simulate(args) => simulate::execute(args),
        Commands::Parse(args) => parse::execute(args),
        Commands::CdlFix(args) => cdl_fix::execute(args),
    }
}

/// Configuration file (or defaults) with command-line overrides applied
pub(crate) fn load_config(path: Option<&Path>, dialect: Option<Dialect>) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(dialect) = dialect {
        config.dialect = dialect;
    }
    Ok(config)
}

/// Print deck diagnostics on stderr
pub(crate) fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let level = match diagnostic.severity {
            Severity::Warning => "warning".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        match &diagnostic.component {
            Some(component) => eprintln!("{level}: {}: {}", component.bold(), diagnostic.message),
            None => eprintln!("{level}: {}", diagnostic.message),
        }
    }
}

/// Write a dataset as text or JSON, to a file or stdout
pub(crate) fn write_dataset(dataset: &Dataset, output: Option<&Path>, json: bool) -> Result<()> {
    let text = if json {
        dataset.to_json()?
    } else {
        dataset.to_text()
    };
    match output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write dataset: {}", path.display()))?;
            eprintln!(
                "Wrote {} vectors to {}",
                dataset.vectors.len(),
                path.display()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}
