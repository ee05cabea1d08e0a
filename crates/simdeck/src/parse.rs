//! `parse` command: convert an existing simulator output into a dataset

use anyhow::{Context, Result};
use clap::Args;
use simdeck_core::results::parse_file;
use simdeck_core::{AnalysisKind, Dataset, Dialect};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{load_config, write_dataset};

/// Arguments for the `parse` command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Raw file, `.prn` table, simulator log or Qucs dataset
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,

    /// Analysis whose results the file holds (op, dc, ac, tran, noise, sens, four, pz, hb)
    #[arg(short, long, value_name = "KIND")]
    pub analysis: AnalysisKind,

    /// Simulator that wrote the file
    #[arg(short, long)]
    pub dialect: Option<Dialect>,

    /// Prefix for vector names (defaults to the analysis name)
    #[arg(long)]
    pub prefix: Option<String>,

    /// TOML configuration file (raw byte order)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dataset output file (prints to stdout if omitted)
    #[arg(short, long, value_name = "DATASET")]
    pub output: Option<PathBuf>,

    /// Write the dataset as JSON instead of the text format
    #[arg(long)]
    pub json: bool,
}

/// Whether the file is already in the text dataset format
fn is_dataset(path: &Path) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(bytes.trim_ascii_start().starts_with(b"<Qucs Dataset"))
}

/// Execute the `parse` command
pub fn execute(args: ParseArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.dialect)?;

    let dataset = if config.dialect == Dialect::QucsatorNative || is_dataset(&args.file)? {
        Dataset::read(&args.file)
            .with_context(|| format!("Failed to read dataset: {}", args.file.display()))?
    } else {
        let plots = parse_file(&args.file, args.analysis, &config)
            .with_context(|| format!("Failed to parse {}", args.file.display()))?;
        let prefix = args
            .prefix
            .or(config.dataset_prefix)
            .unwrap_or_else(|| args.analysis.name().to_string());
        Dataset::from_plots(&plots, &prefix)
    };

    write_dataset(&dataset, args.output.as_deref(), args.json)
}
