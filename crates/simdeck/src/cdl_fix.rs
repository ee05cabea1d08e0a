//! `cdl-fix` command: prefix resolution on an existing CDL deck

use anyhow::{Context, Result};
use clap::Args;
use simdeck_core::resolve_prefixes;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `cdl-fix` command
#[derive(Args, Debug)]
pub struct CdlFixArgs {
    /// CDL deck to rewrite
    #[arg(value_name = "DECK", value_hint = clap::ValueHint::FilePath)]
    pub deck: PathBuf,

    /// Output file (prints to stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the `cdl-fix` command
pub fn execute(args: CdlFixArgs) -> Result<()> {
    let deck = fs::read_to_string(&args.deck)
        .with_context(|| format!("Failed to read deck: {}", args.deck.display()))?;
    let fixed = resolve_prefixes(&deck);

    match args.output {
        Some(path) => {
            fs::write(&path, &fixed)
                .with_context(|| format!("Failed to write deck: {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{fixed}"),
    }
    Ok(())
}
