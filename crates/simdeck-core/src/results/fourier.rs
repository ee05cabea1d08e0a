//! Fourier analysis logs (`.FOUR`), as printed by ngspice and Xyce.
//!
//! ```text
//! Fourier analysis for v(out):
//!   No. Harmonics: 10, THD: 1.2345 %, Gridsize: 200, Interpolation Degree: 1
//!
//! Harmonic Frequency   Magnitude   Phase       Norm. Mag   Norm. Phase
//! -------- ---------   ---------   -----       ---------   -----------
//!  0       0           1.2e-3      0           0           0
//!  1       1000        1           -90         1           0
//! ```
//!
//! Harmonic rows are collected per output into plots over `fourierfreq`;
//! the THD figures are routed to a separate single-point plot.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use num_complex::Complex64;

use super::{parse_number, scalar_plot, Plot, SampleMatrix, Variable};
use crate::error::{Error, Result};

static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^fourier\s+analysis\s+for\s+(.+?):?\s*$").unwrap());

static THD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bTHD:\s*([-+0-9.eE]+)").unwrap());

/// Columns after the harmonic number
const COLUMNS: [&str; 5] = ["fourierfreq", "mag", "phase", "norm_mag", "norm_phase"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Between blocks
    Idle,
    /// Inside a block header, before the first harmonic row
    Header,
    /// Reading harmonic rows
    Rows,
}

#[derive(Debug)]
struct Block {
    output: String,
    thd: Option<f64>,
    rows: Vec<[f64; 5]>,
}

fn harmonic_row(line: &str) -> Option<[f64; 5]> {
    let fields: Vec<f64> = line
        .split_whitespace()
        .map(parse_number)
        .collect::<Option<_>>()?;
    if fields.len() != 6 {
        return None;
    }
    Some([fields[1], fields[2], fields[3], fields[4], fields[5]])
}

fn scan_blocks(text: &str, path: &Path) -> Result<Vec<Block>> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut phase = Phase::Idle;

    for line in text.lines().map(str::trim) {
        if let Some(caps) = BLOCK_START.captures(line) {
            blocks.push(Block {
                output: caps[1].trim().to_string(),
                thd: None,
                rows: Vec::new(),
            });
            phase = Phase::Header;
            continue;
        }
        let Some(block) = blocks.last_mut() else {
            continue;
        };

        match phase {
            Phase::Idle => {}
            Phase::Header => {
                if let Some(caps) = THD.captures(line) {
                    block.thd = parse_number(&caps[1]);
                } else if let Some(row) = harmonic_row(line) {
                    block.rows.push(row);
                    phase = Phase::Rows;
                }
            }
            Phase::Rows => match harmonic_row(line) {
                Some(row) => block.rows.push(row),
                None => phase = Phase::Idle,
            },
        }
    }

    if let Some(empty) = blocks.iter().find(|b| b.rows.is_empty()) {
        return Err(Error::result_format(
            path,
            format!("Fourier block for {} has no harmonics", empty.output),
        ));
    }
    Ok(blocks)
}

/// Parse every Fourier block in a simulator log
pub fn parse_fourier(text: &str, path: &Path) -> Result<Vec<Plot>> {
    let blocks = scan_blocks(text, path)?;
    let mut plots: Vec<Plot> = Vec::new();

    for block in &blocks {
        let frequencies: Vec<f64> = block.rows.iter().map(|r| r[0]).collect();
        let target = plots.iter_mut().find(|p| match &p.samples {
            SampleMatrix::Real(rows) => rows.iter().map(|r| r[0]).eq(frequencies.iter().copied()),
            SampleMatrix::Complex(_) => false,
        });

        let names = COLUMNS[1..]
            .iter()
            .map(|c| Variable::new(format!("{c}({})", block.output), ""));
        match target {
            Some(plot) => {
                plot.variables.extend(names);
                if let SampleMatrix::Real(rows) = &mut plot.samples {
                    for (row, harmonic) in rows.iter_mut().zip(&block.rows) {
                        row.extend_from_slice(&harmonic[1..]);
                    }
                }
            }
            None => {
                let mut variables = vec![Variable::new(COLUMNS[0], "frequency")];
                variables.extend(names);
                plots.push(Plot {
                    title: String::new(),
                    name: "Fourier analysis".to_string(),
                    variables,
                    samples: SampleMatrix::Real(block.rows.iter().map(|r| r.to_vec()).collect()),
                    has_axis: true,
                });
            }
        }
    }

    let thd: Vec<(String, Complex64)> = blocks
        .iter()
        .filter_map(|b| Some((format!("thd({})", b.output), Complex64::new(b.thd?, 0.0))))
        .collect();
    plots.extend(scalar_plot("Total harmonic distortion", thd));
    Ok(plots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Column;

    const LOG: &str = "\
Circuit: amp

Fourier analysis for v(out):
  No. Harmonics: 3, THD: 2.5 %, Gridsize: 200, Interpolation Degree: 1

Harmonic Frequency   Magnitude   Phase       Norm. Mag   Norm. Phase
-------- ---------   ---------   -----       ---------   -----------
 0       0           1.0e-3      0           1.0e-3      0
 1       1000        1           -90         1           0
 2       2000        0.025       45          0.025       135

Fourier analysis for v(in):
  No. Harmonics: 3, THD: 0 %, Gridsize: 200, Interpolation Degree: 1

Harmonic Frequency   Magnitude   Phase       Norm. Mag   Norm. Phase
 0       0           0           0           0           0
 1       1000        0.5         0           1           0
 2       2000        0           0           0           0
";

    #[test]
    fn test_blocks_share_one_axis() {
        let plots = parse_fourier(LOG, Path::new("amp.log")).unwrap();
        assert_eq!(plots.len(), 2);

        let spectrum = &plots[0];
        assert!(spectrum.has_axis);
        assert_eq!(spectrum.names()[0], "fourierfreq");
        assert_eq!(spectrum.variables.len(), 9);
        assert_eq!(spectrum.column("fourierfreq").unwrap().real(), vec![0.0, 1000.0, 2000.0]);
        assert_eq!(spectrum.column("phase(v(out))").unwrap().real(), vec![0.0, -90.0, 45.0]);
        assert_eq!(spectrum.column("mag(v(in))").unwrap().real(), vec![0.0, 0.5, 0.0]);

        let thd = &plots[1];
        assert!(!thd.has_axis);
        assert_eq!(thd.column("thd(v(out))"), Some(Column::Real(vec![2.5])));
        assert_eq!(thd.column("thd(v(in))"), Some(Column::Real(vec![0.0])));
    }

    #[test]
    fn test_no_blocks_and_empty_block() {
        assert!(parse_fourier("Circuit: amp\n", Path::new("a")).unwrap().is_empty());
        let err = parse_fourier("Fourier analysis for v(x):\nerror: no transient\n", Path::new("a"))
            .unwrap_err();
        assert!(matches!(err, Error::ResultFormat { .. }));
    }
}
