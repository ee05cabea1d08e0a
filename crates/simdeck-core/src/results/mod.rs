//! Simulator output decoding.
//!
//! Every parser produces [`Plot`]s: a list of variables and a matrix with
//! one row per point. Raw files and `.prn` tables carry waveforms; Fourier,
//! noise, sensitivity and pole-zero results are scraped from text logs.

mod fourier;
mod noise;
mod pz;
mod prn;
mod raw;
mod sens;

pub use fourier::parse_fourier;
pub use noise::parse_noise;
pub use prn::parse_prn;
pub use pz::parse_pole_zero;
pub use raw::{parse_raw, read_raw};
pub use sens::parse_sensitivity;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use num_complex::Complex64;

use crate::config::{Dialect, SimConfig};
use crate::error::{Error, Result};
use crate::launch::SimulationRun;
use crate::parser::CircuitGraph;

/// Analyses whose results can be read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Op,
    Dc,
    Ac,
    Tran,
    Noise,
    Sens,
    Fourier,
    PoleZero,
    HarmonicBalance,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 9] = [
        AnalysisKind::Op,
        AnalysisKind::Dc,
        AnalysisKind::Ac,
        AnalysisKind::Tran,
        AnalysisKind::Noise,
        AnalysisKind::Sens,
        AnalysisKind::Fourier,
        AnalysisKind::PoleZero,
        AnalysisKind::HarmonicBalance,
    ];

    /// Short name, also the default dataset prefix
    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::Op => "op",
            AnalysisKind::Dc => "dc",
            AnalysisKind::Ac => "ac",
            AnalysisKind::Tran => "tran",
            AnalysisKind::Noise => "noise",
            AnalysisKind::Sens => "sens",
            AnalysisKind::Fourier => "four",
            AnalysisKind::PoleZero => "pz",
            AnalysisKind::HarmonicBalance => "hb",
        }
    }

    /// The analysis a schematic directive requests
    pub fn from_directive(model: &str) -> Option<Self> {
        Some(match model {
            ".DC" => AnalysisKind::Op,
            ".AC" => AnalysisKind::Ac,
            ".TR" => AnalysisKind::Tran,
            ".NOISE" => AnalysisKind::Noise,
            ".SENS" => AnalysisKind::Sens,
            ".FOUR" => AnalysisKind::Fourier,
            ".PZ" => AnalysisKind::PoleZero,
            ".HB" => AnalysisKind::HarmonicBalance,
            _ => return None,
        })
    }

    /// Whether a raw-file plot name belongs to this analysis
    pub fn matches_plot(self, plot_name: &str) -> bool {
        let name = plot_name.to_ascii_lowercase();
        match self {
            AnalysisKind::Op => name.contains("operating point"),
            AnalysisKind::Dc => name.starts_with("dc"),
            AnalysisKind::Ac => name.starts_with("ac"),
            AnalysisKind::Tran => name.contains("transient"),
            AnalysisKind::Noise => name.contains("noise"),
            _ => true,
        }
    }

    /// Analyses requested by the directives of a circuit, in schematic order
    pub fn requested(graph: &CircuitGraph) -> Vec<Self> {
        graph
            .components
            .iter()
            .filter_map(|c| Self::from_directive(&c.model))
            .unique()
            .collect()
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        AnalysisKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .or(match lower.as_str() {
                "tr" | "transient" => Some(AnalysisKind::Tran),
                "fourier" => Some(AnalysisKind::Fourier),
                "sensitivity" => Some(AnalysisKind::Sens),
                _ => None,
            })
            .ok_or_else(|| format!("unknown analysis '{s}'"))
    }
}

/// One variable of a plot, as declared by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Declared type ("time", "frequency", "voltage", …); may be empty
    pub kind: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Samples, one row per point and one column per variable
#[derive(Debug, Clone, PartialEq)]
pub enum SampleMatrix {
    Real(Vec<Vec<f64>>),
    Complex(Vec<Vec<Complex64>>),
}

/// One column of a [`SampleMatrix`]
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Real(v) => v.len(),
            Column::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real parts
    pub fn real(&self) -> Vec<f64> {
        match self {
            Column::Real(v) => v.clone(),
            Column::Complex(v) => v.iter().map(|c| c.re).collect(),
        }
    }
}

impl SampleMatrix {
    pub fn is_complex(&self) -> bool {
        matches!(self, SampleMatrix::Complex(_))
    }

    pub fn points(&self) -> usize {
        match self {
            SampleMatrix::Real(rows) => rows.len(),
            SampleMatrix::Complex(rows) => rows.len(),
        }
    }

    pub fn column(&self, index: usize) -> Column {
        match self {
            SampleMatrix::Real(rows) => {
                Column::Real(rows.iter().map(|r| r.get(index).copied().unwrap_or(0.0)).collect())
            }
            SampleMatrix::Complex(rows) => Column::Complex(
                rows.iter()
                    .map(|r| r.get(index).copied().unwrap_or_default())
                    .collect(),
            ),
        }
    }
}

/// One block of results: a set of variables sampled over the same points
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub title: String,
    /// Analysis description, e.g. "AC Analysis"
    pub name: String,
    pub variables: Vec<Variable>,
    pub samples: SampleMatrix,
    /// Whether the first variable is the independent axis; otherwise every
    /// variable is a single-point result
    pub has_axis: bool,
}

impl Plot {
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn is_complex(&self) -> bool {
        self.samples.is_complex()
    }

    pub fn points(&self) -> usize {
        self.samples.points()
    }

    pub fn column(&self, name: &str) -> Option<Column> {
        let index = self.variables.iter().position(|v| v.name == name)?;
        Some(self.samples.column(index))
    }

    /// Same variables and axis; such plots are steps of one sweep
    pub fn same_layout(&self, other: &Plot) -> bool {
        self.has_axis == other.has_axis
            && self.points() == other.points()
            && self.names() == other.names()
    }
}

/// Axis variables carry these declared types
pub(crate) fn is_axis_type(kind: &str) -> bool {
    matches!(kind.to_ascii_lowercase().as_str(), "time" | "frequency" | "freq")
}

/// Parse a result file.
///
/// Raw files and `.prn` tables are recognized by their content; anything
/// else is read as a text log for the log-format analyses.
pub fn parse_file(path: &Path, kind: AnalysisKind, config: &SimConfig) -> Result<Vec<Plot>> {
    let bytes = fs::read(path)?;
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).into_owned();
    let first = head.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim_start();

    if first.starts_with("Title:") || first.starts_with("Plotname:") {
        return parse_raw(&bytes, config.byte_order, path);
    }
    let text = String::from_utf8_lossy(&bytes);
    if first.starts_with("Index") {
        return parse_prn(&text, kind.name(), path);
    }
    parse_log(&text, kind, path)
}

fn parse_log(text: &str, kind: AnalysisKind, path: &Path) -> Result<Vec<Plot>> {
    let plots = match kind {
        AnalysisKind::Fourier => parse_fourier(text, path)?,
        AnalysisKind::Sens => parse_sensitivity(text),
        AnalysisKind::PoleZero => parse_pole_zero(text, path)?,
        AnalysisKind::Noise => parse_noise(text),
        other => {
            return Err(Error::UnsupportedAnalysis(format!(
                "{other} results are not written to the log"
            )))
        }
    };
    if plots.is_empty() {
        return Err(Error::result_format(path, format!("no {kind} results found")));
    }
    Ok(plots)
}

/// Decode the results of a finished run.
///
/// Log-format analyses come from the captured output (or Xyce's companion
/// files), waveforms from the raw file.
pub fn parse_run(run: &SimulationRun, kind: AnalysisKind, config: &SimConfig) -> Result<Vec<Plot>> {
    log::info!("reading {kind} results of {} run", run.dialect);
    let xyce = run.dialect == Dialect::Xyce;
    let companion = |suffixes: &[&str]| {
        if xyce {
            suffixes.iter().find_map(|s| run.companion(s))
        } else {
            None
        }
    };

    match (run.dialect, kind) {
        (Dialect::QucsatorNative, _) => Err(Error::UnsupportedAnalysis(
            "qucsator writes a dataset; read it with Dataset::read".to_string(),
        )),
        (_, AnalysisKind::Fourier) => match companion(&[".four0", ".four"]) {
            Some(path) => parse_file(&path, kind, config),
            None => parse_log(&run.log, kind, &run.deck),
        },
        (_, AnalysisKind::Sens) => match companion(&[".SENS.prn"]) {
            Some(path) => parse_file(&path, kind, config),
            None => parse_log(&run.log, kind, &run.deck),
        },
        (_, AnalysisKind::PoleZero) => parse_log(&run.log, kind, &run.deck),
        (_, AnalysisKind::Noise) if xyce => match companion(&[".NOISE.prn"]) {
            Some(path) => parse_file(&path, kind, config),
            None => Err(Error::result_format(&run.workdir, "Xyce wrote no noise table")),
        },
        (_, AnalysisKind::HarmonicBalance) => match companion(&[".HB.FD.prn"]) {
            Some(path) => parse_file(&path, kind, config),
            None => Err(Error::UnsupportedAnalysis(format!(
                "harmonic balance results from {}",
                run.dialect
            ))),
        },
        _ => {
            let raw = run
                .raw
                .as_deref()
                .ok_or_else(|| Error::result_format(&run.workdir, "simulator wrote no raw file"))?;
            let mut plots: Vec<Plot> = read_raw(raw, config.byte_order)?
                .into_iter()
                .filter(|p| kind.matches_plot(&p.name))
                .collect();
            if plots.is_empty() {
                return Err(Error::result_format(raw, format!("no {kind} plot in raw file")));
            }
            // ngspice prints integrated noise totals instead of writing them
            if kind == AnalysisKind::Noise {
                plots.extend(parse_noise(&run.log));
            }
            Ok(plots)
        }
    }
}

/// Parse a real number, tolerating Fortran-style `D` exponents
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .or_else(|| text.replace(['D', 'd'], "e").parse().ok())
}

/// Build a single-row plot of named scalar results
pub(crate) fn scalar_plot(name: &str, values: Vec<(String, Complex64)>) -> Option<Plot> {
    if values.is_empty() {
        return None;
    }
    let complex = values.iter().any(|(_, v)| v.im != 0.0);
    let variables = values.iter().map(|(n, _)| Variable::new(n.clone(), "")).collect();
    let samples = if complex {
        SampleMatrix::Complex(vec![values.iter().map(|(_, v)| *v).collect()])
    } else {
        SampleMatrix::Real(vec![values.iter().map(|(_, v)| v.re).collect()])
    };
    Some(Plot {
        title: String::new(),
        name: name.to_string(),
        variables,
        samples,
        has_axis: false,
    })
}
