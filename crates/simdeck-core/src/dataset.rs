//! Dialect-neutral dataset of named vectors, and its Qucs text form.
//!
//! ```text
//! <Qucs Dataset 0.0.19>
//! <indep ac.frequency 2>
//!   +1.00000000000e3
//!   +1.00000000000e4
//! </indep>
//! <dep ac.v(out) ac.frequency>
//!   +9.00000000000e-1-j1.00000000000e-1
//!   +5.00000000000e-1-j5.00000000000e-1
//! </dep>
//! ```

use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use num_complex::Complex64;
use serde::Serialize;

use crate::config::{Dialect, SimConfig};
use crate::emit::ParamSweep;
use crate::error::{Error, Result};
use crate::launch::SimulationRun;
use crate::results::{parse_run, AnalysisKind, Column, Plot};

const HEADER: &str = "<Qucs Dataset 0.0.19>";

/// Vector samples
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Values {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Real(v) => v.len(),
            Values::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Values::Complex(_))
    }

    fn into_complex(self) -> Vec<Complex64> {
        match self {
            Values::Real(v) => v.into_iter().map(|re| Complex64::new(re, 0.0)).collect(),
            Values::Complex(v) => v,
        }
    }

    /// Append samples; mixing real and complex steps yields complex values
    fn append(self, other: Values) -> Values {
        match (self, other) {
            (Values::Real(mut a), Values::Real(b)) => {
                a.extend(b);
                Values::Real(a)
            }
            (a, b) => {
                let mut merged = a.into_complex();
                merged.extend(b.into_complex());
                Values::Complex(merged)
            }
        }
    }
}

impl From<Column> for Values {
    fn from(column: Column) -> Self {
        match column {
            Column::Real(v) => Values::Real(v),
            Column::Complex(v) => Values::Complex(v),
        }
    }
}

/// A named vector; dependent vectors list the independent vectors they are
/// sampled over, innermost first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataVector {
    pub name: String,
    pub dependencies: Vec<String>,
    pub values: Values,
}

impl DataVector {
    pub fn is_independent(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Ordered set of named vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub vectors: Vec<DataVector>,
}

/// Canonical dataset key of a simulator variable name.
///
/// Names are lower-cased; ngspice branch currents `v1#branch` become
/// `i(v1)`; a non-empty prefix is joined with a dot.
pub fn canonical_name(raw: &str, prefix: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let name = match lower.strip_suffix("#branch") {
        Some(element) => format!("i({element})"),
        None => lower,
    };
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}.{name}")
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&DataVector> {
        self.vectors.iter().find(|v| v.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.vectors.iter().map(|v| v.name.as_str()).collect()
    }

    /// Add a vector; a name that is already present keeps its first vector
    pub fn push(&mut self, vector: DataVector) -> bool {
        if self.get(&vector.name).is_some() {
            log::warn!("duplicate dataset vector '{}', keeping the first", vector.name);
            return false;
        }
        self.vectors.push(vector);
        true
    }

    /// Merge another dataset; duplicates keep the vectors already present
    pub fn extend(&mut self, other: Dataset) {
        for vector in other.vectors {
            self.push(vector);
        }
    }

    /// Convert parsed plots.
    ///
    /// Consecutive plots with the same layout are steps of a parametric
    /// sweep and are stacked along an outer `step` axis.
    pub fn from_plots(plots: &[Plot], prefix: &str) -> Self {
        Self::from_swept_plots(plots, prefix, None)
    }

    /// Like [`Dataset::from_plots`], naming the outer axis after `sweep`.
    ///
    /// The axis carries the swept parameter values when their count matches
    /// the number of stacked steps; otherwise it falls back to `step` 1..N.
    pub fn from_swept_plots(plots: &[Plot], prefix: &str, sweep: Option<&ParamSweep>) -> Self {
        let mut dataset = Dataset::new();
        let mut start = 0;
        while start < plots.len() {
            let first = &plots[start];
            let steps = plots[start..]
                .iter()
                .take_while(|p| p.same_layout(first))
                .count();
            dataset.add_group(&plots[start..start + steps], prefix, sweep);
            start += steps;
        }
        dataset
    }

    fn add_group(&mut self, group: &[Plot], prefix: &str, sweep: Option<&ParamSweep>) {
        let first = &group[0];
        let key = |name: &str| canonical_name(name, prefix);
        let mut axes = Vec::new();

        if first.has_axis {
            if let Some(axis) = first.variables.first() {
                let name = key(&axis.name);
                // A complex axis (ngspice AC frequency) keeps its real part
                let values = Values::Real(first.samples.column(0).real());
                self.push(DataVector {
                    name: name.clone(),
                    dependencies: Vec::new(),
                    values,
                });
                axes.push(name);
            }
        }
        if group.len() > 1 {
            let (name, values) = match sweep.filter(|s| s.values.len() == group.len()) {
                Some(sweep) => (key(&sweep.param), sweep.values.clone()),
                None => {
                    if let Some(sweep) = sweep {
                        log::warn!(
                            "{} steps stacked but sweep of {} has {} values",
                            group.len(),
                            sweep.param,
                            sweep.values.len()
                        );
                    }
                    (key("step"), (1..=group.len()).map(|s| s as f64).collect())
                }
            };
            self.push(DataVector {
                name: name.clone(),
                dependencies: Vec::new(),
                values: Values::Real(values),
            });
            axes.push(name);
        }

        let skip = usize::from(first.has_axis);
        for (index, variable) in first.variables.iter().enumerate().skip(skip) {
            let Some(values) = group
                .iter()
                .map(|plot| Values::from(plot.samples.column(index)))
                .reduce(Values::append)
            else {
                continue;
            };
            self.push(DataVector {
                name: key(&variable.name),
                dependencies: axes.clone(),
                values,
            });
        }
    }

    /// Collect the results of a finished run.
    ///
    /// Each analysis is prefixed with its own short name, behind the
    /// configured dataset prefix when one is set (`run1.ac`). Stacked steps
    /// of a parametric sweep are indexed by `sweep` values. Qucsator writes
    /// the dataset itself.
    pub fn from_run(
        run: &SimulationRun,
        analyses: &[AnalysisKind],
        sweep: Option<&ParamSweep>,
        config: &SimConfig,
    ) -> Result<Self> {
        if run.dialect == Dialect::QucsatorNative {
            let path = run
                .dataset
                .as_deref()
                .ok_or_else(|| Error::result_format(&run.workdir, "qucsator wrote no dataset"))?;
            return Self::read(path);
        }

        let mut dataset = Dataset::new();
        for &kind in analyses {
            let plots = parse_run(run, kind, config)?;
            let prefix = match config.dataset_prefix.as_deref() {
                Some(configured) => format!("{configured}.{}", kind.name()),
                None => kind.name().to_string(),
            };
            dataset.extend(Self::from_swept_plots(&plots, &prefix, sweep));
        }
        Ok(dataset)
    }

    /// Check that every dependent vector has one sample per point of its axes
    pub fn validate(&self) -> std::result::Result<(), String> {
        let lengths: HashMap<&str, usize> = self
            .vectors
            .iter()
            .filter(|v| v.is_independent())
            .map(|v| (v.name.as_str(), v.values.len()))
            .collect();
        for vector in self.vectors.iter().filter(|v| !v.is_independent()) {
            let mut expected = 1;
            for dep in &vector.dependencies {
                expected *= lengths
                    .get(dep.as_str())
                    .ok_or_else(|| format!("{} depends on unknown '{dep}'", vector.name))?;
            }
            if vector.values.len() != expected {
                return Err(format!(
                    "{} has {} values, its axes span {expected}",
                    vector.name,
                    vector.values.len()
                ));
            }
        }
        Ok(())
    }

    /// The Qucs text dataset
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        writeln!(out, "{HEADER}").unwrap();
        for vector in &self.vectors {
            if vector.is_independent() {
                writeln!(out, "<indep {} {}>", vector.name, vector.values.len()).unwrap();
            } else {
                writeln!(out, "<dep {} {}>", vector.name, vector.dependencies.join(" ")).unwrap();
            }
            match &vector.values {
                Values::Real(values) => {
                    for v in values {
                        writeln!(out, "  {}", format_real(*v)).unwrap();
                    }
                }
                Values::Complex(values) => {
                    for v in values {
                        writeln!(out, "  {}", format_complex(*v)).unwrap();
                    }
                }
            }
            let close = if vector.is_independent() { "</indep>" } else { "</dep>" };
            writeln!(out, "{close}").unwrap();
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a Qucs text dataset, such as the one qucsator writes
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_text(&text, path)
    }

    pub fn parse_text(text: &str, path: &Path) -> Result<Self> {
        let err = |reason: String| Error::result_format(path, reason);
        let mut dataset = Dataset::new();
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        match lines.next() {
            Some(first) if first.starts_with("<Qucs Dataset") => {}
            _ => return Err(err("missing '<Qucs Dataset' header".to_string())),
        }

        while let Some(line) = lines.next() {
            let tag = line
                .strip_prefix('<')
                .and_then(|l| l.strip_suffix('>'))
                .ok_or_else(|| err(format!("expected a vector tag, found '{line}'")))?;
            let mut fields = tag.split_whitespace();
            let kind = fields.next().unwrap_or("");
            let name = fields
                .next()
                .ok_or_else(|| err(format!("unnamed vector '{line}'")))?
                .to_string();
            let rest: Vec<String> = fields.map(str::to_string).collect();
            let (close, dependencies) = match kind {
                "indep" => ("</indep>", Vec::new()),
                "dep" => ("</dep>", rest.clone()),
                other => return Err(err(format!("unknown vector kind '{other}'"))),
            };

            let mut samples = Vec::new();
            loop {
                let value = lines
                    .next()
                    .ok_or_else(|| err(format!("vector {name} is not closed")))?;
                if value == close {
                    break;
                }
                samples.push(
                    parse_sample(value)
                        .ok_or_else(|| err(format!("invalid value '{value}' in {name}")))?,
                );
            }

            if kind == "indep" {
                if let Some(declared) = rest.first().and_then(|n| n.parse::<usize>().ok()) {
                    if declared != samples.len() {
                        return Err(err(format!(
                            "{name} declares {declared} values but has {}",
                            samples.len()
                        )));
                    }
                }
            }

            let values = if samples.iter().any(|s| s.im != 0.0) {
                Values::Complex(samples)
            } else {
                Values::Real(samples.into_iter().map(|s| s.re).collect())
            };
            dataset.push(DataVector {
                name,
                dependencies,
                values,
            });
        }

        dataset.validate().map_err(err)?;
        Ok(dataset)
    }
}

fn format_real(v: f64) -> String {
    format!("{v:+.11e}")
}

fn format_complex(v: Complex64) -> String {
    let sign = if v.im.is_sign_negative() { '-' } else { '+' };
    format!("{:+.11e}{sign}j{:.11e}", v.re, v.im.abs())
}

/// `+1.5e0`, `+1.5e0-j2e-1`
fn parse_sample(text: &str) -> Option<Complex64> {
    match text.find('j') {
        Some(j) if j > 0 => {
            let sign = match text.as_bytes()[j - 1] {
                b'-' => -1.0,
                b'+' => 1.0,
                _ => return None,
            };
            let re: f64 = text[..j - 1].parse().ok()?;
            let im: f64 = text[j + 1..].parse().ok()?;
            Some(Complex64::new(re, sign * im))
        }
        Some(_) => None,
        None => text.parse().ok().map(|re| Complex64::new(re, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{SampleMatrix, Variable};

    fn ac_plot(gain: f64) -> Plot {
        Plot {
            title: "rc".into(),
            name: "AC Analysis".into(),
            variables: vec![
                Variable::new("frequency", "frequency"),
                Variable::new("V(out)", "voltage"),
                Variable::new("v1#branch", "current"),
            ],
            samples: SampleMatrix::Complex(vec![
                vec![
                    Complex64::new(1e3, 0.0),
                    Complex64::new(gain, -0.1),
                    Complex64::new(-1e-3, 0.0),
                ],
                vec![
                    Complex64::new(1e4, 0.0),
                    Complex64::new(gain / 2.0, -0.5),
                    Complex64::new(-2e-3, 0.0),
                ],
            ]),
            has_axis: true,
        }
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("V(OUT)", "ac"), "ac.v(out)");
        assert_eq!(canonical_name("v1#branch", ""), "i(v1)");
        assert_eq!(canonical_name("I(V1)", "tran"), "tran.i(v1)");
    }

    #[test]
    fn test_from_plots_collates_names() {
        let dataset = Dataset::from_plots(&[ac_plot(0.9)], "ac");
        assert_eq!(dataset.names(), vec!["ac.frequency", "ac.v(out)", "ac.i(v1)"]);

        let freq = dataset.get("ac.frequency").unwrap();
        assert!(freq.is_independent());
        assert_eq!(freq.values, Values::Real(vec![1e3, 1e4]));

        let out = dataset.get("ac.v(out)").unwrap();
        assert_eq!(out.dependencies, vec!["ac.frequency"]);
        assert!(out.values.is_complex());
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_parametric_steps_stack() {
        let dataset = Dataset::from_plots(&[ac_plot(0.9), ac_plot(0.8), ac_plot(0.7)], "ac");
        let step = dataset.get("ac.step").unwrap();
        assert_eq!(step.values, Values::Real(vec![1.0, 2.0, 3.0]));
        let out = dataset.get("ac.v(out)").unwrap();
        assert_eq!(out.dependencies, vec!["ac.frequency", "ac.step"]);
        assert_eq!(out.values.len(), 6);
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_sweep_values_index_steps() {
        let plots = [ac_plot(0.9), ac_plot(0.8), ac_plot(0.7)];
        let sweep = ParamSweep {
            param: "Rload".into(),
            values: vec![1e3, 2e3, 3e3],
        };
        let dataset = Dataset::from_swept_plots(&plots, "ac", Some(&sweep));
        assert!(dataset.get("ac.step").is_none());
        let axis = dataset.get("ac.rload").unwrap();
        assert_eq!(axis.values, Values::Real(vec![1e3, 2e3, 3e3]));
        let out = dataset.get("ac.v(out)").unwrap();
        assert_eq!(out.dependencies, vec!["ac.frequency", "ac.rload"]);
        assert!(dataset.validate().is_ok());

        // A sweep that does not match the stacked steps keeps plain indices
        let short = ParamSweep {
            param: "Rload".into(),
            values: vec![1e3, 2e3],
        };
        let dataset = Dataset::from_swept_plots(&plots, "ac", Some(&short));
        assert_eq!(dataset.get("ac.step").unwrap().values, Values::Real(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_configured_prefix_keeps_analyses_apart() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "Title: rc\nPlotname: AC Analysis\nFlags: complex\nNo. Variables: 2\nNo. Points: 1\nVariables:\n\t0\tfrequency\tfrequency\n\t1\tv(out)\tvoltage\nValues:\n 0\t1e3,0\n\t0.5,-0.5\nTitle: rc\nPlotname: Transient Analysis\nFlags: real\nNo. Variables: 2\nNo. Points: 1\nVariables:\n\t0\ttime\ttime\n\t1\tv(out)\tvoltage\nValues:\n 0\t0\n\t1.5\n";
        fs::write(dir.path().join("simdeck.raw"), raw).unwrap();
        let run = SimulationRun::from_workdir(Dialect::Ngspice, dir.path(), String::new());

        let mut config = SimConfig::for_dialect(Dialect::Ngspice);
        config.dataset_prefix = Some("run1".into());
        let dataset =
            Dataset::from_run(&run, &[AnalysisKind::Ac, AnalysisKind::Tran], None, &config).unwrap();
        assert_eq!(
            dataset.names(),
            vec!["run1.ac.frequency", "run1.ac.v(out)", "run1.tran.time", "run1.tran.v(out)"]
        );
        assert_eq!(dataset.get("run1.tran.v(out)").unwrap().values, Values::Real(vec![1.5]));

        config.dataset_prefix = None;
        let dataset = Dataset::from_run(&run, &[AnalysisKind::Tran], None, &config).unwrap();
        assert_eq!(dataset.names(), vec!["tran.time", "tran.v(out)"]);
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let mut dataset = Dataset::from_plots(&[ac_plot(0.9)], "ac");
        let other = Dataset::from_plots(&[ac_plot(0.1)], "ac");
        dataset.extend(other);
        assert_eq!(dataset.vectors.len(), 3);
        let Values::Complex(out) = &dataset.get("ac.v(out)").unwrap().values else {
            panic!("expected complex values");
        };
        assert_eq!(out[0].re, 0.9);
    }

    #[test]
    fn test_text_round_trip() {
        let dataset = Dataset::from_plots(&[ac_plot(0.9)], "ac");
        let text = dataset.to_text();
        assert!(text.starts_with("<Qucs Dataset 0.0.19>\n<indep ac.frequency 2>\n  +1.00000000000e3\n"));
        assert!(text.contains("<dep ac.v(out) ac.frequency>\n  +9.00000000000e-1-j1.00000000000e-1\n"));

        let back = Dataset::parse_text(&text, Path::new("rc.dat")).unwrap();
        assert_eq!(back.names(), dataset.names());
        assert_eq!(back.get("ac.v(out)"), dataset.get("ac.v(out)"));
        // Complex vectors with a zero imaginary part read back as real
        assert_eq!(
            back.get("ac.i(v1)").unwrap().values,
            Values::Real(vec![-1e-3, -2e-3])
        );
    }

    #[test]
    fn test_parse_qucsator_output() {
        let text = "<Qucs Dataset 0.0.19>\n<indep time 3>\n  +0.00000000000e+00\n  +5.00000000000e-04\n  +1.00000000000e-03\n</indep>\n<dep out.Vt time>\n  +0.0\n  +0.39\n  +0.63\n</dep>\n";
        let dataset = Dataset::parse_text(text, Path::new("q.dat")).unwrap();
        assert_eq!(dataset.get("out.Vt").unwrap().values, Values::Real(vec![0.0, 0.39, 0.63]));

        let broken = "<Qucs Dataset 0.0.19>\n<indep time 3>\n  +0.0\n</indep>\n";
        assert!(Dataset::parse_text(broken, Path::new("q.dat")).is_err());
        let short = "<Qucs Dataset 0.0.19>\n<indep time 2>\n  +0.0\n  +1.0\n</indep>\n<dep v time>\n  +1.0\n</dep>\n";
        let err = Dataset::parse_text(short, Path::new("q.dat")).unwrap_err();
        assert!(err.to_string().contains("v has 1 values, its axes span 2"), "{err}");
    }

    #[test]
    fn test_json() {
        let dataset = Dataset::from_plots(&[ac_plot(0.9)], "ac");
        let json: serde_json::Value = serde_json::from_str(&dataset.to_json().unwrap()).unwrap();
        assert_eq!(json["vectors"][0]["name"], "ac.frequency");
        assert_eq!(json["vectors"][0]["values"][1], 1e4);
        assert_eq!(json["vectors"][1]["values"][0][1], -0.1);
    }
}
