//! Simulation directives for the SPICE simulators.
//!
//! Sweep parameters are derived rather than copied: logarithmic sweeps
//! become points per decade, transient sweeps become a step size. Both use
//! ceiling rounding so step counts never come out one short.

use super::{EmitContext, Fragment};
use crate::config::Dialect;
use crate::error::Result;
use crate::mapping::{format_number, parse_magnitude, DeviceInfo};
use crate::parser::{CircuitGraph, Component};

/// `ceil((points - 1) / ceil(log10(stop / start)))`
pub fn points_per_decade(start: f64, stop: f64, points: u64) -> u64 {
    let decades = (stop / start).log10().ceil().max(1.0);
    (points.saturating_sub(1) as f64 / decades).ceil() as u64
}

/// `(stop - start) / (points - 1)`
pub fn transient_step(start: f64, stop: f64, points: u64) -> f64 {
    (stop - start) / (points.max(2) - 1) as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spacing {
    Linear,
    Logarithmic,
}

/// Start/stop/points of a swept directive
#[derive(Debug, Clone, Copy)]
struct Sweep {
    spacing: Spacing,
    start: f64,
    stop: f64,
    points: u64,
}

fn magnitude(
    component: &Component,
    name: &str,
    default: &str,
) -> std::result::Result<f64, String> {
    let raw = component.property_or(name, default);
    parse_magnitude(raw).map_err(|_| format!("{name}='{raw}' is not a number"))
}

fn read_sweep(component: &Component) -> std::result::Result<Sweep, String> {
    let spacing = match component.property_or("Type", "lin").trim() {
        "log" => Spacing::Logarithmic,
        "lin" => Spacing::Linear,
        other => return Err(format!("sweep type '{other}' is not supported")),
    };
    let start = magnitude(component, "Start", "0")?;
    let stop = magnitude(component, "Stop", "1")?;
    let points = component
        .property_or("Points", "2")
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Points='{}' is not a count", component.property_or("Points", "")))?;
    if spacing == Spacing::Logarithmic && (start <= 0.0 || stop <= start) {
        return Err(format!("log sweep needs 0 < Start < Stop, got {start}..{stop}"));
    }
    Ok(Sweep {
        spacing,
        start,
        stop,
        points,
    })
}

/// Parameter values a `.SW` directive steps through, in simulator order
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSweep {
    pub param: String,
    pub values: Vec<f64>,
}

impl ParamSweep {
    /// Values of the first parameter sweep in `graph`, if it is well formed
    pub fn from_graph(graph: &CircuitGraph) -> Option<Self> {
        graph
            .components
            .iter()
            .find(|c| c.model == ".SW")
            .and_then(Self::from_component)
    }

    /// Values of the `.STEP` line written for this directive
    pub fn from_component(component: &Component) -> Option<Self> {
        let param = component
            .property("Param")
            .map(str::trim)
            .filter(|p| !p.is_empty())?
            .to_string();

        if component.property_or("Type", "lin").trim() == "list" {
            let values = component
                .property_or("Values", "")
                .replace([';', ','], " ")
                .split_whitespace()
                .map(parse_magnitude)
                .collect::<std::result::Result<Vec<_>, _>>()
                .ok()?;
            return Some(Self { param, values });
        }

        let sweep = read_sweep(component).ok()?;
        let values = match sweep.spacing {
            Spacing::Linear => {
                let step = transient_step(sweep.start, sweep.stop, sweep.points);
                (0..sweep.points.max(2))
                    .map(|k| sweep.start + k as f64 * step)
                    .collect()
            }
            Spacing::Logarithmic => {
                let ppd = points_per_decade(sweep.start, sweep.stop, sweep.points).max(1);
                let limit = sweep.stop * (1.0 + 1e-9);
                (0..)
                    .map(|k| sweep.start * 10f64.powf(k as f64 / ppd as f64))
                    .take_while(|v| *v <= limit)
                    .collect()
            }
        };
        Some(Self { param, values })
    }
}

/// `DEC <ppd> <start> <stop>` or `LIN <points> <start> <stop>`
fn frequency_sweep(sweep: &Sweep) -> String {
    let (start, stop) = (format_number(sweep.start), format_number(sweep.stop));
    match sweep.spacing {
        Spacing::Logarithmic => format!(
            "DEC {} {start} {stop}",
            points_per_decade(sweep.start, sweep.stop, sweep.points)
        ),
        Spacing::Linear => format!("LIN {} {start} {stop}", sweep.points),
    }
}

fn unsupported(ctx: &EmitContext<'_>, component: &Component) -> Fragment {
    Fragment::warning(
        component,
        format!("{} is not supported by {}, dropped", component.model, ctx.dialect),
    )
}

fn directive(line: String) -> Fragment {
    Fragment {
        directives: vec![line],
        ..Default::default()
    }
}

/// `V(node)` unless already an access expression
fn output_access(ctx: &EmitContext<'_>, output: &str) -> String {
    let output = output.trim();
    if output.contains('(') {
        output.to_string()
    } else {
        format!("V({})", ctx.nets.node(output))
    }
}

/// DC operating point
pub(crate) fn emit_op(
    _ctx: &EmitContext<'_>,
    _component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    Ok(directive(".OP".to_string()))
}

pub(crate) fn emit_ac(
    _ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    Ok(match read_sweep(component) {
        Ok(sweep) => directive(format!(".AC {}", frequency_sweep(&sweep))),
        Err(e) => Fragment::error(component, e),
    })
}

pub(crate) fn emit_tran(
    _ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let sweep = match read_sweep(component) {
        Ok(sweep) => sweep,
        Err(e) => return Ok(Fragment::error(component, e)),
    };
    let step = format_number(transient_step(sweep.start, sweep.stop, sweep.points));
    let mut line = format!(".TRAN {step} {}", format_number(sweep.stop));
    if sweep.start != 0.0 {
        line.push(' ');
        line.push_str(&format_number(sweep.start));
    }
    Ok(directive(line))
}

/// Harmonic balance exists only in Xyce
pub(crate) fn emit_hb(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    if ctx.dialect != Dialect::Xyce {
        return Ok(unsupported(ctx, component));
    }
    let freq = match magnitude(component, "f", "1 GHz") {
        Ok(f) => f,
        Err(e) => return Ok(Fragment::error(component, e)),
    };
    let harmonics = component.property_or("n", "4").trim().to_string();
    let mut fragment = directive(format!(".HB {}", format_number(freq)));
    fragment
        .directives
        .push(format!(".OPTIONS HBINT NUMFREQ={harmonics}"));
    Ok(fragment)
}

/// DC sensitivity of one output; Xyce also needs the parameter list
pub(crate) fn emit_sens(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(output) = component.property("Output").filter(|o| !o.trim().is_empty()) else {
        return Ok(Fragment::error(component, "sensitivity needs an Output"));
    };
    let output = output_access(ctx, output);

    let line = match ctx.dialect {
        Dialect::Xyce => {
            let params: Vec<&str> = component
                .property_or("Param", "")
                .split([',', ' '])
                .filter(|p| !p.is_empty())
                .collect();
            if params.is_empty() {
                return Ok(Fragment::error(component, "Xyce sensitivity needs Param"));
            }
            format!(".SENS objfunc={{{output}}} param={}", params.join(","))
        }
        _ => format!(".SENS {output}"),
    };
    Ok(directive(line))
}

pub(crate) fn emit_noise(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let output = output_access(ctx, component.property_or("Output", "out"));
    let source = component.property_or("Source", "V1").trim().to_string();
    let mut fragment = match read_sweep(component) {
        Ok(sweep) => directive(format!(".NOISE {output} {source} {}", frequency_sweep(&sweep))),
        Err(e) => return Ok(Fragment::error(component, e)),
    };
    // Xyce only writes noise results that are printed
    if ctx.dialect == Dialect::Xyce {
        fragment
            .directives
            .push(".PRINT NOISE ONOISE INOISE".to_string());
    }
    Ok(fragment)
}

pub(crate) fn emit_four(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let freq = match magnitude(component, "f", "1 kHz") {
        Ok(f) => f,
        Err(e) => return Ok(Fragment::error(component, e)),
    };
    let outputs: Vec<String> = component
        .property_or("Outputs", "out")
        .split_whitespace()
        .map(|o| output_access(ctx, o))
        .collect();
    Ok(directive(format!(".FOUR {} {}", format_number(freq), outputs.join(" "))))
}

/// Pole-zero analysis; Xyce has none
pub(crate) fn emit_pz(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    if ctx.dialect == Dialect::Xyce {
        return Ok(unsupported(ctx, component));
    }
    let node = |name: &str, default: &str| {
        ctx.nets
            .node(component.property_or(name, default).trim())
    };
    let input = match component.property_or("Type", "vol").trim() {
        "cur" => "CUR",
        _ => "VOL",
    };
    let analysis = match component.property_or("Analysis", "pz").trim() {
        "pol" => "POL",
        "zer" => "ZER",
        _ => "PZ",
    };
    Ok(directive(format!(
        ".PZ {} {} {} {} {input} {analysis}",
        node("Inp", "in"),
        node("Inn", "gnd"),
        node("Outp", "out"),
        node("Outn", "gnd")
    )))
}

/// Parameter sweep, written as Xyce `.STEP`
pub(crate) fn emit_sweep(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    if ctx.dialect != Dialect::Xyce {
        return Ok(unsupported(ctx, component));
    }
    let Some(param) = component
        .property("Param")
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        return Ok(Fragment::error(component, "sweep needs a Param"));
    };

    if component.property_or("Type", "lin").trim() == "list" {
        let raw = component.property_or("Values", "").replace([';', ','], " ");
        let values: Vec<&str> = raw.split_whitespace().collect();
        return Ok(directive(format!(".STEP {param} LIST {}", values.join(" "))));
    }

    let sweep = match read_sweep(component) {
        Ok(sweep) => sweep,
        Err(e) => return Ok(Fragment::error(component, e)),
    };
    let (start, stop) = (format_number(sweep.start), format_number(sweep.stop));
    let line = match sweep.spacing {
        Spacing::Linear => format!(
            ".STEP LIN {param} {start} {stop} {}",
            format_number(transient_step(sweep.start, sweep.stop, sweep.points))
        ),
        Spacing::Logarithmic => format!(
            ".STEP DEC {param} {start} {stop} {}",
            points_per_decade(sweep.start, sweep.stop, sweep.points)
        ),
    };
    Ok(directive(line))
}
