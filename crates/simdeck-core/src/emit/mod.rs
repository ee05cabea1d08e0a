//! Netlist emission: per-component fragments assembled into a dialect deck

pub(crate) mod directives;
mod diagnostics;
mod qucsator;
pub(crate) mod spice;
mod subcircuit;
pub(crate) mod verilog_a;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use directives::ParamSweep;
pub use subcircuit::match_ports;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::cdl::PrefixResolver;
use crate::config::{Dialect, SimConfig};
use crate::error::Result;
use crate::mapping::{device_info, floating_nets, DeviceInfo, NetNames};
use crate::parser::{logical_lines, CircuitGraph, Component, SubcircuitLibrary};

/// Per-kind emission function
pub type EmitFn = fn(&EmitContext<'_>, &Component, &DeviceInfo) -> Result<Fragment>;

/// Everything an emitter may consult while building one deck
pub struct EmitContext<'a> {
    pub config: &'a SimConfig,
    pub dialect: Dialect,
    pub nets: NetNames,
    pub library: &'a dyn SubcircuitLibrary,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        graph: &CircuitGraph,
        config: &'a SimConfig,
        library: &'a dyn SubcircuitLibrary,
    ) -> Self {
        Self {
            config,
            dialect: config.dialect,
            nets: NetNames::new(graph, config.dialect),
            library,
        }
    }

    /// Deck title: configured title, else the schematic's, else a default
    pub fn title<'g>(&'g self, graph: &'g CircuitGraph) -> &'g str {
        [self.config.title.as_str(), graph.title.as_str()]
            .into_iter()
            .find(|t| !t.trim().is_empty())
            .unwrap_or("simdeck")
    }
}

/// Output of one component, sorted by the deck section it belongs to
#[derive(Debug, Default)]
pub struct Fragment {
    pub instances: Vec<String>,
    pub models: Vec<String>,
    pub params: Vec<String>,
    /// Verilog-A analog-block assignments
    pub equations: Vec<String>,
    pub directives: Vec<String>,
    /// Referenced subcircuit definitions as (name, text)
    pub subcircuits: Vec<(String, String)>,
    pub diagnostics: Diagnostics,
}

impl Fragment {
    pub fn instance(line: String) -> Self {
        Self {
            instances: vec![line],
            ..Default::default()
        }
    }

    pub(crate) fn warning(component: &Component, message: impl Into<String>) -> Self {
        let mut fragment = Self::default();
        fragment.diagnostics.warn(Some(&component.name), message);
        fragment
    }

    pub(crate) fn error(component: &Component, message: impl Into<String>) -> Self {
        let mut fragment = Self::default();
        fragment.diagnostics.error(Some(&component.name), message);
        fragment
    }

    pub(crate) fn missing_ports(component: &Component) -> Self {
        Self::error(
            component,
            format!("{} has fewer ports than its model needs", component.model),
        )
    }

    /// The fragment's lines, in deck order
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in self
            .params
            .iter()
            .chain(&self.equations)
            .chain(&self.instances)
            .chain(&self.models)
            .chain(&self.directives)
        {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Merge `other` into `self`; subcircuit definitions and model cards are
    /// kept once
    fn absorb(&mut self, other: Fragment) {
        self.instances.extend(other.instances);
        self.params.extend(other.params);
        self.equations.extend(other.equations);
        self.directives.extend(other.directives);
        for model in other.models {
            if !self.models.contains(&model) {
                self.models.push(model);
            }
        }
        for (name, text) in other.subcircuits {
            if !self
                .subcircuits
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case(&name))
            {
                self.subcircuits.push((name, text));
            }
        }
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Deck sections, in the order they usually appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Options,
    Subcircuits,
    /// `.SUBCKT`, `.Def:` or the Verilog-A module header
    Begin,
    Params,
    Instances,
    Models,
    End,
    Directives,
    Terminator,
}

/// A complete netlist, grouped into sections
#[derive(Debug, Clone)]
pub struct NetlistDeck {
    pub dialect: Dialect,
    sections: Vec<(Section, Vec<String>)>,
    pub diagnostics: Diagnostics,
}

impl NetlistDeck {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sections: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Append a section; empty sections are skipped
    pub fn push_section(&mut self, section: Section, lines: Vec<String>) {
        if !lines.is_empty() {
            self.sections.push((section, lines));
        }
    }

    /// All lines of one section kind
    pub fn section(&self, section: Section) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(s, _)| *s == section)
            .flat_map(|(_, lines)| lines.iter().map(String::as_str))
            .collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|(_, lines)| lines.iter().map(String::as_str))
    }

    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.text())?;
        Ok(())
    }

    /// Strip call prefixes everywhere, library definition bodies included
    fn resolve_cdl_prefixes(&mut self) {
        let resolver = PrefixResolver::scan(&self.text());
        for (_, lines) in &mut self.sections {
            let mut joined = logical_lines(&lines.join("\n"));
            for line in joined.iter_mut() {
                if let Some(fixed) = resolver.resolve(line) {
                    log::debug!("no local definition for '{line}', stripping call prefix");
                    *line = fixed;
                }
            }
            *lines = joined;
        }
    }
}

impl fmt::Display for NetlistDeck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Emit one component for the context's dialect
pub fn emit_component(ctx: &EmitContext<'_>, component: &Component) -> Result<Fragment> {
    log::debug!(
        "emitting {} ({}) as {}",
        component.name,
        component.model,
        ctx.dialect
    );

    if ctx.dialect == Dialect::QucsatorNative {
        return qucsator::emit(ctx, component);
    }

    let Some(info) = device_info(&component.model) else {
        return Ok(Fragment::warning(
            component,
            format!("unknown model '{}', skipped", component.model),
        ));
    };

    // Ground symbols and terminals only shape node names
    if matches!(info.model, "GND" | "Port") {
        return Ok(Fragment::default());
    }

    if info.is_directive() && !ctx.dialect.is_simulator() {
        log::debug!("{} decks carry no analyses, dropping {}", ctx.dialect, component.name);
        return Ok(Fragment::default());
    }

    let emit = if ctx.dialect == Dialect::VerilogA {
        info.verilog_a
    } else {
        info.spice
    };
    match emit {
        Some(emit) => emit(ctx, component, info),
        None => Ok(Fragment::warning(
            component,
            format!("{} is not supported in {}, skipped", component.model, ctx.dialect),
        )),
    }
}

/// Build a complete deck for `config.dialect`.
///
/// Problems local to one component (bad equations, unresolvable
/// subcircuits, unsupported kinds) are recorded in the deck's diagnostics
/// and the rest of the circuit is still emitted.
pub fn emit_deck(
    graph: &CircuitGraph,
    config: &SimConfig,
    library: &dyn SubcircuitLibrary,
) -> NetlistDeck {
    let ctx = EmitContext::new(graph, config, library);
    let mut parts = Fragment::default();

    for net in floating_nets(graph) {
        parts
            .diagnostics
            .warn(None, format!("net '{net}' has a single connection"));
    }

    for component in &graph.components {
        match emit_component(&ctx, component) {
            Ok(fragment) => parts.absorb(fragment),
            Err(e) => parts.diagnostics.error(Some(&component.name), e.to_string()),
        }
    }

    let mut deck = match ctx.dialect {
        Dialect::QucsatorNative => qucsator::assemble(&ctx, graph, parts),
        Dialect::VerilogA => verilog_a::assemble(&ctx, graph, parts),
        _ => spice::assemble(&ctx, graph, parts),
    };

    if ctx.dialect == Dialect::Cdl {
        deck.resolve_cdl_prefixes();
    }

    log::info!(
        "built {} deck for '{}': {} lines, {} diagnostics",
        ctx.dialect,
        ctx.title(graph),
        deck.lines().count(),
        deck.diagnostics.len()
    );
    deck
}
