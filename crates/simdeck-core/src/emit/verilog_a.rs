//! Verilog-A module emission: contribution statements inside one analog block

use itertools::Itertools;

use super::spice::{edd_branches, edd_equations};
use super::{EmitContext, Fragment, NetlistDeck, Section};
use crate::config::Dialect;
use crate::equation::{translate_expression, translate_tokens, Access, Branch, Substitution};
use crate::error::Result;
use crate::mapping::{normalize, parse_value, sanitize_identifier, DeviceInfo, QuantityKind};
use crate::parser::{CircuitGraph, Component};

/// A property value inside an analog expression; expressions are translated
/// and parenthesized
pub(crate) fn va_value(raw: &str, kind: QuantityKind) -> String {
    let trimmed = raw.trim();
    let expr = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed);
    if parse_value(expr).is_ok() {
        return normalize(expr, kind, Dialect::VerilogA);
    }
    match translate_expression(expr, Dialect::VerilogA) {
        Ok(t) => format!("({t})"),
        Err(e) => {
            log::debug!("{e}; keeping raw text");
            format!("({expr})")
        }
    }
}

/// `quantity(branch) <+ expr;`, sign-corrected for a grounded plus terminal
fn contribution(branch: &Branch, quantity: char, expr: &str) -> Option<String> {
    branch.access(quantity).map(|access| contribute(access, expr))
}

fn contribute(access: Access, expr: &str) -> String {
    match access {
        Access {
            text,
            negated: false,
        } => format!("{text} <+ {expr};"),
        Access {
            text,
            negated: true,
        } => format!("{text} <+ -({expr});"),
    }
}

fn branch(ctx: &EmitContext<'_>, component: &Component, plus: usize, minus: usize) -> Option<Branch> {
    let p = component.net(plus)?;
    let m = component.net(minus)?;
    Some(Branch::new(
        &ctx.nets.node(p),
        &ctx.nets.node(m),
        ctx.nets.is_ground(p),
        ctx.nets.is_ground(m),
    ))
}

/// A declared `branch (p, n) br_<name>;` owned by a single element, so
/// elements in parallel on one node pair keep separate contributions
struct NamedBranch {
    name: String,
    nodes: String,
    negated: bool,
}

impl NamedBranch {
    /// `None` when both terminals are grounded
    fn new(branch: &Branch, name: &str) -> Option<Self> {
        let (nodes, negated) = match (branch.plus_ground, branch.minus_ground) {
            (false, false) => (format!("{}, {}", branch.plus, branch.minus), false),
            (false, true) => (branch.plus.clone(), false),
            (true, false) => (branch.minus.clone(), true),
            (true, true) => return None,
        };
        Some(Self {
            name: format!("br_{}", sanitize_identifier(name)),
            nodes,
            negated,
        })
    }

    fn declaration(&self) -> String {
        format!("branch ({}) {};", self.nodes, self.name)
    }

    fn access(&self, quantity: char) -> Access {
        Access {
            text: format!("{quantity}({})", self.name),
            negated: self.negated,
        }
    }

    fn expression(&self, quantity: char) -> String {
        match self.access(quantity) {
            Access { text, negated: false } => text,
            Access { text, negated: true } => format!("(-{text})"),
        }
    }

    fn contribution(&self, quantity: char, expr: &str) -> String {
        contribute(self.access(quantity), expr)
    }
}

/// Declare the element's own branch, or warn when it has none
fn declare(fragment: &mut Fragment, component: &Component, br: &Branch, name: &str) -> Option<NamedBranch> {
    let named = NamedBranch::new(br, name);
    match &named {
        Some(named) => fragment.params.push(named.declaration()),
        None => fragment
            .diagnostics
            .warn(Some(&component.name), "both terminals are grounded, skipped"),
    }
    named
}

/// R, C and L as branch contributions
pub(crate) fn emit_passive(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(br) = branch(ctx, component, info.pin_order[0], info.pin_order[1]) else {
        return Ok(Fragment::missing_ports(component));
    };
    let Some((raw, kind)) = info.raw_value(component) else {
        return Ok(Fragment::error(component, "missing value"));
    };
    let value = va_value(raw, kind);

    let mut fragment = Fragment::default();
    let Some(br) = declare(&mut fragment, component, &br, &component.name) else {
        return Ok(fragment);
    };
    let statement = match info.model {
        "R" => br.contribution('I', &format!("{}/{value}", br.expression('V'))),
        "C" => br.contribution('I', &format!("{value}*ddt({})", br.expression('V'))),
        _ => br.contribution('V', &format!("{value}*ddt({})", br.expression('I'))),
    };
    fragment.instances.push(statement);
    Ok(fragment)
}

/// Vdc and Idc
pub(crate) fn emit_source(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(br) = branch(ctx, component, info.pin_order[0], info.pin_order[1]) else {
        return Ok(Fragment::missing_ports(component));
    };
    let value = info
        .raw_value(component)
        .map(|(raw, kind)| va_value(raw, kind))
        .unwrap_or_else(|| "0".to_string());
    let quantity = if info.prefix == "V" { 'V' } else { 'I' };

    let mut fragment = Fragment::default();
    if let Some(br) = declare(&mut fragment, component, &br, &component.name) {
        fragment.instances.push(br.contribution(quantity, &value));
    }
    Ok(fragment)
}

/// VCVS, VCCS, CCCS and CCVS.
///
/// Current-controlled kinds read their control current from a zero-volt
/// contribution on the input branch.
pub(crate) fn emit_controlled(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let order = info.pin_order;
    let (Some(output), Some(input)) = (
        branch(ctx, component, order[0], order[1]),
        branch(ctx, component, order[2], order[3]),
    ) else {
        return Ok(Fragment::missing_ports(component));
    };
    let gain = info
        .raw_value(component)
        .map(|(raw, kind)| va_value(raw, kind))
        .unwrap_or_else(|| "1".to_string());

    let mut fragment = Fragment::default();
    let (out_quantity, in_quantity) = match info.model {
        "VCVS" => ('V', 'V'),
        "VCCS" => ('I', 'V'),
        "CCCS" => ('I', 'I'),
        _ => ('V', 'I'),
    };
    let control = if in_quantity == 'I' {
        let Some(sense) = declare(&mut fragment, component, &input, &format!("{}_in", component.name))
        else {
            return Ok(fragment);
        };
        fragment.instances.push(sense.contribution('V', "0"));
        sense.expression('I')
    } else {
        input.expression('V')
    };
    if let Some(out) = declare(&mut fragment, component, &output, &component.name) {
        fragment
            .instances
            .push(out.contribution(out_quantity, &format!("{gain}*{control}")));
    }
    Ok(fragment)
}

/// Equation-defined device: one current contribution per non-zero `I<n>`
/// and `Q<n>` equation
pub(crate) fn emit_edd(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let mut fragment = Fragment::default();
    let Some(branches) = edd_branches(ctx, component) else {
        return Ok(Fragment::missing_ports(component));
    };
    let equations = edd_equations(component, branches.len(), &mut fragment);
    let sub = Substitution::new(ctx.dialect, &component.name, &branches);

    for (n, quantity, tokens) in equations {
        let Some(tokens) = tokens else { continue };
        let expr = translate_tokens(tokens, &sub);
        if expr.is_empty() || expr == "0" {
            continue;
        }
        let body = if quantity == 'Q' {
            format!("ddt({expr})")
        } else {
            expr
        };
        if let Some(line) = contribution(&branches[n - 1], 'I', &body) {
            fragment.instances.push(line);
        }
    }
    Ok(fragment)
}

/// Equation block: a `real` declaration and an assignment per variable
pub(crate) fn emit_equation(
    ctx: &EmitContext<'_>,
    component: &Component,
    _info: &DeviceInfo,
) -> Result<Fragment> {
    let mut fragment = Fragment::default();
    for p in &component.properties {
        if p.name == "Export" || p.value.trim().is_empty() {
            continue;
        }
        match translate_expression(&p.value, ctx.dialect) {
            Ok(expr) => {
                let name = sanitize_identifier(&p.name);
                fragment.params.push(format!("real {name};"));
                fragment.equations.push(format!("{name} = {expr};"));
            }
            Err(e) => fragment.diagnostics.error(Some(&component.name), e.to_string()),
        }
    }
    Ok(fragment)
}

/// Lay out the module: terminals become its ports, every other net an
/// internal `electrical`
pub(crate) fn assemble(ctx: &EmitContext<'_>, graph: &CircuitGraph, parts: Fragment) -> NetlistDeck {
    let mut deck = NetlistDeck::new(ctx.dialect);
    deck.diagnostics = parts.diagnostics;
    let title = ctx.title(graph);

    deck.push_section(
        Section::Title,
        vec![
            format!("// {title}"),
            "`include \"disciplines.vams\"".to_string(),
            "`include \"constants.vams\"".to_string(),
        ],
    );

    let ports: Vec<String> = graph
        .terminals()
        .iter()
        .filter_map(|t| t.net(0))
        .filter(|net| !ctx.nets.is_ground(net))
        .map(|net| ctx.nets.node(net))
        .unique()
        .collect();
    let internal: Vec<String> = graph
        .components
        .iter()
        .filter(|c| !matches!(c.model.as_str(), "GND" | "Port"))
        .flat_map(|c| c.ports.iter())
        .filter(|p| !ctx.nets.is_ground(&p.net))
        .map(|p| ctx.nets.node(&p.net))
        .filter(|node| !ports.contains(node))
        .unique()
        .collect();

    let name = sanitize_identifier(title);
    let mut header = Vec::new();
    if ports.is_empty() {
        header.push(format!("module {name};"));
    } else {
        let list = ports.join(", ");
        header.push(format!("module {name}({list});"));
        header.push(format!("  inout {list};"));
        header.push(format!("  electrical {list};"));
    }
    if !internal.is_empty() {
        header.push(format!("  electrical {};", internal.join(", ")));
    }
    header.extend(parts.params.iter().unique().map(|d| format!("  {d}")));
    header.push("  analog begin".to_string());
    deck.push_section(Section::Begin, header);

    deck.push_section(
        Section::Params,
        parts.equations.iter().map(|e| format!("    {e}")).collect(),
    );
    deck.push_section(
        Section::Instances,
        parts.instances.iter().map(|c| format!("    {c}")).collect(),
    );
    deck.push_section(
        Section::End,
        vec!["  end".to_string(), "endmodule".to_string()],
    );
    deck
}
