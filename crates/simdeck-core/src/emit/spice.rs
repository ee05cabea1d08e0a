//! SPICE-family instance lines, model cards and deck assembly (ngspice,
//! Xyce, SpiceOpus, CDL)

use itertools::Itertools;
use std::fmt::Write;

use super::subcircuit::{self, SELECTOR_PROPS};
use super::{EmitContext, Fragment, NetlistDeck, Section};
use crate::config::{Dialect, RawFormat};
use crate::equation::{
    sense_node_name, sense_source_name, split_equation, translate_expression,
    translate_tokens, used_currents, Branch, Substitution, Token,
};
use crate::error::Result;
use crate::mapping::{
    format_number, normalize, parse_magnitude, parse_value, sanitize_identifier, DeviceInfo,
    QuantityKind,
};
use crate::parser::{CircuitGraph, Component};

/// Element name: the designator, with the kind's letter prepended when the
/// designator does not already start with it
pub(crate) fn element_name(prefix: &str, designator: &str) -> String {
    let starts = designator
        .get(..prefix.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(prefix));
    if starts {
        designator.to_string()
    } else {
        format!("{prefix}{designator}")
    }
}

/// A property value as written in a SPICE card.
///
/// Numbers are normalized; expressions (quoted, or anything that is not a
/// number) are translated and, for ngspice and Xyce, wrapped in braces.
pub(crate) fn param_value(raw: &str, kind: QuantityKind, dialect: Dialect) -> String {
    let trimmed = raw.trim();
    let quoted = trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'');
    if !quoted && parse_value(trimmed).is_ok() {
        return normalize(trimmed, kind, dialect);
    }

    let expr = if quoted {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    match dialect {
        Dialect::Ngspice | Dialect::Xyce => match translate_expression(expr, dialect) {
            Ok(t) => format!("{{{t}}}"),
            Err(e) => {
                log::debug!("{e}; keeping raw text");
                expr.to_string()
            }
        },
        _ => expr.to_string(),
    }
}

/// Log parameters the dialect cannot express; zero-valued ones are the
/// schematic defaults and dropped silently
fn report_dropped(component: &Component, dropped: &[&str], dialect: Dialect) {
    let significant: Vec<&str> = dropped
        .iter()
        .copied()
        .filter(|p| {
            component
                .property(p)
                .is_some_and(|v| parse_magnitude(v).map_or(true, |m| m != 0.0))
        })
        .collect();
    if !significant.is_empty() {
        log::warn!(
            "{}: dropping {} (not supported by {dialect})",
            component.name,
            significant.join(", ")
        );
    }
}

fn push_params(line: &mut String, params: &[(&str, &str)], dialect: Dialect) {
    for (name, value) in params {
        write!(line, " {name}={}", param_value(value, QuantityKind::Any, dialect)).unwrap();
    }
}

/// R, C and L
pub(crate) fn emit_passive(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let Some((raw, kind)) = info.raw_value(component) else {
        return Ok(Fragment::error(component, "missing value"));
    };

    let mut line = format!(
        "{} {} {}",
        element_name(info.prefix, &component.name),
        nodes.join(" "),
        param_value(raw, kind, ctx.dialect)
    );
    let (params, dropped) = info.split_params(component, ctx.dialect, true);
    report_dropped(component, &dropped, ctx.dialect);
    push_params(&mut line, &params, ctx.dialect);
    Ok(Fragment::instance(line))
}

/// Vdc and Idc
pub(crate) fn emit_dc_source(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let value = info
        .raw_value(component)
        .map(|(raw, kind)| param_value(raw, kind, ctx.dialect))
        .unwrap_or_else(|| "0".to_string());
    Ok(Fragment::instance(format!(
        "{} {} DC {value}",
        element_name(info.prefix, &component.name),
        nodes.join(" ")
    )))
}

/// Vac, Iac (small-signal plus sine) and Vsin (sine only)
pub(crate) fn emit_sine_source(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let d = ctx.dialect;
    let amplitude = info
        .raw_value(component)
        .map(|(raw, kind)| param_value(raw, kind, d))
        .unwrap_or_else(|| "1".to_string());
    let freq = param_value(component.property_or("f", "1 GHz"), QuantityKind::Frequency, d);
    let theta = param_value(component.property_or("Theta", "0"), QuantityKind::Any, d);
    let phase = param_value(component.property_or("Phase", "0"), QuantityKind::Any, d);
    let offset = param_value(component.property_or("Vo", "0"), QuantityKind::Voltage, d);
    let delay = param_value(component.property_or("Td", "0"), QuantityKind::Time, d);

    let name = element_name(info.prefix, &component.name);
    let sine = format!("SIN({offset} {amplitude} {freq} {delay} {theta} {phase})");
    let line = if info.model == "Vsin" {
        format!("{name} {} {sine}", nodes.join(" "))
    } else {
        format!("{name} {} DC 0 AC {amplitude} {sine}", nodes.join(" "))
    };
    Ok(Fragment::instance(line))
}

/// Vpulse: pulse width is the span between the two edge times
pub(crate) fn emit_pulse_source(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let d = ctx.dialect;
    let u1 = param_value(component.property_or("U1", "0 V"), QuantityKind::Voltage, d);
    let u2 = param_value(component.property_or("U2", "1 V"), QuantityKind::Voltage, d);
    let t1 = component.property_or("T1", "0");
    let t2 = component.property_or("T2", "1 ms");
    let rise = param_value(component.property_or("Tr", "1 ns"), QuantityKind::Time, d);
    let fall = param_value(component.property_or("Tf", "1 ns"), QuantityKind::Time, d);

    let width = match (parse_magnitude(t1), parse_magnitude(t2)) {
        (Ok(a), Ok(b)) if b > a => format_number(b - a),
        _ => {
            return Ok(Fragment::error(
                component,
                format!("cannot derive pulse width from T1='{t1}' and T2='{t2}'"),
            ))
        }
    };
    let delay = param_value(t1, QuantityKind::Time, d);

    Ok(Fragment::instance(format!(
        "{} {} PULSE({u1} {u2} {delay} {rise} {fall} {width})",
        element_name(info.prefix, &component.name),
        nodes.join(" ")
    )))
}

/// SPICE model type for a semiconductor kind
fn device_type(component: &Component, info: &DeviceInfo) -> &'static str {
    let p_type = component
        .property("Type")
        .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with('p'));
    match (info.model, p_type) {
        ("_BJT", false) => "NPN",
        ("_BJT", true) => "PNP",
        ("_MOSFET", false) => "NMOS",
        ("_MOSFET", true) => "PMOS",
        ("JFET", false) => "NJF",
        ("JFET", true) => "PJF",
        _ => "D",
    }
}

/// Diode, BJT, MOSFET and JFET: instance line plus a per-instance `.MODEL`
/// card. CDL decks reference the model by name and carry no card.
pub(crate) fn emit_semiconductor(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let d = ctx.dialect;
    let kind = device_type(component, info);

    let (instance, dropped_instance) = info.split_params(component, d, true);
    let (model, dropped_model) = info.split_params(component, d, false);
    report_dropped(component, &[dropped_instance, dropped_model].concat(), d);

    let mut fragment = Fragment::default();
    let model_name = if d == Dialect::Cdl {
        component.property_or("Model", kind).to_string()
    } else {
        let model_name = format!("{}MOD_{}", info.prefix, component.name);
        let mut card = format!(".MODEL {model_name} {kind}(");
        let mut fields: Vec<String> = Vec::new();
        if d == Dialect::Xyce && info.model == "_MOSFET" {
            fields.push("LEVEL=1".to_string());
        }
        fields.extend(
            model
                .iter()
                .map(|(n, v)| format!("{n}={}", param_value(v, QuantityKind::Any, d))),
        );
        card.push_str(&fields.join(" "));
        card.push(')');
        fragment.models.push(card);
        model_name
    };

    let mut line = format!(
        "{} {} {model_name}",
        element_name(info.prefix, &component.name),
        nodes.join(" ")
    );
    push_params(&mut line, &instance, d);
    fragment.instances.push(line);
    Ok(fragment)
}

/// VCVS and VCCS map onto E and G elements directly
pub(crate) fn emit_voltage_controlled(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let gain = info
        .raw_value(component)
        .map(|(raw, kind)| param_value(raw, kind, ctx.dialect))
        .unwrap_or_else(|| "1".to_string());
    let (_, dropped) = info.split_params(component, ctx.dialect, true);
    report_dropped(component, &dropped, ctx.dialect);
    Ok(Fragment::instance(format!(
        "{} {} {gain}",
        element_name(info.prefix, &component.name),
        nodes.join(" ")
    )))
}

/// Name of the zero-volt source carrying the controlling current of a
/// current-controlled source
pub fn control_source_name(designator: &str) -> String {
    format!("V{designator}_ctl")
}

/// CCCS and CCVS: a zero-volt source in the controlling branch and an F/H
/// element reading its current
pub(crate) fn emit_current_controlled(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let Some(nodes) = info.nodes(component, &ctx.nets) else {
        return Ok(Fragment::missing_ports(component));
    };
    let gain = info
        .raw_value(component)
        .map(|(raw, kind)| param_value(raw, kind, ctx.dialect))
        .unwrap_or_else(|| "1".to_string());
    let (_, dropped) = info.split_params(component, ctx.dialect, true);
    report_dropped(component, &dropped, ctx.dialect);

    let control = control_source_name(&component.name);
    let mut fragment = Fragment::default();
    fragment
        .instances
        .push(format!("{control} {} {} DC 0", nodes[2], nodes[3]));
    fragment.instances.push(format!(
        "{} {} {} {control} {gain}",
        element_name(info.prefix, &component.name),
        nodes[0],
        nodes[1]
    ));
    Ok(fragment)
}

/// Equation-defined device: one B source per non-zero branch equation, plus
/// a sensing source for every branch whose current an equation reads
pub(crate) fn emit_edd(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    if ctx.dialect == Dialect::Cdl {
        return Ok(Fragment::warning(component, "EDD has no CDL form, skipped"));
    }

    let mut fragment = Fragment::default();
    let Some(branches) = edd_branches(ctx, component) else {
        return Ok(Fragment::missing_ports(component));
    };
    let equations = edd_equations(component, branches.len(), &mut fragment);

    let used = used_currents(equations.iter().flat_map(|(_, _, t)| t.as_deref()));
    let sub = Substitution::new(ctx.dialect, &component.name, &branches);

    for (i, branch) in branches.iter().enumerate() {
        let n = i + 1;
        let plus = if used.contains(&n) {
            let node = sense_node_name(&component.name, n);
            fragment.instances.push(format!(
                "{} {} {node} DC 0",
                sense_source_name(&component.name, n),
                branch.plus
            ));
            node
        } else {
            branch.plus.clone()
        };

        for (branch_no, quantity, tokens) in &equations {
            if *branch_no != n {
                continue;
            }
            let Some(tokens) = tokens else { continue };
            let expr = translate_tokens(tokens.clone(), &sub);
            if expr.is_empty() || expr == "0" {
                continue;
            }
            let body = if *quantity == 'Q' {
                format!("ddt({expr})")
            } else {
                expr
            };
            fragment.instances.push(format!(
                "{} {plus} {} I={body}",
                element_name(info.prefix, &format!("{}_{quantity}{n}", component.name)),
                branch.minus
            ));
        }
    }
    Ok(fragment)
}

/// Branch terminals of an EDD: ports (2i, 2i+1) for branch i+1
pub(crate) fn edd_branches(ctx: &EmitContext<'_>, component: &Component) -> Option<Vec<Branch>> {
    let count = component
        .property("Branches")
        .and_then(|b| b.trim().parse::<usize>().ok())
        .unwrap_or(component.ports.len() / 2);
    (0..count)
        .map(|i| {
            let plus = component.net(2 * i)?;
            let minus = component.net(2 * i + 1)?;
            Some(Branch::new(
                &ctx.nets.node(plus),
                &ctx.nets.node(minus),
                ctx.nets.is_ground(plus),
                ctx.nets.is_ground(minus),
            ))
        })
        .collect()
}

/// Tokenized `I<n>`/`Q<n>` equations of an EDD as (branch, quantity, tokens);
/// equations that fail to tokenize are reported and carry `None`
pub(crate) fn edd_equations(
    component: &Component,
    branch_count: usize,
    fragment: &mut Fragment,
) -> Vec<(usize, char, Option<Vec<Token>>)> {
    let mut equations = Vec::new();
    for n in 1..=branch_count {
        for quantity in ['I', 'Q'] {
            let raw = component.property_or(&format!("{quantity}{n}"), "0");
            let tokens = match split_equation(raw) {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    fragment.diagnostics.error(Some(&component.name), e.to_string());
                    None
                }
            };
            equations.push((n, quantity, tokens));
        }
    }
    equations
}

/// Subcircuit instance; the definition travels with the fragment
pub(crate) fn emit_subcircuit(
    ctx: &EmitContext<'_>,
    component: &Component,
    info: &DeviceInfo,
) -> Result<Fragment> {
    let resolved = subcircuit::resolve(ctx, component)?;
    let nodes = resolved
        .order
        .iter()
        .map(|&i| ctx.nets.node(&component.ports[i].net))
        .join(" ");

    let mut line = format!(
        "{} {nodes} {}",
        element_name(info.prefix, &component.name),
        resolved.name
    );
    let params: Vec<(&str, &str)> = component
        .properties
        .iter()
        .filter(|p| !SELECTOR_PROPS.contains(&p.name.as_str()) && !p.value.trim().is_empty())
        .map(|p| (p.name.as_str(), p.value.as_str()))
        .collect();
    if !params.is_empty() {
        if ctx.dialect == Dialect::Xyce {
            line.push_str(" PARAMS:");
        }
        push_params(&mut line, &params, ctx.dialect);
    }

    let mut fragment = Fragment::instance(line);
    fragment.subcircuits.push((resolved.name, resolved.definition));
    Ok(fragment)
}

/// Equation block: one `.PARAM` card per assignment
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
                let card = match ctx.dialect {
                    Dialect::Ngspice | Dialect::Xyce => format!(".PARAM {}={{{expr}}}", p.name),
                    _ => format!(".PARAM {}={expr}", p.name),
                };
                fragment.params.push(card);
            }
            Err(e) => fragment.diagnostics.error(Some(&component.name), e.to_string()),
        }
    }
    Ok(fragment)
}

/// Lay out a SPICE or CDL deck
pub(crate) fn assemble(ctx: &EmitContext<'_>, graph: &CircuitGraph, parts: Fragment) -> NetlistDeck {
    let mut deck = NetlistDeck::new(ctx.dialect);
    deck.diagnostics = parts.diagnostics;
    let title = ctx.title(graph);
    let subcircuit = graph.is_subcircuit();

    deck.push_section(Section::Title, vec![format!("* {title}")]);

    if ctx.dialect == Dialect::Ngspice && ctx.config.raw_format == RawFormat::Ascii && !subcircuit {
        deck.push_section(Section::Options, vec![".OPTIONS FILETYPE=ASCII".to_string()]);
    }

    let definitions: Vec<String> = parts
        .subcircuits
        .iter()
        .flat_map(|(_, text)| text.lines().map(|l| l.trim_end().to_string()))
        .filter(|l| !l.is_empty())
        .collect();
    deck.push_section(Section::Subcircuits, definitions);

    if subcircuit {
        let pins = graph
            .terminals()
            .iter()
            .filter_map(|t| t.net(0))
            .map(|net| ctx.nets.node(net))
            .join(" ");
        deck.push_section(
            Section::Begin,
            vec![format!(".SUBCKT {} {pins}", sanitize_identifier(title))],
        );
    }

    deck.push_section(Section::Params, parts.params);
    deck.push_section(Section::Instances, parts.instances);
    deck.push_section(Section::Models, parts.models);

    if subcircuit {
        deck.push_section(Section::End, vec![".ENDS".to_string()]);
        if !parts.directives.is_empty() {
            deck.diagnostics
                .warn(None, "simulation directives are ignored in a subcircuit");
        }
    } else {
        deck.push_section(Section::Directives, parts.directives);
    }

    deck.push_section(Section::Terminator, vec![".END".to_string()]);
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::mapping::device_info;
    use crate::parser::{MapLibrary, NoSubcircuits};

    fn emit(dialect: Dialect, graph: &CircuitGraph, index: usize) -> Fragment {
        let config = SimConfig::for_dialect(dialect);
        let ctx = EmitContext::new(graph, &config, &NoSubcircuits);
        let component = &graph.components[index];
        let info = device_info(&component.model).unwrap();
        let emit = info.spice.unwrap();
        emit(&ctx, component, info).unwrap()
    }

    fn single(component: Component) -> CircuitGraph {
        CircuitGraph {
            title: "t".into(),
            components: vec![component, Component::new("GND", "GND1").port("1", "gnd")],
        }
    }

    #[test]
    fn test_element_name() {
        assert_eq!(element_name("R", "R1"), "R1");
        assert_eq!(element_name("R", "r1"), "r1");
        assert_eq!(element_name("M", "T1"), "MT1");
        assert_eq!(element_name("X", "SUB1"), "XSUB1");
    }

    #[test]
    fn test_param_value() {
        assert_eq!(param_value("1 kOhm", QuantityKind::Resistance, Dialect::Xyce), "1k");
        assert_eq!(param_value("1 k", QuantityKind::Resistance, Dialect::Ngspice), "1k");
        assert_eq!(param_value("2.2M", QuantityKind::Resistance, Dialect::Ngspice), "2.2Meg");
        assert_eq!(param_value("Rload*2", QuantityKind::Resistance, Dialect::Ngspice), "{Rload*2}");
        assert_eq!(param_value("'x^2'", QuantityKind::Any, Dialect::Xyce), "{x**2}");
        assert_eq!(param_value("Rload", QuantityKind::Resistance, Dialect::Cdl), "Rload");
    }

    #[test]
    fn test_passive_with_params() {
        let graph = single(
            Component::new("C", "C1")
                .port("1", "out")
                .port("2", "gnd")
                .prop("C", "10 pF")
                .prop("V", "1 V"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(f.instances, vec!["C1 out 0 10p IC=1"]);
        let f = emit(Dialect::Cdl, &graph, 0);
        assert_eq!(f.instances, vec!["C1 out 0 10p"]);
    }

    #[test]
    fn test_sources() {
        let graph = single(Component::new("Vdc", "V1").port("+", "in").port("-", "gnd").prop("U", "5 V"));
        assert_eq!(emit(Dialect::Ngspice, &graph, 0).instances, vec!["V1 in 0 DC 5"]);

        let graph = single(
            Component::new("Vac", "V2")
                .port("+", "in")
                .port("-", "gnd")
                .prop("U", "1 V")
                .prop("f", "1 kHz"),
        );
        assert_eq!(
            emit(Dialect::Xyce, &graph, 0).instances,
            vec!["V2 in 0 DC 0 AC 1 SIN(0 1 1k 0 0 0)"]
        );

        let graph = single(
            Component::new("Vpulse", "V3")
                .port("+", "in")
                .port("-", "gnd")
                .prop("U1", "0 V")
                .prop("U2", "5 V")
                .prop("T1", "0")
                .prop("T2", "2 ms"),
        );
        assert_eq!(
            emit(Dialect::Ngspice, &graph, 0).instances,
            vec!["V3 in 0 PULSE(0 5 0 1n 1n 0.002)"]
        );
    }

    #[test]
    fn test_mosfet_pin_order_and_model_card() {
        let graph = single(
            Component::new("_MOSFET", "T1")
                .port("G", "g")
                .port("D", "d")
                .port("S", "gnd")
                .port("B", "gnd")
                .prop("Type", "nfet")
                .prop("Vt0", "1.0 V")
                .prop("Kp", "2e-5")
                .prop("Rg", "10")
                .prop("W", "10 um")
                .prop("L", "1 um"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(f.instances, vec!["MT1 d g 0 0 MMOD_T1 W=10u L=1u"]);
        assert_eq!(f.models, vec![".MODEL MMOD_T1 NMOS(Vto=1.0 Kp=2e-5)"]);

        let f = emit(Dialect::Xyce, &graph, 0);
        assert_eq!(f.models, vec![".MODEL MMOD_T1 NMOS(LEVEL=1 VTO=1.0 Kp=2e-5)"]);

        let f = emit(Dialect::Cdl, &graph, 0);
        assert_eq!(f.instances, vec!["MT1 d g 0 0 NMOS W=10u L=1u"]);
        assert!(f.models.is_empty());
    }

    #[test]
    fn test_diode_and_bjt() {
        let graph = single(
            Component::new("Diode", "D1")
                .port("C", "gnd")
                .port("A", "a")
                .prop("Is", "1e-15 A")
                .prop("Cj0", "10 fF"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(f.instances, vec!["D1 a 0 DMOD_D1"]);
        assert_eq!(f.models, vec![".MODEL DMOD_D1 D(Is=1e-15 Cjo=10f)"]);

        let graph = single(
            Component::new("_BJT", "T2")
                .port("B", "b")
                .port("C", "c")
                .port("E", "gnd")
                .port("S", "gnd")
                .prop("Type", "pnp")
                .prop("Bf", "100"),
        );
        let f = emit(Dialect::Xyce, &graph, 0);
        assert_eq!(f.instances, vec!["QT2 c b 0 0 QMOD_T2"]);
        assert_eq!(f.models, vec![".MODEL QMOD_T2 PNP(Bf=100)"]);
    }

    #[test]
    fn test_current_controlled_two_sources() {
        let graph = single(
            Component::new("CCCS", "SRC1")
                .port("1", "in")
                .port("2", "out")
                .port("3", "gnd")
                .port("4", "mid")
                .prop("G", "2"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(
            f.instances,
            vec!["VSRC1_ctl in mid DC 0", "FSRC1 out 0 VSRC1_ctl 2"]
        );
    }

    #[test]
    fn test_vcvs_order() {
        let graph = single(
            Component::new("VCVS", "SRC2")
                .port("1", "in")
                .port("2", "out")
                .port("3", "gnd")
                .port("4", "gnd")
                .prop("G", "10")
                .prop("T", "0"),
        );
        assert_eq!(emit(Dialect::Xyce, &graph, 0).instances, vec!["ESRC2 out 0 in 0 10"]);
    }

    #[test]
    fn test_edd_dead_current_elimination() {
        // I1 is never read: no sensing source
        let graph = single(
            Component::new("EDD", "D1")
                .port("P1+", "a")
                .port("P1-", "gnd")
                .prop("Branches", "1")
                .prop("I1", "V1/1k")
                .prop("Q1", "0"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(f.instances, vec!["BD1_I1 a 0 I=V(a)/1k"]);
    }

    #[test]
    fn test_edd_sensing_source_once_per_branch() {
        let graph = single(
            Component::new("EDD", "D1")
                .port("P1+", "a")
                .port("P1-", "gnd")
                .port("P2+", "b")
                .port("P2-", "a")
                .prop("Branches", "2")
                .prop("I1", "1e-3*I2")
                .prop("Q1", "1p*V1")
                .prop("I2", "V2/50 + 0*I2"),
        );
        let f = emit(Dialect::Xyce, &graph, 0);
        assert_eq!(
            f.instances,
            vec![
                "BD1_I1 a 0 I=1e-3*i(VD1_I2)",
                "BD1_Q1 a 0 I=ddt(1p*V(a))",
                "VD1_I2 b _D1_I2 DC 0",
                "BD1_I2 _D1_I2 a I=V(b,a)/50+0*i(VD1_I2)",
            ]
        );
        let sensing = f.instances.iter().filter(|l| l.starts_with("VD1_I2 ")).count();
        assert_eq!(sensing, 1);
    }

    #[test]
    fn test_edd_syntax_error_is_diagnostic() {
        let graph = single(
            Component::new("EDD", "D1")
                .port("P1+", "a")
                .port("P1-", "gnd")
                .prop("Branches", "1")
                .prop("I1", "(V1/1k"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert!(f.instances.is_empty());
        assert!(f.diagnostics.has_errors());
    }

    #[test]
    fn test_equation_params() {
        let graph = single(
            Component::new("Eqn", "Eqn1")
                .prop("gain", "2*pi*f0^2")
                .prop("bad", "(1")
                .prop("Export", "yes"),
        );
        let f = emit(Dialect::Ngspice, &graph, 0);
        assert_eq!(f.params, vec![".PARAM gain={2*3.141592653589793*f0**2}"]);
        assert!(f.diagnostics.has_errors());
    }

    #[test]
    fn test_subcircuit_instance_params() {
        let mut library = MapLibrary::new();
        library.insert("LP", ".SUBCKT LP in out fc=1k\n.ENDS\n");
        let graph = single(
            Component::new("Sub", "SUB1")
                .port("out", "o")
                .port("in", "i")
                .prop("File", "LP.sch")
                .prop("fc", "2 kHz"),
        );
        let config = SimConfig::for_dialect(Dialect::Xyce);
        let ctx = EmitContext::new(&graph, &config, &library);
        let info = device_info("Sub").unwrap();
        let f = emit_subcircuit(&ctx, &graph.components[0], info).unwrap();
        assert_eq!(f.instances, vec!["XSUB1 i o LP PARAMS: fc=2k"]);
        assert_eq!(f.subcircuits[0].0, "LP");
    }

    #[test]
    fn test_subcircuit_deck_wrapping() {
        let graph = CircuitGraph {
            title: "buffer stage".into(),
            components: vec![
                Component::new("Port", "P1").port("1", "in").prop("Num", "1"),
                Component::new("Port", "P2").port("1", "out").prop("Num", "2"),
                Component::new("R", "R1").port("1", "in").port("2", "out").prop("R", "1k"),
                Component::new(".TR", "TR1").prop("Stop", "1 ms"),
            ],
        };
        let deck = crate::emit::emit_deck(&graph, &SimConfig::default(), &NoSubcircuits);
        assert_eq!(deck.section(Section::Begin), vec![".SUBCKT buffer_stage in out"]);
        assert_eq!(deck.section(Section::End), vec![".ENDS"]);
        assert!(deck.section(Section::Directives).is_empty());
    }
}
