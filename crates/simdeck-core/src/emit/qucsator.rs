//! Qucsator native netlists: `Model:Name node… Prop="value"`

use itertools::Itertools;

use super::subcircuit::{self, SELECTOR_PROPS};
use super::{EmitContext, Fragment, NetlistDeck, Section};
use crate::error::Result;
use crate::mapping::{normalize, QuantityKind};
use crate::parser::{CircuitGraph, Component};

fn property_list<'a>(props: impl Iterator<Item = (&'a str, &'a str)>, ctx: &EmitContext<'_>) -> String {
    props
        .map(|(name, value)| {
            let value = normalize(value, QuantityKind::Any, ctx.dialect);
            format!(" {name}=\"{}\"", value.replace('"', "'"))
        })
        .collect()
}

/// Every kind is written generically; only ground symbols, terminals and
/// subcircuit references need special handling
pub(crate) fn emit(ctx: &EmitContext<'_>, component: &Component) -> Result<Fragment> {
    match component.model.as_str() {
        "GND" | "Port" => return Ok(Fragment::default()),
        "Sub" => return emit_subcircuit(ctx, component),
        _ => {}
    }

    let nodes: String = component
        .ports
        .iter()
        .map(|p| format!(" {}", ctx.nets.node(&p.net)))
        .collect();
    let props = property_list(
        component
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str())),
        ctx,
    );
    let line = format!("{}:{}{nodes}{props}", component.model, component.name);

    let mut fragment = Fragment::default();
    if component.model.starts_with('.') {
        fragment.directives.push(line);
    } else {
        fragment.instances.push(line);
    }
    Ok(fragment)
}

fn emit_subcircuit(ctx: &EmitContext<'_>, component: &Component) -> Result<Fragment> {
    let resolved = subcircuit::resolve(ctx, component)?;
    let nodes = resolved
        .order
        .iter()
        .map(|&i| ctx.nets.node(&component.ports[i].net))
        .join(" ");
    let props = property_list(
        component
            .properties
            .iter()
            .filter(|p| !SELECTOR_PROPS.contains(&p.name.as_str()))
            .map(|p| (p.name.as_str(), p.value.as_str())),
        ctx,
    );

    let mut fragment = Fragment::instance(format!(
        "Sub:{} {nodes} Type=\"{}\"{props}",
        component.name, resolved.name
    ));
    fragment.subcircuits.push((resolved.name, resolved.definition));
    Ok(fragment)
}

pub(crate) fn assemble(ctx: &EmitContext<'_>, graph: &CircuitGraph, parts: Fragment) -> NetlistDeck {
    let mut deck = NetlistDeck::new(ctx.dialect);
    deck.diagnostics = parts.diagnostics;
    let title = ctx.title(graph);

    deck.push_section(Section::Title, vec![format!("# Qucs netlist: {title}")]);

    let definitions: Vec<String> = parts
        .subcircuits
        .iter()
        .flat_map(|(_, text)| text.lines().map(|l| l.trim_end().to_string()))
        .filter(|l| !l.is_empty())
        .collect();
    deck.push_section(Section::Subcircuits, definitions);

    let subcircuit = graph.is_subcircuit();
    if subcircuit {
        let pins = graph
            .terminals()
            .iter()
            .filter_map(|t| t.net(0))
            .map(|net| ctx.nets.node(net))
            .join(" ");
        deck.push_section(Section::Begin, vec![format!(".Def:{title} {pins}")]);
    }

    deck.push_section(Section::Instances, parts.instances);

    if subcircuit {
        deck.push_section(Section::End, vec![".Def:End".to_string()]);
    } else {
        deck.push_section(Section::Directives, parts.directives);
    }
    deck
}
