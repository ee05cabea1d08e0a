//! Subcircuit instances: definition lookup and port ↔ pin matching

use std::path::Path;

use super::EmitContext;
use crate::error::{Error, Result};
use crate::parser::{find_subckt, Component, Port};

/// A subcircuit instance with its definition resolved
#[derive(Debug)]
pub(crate) struct ResolvedInstance {
    pub name: String,
    pub definition: String,
    /// Component port index for each definition pin
    pub order: Vec<usize>,
}

/// Properties that select the subcircuit rather than parameterize it
pub(crate) const SELECTOR_PROPS: &[&str] = &["Type", "File"];

/// Referenced subcircuit name: `Type`, else the stem of `File`
pub(crate) fn subcircuit_name(component: &Component) -> Option<String> {
    if let Some(t) = component.property("Type").filter(|t| !t.trim().is_empty()) {
        return Some(t.trim().to_string());
    }
    component
        .property("File")
        .and_then(|f| Path::new(f.trim()).file_stem())
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

pub(crate) fn resolve(ctx: &EmitContext<'_>, component: &Component) -> Result<ResolvedInstance> {
    let name = subcircuit_name(component).ok_or_else(|| Error::SubcircuitResolution {
        name: component.name.clone(),
        reason: "no Type or File property".to_string(),
    })?;
    let definition = ctx.library.definition(&name, ctx.dialect)?;
    let header = find_subckt(&definition, &name)?;
    let order = match_ports(&component.ports, &header.pins).map_err(|reason| {
        Error::SubcircuitResolution {
            name: name.clone(),
            reason,
        }
    })?;
    Ok(ResolvedInstance {
        name: header.name,
        definition,
        order,
    })
}

/// Matching key of a port alias or pin name: case-folded, `_net` prefix removed
fn alias_key(name: &str) -> String {
    let name = name.trim();
    let stripped = match name.get(..4) {
        Some(prefix) if name.len() > 4 && prefix.eq_ignore_ascii_case("_net") => &name[4..],
        _ => name,
    };
    stripped.to_ascii_lowercase()
}

/// For each definition pin, the index of the instance port wired to it.
///
/// Ports are matched by name; when the instance ports carry no names at all
/// they are taken positionally.
pub fn match_ports(ports: &[Port], pins: &[String]) -> std::result::Result<Vec<usize>, String> {
    if ports.len() != pins.len() {
        return Err(format!(
            "instance has {} ports but definition has {} pins",
            ports.len(),
            pins.len()
        ));
    }

    if ports.iter().all(|p| p.name.trim().is_empty()) {
        return Ok((0..ports.len()).collect());
    }

    pins.iter()
        .map(|pin| {
            let key = alias_key(pin);
            ports
                .iter()
                .position(|p| alias_key(&p.name) == key)
                .ok_or_else(|| format!("pin '{pin}' has no matching port"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, net: &str) -> Port {
        Port {
            name: name.into(),
            net: net.into(),
        }
    }

    #[test]
    fn test_match_by_alias() {
        let ports = [port("out", "n2"), port("IN", "n1"), port("gnd", "0")];
        let pins: Vec<String> = ["_netin", "_netout", "gnd"].map(String::from).to_vec();
        assert_eq!(match_ports(&ports, &pins).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_match_positional_and_errors() {
        let ports = [port("", "a"), port("", "b")];
        let pins: Vec<String> = ["x", "y"].map(String::from).to_vec();
        assert_eq!(match_ports(&ports, &pins).unwrap(), vec![0, 1]);

        let ports = [port("a", "n1"), port("c", "n2")];
        let err = match_ports(&ports, &pins).unwrap_err();
        assert_eq!(err, "pin 'x' has no matching port");

        assert!(match_ports(&ports[..1], &pins).is_err());
    }

    #[test]
    fn test_subcircuit_name() {
        let c = Component::new("Sub", "SUB1").prop("File", "filters/lowpass.sch");
        assert_eq!(subcircuit_name(&c).as_deref(), Some("lowpass"));
        let c = c.prop("Type", "LP2");
        assert_eq!(subcircuit_name(&c).as_deref(), Some("LP2"));
        assert_eq!(subcircuit_name(&Component::new("Sub", "SUB2")), None);
    }
}
