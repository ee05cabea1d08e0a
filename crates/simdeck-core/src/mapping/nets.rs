//! Net name → dialect node literal

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::config::Dialect;
use crate::parser::CircuitGraph;

/// Names the schematic uses for the ground net
static GROUND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(gnd|0)$").unwrap());

/// Whether a net name is the ground sentinel
pub fn is_ground(name: &str) -> bool {
    GROUND_PATTERN.is_match(name.trim())
}

/// Node naming for one deck build.
///
/// Ground is rewritten here, at emission time: every net bound to a ground
/// symbol (or spelled `gnd`/`0`) becomes the dialect's ground literal.
#[derive(Debug, Clone)]
pub struct NetNames {
    dialect: Dialect,
    ground: HashSet<String>,
}

impl NetNames {
    pub fn new(graph: &CircuitGraph, dialect: Dialect) -> Self {
        let ground = graph
            .components
            .iter()
            .filter(|c| c.model == "GND")
            .flat_map(|c| c.ports.iter().map(|p| p.net.clone()))
            .collect();
        Self { dialect, ground }
    }

    pub fn is_ground(&self, net: &str) -> bool {
        is_ground(net) || self.ground.contains(net)
    }

    /// The literal written for `net` in this dialect
    pub fn node(&self, net: &str) -> String {
        if self.is_ground(net) {
            return self.dialect.ground_literal().to_string();
        }
        match self.dialect {
            Dialect::VerilogA => sanitize_identifier(net),
            Dialect::QucsatorNative => net.to_string(),
            _ => net.replace(char::is_whitespace, "_"),
        }
    }
}

/// Nets touched by exactly one port (floating), in name order
pub fn floating_nets(graph: &CircuitGraph) -> Vec<String> {
    let usage: BTreeMap<&str, usize> = graph.net_usage();
    usage
        .into_iter()
        .filter(|(net, count)| *count == 1 && !is_ground(net))
        .map(|(net, _)| net.to_string())
        .collect()
}

/// Sanitize a net name to be a valid Verilog-A identifier
pub fn sanitize_identifier(name: &str) -> String {
    let mut result = String::new();

    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if i == 0 && ch.is_ascii_digit() {
                result.push('_');
            }
            result.push(ch);
        } else {
            result.push('_');
        }
    }

    // Handle reserved words
    if matches!(
        result.as_str(),
        "module" | "begin" | "end" | "analog" | "electrical" | "ground" | "input" | "output"
            | "inout" | "real" | "integer" | "parameter" | "branch" | "if" | "else"
    ) {
        result.push('_');
    }

    if result.is_empty() {
        "net".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Component;

    fn graph() -> CircuitGraph {
        CircuitGraph {
            title: String::new(),
            components: vec![
                Component::new("R", "R1").port("1", "in").port("2", "_net0"),
                Component::new("GND", "G1").port("1", "_net0"),
                Component::new("R", "R2").port("1", "in").port("2", "gnd"),
                Component::new("C", "C1").port("1", "float").port("2", "0"),
            ],
        }
    }

    #[test]
    fn test_ground_detection() {
        assert!(is_ground("gnd"));
        assert!(is_ground("GND"));
        assert!(is_ground("0"));
        assert!(!is_ground("00"));
        assert!(!is_ground("vgnd"));
    }

    #[test]
    fn test_ground_rewritten_per_dialect() {
        let g = graph();
        let spice = NetNames::new(&g, Dialect::Ngspice);
        assert_eq!(spice.node("_net0"), "0");
        assert_eq!(spice.node("gnd"), "0");
        assert_eq!(spice.node("in"), "in");

        let va = NetNames::new(&g, Dialect::VerilogA);
        assert_eq!(va.node("_net0"), "gnd");
        assert_eq!(va.node("0"), "gnd");

        let qucs = NetNames::new(&g, Dialect::QucsatorNative);
        assert_eq!(qucs.node("_net0"), "gnd");
    }

    #[test]
    fn test_floating_nets() {
        assert_eq!(floating_nets(&graph()), vec!["float".to_string()]);
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("out"), "out");
        assert_eq!(sanitize_identifier("1n"), "_1n");
        assert_eq!(sanitize_identifier("v+"), "v_");
        assert_eq!(sanitize_identifier("module"), "module_");
        assert_eq!(sanitize_identifier(""), "net");
    }
}
