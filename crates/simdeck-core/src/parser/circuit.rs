//! Circuit graph handed over by the schematic editor (JSON format)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// A circuit: components whose ports are bound to named nets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitGraph {
    /// Schematic title (becomes the deck title or subcircuit name)
    #[serde(default)]
    pub title: String,
    /// Components in schematic order
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A placed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Model identifier (e.g., "R", "_MOSFET", ".AC")
    pub model: String,
    /// Reference designator (e.g., "R1")
    pub name: String,
    /// Ports in declaration order
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Properties in declaration order
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// A component port bound to exactly one net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port alias (pin name for subcircuit instances)
    #[serde(default)]
    pub name: String,
    /// Net name
    pub net: String,
}

/// A component property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Component {
    pub fn new(model: &str, name: &str) -> Self {
        Self {
            model: model.to_string(),
            name: name.to_string(),
            ports: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Append a port bound to `net`
    pub fn port(mut self, name: &str, net: &str) -> Self {
        self.ports.push(Port {
            name: name.to_string(),
            net: net.to_string(),
        });
        self
    }

    /// Append a property
    pub fn prop(mut self, name: &str, value: &str) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            value: value.to_string(),
            visible: true,
        });
        self
    }

    /// Property value by name
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Property value by name, or `default` when absent or blank
    pub fn property_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.property(name) {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }

    /// Net bound to the port at `index`
    pub fn net(&self, index: usize) -> Option<&str> {
        self.ports.get(index).map(|p| p.net.as_str())
    }
}

impl CircuitGraph {
    /// Parse a circuit JSON file
    pub fn parse(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Parse a circuit from JSON content
    pub fn parse_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Number of port bindings per net
    pub fn net_usage(&self) -> BTreeMap<&str, usize> {
        let mut usage = BTreeMap::new();
        for component in &self.components {
            for port in &component.ports {
                *usage.entry(port.net.as_str()).or_insert(0) += 1;
            }
        }
        usage
    }

    /// Subcircuit terminals (`Port` components), ordered by their `Num` property
    pub fn terminals(&self) -> Vec<&Component> {
        let mut ports: Vec<_> = self
            .components
            .iter()
            .filter(|c| c.model == "Port")
            .collect();
        ports.sort_by_key(|c| c.property("Num").and_then(|n| n.trim().parse::<u32>().ok()));
        ports
    }

    /// A schematic with terminals is emitted as a subcircuit definition
    pub fn is_subcircuit(&self) -> bool {
        self.components.iter().any(|c| c.model == "Port")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_circuit() {
        let json = r#"{
            "title": "divider",
            "components": [
                {
                    "model": "R",
                    "name": "R1",
                    "ports": [{"name": "1", "net": "in"}, {"name": "2", "net": "out"}],
                    "properties": [{"name": "R", "value": "1 kOhm"}]
                },
                {
                    "model": "GND",
                    "name": "GND1",
                    "ports": [{"net": "gnd"}]
                }
            ]
        }"#;
        let graph = CircuitGraph::parse_str(json).unwrap();

        assert_eq!(graph.title, "divider");
        assert_eq!(graph.components.len(), 2);

        let r1 = &graph.components[0];
        assert_eq!(r1.property("R"), Some("1 kOhm"));
        assert!(r1.properties[0].visible);
        assert_eq!(r1.net(1), Some("out"));
        assert_eq!(graph.components[1].ports[0].name, "");
    }

    #[test]
    fn test_net_usage_and_terminals() {
        let graph = CircuitGraph {
            title: "sub".to_string(),
            components: vec![
                Component::new("Port", "P2").port("1", "b").prop("Num", "2"),
                Component::new("Port", "P1").port("1", "a").prop("Num", "1"),
                Component::new("R", "R1").port("1", "a").port("2", "b"),
                Component::new("C", "C1").port("1", "b").port("2", "dangling"),
            ],
        };

        let usage = graph.net_usage();
        assert_eq!(usage["a"], 2);
        assert_eq!(usage["b"], 3);
        assert_eq!(usage["dangling"], 1);

        assert!(graph.is_subcircuit());
        let names: Vec<_> = graph.terminals().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["P1", "P2"]);
    }

    #[test]
    fn test_property_or() {
        let c = Component::new("R", "R1").prop("Temp", " ");
        assert_eq!(c.property_or("Temp", "26.85"), "26.85");
        assert_eq!(c.property_or("Tc1", "0"), "0");
    }
}
