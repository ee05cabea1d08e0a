//! Subcircuit definitions: card-level helpers and definition lookup

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::config::Dialect;
use crate::error::{Error, Result};

/// File extensions tried, in order, by [`DirectoryLibrary`]
const DEFINITION_EXTENSIONS: &[&str] = &["cir", "sp", "ckt", "cdl", "net"];

/// Header of a subcircuit definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcktHeader {
    pub name: String,
    pub pins: Vec<String>,
}

/// Supplies already-built netlists of referenced subcircuits.
///
/// The schematic side owns the referenced schematics; the emitter only asks
/// for their text.
pub trait SubcircuitLibrary {
    /// Netlist text defining subcircuit `name` in `dialect`
    fn definition(&self, name: &str, dialect: Dialect) -> Result<String>;
}

/// A library that resolves nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubcircuits;

impl SubcircuitLibrary for NoSubcircuits {
    fn definition(&self, name: &str, _dialect: Dialect) -> Result<String> {
        Err(Error::SubcircuitResolution {
            name: name.to_string(),
            reason: "no subcircuit library configured".to_string(),
        })
    }
}

/// In-memory definitions keyed by subcircuit name
#[derive(Debug, Default, Clone)]
pub struct MapLibrary {
    definitions: HashMap<String, String>,
}

impl MapLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.definitions.insert(name.to_string(), text.to_string());
    }
}

impl SubcircuitLibrary for MapLibrary {
    fn definition(&self, name: &str, _dialect: Dialect) -> Result<String> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SubcircuitResolution {
                name: name.to_string(),
                reason: "not defined".to_string(),
            })
    }
}

/// Definitions stored as `<dir>/<name>.<ext>` files
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SubcircuitLibrary for DirectoryLibrary {
    fn definition(&self, name: &str, _dialect: Dialect) -> Result<String> {
        for ext in DEFINITION_EXTENSIONS {
            let path = self.root.join(format!("{name}.{ext}"));
            if path.is_file() {
                return fs::read_to_string(&path).map_err(|e| Error::SubcircuitResolution {
                    name: name.to_string(),
                    reason: format!("{}: {e}", path.display()),
                });
            }
        }
        Err(Error::SubcircuitResolution {
            name: name.to_string(),
            reason: format!("no definition file in {}", self.root.display()),
        })
    }
}

/// Join `+` continuation lines onto the statement they continue
pub fn logical_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let line = raw.trim_end();
        if let Some(rest) = line.trim_start().strip_prefix('+') {
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(rest.trim());
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Parse a `.SUBCKT`, `.MACRO` or Qucsator `.Def:` header line.
///
/// Pins are the tokens after the name up to the first parameter (`=`) or
/// alternate-syntax (`/`) marker.
pub fn parse_subckt_header(line: &str) -> Option<SubcktHeader> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let upper = first.to_ascii_uppercase();

    let name = if upper == ".SUBCKT" || upper == ".MACRO" {
        tokens.next()?.to_string()
    } else if let Some(name) = first.strip_prefix(".Def:") {
        if name == "End" {
            return None;
        }
        name.to_string()
    } else {
        return None;
    };

    let pins = tokens
        .take_while(|t| !t.contains('=') && !t.starts_with('/') && !t.eq_ignore_ascii_case("params:"))
        .map(str::to_string)
        .collect();

    Some(SubcktHeader { name, pins })
}

/// Find the header of subcircuit `name` inside a definition text
pub fn find_subckt(text: &str, name: &str) -> Result<SubcktHeader> {
    logical_lines(text)
        .iter()
        .filter_map(|l| parse_subckt_header(l))
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::SubcircuitResolution {
            name: name.to_string(),
            reason: "pin list not found in definition".to_string(),
        })
}
