//! Parsers for the engine's inputs: the circuit graph and subcircuit definitions

mod circuit;
mod subckt;

pub use circuit::{CircuitGraph, Component, Port, Property};
pub use subckt::{
    find_subckt, logical_lines, parse_subckt_header, DirectoryLibrary, MapLibrary, NoSubcircuits,
    SubcircuitLibrary, SubcktHeader,
};
