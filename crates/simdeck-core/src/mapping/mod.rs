//! Mapping utilities for schematic → dialect translation

mod devices;
mod nets;
pub mod values;

pub use devices::{device_info, DeviceInfo};
pub use nets::{floating_nets, is_ground, sanitize_identifier, NetNames};
pub use values::{format_number, normalize, parse_magnitude, parse_value, QuantityKind, Value};
