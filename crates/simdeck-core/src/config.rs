//! Target dialects and run configuration.
//!
//! Everything that used to be global application state (active simulator,
//! executable paths, output format) lives in [`SimConfig`] and is passed
//! explicitly to the emitter, the launcher and the result parsers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;

/// Output format family of a generated netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Qucsator's own `Model:Name node… prop="value"` netlist.
    #[serde(rename = "qucsator")]
    QucsatorNative,
    #[default]
    Ngspice,
    Xyce,
    SpiceOpus,
    /// Circuit description language (LVS decks), no analyses.
    Cdl,
    /// A Verilog-A module.
    #[serde(rename = "veriloga")]
    VerilogA,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::QucsatorNative,
        Dialect::Ngspice,
        Dialect::Xyce,
        Dialect::SpiceOpus,
        Dialect::Cdl,
        Dialect::VerilogA,
    ];

    /// SPICE card syntax: element letter prefixes, `+` continuation, `0` ground.
    pub fn is_spice_family(self) -> bool {
        matches!(
            self,
            Dialect::Ngspice | Dialect::Xyce | Dialect::SpiceOpus | Dialect::Cdl
        )
    }

    /// Whether decks in this dialect carry analyses and can be simulated.
    pub fn is_simulator(self) -> bool {
        matches!(
            self,
            Dialect::QucsatorNative | Dialect::Ngspice | Dialect::Xyce | Dialect::SpiceOpus
        )
    }

    /// The literal written for the ground net.
    pub fn ground_literal(self) -> &'static str {
        if self.is_spice_family() {
            "0"
        } else {
            "gnd"
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::QucsatorNative => "qucsator",
            Dialect::Ngspice => "ngspice",
            Dialect::Xyce => "xyce",
            Dialect::SpiceOpus => "spiceopus",
            Dialect::Cdl => "cdl",
            Dialect::VerilogA => "veriloga",
        }
    }

    /// Customary file extension of a deck in this dialect
    pub fn extension(self) -> &'static str {
        match self {
            Dialect::QucsatorNative => "net",
            Dialect::Cdl => "cdl",
            Dialect::VerilogA => "va",
            _ => "cir",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.name() == lower)
            .or(match lower.as_str() {
                "qucs" => Some(Dialect::QucsatorNative),
                "va" | "verilog-a" => Some(Dialect::VerilogA),
                _ => None,
            })
            .ok_or_else(|| format!("unknown dialect '{s}'"))
    }
}

/// Encoding requested for simulator raw files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFormat {
    #[default]
    Binary,
    Ascii,
}

/// Byte order of binary raw-file samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// An external command: program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Executable names or paths for each supported simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorPaths {
    pub ngspice: String,
    pub xyce: String,
    pub spiceopus: String,
    pub qucsator: String,
}

impl Default for SimulatorPaths {
    fn default() -> Self {
        Self {
            ngspice: "ngspice".to_string(),
            xyce: "Xyce".to_string(),
            spiceopus: "spiceopus".to_string(),
            qucsator: "qucsator".to_string(),
        }
    }
}

/// Configuration for one netlist build / simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Target dialect of the generated deck
    pub dialect: Dialect,
    /// Deck title line; the schematic title when empty
    pub title: String,
    /// Simulator executables
    pub simulators: SimulatorPaths,
    /// Working directory for deck and result files (a temp dir if unset)
    pub workdir: Option<PathBuf>,
    /// Wall-clock limit for one simulator run
    pub timeout_secs: u64,
    /// Filter run over the deck before the simulator is started
    pub preprocess: Option<CommandSpec>,
    /// Raw file encoding requested from the simulator
    pub raw_format: RawFormat,
    /// Byte order of binary raw files
    pub byte_order: ByteOrder,
    /// Prefix for dataset variable names, joined before the analysis name
    pub dataset_prefix: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            title: String::new(),
            simulators: SimulatorPaths::default(),
            workdir: None,
            timeout_secs: 300,
            preprocess: None,
            raw_format: RawFormat::default(),
            byte_order: ByteOrder::default(),
            dataset_prefix: None,
        }
    }
}

impl SimConfig {
    /// Configuration with defaults for the given dialect
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Simulator executable for the configured dialect, if it simulates at all
    pub fn executable(&self) -> Option<&str> {
        match self.dialect {
            Dialect::Ngspice => Some(&self.simulators.ngspice),
            Dialect::Xyce => Some(&self.simulators.xyce),
            Dialect::SpiceOpus => Some(&self.simulators.spiceopus),
            Dialect::QucsatorNative => Some(&self.simulators.qucsator),
            Dialect::Cdl | Dialect::VerilogA => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("ngspice".parse::<Dialect>().unwrap(), Dialect::Ngspice);
        assert_eq!("Xyce".parse::<Dialect>().unwrap(), Dialect::Xyce);
        assert_eq!("qucs".parse::<Dialect>().unwrap(), Dialect::QucsatorNative);
        assert_eq!("verilog-a".parse::<Dialect>().unwrap(), Dialect::VerilogA);
        assert!("hspice".parse::<Dialect>().is_err());
        assert_eq!(Dialect::QucsatorNative.extension(), "net");
        assert_eq!(Dialect::Xyce.extension(), "cir");
    }

    #[test]
    fn test_ground_literal() {
        assert_eq!(Dialect::Ngspice.ground_literal(), "0");
        assert_eq!(Dialect::Cdl.ground_literal(), "0");
        assert_eq!(Dialect::VerilogA.ground_literal(), "gnd");
        assert_eq!(Dialect::QucsatorNative.ground_literal(), "gnd");
    }

    #[test]
    fn test_config_from_toml() {
        let config = SimConfig::from_toml_str(
            r#"
dialect = "xyce"
timeout_secs = 10
raw_format = "ascii"

[simulators]
xyce = "/opt/xyce/bin/Xyce"
"#,
        )
        .unwrap();

        assert_eq!(config.dialect, Dialect::Xyce);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.raw_format, RawFormat::Ascii);
        assert_eq!(config.executable(), Some("/opt/xyce/bin/Xyce"));
        assert_eq!(config.simulators.ngspice, "ngspice");
        assert_eq!(config.byte_order, ByteOrder::Little);
    }

    #[test]
    fn test_non_simulating_dialects() {
        assert!(SimConfig::for_dialect(Dialect::Cdl).executable().is_none());
        assert!(!Dialect::VerilogA.is_simulator());
        assert!(Dialect::QucsatorNative.is_simulator());
    }
}
