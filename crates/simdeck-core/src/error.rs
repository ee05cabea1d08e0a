//! Error types for netlist generation, simulator runs and result parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for simdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building decks, running simulators or
/// decoding their output.
#[derive(Debug, Error)]
pub enum Error {
    /// A property string did not match any numeric/unit pattern.
    #[error("cannot parse value '{0}'")]
    ValueParse(String),

    /// An equation contained an unbalanced or unrecognized construct.
    #[error("equation syntax error in '{equation}': {reason}")]
    EquationSyntax { equation: String, reason: String },

    /// A referenced subcircuit could not be opened or its pins recovered.
    #[error("cannot resolve subcircuit '{name}': {reason}")]
    SubcircuitResolution { name: String, reason: String },

    /// The simulator binary could not be started.
    #[error("cannot launch '{program}': {reason}")]
    ProcessLaunch { program: String, reason: String },

    /// The simulator exited abnormally.
    #[error("{program} exited with {status}\n{stderr}")]
    SimulatorFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The simulator did not finish in time.
    #[error("{program} timed out after {secs} seconds")]
    SimulatorTimeout { program: String, secs: u64 },

    /// Declared counts in a result file disagree with the decoded data.
    #[error("malformed result file {path}: {reason}")]
    ResultFormat { path: PathBuf, reason: String },

    /// The analysis cannot be parsed for the requested simulator.
    #[error("unsupported analysis: {0}")]
    UnsupportedAnalysis(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file error.
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn result_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ResultFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn equation(equation: &str, reason: impl Into<String>) -> Self {
        Error::EquationSyntax {
            equation: equation.to_string(),
            reason: reason.into(),
        }
    }
}
