//! Non-fatal problems collected during a deck build

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Reference designator of the component, if the problem is local to one
    pub component: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.component {
            Some(c) => write!(f, "{level}: {c}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Ordered collection of diagnostics; every entry is also logged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, component: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Warning, component, message.into());
    }

    pub fn error(&mut self, component: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Error, component, message.into());
    }

    fn push(&mut self, severity: Severity, component: Option<&str>, message: String) {
        let diagnostic = Diagnostic {
            severity,
            component: component.map(str::to_string),
            message,
        };
        match severity {
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Error => log::error!("{diagnostic}"),
        }
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }
}
