//! Pole-zero results printed to the log.
//!
//! Poles are listed before zeros, one root per line:
//! `pole(1) = -1.00000e+03, 0.00000e+00` (real, imaginary) or
//! `zero(1) = -1.0e+03 + j 2.0e+02`. A `poles`/`zeros` heading switches
//! the section for bare `(n) = …` lines.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use num_complex::Complex64;

use super::{parse_number, scalar_plot, Plot};
use crate::error::{Error, Result};

static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(pole|zero)?\s*\(\s*(\d+)\s*\)\s*=\s*(.+)$").unwrap()
});

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(pole|zero)s?\s*:?\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Poles,
    Zeros,
}

impl Section {
    fn from_word(word: &str) -> Self {
        if word.eq_ignore_ascii_case("zero") {
            Section::Zeros
        } else {
            Section::Poles
        }
    }

    fn name(self) -> &'static str {
        match self {
            Section::Poles => "pole",
            Section::Zeros => "zero",
        }
    }
}

/// `re, im`, `re im` or `re +/- j im`
fn parse_root(text: &str) -> Option<Complex64> {
    let text = text.trim();
    if let Some(j) = text.find(['j', 'J']) {
        let (re, rest) = text[..j].trim_end().split_at(
            text[..j]
                .trim_end()
                .rfind(['+', '-'])
                .filter(|&i| i > 0)?,
        );
        let sign = if rest.starts_with('-') { -1.0 } else { 1.0 };
        let im = parse_number(&text[j + 1..])?;
        return Some(Complex64::new(parse_number(re)?, sign * im));
    }
    let mut parts = text.split([',', ' ', '\t']).filter(|p| !p.is_empty());
    let re = parse_number(parts.next()?)?;
    let im = match parts.next() {
        Some(p) => parse_number(p)?,
        None => 0.0,
    };
    Some(Complex64::new(re, im))
}

/// Parse the poles and zeros of a log into one single-point plot
pub fn parse_pole_zero(text: &str, path: &Path) -> Result<Vec<Plot>> {
    let mut section = Section::Poles;
    let mut roots: Vec<(String, Complex64)> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = HEADING.captures(line) {
            section = Section::from_word(&caps[1]);
            continue;
        }
        let Some(caps) = ROOT.captures(line) else {
            continue;
        };
        if let Some(word) = caps.get(1) {
            section = Section::from_word(word.as_str());
        }
        let value = parse_root(&caps[3]).ok_or_else(|| {
            Error::result_format(path, format!("cannot read root '{}'", line.trim()))
        })?;
        roots.push((format!("{}({})", section.name(), &caps[2]), value));
    }

    Ok(scalar_plot("Pole-zero analysis", roots).into_iter().collect())
}
