//! DC sensitivity tables printed to the log.
//!
//! A table starts with a line naming its output
//! (`DC Sensitivities of output v(out)`, or Xyce's
//! `Direct Sensitivities of objective function V(2):`); each row is an
//! element name followed by its value, sensitivity and, optionally, the
//! normalized sensitivity.

use regex::Regex;
use std::sync::LazyLock;

use num_complex::Complex64;

use super::{parse_number, scalar_plot, Plot};

static TABLE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sensitivit(?:y|ies)\s+of\s+(?:output|objective\s+function)\s*:?\s*(\S+?):?\s*$")
        .unwrap()
});

/// Parse every sensitivity table into one single-point plot
pub fn parse_sensitivity(text: &str) -> Vec<Plot> {
    let mut values: Vec<(String, Complex64)> = Vec::new();
    let mut output: Option<String> = None;

    for line in text.lines() {
        if let Some(caps) = TABLE_START.captures(line) {
            output = Some(caps[1].to_string());
            continue;
        }
        let Some(output) = &output else { continue };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if !(3..=4).contains(&fields.len()) || parse_number(fields[0]).is_some() {
            continue;
        }
        let Some(numbers) = fields[1..]
            .iter()
            .map(|f| parse_number(f))
            .collect::<Option<Vec<f64>>>()
        else {
            continue;
        };

        let element = fields[0].to_string();
        values.push((
            format!("sens({output},{element})"),
            Complex64::new(numbers[1], 0.0),
        ));
        if let Some(normalized) = numbers.get(2) {
            values.push((
                format!("nsens({output},{element})"),
                Complex64::new(*normalized, 0.0),
            ));
        }
    }
    scalar_plot("Sensitivity", values).into_iter().collect()
}
