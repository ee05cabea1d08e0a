//! Integrated noise totals printed to the log (`onoise_total = 1.2e-05`)

use regex::Regex;
use std::sync::LazyLock;

use num_complex::Complex64;

use super::{parse_number, scalar_plot, Plot};

static NOISE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z_][\w.#()]*noise[\w.#()]*)\s*=\s*(\S+)\s*$").unwrap()
});

/// Collect `name = value` noise figures; later values of a name win
pub fn parse_noise(text: &str) -> Vec<Plot> {
    let mut values: Vec<(String, Complex64)> = Vec::new();
    for caps in text.lines().filter_map(|l| NOISE_VALUE.captures(l)) {
        let Some(value) = parse_number(&caps[2]) else {
            continue;
        };
        let name = caps[1].to_string();
        match values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = Complex64::new(value, 0.0),
            None => values.push((name, Complex64::new(value, 0.0))),
        }
    }
    scalar_plot("Integrated noise", values).into_iter().collect()
}
