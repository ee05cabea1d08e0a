//! Engineering-notation value normalization per target dialect

use regex::Regex;
use std::sync::LazyLock;

use crate::config::Dialect;
use crate::error::{Error, Result};

/// `<mantissa> [multiplier] [unit]`, e.g. "1 kOhm", "4.7u", "1e-4", "10 MegHz"
static VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)\s*(Meg|MEG|meg|[TGMKkmunpfaµμ])?\s*(Ohm|ohm|Ω|Hz|F|H|V|A|S|s|W|m)?$",
    )
    .unwrap()
});

/// Physical quantity a property carries; restricts the accepted unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    Resistance,
    Capacitance,
    Inductance,
    Voltage,
    Current,
    Frequency,
    Conductance,
    Time,
    Power,
    Length,
    /// Accept any known unit
    Any,
}

impl QuantityKind {
    fn accepts(self, unit: &str) -> bool {
        match self {
            QuantityKind::Resistance => matches!(unit, "Ohm" | "ohm" | "Ω"),
            QuantityKind::Capacitance => unit == "F",
            QuantityKind::Inductance => unit == "H",
            QuantityKind::Voltage => unit == "V",
            QuantityKind::Current => unit == "A",
            QuantityKind::Frequency => unit == "Hz",
            QuantityKind::Conductance => unit == "S",
            QuantityKind::Time => unit == "s",
            QuantityKind::Power => unit == "W",
            QuantityKind::Length => unit == "m",
            QuantityKind::Any => true,
        }
    }
}

/// A parsed value: mantissa text, optional multiplier and optional unit
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Mantissa exactly as written (sign and exponent included)
    pub mantissa: String,
    /// Multiplier letter or word as written ("k", "Meg", "µ", …)
    pub multiplier: Option<String>,
    /// Unit as written ("Ohm", "F", "Hz", …)
    pub unit: Option<String>,
}

impl Value {
    /// Numeric magnitude in base units
    pub fn magnitude(&self) -> f64 {
        let mantissa: f64 = self.mantissa.parse().unwrap_or(0.0);
        mantissa * self.multiplier.as_deref().map(multiplier_factor).unwrap_or(1.0)
    }

    fn multiplier_for(&self, dialect: Dialect) -> &'static str {
        let Some(m) = self.multiplier.as_deref() else {
            return "";
        };
        match (canonical_multiplier(m), dialect) {
            ("M", d) if d.is_spice_family() => "Meg",
            (c, _) => c,
        }
    }
}

/// Parse engineering notation such as "1 kOhm", "26.85", "1e-4" or "2.2Meg"
pub fn parse_value(raw: &str) -> Result<Value> {
    let text = raw.trim();
    let caps = VALUE_PATTERN
        .captures(text)
        .ok_or_else(|| Error::ValueParse(raw.to_string()))?;

    Ok(Value {
        mantissa: caps[1].to_string(),
        multiplier: caps.get(2).map(|m| m.as_str().to_string()),
        unit: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Parse a value and return its magnitude in base units
pub fn parse_magnitude(raw: &str) -> Result<f64> {
    let text = raw.trim();
    let text = text
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(text);
    parse_value(text).map(|v| v.magnitude())
}

/// Normalize a value for the given dialect
///
/// Examples (resistance):
/// - ngspice/Xyce/CDL: "1 kOhm" → "1k", "2.2 MOhm" → "2.2Meg", "2.2M" → "2.2Meg"
/// - Verilog-A: "2.2 MOhm" → "2.2M"
/// - Qucsator: "2.2MOhm" → "2.2 MOhm", "1k" → "1 k"
///
/// Single-quoted values lose their quotes; the content is normalized like
/// any other value when it parses. Values with a unit of another quantity,
/// and values that cannot be parsed at all, are returned unchanged.
pub fn normalize(raw: &str, kind: QuantityKind, dialect: Dialect) -> String {
    match try_normalize(raw, kind, dialect) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("{e}; keeping raw text");
            raw.to_string()
        }
    }
}

/// Like [`normalize`] but reports values that cannot be parsed
pub fn try_normalize(raw: &str, kind: QuantityKind, dialect: Dialect) -> Result<String> {
    let trimmed = raw.trim();
    if let Some(expr) = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        return Ok(try_normalize(expr, kind, dialect).unwrap_or_else(|_| expr.trim().to_string()));
    }

    let value = parse_value(trimmed)?;
    let unit = match value.unit.as_deref() {
        Some(unit) if kind.accepts(unit) => unit,
        Some(_) => return Ok(raw.to_string()),
        None => "",
    };

    let multiplier = value.multiplier_for(dialect);
    let out = match dialect {
        Dialect::QucsatorNative => {
            let unit = if matches!(unit, "ohm" | "Ω") { "Ohm" } else { unit };
            let suffix = format!("{multiplier}{unit}");
            if suffix.is_empty() {
                value.mantissa
            } else {
                format!("{} {suffix}", value.mantissa)
            }
        }
        _ => format!("{}{}", value.mantissa, multiplier),
    };
    Ok(out)
}

/// Format a derived number (sweep step, points per decade) for a netlist
pub fn format_number(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if (1e-3..1e6).contains(&abs) {
        format!("{v}")
    } else {
        format!("{v:e}")
    }
}

fn canonical_multiplier(m: &str) -> &'static str {
    match m {
        "T" => "T",
        "G" => "G",
        "M" | "Meg" | "MEG" | "meg" => "M",
        "k" | "K" => "k",
        "m" => "m",
        "u" | "µ" | "μ" => "u",
        "n" => "n",
        "p" => "p",
        "f" => "f",
        "a" => "a",
        _ => "",
    }
}

fn multiplier_factor(m: &str) -> f64 {
    match canonical_multiplier(m) {
        "T" => 1e12,
        "G" => 1e9,
        "M" => 1e6,
        "k" => 1e3,
        "m" => 1e-3,
        "u" => 1e-6,
        "n" => 1e-9,
        "p" => 1e-12,
        "f" => 1e-15,
        "a" => 1e-18,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spice_resistance() {
        for d in [Dialect::Ngspice, Dialect::Xyce, Dialect::Cdl] {
            assert_eq!(normalize("1 kOhm", QuantityKind::Resistance, d), "1k");
            assert_eq!(normalize("2.2 MOhm", QuantityKind::Resistance, d), "2.2Meg");
            assert_eq!(normalize("50 Ohm", QuantityKind::Resistance, d), "50");
            assert_eq!(normalize("10 mOhm", QuantityKind::Resistance, d), "10m");
        }
    }

    #[test]
    fn test_spice_other_quantities() {
        let d = Dialect::Ngspice;
        assert_eq!(normalize("10 uF", QuantityKind::Capacitance, d), "10u");
        assert_eq!(normalize("4.7µF", QuantityKind::Capacitance, d), "4.7u");
        assert_eq!(normalize("1 F", QuantityKind::Capacitance, d), "1");
        assert_eq!(normalize("100 nH", QuantityKind::Inductance, d), "100n");
        assert_eq!(normalize("10 MHz", QuantityKind::Frequency, d), "10Meg");
        assert_eq!(normalize("1 mS", QuantityKind::Conductance, d), "1m");
        assert_eq!(normalize("-5 V", QuantityKind::Voltage, d), "-5");
        assert_eq!(normalize("1 ms", QuantityKind::Time, d), "1m");
        assert_eq!(normalize("10 um", QuantityKind::Length, d), "10u");
        // a bare `m` is milli, not metre
        assert_eq!(normalize("10 m", QuantityKind::Length, d), "10m");
    }

    #[test]
    fn test_verilog_a_and_qucsator() {
        assert_eq!(
            normalize("2.2 MOhm", QuantityKind::Resistance, Dialect::VerilogA),
            "2.2M"
        );
        assert_eq!(
            normalize("1kOhm", QuantityKind::Resistance, Dialect::QucsatorNative),
            "1 kOhm"
        );
        assert_eq!(
            normalize("2.2MegOhm", QuantityKind::Resistance, Dialect::QucsatorNative),
            "2.2 MOhm"
        );
    }

    #[test]
    fn test_without_unit() {
        assert_eq!(normalize("26.85", QuantityKind::Any, Dialect::Ngspice), "26.85");
        assert_eq!(normalize("1e-4", QuantityKind::Any, Dialect::Xyce), "1e-4");
        assert_eq!(normalize("4.7k", QuantityKind::Resistance, Dialect::Ngspice), "4.7k");
        // Unit of the wrong quantity is not a recognized suffix
        assert_eq!(
            normalize("1 uF", QuantityKind::Resistance, Dialect::Ngspice),
            "1 uF"
        );
    }

    #[test]
    fn test_bare_multiplier_spelling() {
        for d in [Dialect::Ngspice, Dialect::Xyce, Dialect::SpiceOpus, Dialect::Cdl] {
            assert_eq!(normalize("2.2M", QuantityKind::Resistance, d), "2.2Meg", "{d}");
            assert_eq!(normalize("1 k", QuantityKind::Resistance, d), "1k", "{d}");
            assert_eq!(normalize("1Meg", QuantityKind::Any, d), "1Meg", "{d}");
        }
        assert_eq!(normalize("2.2M", QuantityKind::Resistance, Dialect::VerilogA), "2.2M");
        assert_eq!(normalize("1 k", QuantityKind::Resistance, Dialect::VerilogA), "1k");
        assert_eq!(normalize("1Meg", QuantityKind::Any, Dialect::VerilogA), "1M");
        assert_eq!(
            normalize("2.2M", QuantityKind::Resistance, Dialect::QucsatorNative),
            "2.2 M"
        );
        assert_eq!(
            normalize("1 k", QuantityKind::Resistance, Dialect::QucsatorNative),
            "1 k"
        );

        for d in Dialect::ALL {
            for raw in ["2.2M", "1 k", "1Meg"] {
                let n = normalize(raw, QuantityKind::Any, d);
                assert!(!n.contains(char::is_whitespace) || d == Dialect::QucsatorNative, "{d}: {n}");
                let expected = parse_magnitude(raw).unwrap();
                let m = parse_magnitude(&n).unwrap();
                assert!((m - expected).abs() < 1e-6, "{d}: {raw} -> {n}");
            }
        }
    }

    #[test]
    fn test_unparseable_is_error_but_normalize_keeps_text() {
        assert!(try_normalize("abc", QuantityKind::Any, Dialect::Ngspice).is_err());
        assert_eq!(normalize("abc", QuantityKind::Any, Dialect::Ngspice), "abc");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "1 kOhm", "2.2 MOhm", "10 uF", "100 nH", "26.85", "1e-4", "'a+b'", "5 V",
            "1 GHz", "3.3", "-1.5e3 mV", "x", "10 MegHz", "0.5 pF", "'1 kOhm'", "'2.2M'",
            "2.2M", "1 k",
        ];
        for d in Dialect::ALL {
            for s in samples {
                let once = normalize(s, QuantityKind::Any, d);
                let twice = normalize(&once, QuantityKind::Any, d);
                assert_eq!(once, twice, "{s} in {d}");
            }
        }
    }

    #[test]
    fn test_magnitude_preserved() {
        let v = parse_value("2.2 MOhm").unwrap();
        assert!((v.magnitude() - 2.2e6).abs() < 1e-6);
        // SPICE `Meg`, Verilog-A `M` and Qucsator `M` all read back as mega
        for d in Dialect::ALL {
            let n = normalize("2.2 MOhm", QuantityKind::Resistance, d);
            let m = parse_magnitude(&n).unwrap();
            assert!((m - 2.2e6).abs() < 1e-6, "{d}: {n}");
        }
        assert!((parse_magnitude("1 kHz").unwrap() - 1e3).abs() < 1e-9);
        assert!((parse_magnitude("'1 ms'").unwrap() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(199.0), "199");
        assert_eq!(format_number(1e-6), "1e-6");
        assert_eq!(format_number(0.5), "0.5");
    }
}
