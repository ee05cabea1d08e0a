//! CDL subcircuit-call prefix repair.
//!
//! An `X` instance whose `(subcircuit, pin count)` is not defined in the deck
//! is demoted to a primitive device by removing the `X`. Matching only
//! counts pins; two definitions sharing a name and pin count are not told
//! apart.

use std::collections::HashSet;

use crate::parser::{logical_lines, parse_subckt_header};

/// Subcircuits defined in one deck, keyed by upper-cased name and pin count
#[derive(Debug, Default)]
pub struct PrefixResolver {
    defined: HashSet<(String, usize)>,
}

impl PrefixResolver {
    /// Collect every `.SUBCKT`/`.MACRO` definition in `deck`
    pub fn scan(deck: &str) -> Self {
        let defined = logical_lines(deck)
            .iter()
            .filter_map(|l| parse_subckt_header(l))
            .map(|h| (h.name.to_ascii_uppercase(), h.pins.len()))
            .collect();
        Self { defined }
    }

    pub fn is_defined(&self, name: &str, pins: usize) -> bool {
        self.defined.contains(&(name.to_ascii_uppercase(), pins))
    }

    /// The repaired line, or `None` when `line` needs no change
    pub fn resolve(&self, line: &str) -> Option<String> {
        let (name, pins) = instance_key(line)?;
        if self.is_defined(&name, pins) {
            return None;
        }
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        Some(format!("{indent}{}", &trimmed[1..]))
    }
}

/// `(subcircuit, pin count)` referenced by an `X` instance line.
///
/// Handles both `Xname n1 n2 SUB p=v` and the alternate
/// `Xname n1 n2 / SUB p=v` syntax.
fn instance_key(line: &str) -> Option<(String, usize)> {
    let mut tokens = line.split_whitespace();
    let designator = tokens.next()?;
    if designator.len() < 2 || !designator.starts_with(['X', 'x']) {
        return None;
    }

    let rest: Vec<&str> = tokens
        .take_while(|t| !t.contains('=') && !t.eq_ignore_ascii_case("params:"))
        .collect();

    if let Some(slash) = rest.iter().position(|t| t.starts_with('/')) {
        let model = match rest[slash].strip_prefix('/') {
            Some(m) if !m.is_empty() => m,
            _ => rest.get(slash + 1)?,
        };
        return Some((model.to_string(), slash));
    }

    let (model, pins) = rest.split_last()?;
    Some((model.to_string(), pins.len()))
}

/// Repair every instance line of a CDL deck; continuation lines are joined
pub fn resolve_prefixes(deck: &str) -> String {
    let resolver = PrefixResolver::scan(deck);
    let mut out = String::new();
    for line in logical_lines(deck) {
        match resolver.resolve(&line) {
            Some(fixed) => {
                log::debug!("no definition for '{line}', stripping call prefix");
                out.push_str(&fixed);
            }
            None => out.push_str(&line),
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "\
* top
.SUBCKT SUB_A a b c
R1 a b 1k
.ENDS
Xfoo n1 n2 n3 SUB_A
Xbar n1 n2 SUB_B
.END
";

    #[test]
    fn test_defined_instance_kept_undefined_stripped() {
        let fixed = resolve_prefixes(DECK);
        assert!(fixed.contains("\nXfoo n1 n2 n3 SUB_A\n"));
        assert!(fixed.contains("\nbar n1 n2 SUB_B\n"));
    }

    #[test]
    fn test_pin_count_is_part_of_the_key() {
        let resolver = PrefixResolver::scan(DECK);
        assert_eq!(resolver.resolve("Xfoo n1 n2 n3 SUB_A"), None);
        assert_eq!(
            resolver.resolve("Xbaz n1 n2 SUB_A").as_deref(),
            Some("baz n1 n2 SUB_A")
        );
        assert_eq!(resolver.resolve("xq n1 n2 n3 sub_a"), None);
        assert_eq!(resolver.resolve("R1 a b 1k"), None);
    }

    #[test]
    fn test_alternate_syntax_and_params() {
        let deck = ".SUBCKT INV in out vdd vss / W=1u\n.ENDS\n";
        let resolver = PrefixResolver::scan(deck);
        assert!(resolver.is_defined("inv", 4));
        assert_eq!(resolver.resolve("X1 a b vdd 0 / INV W=2u"), None);
        assert_eq!(resolver.resolve("X2 a b vdd 0 /INV"), None);
        assert_eq!(resolver.resolve("X3 a b vdd 0 INV W=2u"), None);
        assert_eq!(
            resolver.resolve("X4 a b / INV").as_deref(),
            Some("4 a b / INV")
        );
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let deck = ".SUBCKT AMP a\n+ b c\n.ENDS\nX1 n1 n2\n+ n3 AMP\nX2 n1\n+ n2 AMP\n";
        let fixed = resolve_prefixes(deck);
        assert!(fixed.contains("X1 n1 n2 n3 AMP\n"));
        assert!(fixed.contains("\n2 n1 n2 AMP\n"));
    }
}
