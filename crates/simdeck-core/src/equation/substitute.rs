//! Branch voltage/current substitution for equation-defined devices

use std::collections::BTreeSet;

use super::Token;
use crate::config::Dialect;

/// Terminals of one branch, already rendered as dialect node literals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub plus: String,
    pub minus: String,
    pub plus_ground: bool,
    pub minus_ground: bool,
}

/// A branch access (`V(a,b)`, `I(a)`, …) and whether it must be negated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub text: String,
    pub negated: bool,
}

impl Branch {
    pub fn new(plus: &str, minus: &str, plus_ground: bool, minus_ground: bool) -> Self {
        Self {
            plus: plus.to_string(),
            minus: minus.to_string(),
            plus_ground,
            minus_ground,
        }
    }

    /// Access function `quantity(…)` for this branch.
    ///
    /// Ground-referenced branches collapse to the single-terminal form; a
    /// grounded plus terminal yields the minus node with `negated` set.
    /// Returns `None` when both terminals are ground.
    pub fn access(&self, quantity: char) -> Option<Access> {
        match (self.plus_ground, self.minus_ground) {
            (false, false) => Some(Access {
                text: format!("{quantity}({},{})", self.plus, self.minus),
                negated: false,
            }),
            (false, true) => Some(Access {
                text: format!("{quantity}({})", self.plus),
                negated: false,
            }),
            (true, false) => Some(Access {
                text: format!("{quantity}({})", self.minus),
                negated: true,
            }),
            (true, true) => None,
        }
    }

    /// Access usable inside an expression
    pub fn expression(&self, quantity: char) -> String {
        match self.access(quantity) {
            Some(Access { text, negated: false }) => text,
            Some(Access { text, negated: true }) => format!("(-{text})"),
            None => "0".to_string(),
        }
    }
}

/// Name of the zero-valued source sensing branch `n` of `designator`
pub fn sense_source_name(designator: &str, n: usize) -> String {
    format!("V{designator}_I{n}")
}

/// Internal node between a branch and its sensing source
pub fn sense_node_name(designator: &str, n: usize) -> String {
    format!("_{designator}_I{n}")
}

/// Branch indices whose current is referenced by any of the equations
pub fn used_currents<'a>(equations: impl IntoIterator<Item = &'a [Token]>) -> BTreeSet<usize> {
    equations
        .into_iter()
        .flatten()
        .filter_map(|t| match t {
            Token::Current(n) => Some(*n),
            _ => None,
        })
        .collect()
}

/// Substitution context for the branches of one component
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    pub dialect: Dialect,
    pub designator: &'a str,
    pub branches: &'a [Branch],
}

impl<'a> Substitution<'a> {
    pub fn new(dialect: Dialect, designator: &'a str, branches: &'a [Branch]) -> Self {
        Self {
            dialect,
            designator,
            branches,
        }
    }

    fn branch(&self, n: usize) -> Option<&Branch> {
        n.checked_sub(1).and_then(|i| self.branches.get(i))
    }

    /// Replace `V<n>` (n ≤ branch count) with a voltage access
    pub fn voltages(&self, tokens: &mut [Token]) {
        for token in tokens.iter_mut() {
            if let Token::Voltage(n) = token {
                if let Some(branch) = self.branch(*n) {
                    *token = Token::Access(branch.expression('V'));
                }
            }
        }
    }

    /// Replace `I<n>` with the current of branch n.
    ///
    /// SPICE dialects read the current through the branch's sensing source;
    /// Verilog-A accesses the branch current directly.
    pub fn currents(&self, tokens: &mut [Token]) {
        for token in tokens.iter_mut() {
            if let Token::Current(n) = token {
                let n = *n;
                let Some(branch) = self.branch(n) else {
                    continue;
                };
                let text = if self.dialect.is_spice_family() {
                    format!("i({})", sense_source_name(self.designator, n))
                } else {
                    branch.expression('I')
                };
                *token = Token::Access(text);
            }
        }
    }
}
