//! Equation tokenizing and translation between schematic and dialect notation.
//!
//! The pipeline is an explicit sequence of token-stream stages, each pure:
//! tokenize → substitute voltages → substitute currents → translate
//! functions → render. Substituted accesses become [`Token::Access`] and are
//! opaque to the later stages.

mod functions;
mod substitute;
mod tokenizer;

pub use functions::{convert_functions, translate_constant, translate_function};
pub use substitute::{
    sense_node_name, sense_source_name, used_currents, Access, Branch, Substitution,
};
pub use tokenizer::split_equation;

use crate::config::Dialect;
use crate::error::Result;

/// An equation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Numeric literal, exponent and engineering suffix included
    Number(String),
    /// Variable or constant name
    Ident(String),
    /// Name of a called function
    Function(String),
    /// Operator, parenthesis or comma
    Operator(String),
    /// `V<n>`: voltage of branch n
    Voltage(usize),
    /// `I<n>`: current of branch n
    Current(usize),
    /// Substituted dialect access expression
    Access(String),
}

/// Join tokens back into text
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Number(s)
            | Token::Ident(s)
            | Token::Function(s)
            | Token::Operator(s)
            | Token::Access(s) => out.push_str(s),
            Token::Voltage(n) => {
                out.push('V');
                out.push_str(&n.to_string());
            }
            Token::Current(n) => {
                out.push('I');
                out.push_str(&n.to_string());
            }
        }
    }
    out
}

/// Translate a plain parameter expression (no branch references)
pub fn translate_expression(expr: &str, dialect: Dialect) -> Result<String> {
    let mut tokens = split_equation(expr)?;
    convert_functions(&mut tokens, dialect);
    Ok(render(&tokens))
}

/// Run the full pipeline on already-split tokens
pub fn translate_tokens(mut tokens: Vec<Token>, sub: &Substitution<'_>) -> String {
    sub.voltages(&mut tokens);
    sub.currents(&mut tokens);
    convert_functions(&mut tokens, sub.dialect);
    render(&tokens)
}

/// Tokenize and run the full pipeline on one branch equation
pub fn translate(expr: &str, sub: &Substitution<'_>) -> Result<String> {
    Ok(translate_tokens(split_equation(expr)?, sub))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_expression() {
        assert_eq!(
            translate_expression("2*pi*f0", Dialect::VerilogA).unwrap(),
            "2*`M_PI*f0"
        );
        assert_eq!(
            translate_expression("x^2 + sign(y)", Dialect::Ngspice).unwrap(),
            "x**2+sgn(y)"
        );
        assert!(translate_expression("(x", Dialect::Ngspice).is_err());
    }

    #[test]
    fn test_full_pipeline() {
        let branches = [Branch::new("p", "0", false, true)];
        let sub = Substitution::new(Dialect::Xyce, "D1", &branches);
        assert_eq!(
            translate("1e-12*(exp(V1/0.025)-1) + I1*q", &sub).unwrap(),
            "1e-12*(exp(V(p)/0.025)-1)+i(VD1_I1)*1.602176634e-19"
        );

        let sub = Substitution::new(Dialect::VerilogA, "D1", &branches);
        assert_eq!(
            translate("V1^2*kB", &sub).unwrap(),
            "V(p)^2*`P_K"
        );
    }

    #[test]
    fn test_access_is_not_retranslated() {
        // the `e` inside a substituted access must survive constant translation
        let branches = [Branch::new("e", "0", false, true)];
        let sub = Substitution::new(Dialect::Ngspice, "D1", &branches);
        assert_eq!(translate("V1+e", &sub).unwrap(), "V(e)+2.718281828459045");
    }
}
