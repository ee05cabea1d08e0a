//! Function and constant name tables per dialect

use super::Token;
use crate::config::Dialect;

/// Constants shared by the SPICE dialects
const SPICE_CONSTANTS: &[(&str, &str)] = &[
    ("pi", "3.141592653589793"),
    ("e", "2.718281828459045"),
    ("kB", "1.380649e-23"),
    ("q", "1.602176634e-19"),
];

const NGSPICE_FUNCTIONS: &[(&str, &str)] = &[
    ("step", "u"),
    ("sign", "sgn"),
    ("arctan", "atan"),
    ("arcsin", "asin"),
    ("arccos", "acos"),
    ("limexp", "exp"),
];

const XYCE_FUNCTIONS: &[(&str, &str)] = &[
    ("step", "stp"),
    ("sign", "sgn"),
    ("ln", "log"),
    ("arctan", "atan"),
    ("arcsin", "asin"),
    ("arccos", "acos"),
    ("limexp", "limit_exp"),
];

const VERILOG_A_CONSTANTS: &[(&str, &str)] = &[
    ("pi", "`M_PI"),
    ("e", "`M_E"),
    ("kB", "`P_K"),
    ("q", "`P_Q"),
];

const VERILOG_A_FUNCTIONS: &[(&str, &str)] = &[
    ("log10", "log"),
    ("arctan", "atan"),
    ("arcsin", "asin"),
    ("arccos", "acos"),
];

/// Dialect name of a constant, if it is translated
pub fn translate_constant(name: &str, dialect: Dialect) -> Option<&'static str> {
    let table = match dialect {
        Dialect::QucsatorNative => return None,
        Dialect::VerilogA => VERILOG_A_CONSTANTS,
        _ => SPICE_CONSTANTS,
    };
    lookup(table, name)
}

/// Dialect name of a function, if it is translated
pub fn translate_function(name: &str, dialect: Dialect) -> Option<&'static str> {
    let table = match dialect {
        Dialect::QucsatorNative => return None,
        Dialect::VerilogA => VERILOG_A_FUNCTIONS,
        Dialect::Xyce => XYCE_FUNCTIONS,
        Dialect::Ngspice | Dialect::SpiceOpus | Dialect::Cdl => NGSPICE_FUNCTIONS,
    };
    lookup(table, name)
}

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table.iter().find(|(from, _)| *from == name).map(|(_, to)| *to)
}

/// Rewrite function names, constants and the power operator in place.
///
/// Unmapped identifiers pass through unchanged; substituted branch accesses
/// are never touched.
pub fn convert_functions(tokens: &mut [Token], dialect: Dialect) {
    for token in tokens.iter_mut() {
        match token {
            Token::Ident(name) => {
                if let Some(to) = translate_constant(name, dialect) {
                    *name = to.to_string();
                }
            }
            Token::Function(name) => {
                if let Some(to) = translate_function(name, dialect) {
                    *name = to.to_string();
                }
            }
            Token::Operator(op) if op.as_str() == "^" && dialect.is_spice_family() => {
                *op = "**".to_string();
            }
            _ => {}
        }
    }
}
