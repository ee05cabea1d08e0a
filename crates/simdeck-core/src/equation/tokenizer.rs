//! Splitting algebraic expressions into tokens

use super::Token;
use crate::error::{Error, Result};

/// Two-character operators, matched before single characters
const OPERATORS2: &[&str] = &["**", "<=", ">=", "==", "!=", "&&", "||"];
const OPERATORS1: &str = "+-*/^%<>!?:,()";

/// Split an expression into tokens.
///
/// Numbers keep their exponent (`1e-4`) and engineering suffix (`10k`);
/// `V<n>`/`I<n>` identifiers become branch references; an identifier
/// directly followed by `(` is a function name.
pub fn split_equation(expr: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // exponent: e, optional sign, digits
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j], '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            // engineering suffix such as k, Meg, u
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '`' || c == '$' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '.')) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next_is_paren = chars[i..]
                .iter()
                .find(|ch| !ch.is_whitespace())
                .is_some_and(|ch| *ch == '(');
            tokens.push(classify_word(word, next_is_paren));
            continue;
        }

        if let Some(op) = OPERATORS2
            .iter()
            .find(|op| chars[i..].iter().take(2).copied().eq(op.chars()))
        {
            tokens.push(Token::Operator(op.to_string()));
            i += 2;
            continue;
        }

        if OPERATORS1.contains(c) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(Error::equation(expr, "unbalanced ')'"));
                    }
                }
                _ => {}
            }
            tokens.push(Token::Operator(c.to_string()));
            i += 1;
            continue;
        }

        return Err(Error::equation(expr, format!("unexpected character '{c}'")));
    }

    if depth != 0 {
        return Err(Error::equation(expr, "unbalanced '('"));
    }

    Ok(tokens)
}

fn classify_word(word: String, next_is_paren: bool) -> Token {
    if next_is_paren {
        return Token::Function(word);
    }
    if let Some(n) = branch_index(&word, 'V') {
        return Token::Voltage(n);
    }
    if let Some(n) = branch_index(&word, 'I') {
        return Token::Current(n);
    }
    Token::Ident(word)
}

/// `V12` → 12 for prefix 'V'
fn branch_index(word: &str, prefix: char) -> Option<usize> {
    let digits = word.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
