//! Formula tokenizing and composition reduction
//!
//! A formula is a sequence of `(symbol, amount)` tokens. Symbols are an
//! uppercase letter followed by lowercase letters, or the wildcard `*`.
//! Amounts are optional decimals. Parenthesised groups carry a multiplier
//! (`Ca(OH)2`).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::element::ordering_electronegativity;
use super::errors::{ChemError, ChemResult};

/// Largest multiplier tried when scaling decimal amounts to integers
const MAX_SCALE: u64 = 1000;

/// Tolerance when deciding whether a scaled amount is integral
const INTEGER_TOLERANCE: f64 = 1e-4;

/// Maximum number of distinct components in an anonymous skeleton
pub const MAX_COMPONENTS: usize = 26;

/// Deepest nesting of parenthesised groups
pub const MAX_GROUP_DEPTH: usize = 8;

/// Longest formula accepted, in characters
pub const MAX_FORMULA_LEN: usize = 256;

/// Pretty formulas whose reduced form is conventionally written differently
const SPECIAL_FORMULAS: &[(&str, &str)] = &[
    ("LiO", "LiO2"),
    ("NaO", "NaO2"),
    ("KO", "KO2"),
    ("HO", "H2O2"),
    ("CsO", "CsO2"),
    ("RbO", "RbO2"),
    ("O", "O2"),
    ("N", "N2"),
    ("F", "F2"),
    ("Cl", "Cl2"),
    ("H", "H2"),
];

/// Token symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A named symbol; not necessarily a real element
    Named(String),
    /// The `*` wildcard
    Wildcard,
}

/// One `(symbol, amount)` pair of a formula
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaToken {
    pub symbol: Symbol,
    pub amount: f64,
}

/// Split a formula into tokens, expanding parenthesised groups
pub fn tokenize(input: &str) -> ChemResult<Vec<FormulaToken>> {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() > MAX_FORMULA_LEN {
        return Err(ChemError::malformed_formula(
            input,
            format!("longer than {} characters", MAX_FORMULA_LEN),
        ));
    }
    let mut pos = 0;
    let tokens = parse_group(&chars, &mut pos, input, 0)?;

    if pos != chars.len() {
        return Err(ChemError::malformed_formula(input, "unbalanced ')'"));
    }
    if tokens.is_empty() {
        return Err(ChemError::malformed_formula(input, "no elements"));
    }

    Ok(tokens)
}

fn parse_group(
    chars: &[char],
    pos: &mut usize,
    input: &str,
    depth: usize,
) -> ChemResult<Vec<FormulaToken>> {
    let mut tokens = Vec::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '(' => {
                if depth >= MAX_GROUP_DEPTH {
                    return Err(ChemError::malformed_formula(
                        input,
                        format!("groups nested deeper than {}", MAX_GROUP_DEPTH),
                    ));
                }
                *pos += 1;
                let inner = parse_group(chars, pos, input, depth + 1)?;
                if chars.get(*pos) != Some(&')') {
                    return Err(ChemError::malformed_formula(input, "unbalanced '('"));
                }
                *pos += 1;
                if inner.is_empty() {
                    return Err(ChemError::malformed_formula(input, "empty group '()'"));
                }
                let multiplier = parse_amount(chars, pos, input)?.unwrap_or(1.0);
                tokens.extend(inner.into_iter().map(|t| FormulaToken {
                    symbol: t.symbol,
                    amount: t.amount * multiplier,
                }));
            }
            ')' => {
                if depth == 0 {
                    return Err(ChemError::malformed_formula(input, "unbalanced ')'"));
                }
                return Ok(tokens);
            }
            '*' => {
                *pos += 1;
                let amount = parse_amount(chars, pos, input)?.unwrap_or(1.0);
                tokens.push(FormulaToken {
                    symbol: Symbol::Wildcard,
                    amount,
                });
            }
            c if c.is_ascii_uppercase() => {
                let mut symbol = String::from(c);
                *pos += 1;
                while let Some(&next) = chars.get(*pos) {
                    if next.is_ascii_lowercase() {
                        symbol.push(next);
                        *pos += 1;
                    } else {
                        break;
                    }
                }
                let amount = parse_amount(chars, pos, input)?.unwrap_or(1.0);
                tokens.push(FormulaToken {
                    symbol: Symbol::Named(symbol),
                    amount,
                });
            }
            other => {
                return Err(ChemError::malformed_formula(
                    input,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(tokens)
}

fn parse_amount(chars: &[char], pos: &mut usize, input: &str) -> ChemResult<Option<f64>> {
    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if c.is_ascii_digit() || c == '.' {
            *pos += 1;
        } else {
            break;
        }
    }

    if start == *pos {
        return Ok(None);
    }

    let text: String = chars[start..*pos].iter().collect();
    let amount: f64 = text
        .parse()
        .map_err(|_| ChemError::malformed_formula(input, format!("invalid amount '{}'", text)))?;

    if amount <= 0.0 {
        return Err(ChemError::malformed_formula(
            input,
            format!("amount must be positive, got '{}'", text),
        ));
    }

    Ok(Some(amount))
}

/// Scale amounts to the lowest integer ratio
pub fn reduce_amounts(amounts: &[f64], input: &str) -> ChemResult<Vec<f64>> {
    let integers = (1..=MAX_SCALE)
        .find_map(|scale| {
            let scaled: Vec<f64> = amounts.iter().map(|a| a * scale as f64).collect();
            scaled
                .iter()
                .all(|s| (s - s.round()).abs() < INTEGER_TOLERANCE)
                .then(|| scaled.iter().map(|s| s.round() as u64).collect::<Vec<u64>>())
        })
        .ok_or_else(|| {
            ChemError::malformed_formula(input, "amounts cannot be expressed as an integer ratio")
        })?;

    let divisor = integers.iter().copied().fold(0, gcd);
    if divisor == 0 {
        return Err(ChemError::malformed_formula(input, "no elements"));
    }

    Ok(integers.iter().map(|n| (n / divisor) as f64).collect())
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn format_amount(amount: f64) -> String {
    if (amount - 1.0).abs() < f64::EPSILON {
        String::new()
    } else if amount.fract() == 0.0 {
        format!("{}", amount as u64)
    } else {
        format!("{}", amount)
    }
}

/// Pretty reduced formula, elements ordered by electronegativity
pub fn reduced_formula(reduced: &BTreeMap<String, f64>) -> String {
    let mut elements: Vec<(&String, &f64)> = reduced.iter().collect();
    elements.sort_by(|(a, _), (b, _)| {
        ordering_electronegativity(a)
            .partial_cmp(&ordering_electronegativity(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b))
    });

    let formula: String = elements
        .iter()
        .map(|(symbol, amount)| format!("{}{}", symbol, format_amount(**amount)))
        .collect();

    SPECIAL_FORMULAS
        .iter()
        .find(|(plain, _)| *plain == formula)
        .map(|(_, special)| special.to_string())
        .unwrap_or(formula)
}

/// Anonymous skeleton: ascending amounts labelled `A`, `B`, `C`, ...
pub fn anonymized_formula(amounts: &[f64]) -> String {
    let mut sorted = amounts.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    sorted
        .iter()
        .zip(b'A'..=b'Z')
        .map(|(amount, letter)| format!("{}{}", letter as char, format_amount(*amount)))
        .collect()
}
