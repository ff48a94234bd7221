//! Arithmetic offload evaluation.
//!
//! The model hides arithmetic inside delimited segments of its streamed
//! output; this crate evaluates those segments natively. The language is
//! deliberately closed: numeric literals, `+ - * / **`, parentheses, and an
//! allow-list of math names (`pi`, `e`, `tau`, `sqrt`, `abs`). There is no
//! general-purpose evaluator behind it, so model output can never reach
//! anything but this grammar.
//!
//! All entry points are total: invalid input yields `None` or passes
//! through unchanged, never an error.

mod lexer;
mod parser;

use std::sync::OnceLock;

use regex::Regex;

/// Evaluate a single expression.
///
/// Returns `None` for syntax errors, names outside the allow-list,
/// division by zero, and any non-finite result.
pub fn evaluate(input: &str) -> Option<f64> {
    let tokens = lexer::tokenize(input)?;
    let value = parser::parse(&tokens)?;
    value.is_finite().then_some(value)
}

/// Render an evaluation result.
///
/// Integral values print as plain integers. Fractional values are truncated
/// (toward zero, not rounded) to 4 decimal places; a lossy truncation is
/// marked with a trailing `…`, an exact one prints without trailing zeros.
pub fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let truncated = (value * 10_000.0).trunc() / 10_000.0;
    if truncated == value {
        format!("{}", value)
    } else {
        format!("{:.4}…", truncated)
    }
}

fn is_bare_number(text: &str) -> bool {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER
        .get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid number pattern"))
        .is_match(text)
}

/// Correct a `lhs=rhs` equation emitted by the model.
///
/// The left side is re-evaluated and the right side replaced with the true
/// result. Input that is not a two-part equation, has a bare number on the
/// left, a non-number on the right, or an unevaluable left side passes
/// through unchanged.
pub fn process_equation(equation: &str) -> String {
    let parts: Vec<&str> = equation.split('=').collect();
    let [left_raw, right_raw] = parts[..] else {
        return equation.to_string();
    };

    let left = left_raw.replace(' ', "");
    let right = right_raw.trim();

    if is_bare_number(&left) || !is_bare_number(right) {
        return equation.to_string();
    }

    match evaluate(&left) {
        Some(value) => format!("{}={}", left, format_result(value)),
        None => equation.to_string(),
    }
}

/// Evaluate a bracketed, comma-separated expression list.
///
/// Each entry is evaluated independently; entries that fail are dropped, so
/// a partially valid list still yields the valid lines.
pub fn evaluate_list(input: &str) -> Vec<String> {
    let inner = input.trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    inner
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|expr| {
            evaluate(expr).map(|value| format!("{} = {}", expr, format_result(value)))
        })
        .collect()
}
