//! Numeric helpers shared by the arithmetic and currency rules.

use super::{ArithmeticOp, RoundMode};
use crate::error::RuleError;

/// How a lone separator (one `.` or one `,`, nothing else) is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separators {
    /// Always the decimal point: `12.346` is twelve and a bit, `12,5` is 12.5.
    Decimal,
    /// Grouping when exactly three digits follow it: `1.234` is 1234.
    Grouping,
}

/// Parse a number for arithmetic.
///
/// `1,234.5`, `1.234,5`, `1'234.5`, `12,5` and `1 234` are all accepted. When
/// both separators appear the last one is the decimal point; a separator that
/// repeats is grouping; a lone one is always the decimal point.
pub(crate) fn parse_number(raw: &str) -> Result<f64, RuleError> {
    let canonical =
        canonical_digits(raw, Separators::Decimal).ok_or_else(|| RuleError::InvalidNumber(raw.to_string()))?;
    canonical.parse::<f64>().map_err(|_| RuleError::InvalidNumber(raw.to_string()))
}

/// Rewrite `raw` into `[-]digits[.digits]`, or `None` when it is not a number.
pub(crate) fn canonical_digits(raw: &str, lone: Separators) -> Option<String> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let body: String = body.chars().filter(|c| !c.is_whitespace() && *c != '\'').collect();
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');
    let decimal_at = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(i), None) | (None, Some(i)) => {
            let sep = body.as_bytes()[i] as char;
            let occurrences = body.matches(sep).count();
            let digits_after = body.len() - i - 1;
            match lone {
                _ if occurrences > 1 => None,
                Separators::Grouping if digits_after == 3 => None,
                _ => Some(i),
            }
        }
        (None, None) => None,
    };

    let mut out = String::with_capacity(body.len() + 1);
    if negative {
        out.push('-');
    }
    for (i, c) in body.char_indices() {
        match c {
            '0'..='9' => out.push(c),
            _ if Some(i) == decimal_at => out.push('.'),
            _ => {}
        }
    }
    if out.ends_with('.') {
        out.pop();
    }
    Some(out)
}

/// Format with at most `places` decimals, trailing zeros stripped.
pub(crate) fn format_trimmed(value: f64, places: usize) -> String {
    let fixed = format!("{value:.places$}");
    let trimmed = if fixed.contains('.') { fixed.trim_end_matches('0').trim_end_matches('.') } else { fixed.as_str() };
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn round_to(value: f64, places: u32, mode: RoundMode) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    let rounded = match mode {
        RoundMode::Nearest => scaled.round(),
        RoundMode::Up => scaled.ceil(),
        RoundMode::Down => scaled.floor(),
    };
    rounded / factor
}

pub(crate) fn apply_op(lhs: f64, op: ArithmeticOp, rhs: f64) -> Result<f64, RuleError> {
    match op {
        ArithmeticOp::Add => Ok(lhs + rhs),
        ArithmeticOp::Subtract => Ok(lhs - rhs),
        ArithmeticOp::Multiply => Ok(lhs * rhs),
        ArithmeticOp::Divide if rhs == 0.0 => Err(RuleError::DivisionByZero),
        ArithmeticOp::Divide => Ok(lhs / rhs),
    }
}

/// Evaluate `value` followed by an operator chain such as `"* 1.5 + 2"`.
pub(crate) fn evaluate(value: f64, expr: &str) -> Result<f64, RuleError> {
    let step = regex!(r"^\s*([+\-*/])\s*(-?\d+(?:\.\d+)?)");
    let mut rest = expr.trim();
    if rest.is_empty() {
        return Err(RuleError::InvalidExpression(expr.to_string()));
    }
    let mut acc = value;
    while !rest.trim().is_empty() {
        let caps = step.captures(rest).ok_or_else(|| RuleError::InvalidExpression(expr.to_string()))?;
        let op = match &caps[1] {
            "+" => ArithmeticOp::Add,
            "-" => ArithmeticOp::Subtract,
            "*" => ArithmeticOp::Multiply,
            _ => ArithmeticOp::Divide,
        };
        let operand: f64 = caps[2].parse().map_err(|_| RuleError::InvalidExpression(expr.to_string()))?;
        acc = apply_op(acc, op, operand)?;
        rest = &rest[caps[0].len()..];
    }
    Ok(acc)
}

/// North-American amount form: `1234.56`.
pub(crate) fn format_currency(raw: &str) -> Result<String, RuleError> {
    let fail = || RuleError::InvalidCurrency(raw.to_string());
    let kept: String = raw.chars().filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '\'' | '-')).collect();
    let digits = canonical_digits(&kept, Separators::Grouping).ok_or_else(fail)?;
    let amount: f64 = digits.parse().map_err(|_| fail())?;
    let out = format!("{amount:.2}");
    match out.find('.') {
        Some(i) if i + 3 == out.len() => Ok(out),
        _ => Err(fail()),
    }
}
