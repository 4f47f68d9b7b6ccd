//! Value rewrites: every rule that maps a working value to a new value.

use super::dates::format_date;
use super::matcher::{compile, literal};
use super::numbers::{apply_op, evaluate, format_currency, format_trimmed, parse_number, round_to};
use super::{LetterCase, Matcher, Replacement, RoundMode, Rule};
use crate::FieldNode;
use crate::error::RuleError;
use chrono::NaiveDateTime;

/// What a value rewrite may look at besides the value itself.
#[derive(Debug, Clone)]
pub(crate) struct RuleEnv<'a> {
    /// Nodes a `CalculateFields` rule may reference, nearest first.
    pub(crate) siblings: Vec<&'a FieldNode>,
    pub(crate) reference_time: NaiveDateTime,
}

impl<'a> RuleEnv<'a> {
    pub(crate) fn new(siblings: Vec<&'a FieldNode>, reference_time: NaiveDateTime) -> Self {
        RuleEnv { siblings, reference_time }
    }

    fn sibling_value(&self, label: &str) -> Option<&'a str> {
        self.siblings.iter().find(|n| n.label.eq_ignore_ascii_case(label)).map(|n| n.value.as_str())
    }
}

/// Apply one value rule. Rules that act on the node rather than the value
/// (filters, generators, conditionals) leave the value as it is.
pub(crate) fn rewrite(rule: &Rule, value: &str, env: &RuleEnv<'_>) -> Result<String, RuleError> {
    match rule {
        Rule::Exclude { pattern } => exclude(pattern, value),
        Rule::DeleteUntil { marker } => delete_until(marker, value),
        Rule::DeleteFrom { marker } => Ok(match marker.locate(value)? {
            Some(range) => value[..range.start].trim().to_string(),
            None => value.to_string(),
        }),
        Rule::ReplaceValue { mapping } => replace_value(mapping, value),
        Rule::ExtractSubstring { start, end } => {
            let len = value.chars().count();
            let end = end.unwrap_or(len).min(len);
            let start = start.unwrap_or(0).min(end);
            Ok(value.chars().skip(start).take(end - start).collect())
        }
        Rule::ExtractPattern { regex } => {
            let re = compile(regex, true)?;
            Ok(re.find(value).map(|m| m.as_str().to_string()).unwrap_or_else(|| value.to_string()))
        }
        Rule::AddPrefix { text } => Ok(format!("{text}{value}")),
        Rule::AddSuffix { text } => Ok(format!("{value}{text}")),
        Rule::ConvertCase { case: LetterCase::Upper } => Ok(value.to_uppercase()),
        Rule::ConvertCase { case: LetterCase::Lower } => Ok(value.to_lowercase()),
        Rule::Trim => Ok(value.trim().to_string()),
        Rule::RoundDecimal { places, mode } => round_decimal(value, *places, *mode),
        Rule::CorrectDataType { mask } => correct_data_type(mask, value),
        Rule::FormatDate { output } => format_date(value, output, env.reference_time),
        Rule::FormatCurrency => format_currency(value),
        Rule::Calculate { expr } => {
            let result = evaluate(parse_number(value)?, expr)?;
            Ok(format_trimmed(round_to(result, 3, RoundMode::Nearest), 3))
        }
        Rule::CalculateFields { op, label } => {
            let other = env.sibling_value(label).ok_or_else(|| RuleError::MissingReference(label.clone()))?;
            let result = apply_op(parse_number(value)?, *op, parse_number(other)?)?;
            Ok(format_trimmed(result, 6))
        }
        Rule::ConvertDecimals => Ok(convert_decimals(value)),
        Rule::FixDimensionSeparators => Ok(fix_dimension_separators(value)),
        Rule::Filter { .. }
        | Rule::SplitBySeparator { .. }
        | Rule::ParseFrom { .. }
        | Rule::CopyValue { .. }
        | Rule::Conditional { .. } => Ok(value.to_string()),
    }
}

// --- Text surgery -------------------------------------------------------------

fn exclude(pattern: &Matcher, value: &str) -> Result<String, RuleError> {
    let out = match pattern {
        Matcher::Text(t) if t.is_empty() => value.to_string(),
        Matcher::Text(t) => literal(t)?.replace_all(value, "").into_owned(),
        Matcher::Regex(p) => compile(p, false)?.replace_all(value, "").into_owned(),
        Matcher::Shape(_) => match pattern.locate(value)? {
            Some(range) => format!("{}{}", &value[..range.start], &value[range.end..]),
            None => value.to_string(),
        },
    };
    Ok(out.trim().to_string())
}

/// Text and shape markers cut at their first match, regex markers at their last.
fn delete_until(marker: &Matcher, value: &str) -> Result<String, RuleError> {
    let cut = match marker {
        Matcher::Regex(_) => marker.locate_all(value)?.pop(),
        _ => marker.locate(value)?,
    };
    Ok(match cut {
        Some(range) => value[range.end..].trim().to_string(),
        None => value.to_string(),
    })
}

fn replace_value(mapping: &[Replacement], value: &str) -> Result<String, RuleError> {
    let whole = value.trim();
    if let Some(hit) = mapping.iter().find(|r| r.from.trim().eq_ignore_ascii_case(whole)) {
        return Ok(hit.to.clone());
    }
    let mut out = value.to_string();
    for r in mapping.iter().filter(|r| !r.from.is_empty()) {
        let re = match compile(&r.from, false) {
            Ok(re) => re,
            Err(_) => literal(&r.from)?,
        };
        out = re.replace_all(&out, regex::NoExpand(&r.to)).into_owned();
    }
    Ok(out)
}

// --- Numbers and masks --------------------------------------------------------

fn round_decimal(value: &str, places: u32, mode: RoundMode) -> Result<String, RuleError> {
    let rounded = round_to(parse_number(value)?, places, mode);
    Ok(format_trimmed(rounded, places as usize))
}

/// `A` positions turn OCR digits into letters, `N` positions letters into digits.
fn correct_data_type(mask: &str, value: &str) -> Result<String, RuleError> {
    if mask.chars().count() != value.chars().count() {
        return Err(RuleError::MaskMismatch { mask: mask.to_string(), value: value.to_string() });
    }
    Ok(mask
        .chars()
        .zip(value.chars())
        .map(|(slot, c)| match (slot, c) {
            ('N', 'O' | 'o' | 'Q' | 'q') => '0',
            ('N', 'I' | 'i' | 'l') => '1',
            ('N', 'S' | 's') => '5',
            ('A', '0') => 'O',
            ('A', '1') => 'I',
            ('A', '5') => 'S',
            _ => c,
        })
        .collect())
}

/// `1.234,5` -> `1234.5`; values without digits pass through.
fn convert_decimals(value: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_end_matches(',').replace('.', "").replace(',', ".")
}

/// Put the dominant `x`/`X`/`*` separator back where OCR turned it into a space.
fn fix_dimension_separators(value: &str) -> String {
    let Some((sep, count)) = ['x', 'X', '*']
        .into_iter()
        .map(|sep| (sep, value.matches(sep).count()))
        .filter(|&(_, n)| n > 0)
        .fold(None, |best: Option<(char, usize)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
    else {
        return value.to_string();
    };
    if count == 2 {
        return value.to_string();
    }
    let text = value.replace("  ", " ");
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_digits = i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if c.is_whitespace() && between_digits { sep } else { c }
        })
        .collect()
}

