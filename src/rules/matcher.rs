use super::{FilterTest, Matcher};
use crate::error::RuleError;
use regex::{Regex, RegexBuilder};
use std::ops::Range;

/// Fold a value into its shape string.
pub(crate) fn shape_of(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'A'..='Z' => 'X',
            'a'..='z' => 'x',
            '0'..='9' => 'D',
            '.' => 'b',
            ',' => 'c',
            ':' => 'y',
            other => other,
        })
        .collect()
}

pub(crate) fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| RuleError::InvalidRegex { pattern: pattern.to_string(), reason: e.to_string() })
}

/// Literal text as a case-insensitive regex.
pub(crate) fn literal(text: &str) -> Result<Regex, RuleError> {
    compile(&regex::escape(text), true)
}

/// Byte offset in `value` of the `char_idx`-th character.
fn byte_offset(value: &str, char_idx: usize) -> usize {
    value.char_indices().nth(char_idx).map(|(b, _)| b).unwrap_or(value.len())
}

impl Matcher {
    pub(crate) fn check(&self) -> Result<(), RuleError> {
        match self {
            Matcher::Regex(p) => compile(p, false).map(|_| ()),
            Matcher::Text(_) | Matcher::Shape(_) => Ok(()),
        }
    }

    /// Byte range of the first match in `value`.
    pub(crate) fn locate(&self, value: &str) -> Result<Option<Range<usize>>, RuleError> {
        match self {
            Matcher::Text(t) if t.is_empty() => Ok(None),
            Matcher::Text(t) => Ok(literal(t)?.find(value).map(|m| m.range())),
            Matcher::Regex(p) => Ok(compile(p, false)?.find(value).map(|m| m.range())),
            Matcher::Shape(s) if s.is_empty() => Ok(None),
            Matcher::Shape(s) => {
                let (shape, needle) = (shape_of(value), shape_of(s));
                Ok(shape.find(needle.as_str()).map(|b| {
                    let start = shape[..b].chars().count();
                    let len = needle.chars().count();
                    byte_offset(value, start)..byte_offset(value, start + len)
                }))
            }
        }
    }

    /// Every match range, left to right.
    pub(crate) fn locate_all(&self, value: &str) -> Result<Vec<Range<usize>>, RuleError> {
        match self {
            Matcher::Text(t) if t.is_empty() => Ok(Vec::new()),
            Matcher::Text(t) => Ok(literal(t)?.find_iter(value).map(|m| m.range()).collect()),
            Matcher::Regex(p) => Ok(compile(p, false)?.find_iter(value).map(|m| m.range()).collect()),
            Matcher::Shape(_) => Ok(self.locate(value)?.into_iter().collect()),
        }
    }

    pub(crate) fn test(&self, test: FilterTest, value: &str) -> Result<bool, RuleError> {
        let value = value.trim();
        Ok(match (self, test) {
            (Matcher::Text(t), FilterTest::Contains) => value.to_lowercase().contains(&t.to_lowercase()),
            (Matcher::Text(t), FilterTest::StartsWith) => value.to_lowercase().starts_with(&t.to_lowercase()),
            (Matcher::Text(t), FilterTest::EndsWith) => value.to_lowercase().ends_with(&t.to_lowercase()),
            (Matcher::Shape(s), FilterTest::Contains) => shape_of(value).contains(&shape_of(s)),
            (Matcher::Shape(s), FilterTest::StartsWith) => shape_of(value).starts_with(&shape_of(s)),
            (Matcher::Shape(s), FilterTest::EndsWith) => shape_of(value).ends_with(&shape_of(s)),
            (Matcher::Regex(p), FilterTest::Contains) => compile(p, false)?.is_match(value),
            (Matcher::Regex(p), FilterTest::StartsWith) => compile(&format!("^(?:{p})"), false)?.is_match(value),
            (Matcher::Regex(p), FilterTest::EndsWith) => compile(&format!("(?:{p})$"), false)?.is_match(value),
        })
    }
}
