//! Rule catalogue.
//!
//! A rule is one step in a field's normalisation chain. The catalogue is a
//! closed enum: configuration names a rule through its `type` tag and an
//! unknown tag is rejected when the configuration loads.
//!
//! ```text
//! value rules      Exclude, DeleteFrom/Until, ReplaceValue, Extract*, Add*,
//!                  ConvertCase, Trim, RoundDecimal, CorrectDataType, Format*,
//!                  Calculate, CalculateFields, ConvertDecimals, FixDimensionSeparators
//!                  -> rewrite the working value (ops.rs)
//! filter           Filter -> false drops the node
//! generators       SplitBySeparator, ParseFrom, CopyValue -> new sibling nodes
//! control          Conditional -> nested chain behind a test
//! ```
//!
//! Generators and filters need the node and its section, so the engine
//! (`engine/apply.rs`) interprets them; everything else is a pure
//! `&str -> Result<String, RuleError>` function in `ops.rs`.
//!
//! ## Matchers
//!
//! Markers and patterns are [`Matcher`]s: a case-insensitive literal, a regex,
//! or a *shape*. A shape is text with every character class folded, and a
//! shape matcher holds sample text (`"AB-12"` matches `"XY-99"`):
//!
//! ```text
//! "AB-12.5, x:"  ->  "XX-DDbDc xy"
//!  A-Z -> X   a-z -> x   0-9 -> D   . -> b   , -> c   : -> y   other chars unchanged
//! ```

#[path = "rules/dates.rs"]
mod dates;
#[path = "rules/matcher.rs"]
mod matcher;
#[path = "rules/numbers.rs"]
mod numbers;
#[path = "rules/ops.rs"]
mod ops;

#[cfg(test)]
#[path = "rules/tests.rs"]
mod tests;

use crate::error::RuleError;
use serde::{Deserialize, Serialize};

pub(crate) use matcher::shape_of;
pub(crate) use numbers::{Separators, canonical_digits};
pub(crate) use ops::{RuleEnv, rewrite};

/// How a marker or pattern is matched against a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Matcher {
    /// Case-insensitive literal text.
    Text(String),
    /// Sample text; it matches any text with the same shape, see the module docs.
    Shape(String),
    /// A regular expression, case-sensitive unless it says `(?i)`.
    Regex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterTest {
    Contains,
    StartsWith,
    EndsWith,
}

/// Guard of a [`Rule::Conditional`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Contains(Matcher),
    DoesNotContain(Matcher),
    StartsWith(Matcher),
    EndsWith(Matcher),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LetterCase {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundMode {
    #[default]
    Nearest,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// One entry of a [`Rule::ReplaceValue`] mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Replacement { from: from.into(), to: to.into() }
    }
}

fn default_date_output() -> String {
    "%m-%d-%Y".to_string()
}

/// One normalisation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Rule {
    Exclude {
        pattern: Matcher,
    },
    /// Keep the text before the marker.
    DeleteFrom {
        marker: Matcher,
    },
    /// Keep the text after the marker.
    DeleteUntil {
        marker: Matcher,
    },
    ReplaceValue {
        mapping: Vec<Replacement>,
    },
    /// Character bounds, `end` exclusive.
    ExtractSubstring {
        #[serde(default)]
        start: Option<usize>,
        #[serde(default)]
        end: Option<usize>,
    },
    ExtractPattern {
        regex: String,
    },
    AddPrefix {
        text: String,
    },
    AddSuffix {
        text: String,
    },
    ConvertCase {
        case: LetterCase,
    },
    Trim,
    RoundDecimal {
        #[serde(default)]
        places: u32,
        #[serde(default)]
        mode: RoundMode,
    },
    /// Per-position `A` (letter) / `N` (digit) mask fixing OCR confusions.
    CorrectDataType {
        mask: String,
    },
    FormatDate {
        #[serde(default = "default_date_output")]
        output: String,
    },
    FormatCurrency,
    Filter {
        test: FilterTest,
        pattern: Matcher,
    },
    SplitBySeparator {
        separator: String,
    },
    ParseFrom {
        marker: Matcher,
        target: String,
    },
    CopyValue {
        target: String,
    },
    /// `value <op> operand ...`, e.g. `"* 1.5"`, evaluated left to right.
    Calculate {
        expr: String,
    },
    CalculateFields {
        op: ArithmeticOp,
        label: String,
    },
    Conditional {
        when: Condition,
        then: Vec<Rule>,
    },
    /// `1.234,5` -> `1234.5`.
    ConvertDecimals,
    FixDimensionSeparators,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Exclude { .. } => "exclude",
            Rule::DeleteFrom { .. } => "deleteFrom",
            Rule::DeleteUntil { .. } => "deleteUntil",
            Rule::ReplaceValue { .. } => "replaceValue",
            Rule::ExtractSubstring { .. } => "extractSubstring",
            Rule::ExtractPattern { .. } => "extractPattern",
            Rule::AddPrefix { .. } => "addPrefix",
            Rule::AddSuffix { .. } => "addSuffix",
            Rule::ConvertCase { .. } => "convertCase",
            Rule::Trim => "trim",
            Rule::RoundDecimal { .. } => "roundDecimal",
            Rule::CorrectDataType { .. } => "correctDataType",
            Rule::FormatDate { .. } => "formatDate",
            Rule::FormatCurrency => "formatCurrency",
            Rule::Filter { .. } => "filter",
            Rule::SplitBySeparator { .. } => "splitBySeparator",
            Rule::ParseFrom { .. } => "parseFrom",
            Rule::CopyValue { .. } => "copyValue",
            Rule::Calculate { .. } => "calculate",
            Rule::CalculateFields { .. } => "calculateFields",
            Rule::Conditional { .. } => "conditional",
            Rule::ConvertDecimals => "convertDecimals",
            Rule::FixDimensionSeparators => "fixDimensionSeparators",
        }
    }

    /// Compile every regex the rule carries.
    pub fn check(&self) -> Result<(), RuleError> {
        match self {
            Rule::Exclude { pattern: m }
            | Rule::DeleteFrom { marker: m }
            | Rule::DeleteUntil { marker: m }
            | Rule::Filter { pattern: m, .. }
            | Rule::ParseFrom { marker: m, .. } => m.check(),
            Rule::ExtractPattern { regex } => matcher::compile(regex, true).map(|_| ()),
            Rule::Conditional { when, then } => {
                when.matcher().check()?;
                then.iter().try_for_each(Rule::check)
            }
            _ => Ok(()),
        }
    }
}

impl Condition {
    pub(crate) fn matcher(&self) -> &Matcher {
        match self {
            Condition::Contains(m) | Condition::DoesNotContain(m) | Condition::StartsWith(m) | Condition::EndsWith(m) => {
                m
            }
        }
    }

    pub(crate) fn holds(&self, value: &str) -> Result<bool, RuleError> {
        match self {
            Condition::Contains(m) => m.test(FilterTest::Contains, value),
            Condition::DoesNotContain(m) => m.test(FilterTest::Contains, value).map(|hit| !hit),
            Condition::StartsWith(m) => m.test(FilterTest::StartsWith, value),
            Condition::EndsWith(m) => m.test(FilterTest::EndsWith, value),
        }
    }
}
