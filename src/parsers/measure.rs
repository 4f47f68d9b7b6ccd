//! Weights and volumes: a number, a unit and whatever text is left over.
//!
//! ```text
//! "1.234,5 kg"         -> 1234.5  KGM
//! "500 KGS gross"      -> 500     KGM  "gross"
//! "100 kg / 220 lbs"   -> 100     KGM  (the pound half is dropped)
//! "12,5 cbm"           -> 12.5    MTQ
//! ```

use crate::error::ParseError;
use crate::rules::{Separators, canonical_digits, shape_of};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub value: String,
    pub uom: String,
    pub extra_text: String,
}

/// Unit words mapped to codes, plus the code used when no unit is written.
struct Units {
    table: &'static [(&'static [&'static str], &'static str)],
    default: &'static str,
}

impl Units {
    fn code(&self, word: &str) -> String {
        let folded = word.to_lowercase().replace('.', "");
        let folded = folded.trim_end_matches(':');
        if folded.is_empty() {
            return self.default.to_string();
        }
        self.table
            .iter()
            .find(|(words, _)| words.contains(&folded))
            .map(|(_, code)| code.to_string())
            .unwrap_or_else(|| folded.to_uppercase())
    }
}

static WEIGHT: Units = Units {
    table: &[
        (&["kg", "kgs", "kgm", "kilo", "kilos", "kilogram", "kilograms"], "KGM"),
        (&["lb", "lbs", "lbr", "pound", "pounds"], "LBR"),
        (&["t", "mt", "tne", "ton", "tons", "tonne", "tonnes"], "TNE"),
        (&["g", "gr", "grm", "gram", "grams"], "GRM"),
    ],
    default: "KGM",
};

static VOLUME: Units = Units {
    table: &[
        (&["m3", "m³", "cbm", "cbm.", "mtq", "cubic"], "MTQ"),
        (&["l", "ltr", "ltrs", "liter", "liters", "litre", "litres"], "LTR"),
        (&["cft", "cuft", "ft3", "ftq"], "FTQ"),
        (&["cm3", "ccm"], "CMQ"),
    ],
    default: "MTQ",
};

pub(super) fn parse_weight(raw: &str) -> Result<Measure, ParseError> {
    let mut text = raw.trim().to_string();
    let lower = text.to_lowercase();
    // "100 kg / 220 lbs": keep the metric half
    if lower.contains('/') && lower.contains("kg") && lower.contains("lb") {
        if let Some((metric, _)) = text.split_once('/') {
            text = metric.trim().to_string();
        }
    }
    // "KG.500"
    if shape_of(&text) == "XXbDDD" {
        text = text.replace('.', " ");
    }
    parse_with(&text, &WEIGHT)
}

pub(super) fn parse_volume(raw: &str) -> Result<Measure, ParseError> {
    parse_with(raw.trim(), &VOLUME)
}

fn parse_with(text: &str, units: &Units) -> Result<Measure, ParseError> {
    let found = regex!(r"-?\d+(?:[.,' ]\d{3})*(?:[.,]\d+)?")
        .find(text)
        .ok_or_else(|| ParseError::Unrecognized(text.to_string()))?;
    let written = found.as_str().trim();
    let value = canonical_digits(written, Separators::Grouping).unwrap_or_else(|| written.to_string());

    // the unit follows the number, or precedes it ("KG 500")
    let after = text[found.end()..].trim();
    let before = text[..found.start()].trim();
    let (unit_side, other) = if after.is_empty() { (before, "") } else { (after, before) };

    let mut words = unit_side.split_whitespace();
    let mut unit = "";
    let mut extra: Vec<&str> = Vec::new();
    if let Some(first) = words.next() {
        // longer words are not units, so they and everything after are text
        if first.trim_end_matches(['.', ':']).chars().count() <= 3 || units_know(units, first) {
            unit = first;
        } else {
            extra.push(first);
        }
    }
    extra.extend(words);
    if !other.is_empty() {
        extra.insert(0, other);
    }

    let uom = units.code(unit);
    let mut extra_text = extra.join(" ");
    let folded = extra_text.to_lowercase();
    if (!unit.is_empty() && folded.contains(&unit.to_lowercase())) || folded.contains(written) {
        extra_text.clear();
    }
    Ok(Measure { value, uom, extra_text })
}

fn units_know(units: &Units, word: &str) -> bool {
    let folded = word.to_lowercase().replace('.', "");
    units.table.iter().any(|(words, _)| words.contains(&folded.as_str()))
}
