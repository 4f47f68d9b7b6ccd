//! Package dimensions.
//!
//! ```text
//! "120x80x100cm"                    -> 120 / 80 / 100 CMT
//! "2x 115x140x92cm 1x 80x60x50cm"   -> two records, counts 2 and 1
//! "3 pallets - 120x80x100 cm 250kg" -> count 3 PLT, gross 250 KGM
//! ```
//!
//! Records are split on line breaks, `;`, `", "` and on every `N x <dims>`
//! restart. Each record tries the exception shapes first, then the token
//! classifier, then a loose three-number scan.

use super::scan::ValueTraits;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LengthUom {
    #[default]
    #[serde(rename = "CMT")]
    Cmt,
    #[serde(rename = "MTR")]
    Mtr,
    #[serde(rename = "MM")]
    Mm,
}

impl LengthUom {
    pub fn code(self) -> &'static str {
        match self {
            LengthUom::Cmt => "CMT",
            LengthUom::Mtr => "MTR",
            LengthUom::Mm => "MM",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().trim_end_matches('.') {
            "cm" | "cms" | "cmt" => Some(LengthUom::Cmt),
            "mm" => Some(LengthUom::Mm),
            "m" | "mtr" | "mtrs" | "meter" | "meters" | "metre" | "metres" => Some(LengthUom::Mtr),
            _ => None,
        }
    }
}

/// One physical item (or group of identical items).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub length: String,
    pub width: String,
    pub height: String,
    pub uom: LengthUom,
    pub package_count: Option<String>,
    pub package_type: Option<String>,
    pub inner_package_count: Option<String>,
    pub inner_package_type: Option<String>,
    pub gross_weight: Option<String>,
    pub gross_weight_uom: Option<String>,
    pub extra_text: Option<String>,
}

impl Dimensions {
    fn new(lwh: &[&str], uom: LengthUom) -> Self {
        let at = |i: usize| lwh.get(i).map(|n| number(n)).unwrap_or_default();
        Dimensions { length: at(0), width: at(1), height: at(2), uom, ..Dimensions::default() }
    }
}

// --- Vocabulary ---------------------------------------------------------------

const SEPARATORS: &[char] = &['x', '@', '*', '+', '-', '—', '/', '\'', '\\', '~', '|', '_'];
const PALLET_WORDS: &[&str] = &["pallets", "pallet", "plt", "plts"];
const COUNT_MARKS: &[&str] = &["@", "x", "*", ")"];
const CARTON_WORDS: &[&str] = &["ctn", "ctns", "carton", "cartons", "cardboard", "cardboards"];
const BOX_WORDS: &[&str] = &["box", "boxs", "boxes"];
const KG_WORDS: &[&str] = &["kg", "kgs", "kgm"];

fn folded(token: &str) -> String {
    token.to_lowercase().replace(['.', ','], "")
}

fn is_num(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) && token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// `"0,70"` -> `"0.70"`, `"100."` -> `"100"`.
fn number(token: &str) -> String {
    token.trim_end_matches(['.', ',']).replace(',', ".")
}

fn inner_type(word: &str) -> Option<&'static str> {
    if CARTON_WORDS.contains(&word) {
        Some("CTN")
    } else if BOX_WORDS.contains(&word) {
        Some("BOX")
    } else {
        None
    }
}

// --- Entry --------------------------------------------------------------------

pub(super) fn parse(raw: &str) -> Result<Vec<Dimensions>, ParseError> {
    let mut out = Vec::new();
    for record in records(raw) {
        match parse_record(&record) {
            Some(mut found) => out.append(&mut found),
            None => debug!(record = %record, "dimension record not understood"),
        }
    }
    if out.is_empty() { Err(ParseError::Unrecognized(raw.trim().to_string())) } else { Ok(out) }
}

fn records(raw: &str) -> Vec<String> {
    let normalized = raw.replace('×', "x");
    let restart = regex!(r"\b\d+\s*[xX*]\s+\d+(?:[.,]\d+)?\s*[xX*]");
    let mut out = Vec::new();
    for line in regex!(r"[\n;]|,\s").split(&normalized) {
        let mut cuts: Vec<usize> = restart.find_iter(line).map(|m| m.start()).filter(|&at| at > 0).collect();
        cuts.push(line.len());
        let mut from = 0;
        for cut in cuts {
            let piece = line[from..cut].trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }
            from = cut;
        }
    }
    out
}

fn parse_record(record: &str) -> Option<Vec<Dimensions>> {
    let traits = ValueTraits::scan(record);
    if !traits.contains(ValueTraits::HAS_DIGITS) {
        return None;
    }
    if let Some(found) = exception_shape(record, traits) {
        return Some(found);
    }
    let found = classify(record);
    if !found.is_empty() {
        return Some(found);
    }
    loose(record)
}

// --- Tier 2: exception shapes -------------------------------------------------

fn exception_shape(record: &str, traits: ValueTraits) -> Option<Vec<Dimensions>> {
    if traits.contains(ValueTraits::LABELLED_LWH) {
        let stripped = regex!(r"(?i)length|width|height|\(l\)|\(w\)|\(h\)").replace_all(record, " ");
        let found = classify(&stripped);
        if !found.is_empty() {
            return Some(found);
        }
    }
    if traits.contains(ValueTraits::HAS_AT) {
        if let Some(found) = at_counts(record, traits) {
            return Some(found);
        }
    }
    if traits.contains(ValueTraits::HAS_PAREN) {
        if let Some(found) = bracketed_count(record) {
            return Some(found);
        }
    }
    None
}

/// `5PLTS 1@80X120X100 4@80X120X90` and `120x80x100 @ 3 (10 ctns)`.
fn at_counts(record: &str, traits: ValueTraits) -> Option<Vec<Dimensions>> {
    let pallet = traits.contains(ValueTraits::PALLET_WORD).then(|| "PLT".to_string());
    let leading = regex!(
        r"(?i)(\d+)\s*@\s*(\d+(?:[.,]\d+)?)\s*[x*]\s*(\d+(?:[.,]\d+)?)\s*[x*]\s*(\d+(?:[.,]\d+)?)\s*(cm|mm|m)?\b"
    );
    let found: Vec<Dimensions> = leading
        .captures_iter(record)
        .map(|c| {
            let uom = c.get(5).and_then(|m| LengthUom::from_word(m.as_str())).unwrap_or_else(|| uom_of(record, &[]));
            let mut d = Dimensions::new(&[&c[2], &c[3], &c[4]], uom);
            d.package_count = Some(c[1].to_string());
            d.package_type = pallet.clone();
            d
        })
        .collect();
    if !found.is_empty() {
        return Some(found);
    }

    let trailing = regex!(
        r"(?i)(\d+(?:[.,]\d+)?)\s*[x*]\s*(\d+(?:[.,]\d+)?)\s*[x*]\s*(\d+(?:[.,]\d+)?)\s*(cm|mm|m)?\s*@\s*(\d+)[^(\d]*(?:\(\s*(\d+)\s*([a-z]+)\s*\))?"
    );
    let c = trailing.captures(record)?;
    let uom = c.get(4).and_then(|m| LengthUom::from_word(m.as_str())).unwrap_or_else(|| uom_of(record, &[]));
    let mut d = Dimensions::new(&[&c[1], &c[2], &c[3]], uom);
    d.package_count = Some(c[5].to_string());
    d.package_type = pallet;
    if let (Some(count), Some(word)) = (c.get(6), c.get(7)) {
        if let Some(kind) = inner_type(&folded(word.as_str())) {
            d.inner_package_count = Some(count.as_str().to_string());
            d.inner_package_type = Some(kind.to_string());
        }
    }
    Some(vec![d])
}

/// `48 X 45 X 12 (2)` and `54cm * 54cm * 37cm (2BOX)`.
fn bracketed_count(record: &str) -> Option<Vec<Dimensions>> {
    let c = regex!(r"^(.*?)\(\s*(\d+)\s*([A-Za-z]*)\s*\)\s*$").captures(record)?;
    let mut found = classify(&c[1]);
    let [d] = found.as_mut_slice() else { return None };
    if d.package_count.is_some() || d.inner_package_count.is_some() {
        return None;
    }
    let word = folded(&c[3]);
    match inner_type(&word) {
        Some(kind) => {
            d.inner_package_count = Some(c[2].to_string());
            d.inner_package_type = Some(kind.to_string());
        }
        None => {
            d.package_count = Some(c[2].to_string());
            if PALLET_WORDS.contains(&word.as_str()) {
                d.package_type = Some("PLT".to_string());
            }
        }
    }
    Some(found)
}

/// Any three numbers in a row, when nothing else matched.
fn loose(record: &str) -> Option<Vec<Dimensions>> {
    let c = regex!(r"(\d+(?:[.,]\d+)?)[^\d]{1,5}?(\d+(?:[.,]\d+)?)[^\d]{1,5}?(\d+(?:[.,]\d+)?)").captures(record)?;
    debug!(record, "dimension loose fallback");
    Some(vec![Dimensions::new(&[&c[1], &c[2], &c[3]], uom_of(record, &[]))])
}

// --- Tier 1: token classifier -------------------------------------------------

/// Most frequent separator symbol; whitespace when there is none.
/// `x` and `X` count together.
fn separator(record: &str) -> char {
    let mut best = (' ', 0);
    for &sep in SEPARATORS {
        let count = if sep == 'x' {
            record.chars().filter(|c| c.eq_ignore_ascii_case(&'x')).count()
        } else {
            record.matches(sep).count()
        };
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

fn uom_of(record: &str, tokens: &[&str]) -> LengthUom {
    if let Some(uom) = tokens.iter().find_map(|t| LengthUom::from_word(t)) {
        return uom;
    }
    let lower = record.to_lowercase();
    if lower.contains("cm") {
        LengthUom::Cmt
    } else if lower.contains("mm") {
        LengthUom::Mm
    } else if regex!(r"\d\s*m\b").is_match(&lower) {
        LengthUom::Mtr
    } else {
        LengthUom::Cmt
    }
}

fn classify(record: &str) -> Vec<Dimensions> {
    let tokens: Vec<&str> = regex!(r"\d+[.,]?\d*|[a-zA-Z]+|[^a-zA-Z\d\s]").find_iter(record).map(|m| m.as_str()).collect();
    let sep = separator(record);
    let is_sep = |t: &str| {
        if sep == 'x' { t.eq_ignore_ascii_case("x") } else { t.len() == sep.len_utf8() && t.starts_with(sep) }
    };
    let next_word = |i: usize| tokens.get(i + 1).map(|t| folded(t)).unwrap_or_default();
    let cm_repeated = record.to_lowercase().matches("cm").count() > 1;

    // pass 1: length/width/height
    let mut taken = vec![false; tokens.len()];
    for (i, tok) in tokens.iter().enumerate() {
        if !is_num(tok) {
            continue;
        }
        let next = tokens.get(i + 1).copied().unwrap_or("");
        let prev = if i > 0 { tokens[i - 1] } else { "" };
        let after_cm = tokens.get(i + 2).copied().unwrap_or("");
        let counted_word = {
            let w = next_word(i);
            KG_WORDS.contains(&w.as_str()) || PALLET_WORDS.contains(&w.as_str()) || inner_type(&w).is_some()
        };
        taken[i] = is_sep(next)
            || is_sep(prev)
            || (cm_repeated && next.eq_ignore_ascii_case("cm") && (is_sep(after_cm) || sep == ' '))
            || (sep == ' ' && !counted_word);
    }
    let uom = uom_of(record, &tokens);

    // pass 2: counts and weights on what is left
    let mut counts = Vec::new();
    let mut inner_counts = Vec::new();
    let mut weights = Vec::new();
    let mut package_type = None;
    let mut inner_kind = None;
    for (i, tok) in tokens.iter().enumerate() {
        if !is_num(tok) || taken[i] {
            continue;
        }
        let word = next_word(i);
        if KG_WORDS.contains(&word.as_str()) {
            weights.push(number(tok));
        } else if PALLET_WORDS.contains(&word.as_str()) || COUNT_MARKS.contains(&word.as_str()) {
            counts.push(number(tok));
            if PALLET_WORDS.contains(&word.as_str()) {
                package_type = Some("PLT");
            }
        } else if let Some(kind) = inner_type(&word) {
            inner_counts.push(number(tok));
            inner_kind = Some(kind);
        } else if i + 1 == tokens.len() || tokens.get(i + 1).is_some_and(|t| is_num(t)) {
            counts.push(number(tok));
        }
    }
    let words: Vec<String> = tokens.iter().map(|t| folded(t)).collect();
    if package_type.is_none() && words.iter().any(|w| PALLET_WORDS.contains(&w.as_str())) {
        package_type = Some("PLT");
    }
    if inner_kind.is_none() {
        inner_kind = words.iter().find_map(|w| inner_type(w));
    }

    let lwh_at: Vec<usize> = taken.iter().enumerate().filter(|(_, t)| **t).map(|(i, _)| i).collect();
    let lwh: Vec<&str> = lwh_at.iter().map(|&i| tokens[i]).collect();
    let width = if !lwh.is_empty() && lwh.len() % 3 == 0 {
        3
    } else if !lwh.is_empty() && lwh.len() % 4 == 0 {
        4
    } else {
        return Vec::new();
    };
    let groups: Vec<&[&str]> = lwh.chunks(width).collect();
    if groups.len() > 1 && counts.len() > 1 && counts.len() != groups.len() {
        counts.remove(0);
    }
    if groups.len() > 1 && inner_counts.len() > 1 && inner_counts.len() != groups.len() {
        inner_counts.remove(0);
    }
    // a four-number group leads with its count unless a package word marks the last number
    let trailing_count = |g: usize| {
        let last = lwh_at[g * width + width - 1];
        let word = next_word(last);
        PALLET_WORDS.contains(&word.as_str()) || inner_type(&word).is_some()
    };
    let extra = leftover_words(&tokens, &taken);

    groups
        .iter()
        .enumerate()
        .map(|(g, group)| {
            let (lwh, count) = match *group {
                [l, w, h, count] if trailing_count(g) => (vec![*l, *w, *h], Some(number(count))),
                [count, l, w, h] => (vec![*l, *w, *h], Some(number(count))),
                other => (other.to_vec(), counts.get(g).cloned()),
            };
            let mut d = Dimensions::new(&lwh, uom);
            d.package_count = count;
            d.package_type = package_type.map(str::to_string);
            d.inner_package_count = inner_counts.get(g).cloned();
            if d.inner_package_count.is_some() {
                d.inner_package_type = inner_kind.map(str::to_string);
            }
            d.gross_weight = weights.get(g).cloned();
            d.gross_weight_uom = d.gross_weight.as_ref().map(|_| "KGM".to_string());
            d.extra_text = extra.clone();
            d
        })
        .collect()
}

/// Words that are not units, package words or separators.
fn leftover_words(tokens: &[&str], taken: &[bool]) -> Option<String> {
    let words: Vec<&str> = tokens
        .iter()
        .zip(taken)
        .filter(|(tok, taken)| !**taken && tok.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|(tok, _)| *tok)
        .filter(|tok| {
            let w = folded(tok);
            LengthUom::from_word(&w).is_none()
                && !PALLET_WORDS.contains(&w.as_str())
                && !KG_WORDS.contains(&w.as_str())
                && inner_type(&w).is_none()
                && w != "x"
        })
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}
