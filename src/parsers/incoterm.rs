//! Incoterms with their named place: `"FCA Graz"`, `"Lieferbedingungen: D.A.P. Berlin"`.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};

const TERMS: [&str; 11] = ["EXW", "FCA", "CPT", "CIP", "DAP", "DPU", "DDP", "FAS", "FOB", "CFR", "CIF"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncotermPlace {
    pub term: String,
    /// Named place, title-cased; empty when none was written.
    pub place: String,
}

pub(super) fn parse(raw: &str) -> Result<IncotermPlace, ParseError> {
    // OCR often splits the F from CA
    let text = regex!(r"\bF CA\b").replace_all(raw.trim(), "FCA");
    let found = regex!(r"(?i)\b([A-Z])\.?([A-Z])\.?([A-Z])\.?(?:\s|,|$|-|:)")
        .captures_iter(&text)
        .find_map(|c| {
            let code: String = [&c[1], &c[2], &c[3]].concat().to_uppercase();
            let whole = c.get(0)?;
            TERMS.contains(&code.as_str()).then(|| (code, whole.start(), whole.start() + c[0].trim_end().len()))
        })
        .ok_or_else(|| ParseError::Unrecognized(raw.trim().to_string()))?;

    let (term, start, end) = found;
    let rest = format!("{} {}", &text[..start], &text[end..]);
    let rest = regex!(r"(?i)\b(?:flughafen|airport|lieferbedingungen|incoterms?(?:\s*20\d\d)?)\b|\x22").replace_all(&rest, " ");
    let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    let rest = rest.trim_matches(|c: char| c == ',' || c == ':' || c == '-' || c.is_whitespace());
    Ok(IncotermPlace { term, place: title_case(rest) })
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_and_place() {
        let p = parse("FCA Graz").unwrap();
        assert_eq!((p.term.as_str(), p.place.as_str()), ("FCA", "Graz"));

        let p = parse("Lieferbedingungen: D.A.P. BERLIN, germany").unwrap();
        assert_eq!((p.term.as_str(), p.place.as_str()), ("DAP", "Berlin, Germany"));

        let p = parse("exw").unwrap();
        assert_eq!((p.term.as_str(), p.place.as_str()), ("EXW", ""));

        let p = parse("F CA Flughafen Wien").unwrap();
        assert_eq!((p.term.as_str(), p.place.as_str()), ("FCA", "Wien"));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(parse("ABC Berlin").is_err());
        assert!(parse("").is_err());
    }
}
