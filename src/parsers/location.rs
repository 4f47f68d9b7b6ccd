//! Place names matched against the port table.
//!
//! ```text
//! "Hamburg, Germany"          country DE, then "Hamburg" among German ports -> DEHAM
//! "Port of Rotterdam NL"      country NL, then fuzzy "Port of Rotterdam"   -> NLRTM
//! "Shangai"                   no country, fuzzy over every port            -> CNSHA
//! ```

use super::tables;
use crate::Context;
use crate::error::ParseError;
use crate::resolution::fuzzy::weighted_ratio;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ports scoring below this are not reported.
const MIN_PORT_SCORE: u8 = 70;
/// Fuzzy country guesses below this are ignored.
const MIN_COUNTRY_SCORE: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMatch {
    pub name: String,
    pub code: String,
    pub country_code: String,
}

pub(super) fn parse(raw: &str, ctx: &Context) -> Result<LocationMatch, ParseError> {
    let mut tokens: Vec<&str> = raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()).collect();
    let country = match take_country(&mut tokens, ctx) {
        Some(iso2) => Some(iso2),
        None => guess_country(&tokens.join(" ")),
    };
    let rest = tokens.join(" ");
    if rest.is_empty() {
        return Err(ParseError::Unrecognized(raw.trim().to_string()));
    }

    let ports = ctx
        .ports
        .iter()
        .map(|p| (p.name.as_str(), p.code.as_str(), p.country_code.as_str()))
        .chain(tables::PORTS.iter().copied())
        .filter(|(_, _, cc)| country.as_deref().is_none_or(|want| cc.eq_ignore_ascii_case(want)));

    let upper_rest: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();
    let mut best: Option<(u8, (&str, &str, &str))> = None;
    for port in ports {
        let (name, code, cc) = port;
        let local = code.strip_prefix(cc).unwrap_or(code);
        let score = if upper_rest.iter().any(|t| t == code || t == local) {
            100
        } else {
            weighted_ratio(&format!("{name} {local}"), &rest).max(weighted_ratio(name, &rest))
        };
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, port));
        }
    }

    match best {
        Some((score, (name, code, cc))) if score >= MIN_PORT_SCORE => {
            debug!(input = raw, port = code, score, "location matched");
            Ok(LocationMatch { name: name.to_string(), code: code.to_string(), country_code: cc.to_uppercase() })
        }
        _ => Err(ParseError::Unrecognized(raw.trim().to_string())),
    }
}

/// Find and remove the rightmost, longest run of tokens naming a country.
/// Codes of three letters or fewer only count when written in capitals.
fn take_country(tokens: &mut Vec<&str>, ctx: &Context) -> Option<String> {
    for width in (1..=tokens.len().min(4)).rev() {
        for start in (0..=tokens.len() - width).rev() {
            let window = &tokens[start..start + width];
            if width == 1 {
                let t = window[0].trim_end_matches('.');
                if t.chars().count() <= 3 && !t.chars().all(|c| c.is_ascii_uppercase()) {
                    continue;
                }
            }
            if let Some(iso2) = ctx.country_code(&window.join(" ")) {
                tokens.drain(start..start + width);
                return Some(iso2);
            }
        }
    }
    None
}

fn guess_country(text: &str) -> Option<String> {
    let (score, iso2) = tables::country_names().map(|(name, iso2)| (weighted_ratio(name, text), iso2)).max_by_key(|(s, _)| *s)?;
    (score >= MIN_COUNTRY_SCORE).then(|| iso2.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortEntry;

    #[test]
    fn country_then_port() {
        let ctx = Context::default();
        let m = parse("Hamburg, Germany", &ctx).unwrap();
        assert_eq!((m.name.as_str(), m.code.as_str(), m.country_code.as_str()), ("Hamburg", "DEHAM", "DE"));

        let m = parse("Port of Rotterdam NL", &ctx).unwrap();
        assert_eq!(m.code, "NLRTM");
    }

    #[test]
    fn fuzzy_without_country() {
        let ctx = Context::default();
        assert_eq!(parse("Shangai", &ctx).unwrap().code, "CNSHA");
        assert_eq!(parse("LAX", &ctx).unwrap().code, "USLAX");
    }

    #[test]
    fn configured_ports_take_part() {
        let mut ctx = Context::default();
        ctx.ports.push(PortEntry { name: "Linz".into(), code: "ATLNZ".into(), country_code: "AT".into() });
        assert_eq!(parse("Linz Austria", &ctx).unwrap().code, "ATLNZ");
    }

    #[test]
    fn nothing_close_is_an_error() {
        let ctx = Context::default();
        assert!(parse("Germany", &ctx).is_err());
        assert!(parse("qqqqqqqqqq", &ctx).is_err());
    }
}
