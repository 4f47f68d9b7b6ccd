//! Free-text address blocks split into the canonical AddressBlock children.
//!
//! The text is read from both ends. Contacts are lifted out first, then the
//! country, postal code and state are taken from the tail; the organisation
//! name (and a leading account number) come off the head. What remains is
//! street, facility and city.
//!
//! ```text
//! "OU1083 COVIDIEN LP 15 Hampshire St MANSFIELD MA 02048-1139 USA"
//!  ^acct  ^name--------^ ^street--------^ ^city---^ ^st ^postal---^ ^country
//! ```

use super::tables::{self, FACILITY_WORDS, LEGAL_MARKERS, STREET_FRAGMENTS, STREET_SUFFIXES};
use crate::{ADDRESS_CHILD_LABELS, Context, FieldNode, Origin};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Street words that open the street name instead of closing it ("Rue de la Paix 5").
const LEADING_STREET_WORDS: &[&str] = &["rue", "calle", "avenida", "viale", "via", "carrer", "ulica"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressParts {
    pub name: String,
    pub account_number: String,
    pub short_code: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    pub country_code: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
}

impl AddressParts {
    /// Every component under its child label, in display order.
    pub fn pairs(&self) -> [(&'static str, &str); 12] {
        let values = [
            &self.name,
            &self.account_number,
            &self.short_code,
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state_province,
            &self.postal_code,
            &self.country_code,
            &self.contact_name,
            &self.contact_phone,
            &self.contact_email,
        ];
        let mut out = [("", ""); 12];
        for (slot, (label, value)) in out.iter_mut().zip(ADDRESS_CHILD_LABELS.into_iter().zip(values)) {
            *slot = (label, value.as_str());
        }
        out
    }

    /// Whether anything besides the name was recognised.
    pub(crate) fn has_structure(&self) -> bool {
        self.pairs().into_iter().any(|(label, value)| label != "name" && !value.is_empty())
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.pairs().into_iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }

    /// The full canonical child set for the block `parent_id`, empty strings included.
    pub(crate) fn into_children(self, parent_id: &str) -> Vec<FieldNode> {
        self.pairs()
            .into_iter()
            .map(|(label, value)| {
                FieldNode::plain(format!("{parent_id}.{label}"), label, value).with_origin(Origin::Parsed)
            })
            .collect()
    }
}

pub(crate) fn parse_address(raw: &str, ctx: &Context) -> AddressParts {
    let mut parts = AddressParts::default();
    let text = take_contacts(raw, &mut parts);
    let text = regex!(r"(?i)^\s*(?:(?:deliver(?:y)?|ship|bill|sold)\s+to|notify\s+party)\b\s*[:.]?").replace(&text, "");
    let mut segments = segments(&text);
    if segments.is_empty() {
        return parts;
    }

    // --- tail: country, postal code, state ---
    let mut country = take_country(&mut segments, ctx);
    let postal = take_postal(&mut segments, country.as_deref());
    if country.as_deref().is_none_or(tables::uses_states) {
        let state = match &postal {
            Some((seg, _, at)) => {
                let at = *at;
                at.checked_sub(1).and_then(|before| take_state(&mut segments[*seg], before, &mut country)).or_else(
                    || take_state(&mut segments[*seg], at, &mut country),
                )
            }
            None => segments.len().checked_sub(1).and_then(|last| {
                let count = segments[last].split_whitespace().count();
                count.checked_sub(1).and_then(|end| take_state(&mut segments[last], end, &mut country))
            }),
        };
        parts.state_province = state.unwrap_or_default();
    }
    let postal_seg = postal.as_ref().map(|(seg, _, _)| *seg);
    if let Some((_, code, _)) = postal {
        parts.postal_code = code;
    }
    parts.country_code = country.unwrap_or_default();

    // --- head: account number, name ---
    let Some(head) = segments.iter().position(|s| !s.is_empty()) else {
        return parts;
    };
    let mut tokens: Vec<&str> = segments[head].split_whitespace().collect();
    if tokens.first().is_some_and(|t| looks_like_account(t)) {
        parts.account_number = tokens.remove(0).to_string();
    }
    let end = name_end(&tokens);
    parts.name = tokens[..end].join(" ");

    let mut pieces: Vec<(String, bool)> = Vec::new();
    let head_rest = tokens[end..].join(" ");
    if !head_rest.is_empty() {
        pieces.push((head_rest, postal_seg == Some(head)));
    }
    for (i, seg) in segments.iter().enumerate().skip(head + 1) {
        if !seg.is_empty() || postal_seg == Some(i) {
            pieces.push((seg.clone(), postal_seg == Some(i)));
        }
    }

    // --- middle: street, facility, city ---
    let mut streets: Vec<String> = Vec::new();
    let mut facilities: Vec<String> = Vec::new();
    let mut loose: Vec<String> = Vec::new();
    let mut postal_city: Option<String> = None;
    for (piece, is_postal) in pieces {
        let (street, rest) = split_street(&piece);
        streets.extend(street);
        if rest.is_empty() {
            continue;
        }
        if is_facility(&rest) {
            facilities.push(rest);
        } else if is_postal && postal_city.is_none() {
            postal_city = Some(rest);
        } else {
            loose.push(rest);
        }
    }
    parts.city = postal_city.or_else(|| loose.pop()).unwrap_or_default();

    let mut lines = streets.into_iter().chain(loose);
    parts.address_line1 = lines.next().unwrap_or_default();
    parts.address_line2 = facilities.into_iter().chain(lines).collect::<Vec<_>>().join(", ");
    if parts.address_line1.is_empty() && !parts.address_line2.is_empty() {
        trace!(line = %parts.address_line2, "address has only a facility line");
    }
    parts
}

// --- contacts -----------------------------------------------------------------

/// Lift phone, e-mail and labelled name/code fields out of the text.
fn take_contacts(raw: &str, parts: &mut AddressParts) -> String {
    let text = raw.replace('\r', "");
    let text = regex!(r"(?i)\b(tel(?:ephone)?|phone|ph|mobile|mob|fax)\b\.?\s*[:.]?\s*(\+?[\d(][\d \t()./-]{4,}\d)")
        .replace_all(&text, |c: &Captures| {
            let is_fax = c[1].eq_ignore_ascii_case("fax");
            if !is_fax && parts.contact_phone.is_empty() {
                parts.contact_phone = c[2].trim().to_string();
            }
            " "
        })
        .into_owned();
    let text = regex!(r"(?i)(?:\be-?mail\b\s*[:.]?\s*)?([\w.+-]+@[\w-]+\.[\w.-]+)")
        .replace_all(&text, |c: &Captures| {
            if parts.contact_email.is_empty() {
                parts.contact_email = c[1].trim_end_matches('.').to_string();
            }
            " "
        })
        .into_owned();
    regex!(
        r"(?i)\b(attn|attention|contact(?:\s+person)?|receiver|short\s*code|acc(?:oun)?t(?:\s*(?:no|number))?)\s*[.:#]\s*([^\n,;]+)"
    )
    .replace_all(&text, |c: &Captures| {
        let key = c[1].to_lowercase();
        let value = c[2].trim().to_string();
        let slot = if key.starts_with("short") {
            &mut parts.short_code
        } else if key.starts_with("acc") {
            &mut parts.account_number
        } else {
            &mut parts.contact_name
        };
        if slot.is_empty() {
            *slot = value;
        }
        "\n"
    })
    .into_owned()
}

// --- segments -----------------------------------------------------------------

fn clean(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches(|c: char| c == ',' || c == ';' || c == ':').trim().to_string()
}

/// Uppercase without dots and commas, the form legal markers are stored in.
fn fold(token: &str) -> String {
    token.to_uppercase().replace(['.', ','], "")
}

fn is_legal_marker(token: &str) -> bool {
    LEGAL_MARKERS.contains(fold(token).as_str())
}

/// Lines and comma-separated pieces. A piece made only of legal markers
/// (`"ACME, INC."`) stays with the piece before it.
fn segments(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for piece in text.split(['\n', ',', ';']) {
        let piece = clean(piece);
        if piece.is_empty() {
            continue;
        }
        let marker_only = piece.split_whitespace().all(|t| t == "&" || is_legal_marker(t));
        match out.last_mut() {
            Some(prev) if marker_only => {
                prev.push_str(", ");
                prev.push_str(&piece);
            }
            _ => out.push(piece),
        }
    }
    out
}

// --- tail -----------------------------------------------------------------------

/// The last segment as a whole, or its last few words. A trailing word of
/// three letters needs capitals; one of two letters needs capitals too, must
/// not be a legal form, and when it doubles as a state code ("MA", "NL") a
/// postal code of that country has to come before it.
fn take_country(segments: &mut [String], ctx: &Context) -> Option<String> {
    let last = segments.last_mut()?;
    if let Some(iso2) = ctx.country_code(last.as_str()) {
        last.clear();
        return Some(iso2);
    }
    let tokens: Vec<&str> = last.split_whitespace().collect();
    for width in (1..=tokens.len().saturating_sub(1).min(4)).rev() {
        let tail = &tokens[tokens.len() - width..];
        if width == 1 {
            let t = tail[0].trim_end_matches(['.', ',']);
            let len = t.chars().count();
            if len < 2 || (len <= 3 && !t.chars().all(|c| c.is_ascii_uppercase())) {
                continue;
            }
            if len == 2 && !trailing_iso2(t, &tokens[..tokens.len() - 1], ctx) {
                continue;
            }
        }
        if let Some(iso2) = ctx.country_code(&tail.join(" ")) {
            *last = tokens[..tokens.len() - width].join(" ");
            return Some(iso2);
        }
    }
    None
}

fn trailing_iso2(code: &str, before: &[&str], ctx: &Context) -> bool {
    if is_legal_marker(code) {
        return false;
    }
    let Some(iso2) = ctx.country_code(code) else { return false };
    if !tables::is_any_state(code) {
        return true;
    }
    let before = before.join(" ");
    postal_patterns(Some(iso2.as_str())).iter().any(|re| re.is_match(&before))
}

fn postal_patterns(country: Option<&str>) -> Vec<&'static Regex> {
    let us = regex!(r"\b\d{5}(?:-\d{4})?\b");
    let ca = regex!(r"\b[A-Z]\d[A-Z]\s?\d[A-Z]\d\b");
    let gb = regex!(r"\b[A-Z]{1,2}\d[A-Z\d]?\s+\d[A-Z]{2}\b");
    let nl = regex!(r"\b\d{4}\s?[A-Z]{2}\b");
    let generic = regex!(r"\b(?:\d{5}-\d{3}|\d{3}-\d{4}|\d{2}-\d{3}|\d{4,6})\b");
    match country {
        Some("US") => vec![us],
        Some("CA") => vec![ca],
        Some("GB" | "IE") => vec![gb],
        Some("NL") => vec![nl, generic],
        Some(_) => vec![generic],
        None => vec![us, gb, ca, nl, generic],
    }
}

/// Rightmost postal code, searched from the last segment backwards. The first
/// segment is skipped when there are others since it holds the name.
///
/// Returns the segment index, the code as written, and the word index in the
/// shortened segment where the code used to be.
fn take_postal(segments: &mut [String], country: Option<&str>) -> Option<(usize, String, usize)> {
    let patterns = postal_patterns(country);
    let first = usize::from(segments.len() > 1);
    for i in (first..segments.len()).rev() {
        let seg = &segments[i];
        let Some(found) = patterns.iter().filter_map(|re| re.find_iter(seg).last()).max_by_key(|m| (m.start(), m.len())) else {
            continue;
        };
        let code = found.as_str().to_string();
        let at = seg[..found.start()].split_whitespace().count();
        let rest = clean(&format!("{} {}", &seg[..found.start()], &seg[found.end()..]));
        segments[i] = rest;
        return Some((i, code, at));
    }
    None
}

/// Remove word `index` from `segment` when it is a state code of `country`.
/// With no country yet, a code owned by exactly one country sets it.
fn take_state(segment: &mut String, index: usize, country: &mut Option<String>) -> Option<String> {
    let mut words: Vec<&str> = segment.split_whitespace().collect();
    let token = words.get(index)?.trim_matches(|c: char| c == '.' || c == ',');
    if !(2..=3).contains(&token.len()) || !token.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let accepted = match country.as_deref() {
        Some(iso2) => tables::is_state(iso2, token),
        None => match tables::state_country(token) {
            Some(owner) => {
                *country = Some(owner.to_string());
                true
            }
            None => false,
        },
    };
    if !accepted {
        return None;
    }
    let state = token.to_string();
    words.remove(index);
    *segment = words.join(" ");
    Some(state)
}

// --- head -----------------------------------------------------------------------

/// A leading code mixing letters and digits, such as `OU1083`.
fn looks_like_account(token: &str) -> bool {
    let len = token.chars().count();
    (4..=12).contains(&len)
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().any(|c| c.is_ascii_alphabetic())
}

fn is_street_word(token: &str) -> bool {
    let lower = token.to_lowercase();
    let bare = lower.trim_end_matches(['.', ',']);
    STREET_SUFFIXES.contains(bare)
        || STREET_FRAGMENTS.iter().any(|f| lower == *f || bare == *f || lower.ends_with(f) || bare.ends_with(f))
}

fn is_street_start(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        || STREET_FRAGMENTS.iter().any(|f| token.to_lowercase().trim_end_matches(',').ends_with(f))
}

/// Words belonging to the organisation name. The name closes after a legal
/// marker (taking any `& Co. KG` tail with it) or before a street word.
fn name_end(tokens: &[&str]) -> usize {
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if is_legal_marker(token) {
            let mut end = i + 1;
            while end < tokens.len() && (tokens[end] == "&" || is_legal_marker(tokens[end])) {
                end += 1;
            }
            return end;
        }
        if is_street_start(token) {
            return i;
        }
    }
    tokens.len()
}

// --- middle ---------------------------------------------------------------------

fn is_house_number(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit()) && token.chars().count() <= 7
}

/// Split a piece into its street part and whatever follows it.
fn split_street(piece: &str) -> (Option<String>, String) {
    let tokens: Vec<&str> = piece.split_whitespace().collect();
    if tokens.is_empty() {
        return (None, String::new());
    }
    let leading = tokens.iter().any(|t| LEADING_STREET_WORDS.contains(&t.to_lowercase().as_str()));
    let end = match tokens.iter().rposition(|t| is_street_word(t)) {
        _ if leading => tokens.len(),
        Some(at) => {
            let mut end = at + 1;
            while end < tokens.len() && is_house_number(tokens[end]) {
                end += 1;
            }
            end
        }
        None if tokens.len() > 1 && is_house_number(tokens[0]) => tokens.len(),
        None => return (None, piece.to_string()),
    };
    (Some(tokens[..end].join(" ")), tokens[end..].join(" "))
}

fn is_facility(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("c/o")
        || lower
            .split_whitespace()
            .any(|w| FACILITY_WORDS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric() && c != '/')))
}
