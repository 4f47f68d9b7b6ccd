//! Candidate scoring and the resolve decision.

use super::fuzzy::{normalize, ratio};
use super::merge::merged;
use super::registry::{Filter, Naming, PROFILE_COLUMN, Record, RegistryClient};
use super::{
    ADDRESS_LINE_THRESHOLD, Ambiguity, CLOSE_MATCH_MARGIN, Decision, FULL_ADDRESS_THRESHOLD, Miss, NAME_THRESHOLD,
};
use crate::{Context, FieldNode, LookupMode};
use tracing::{debug, warn};

/// Registry name prefix for a node: the first word of its name, or the
/// first two when the first is shorter than four characters.
pub(crate) fn search_key(node: &FieldNode) -> Option<String> {
    let name = node.child_value("name");
    let source = if name.trim().is_empty() { node.value.as_str() } else { name };
    let mut words = source.split_whitespace().map(|w| w.trim_end_matches(',').to_uppercase()).filter(|w| !w.is_empty());
    let first = words.next()?;
    if first.chars().count() < 4 {
        if let Some(second) = words.next() {
            return Some(format!("{first} {second}"));
        }
    }
    Some(first)
}

fn score(a: &str, b: &str) -> u8 {
    ratio(&normalize(a), &normalize(b))
}

/// The node's own text for full-address comparison: its value, or its
/// non-empty children joined when the value is blank.
fn address_text(node: &FieldNode) -> String {
    if !node.value.trim().is_empty() {
        return node.value.clone();
    }
    node.children.iter().map(|c| c.value.trim()).filter(|v| !v.is_empty()).collect::<Vec<_>>().join(", ")
}

/// Resolve one AddressBlock against the registry.
///
/// The registry is queried once. A failure is returned as
/// [`Decision::ServiceError`]; it never aborts the caller.
pub fn resolve(node: &FieldNode, registry: &dyn RegistryClient, ctx: &Context) -> Decision {
    let naming = Naming::for_label(&node.label);
    let Some(key) = search_key(node) else {
        debug!(label = %node.label, "no search key, lookup skipped");
        return Decision::NotFound(Miss::NoCandidates);
    };
    let mut filters = vec![Filter::starts_with(&naming.name, &key)];
    if !ctx.profile.is_empty() {
        filters.push(Filter::equals(PROFILE_COLUMN, &ctx.profile));
    }

    let rows = match registry.query(&naming.table, &filters) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(label = %node.label, table = %naming.table, error = %err, "registry query failed");
            return Decision::ServiceError(err);
        }
    };
    debug!(label = %node.label, table = %naming.table, key = %key, rows = rows.len(), "registry candidates");
    if rows.is_empty() {
        return Decision::NotFound(Miss::NoCandidates);
    }

    // full address first: a near-verbatim match settles it
    let text = address_text(node);
    if !text.is_empty() {
        let best = rows
            .iter()
            .filter_map(|row| row.get(&naming.full_address).map(|full| (score(full, &text), row)))
            .max_by_key(|(s, _)| *s);
        if let Some((s, row)) = best {
            debug!(label = %node.label, score = s, "full address score");
            if s >= FULL_ADDRESS_THRESHOLD {
                return Decision::Resolved(merged(node, row, &naming, s, true, ctx));
            }
        }
    }

    let name = match node.child_value("name") {
        n if n.trim().is_empty() => node.value.as_str(),
        n => n,
    };
    let scored: Vec<(u8, &Record)> =
        rows.iter().map(|row| (score(row.get(&naming.name).unwrap_or(""), name), row)).collect();
    let best = scored.iter().map(|(s, _)| *s).max().unwrap_or(0);
    debug!(label = %node.label, best, candidates = scored.len(), "company name scores");

    let passing: Vec<(u8, &Record)> = scored.into_iter().filter(|(s, _)| *s >= NAME_THRESHOLD).collect();
    if passing.is_empty() {
        return Decision::NotFound(Miss::BelowThreshold { best });
    }
    let kept: Vec<(u8, &Record)> = passing.into_iter().filter(|(_, row)| attributes_agree(node, row, &naming, ctx)).collect();
    let Some(top) = kept.iter().map(|(s, _)| *s).max() else {
        return Decision::Ambiguous(Ambiguity::AttributeMismatch);
    };

    let close: Vec<u8> = kept.iter().map(|(s, _)| *s).filter(|s| top - s <= CLOSE_MATCH_MARGIN).collect();
    if close.len() > 1 {
        return Decision::Ambiguous(Ambiguity::CloseMatches { scores: close });
    }
    match kept.into_iter().find(|(s, _)| *s == top) {
        Some((s, row)) => Decision::Resolved(merged(node, row, &naming, s, false, ctx)),
        None => Decision::NotFound(Miss::BelowThreshold { best }),
    }
}

/// Address-line similarity (explicit mode only) and account-number prefix
/// against the node's country. Checks with nothing to compare pass.
fn attributes_agree(node: &FieldNode, row: &Record, naming: &Naming, ctx: &Context) -> bool {
    if ctx.lookup.mode == LookupMode::Explicit {
        let ours = node.child_value("addressLine1").trim();
        if let Some(theirs) = row.get(&naming.line1) {
            if !ours.is_empty() && score(ours, theirs) <= ADDRESS_LINE_THRESHOLD {
                debug!(label = %node.label, ours, theirs, "address line mismatch");
                return false;
            }
        }
    }
    if ctx.lookup.country_check {
        let country = node.child_value("countryCode").trim();
        if let Some(account) = row.get(&naming.account) {
            if !country.is_empty() && !account.get(..2).is_some_and(|p| p.eq_ignore_ascii_case(country)) {
                debug!(label = %node.label, account, country, "account prefix mismatch");
                return false;
            }
        }
    }
    true
}
