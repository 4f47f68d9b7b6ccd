//! Registry column translation and applying a decision to a section.
//!
//! A matched row is folded back into the document in two halves: columns
//! that describe the party itself land in the AddressBlock's children,
//! everything else becomes a sibling field next to it.

use super::registry::{Naming, PROFILE_COLUMN, Record};
use super::{Ambiguity, Decision, Miss, NAME_THRESHOLD};
use crate::parsers::parse_address;
use crate::{ADDRESS_CHILD_LABELS, Context, FieldNode, FieldSection, Message, NodeId, Origin, Status};
use serde::{Deserialize, Serialize};
use tracing::debug;

const REFERENCES: &str = "references";
/// Column prefixes whose remainder names an option of a qualifier table.
const QUALIFIER_PREFIXES: [&str; 5] = ["PARTIES_", "NOTES_", "TIME_", "CUSTOMSENTRIES_", "SERVICE_"];

/// The translated content of one accepted registry row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergedFields {
    pub table: String,
    pub score: u8,
    /// Set when the row was accepted on its full address; replaces the node text.
    pub full_address: Option<String>,
    /// `(child label, value)` pairs written into the AddressBlock.
    pub children: Vec<(String, String)>,
    pub siblings: Vec<SiblingField>,
}

/// A registry value surfaced as a field of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingField {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub qualifier: Option<String>,
}

// --- Column translation ---------------------------------------------------------

fn squash(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '_' | ' ' | '-')).flat_map(char::to_lowercase).collect()
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// AddressBlock child for a column remainder with the mother prefix removed.
fn child_label(rest: &str) -> Option<&'static str> {
    Some(match rest {
        "name" | "companyname" => "name",
        "accountnumber" | "account" => "accountNumber",
        "shortcode" => "shortCode",
        "addressline1" | "address1" => "addressLine1",
        "addressline2" | "address2" => "addressLine2",
        "city" => "city",
        "state" | "stateprovince" | "province" => "stateProvince",
        "postcode" | "postalcode" | "zip" | "zipcode" => "postalCode",
        "countrycode" | "country" => "countryCode",
        "contactname" | "contact" => "contactName",
        "contactphone" | "phone" | "telephone" => "contactPhone",
        "contactemail" | "email" => "contactEmail",
        "fulladdress" => "block",
        _ => return None,
    })
}

/// Strip a leading mother label from a camelCase label: `shipperAccountNumber`
/// on `shipper` gives `accountNumber`.
fn strip_mother(label: &str, mother: &str) -> Option<String> {
    let head = label.get(..mother.len())?;
    let rest = label.get(mother.len()..).filter(|r| !r.is_empty())?;
    head.eq_ignore_ascii_case(mother).then(|| lower_first(rest))
}

fn fixed_rename(lower: &str, table: &str) -> Option<&'static str> {
    Some(match lower {
        "template_id" => "TID",
        "consignee_account" => "consigneeAccountNumber",
        "shipper_account" => "shipperAccountNumber",
        "dest_code" => "destinationLocationCode",
        "parties_deliveryagent" | "dest_agent" => "deliveryAgent",
        "code" if table.contains("ebooking_inco_terms") => "incoterms",
        "location_code" if table.contains("ebooking_origin_location") => "originCountryCode",
        "location_code" if table.contains("ebooking_dest_location") => "destinationCountryCode",
        _ => return None,
    })
}

/// Map one registry column onto a field label and optional qualifier, as seen
/// from the AddressBlock labelled `mother`. `None` drops the column.
pub(super) fn translate(column: &str, mother: &str, table: &str, ctx: &Context) -> Option<(String, Option<String>)> {
    let lower = column.trim().to_lowercase();
    let table = table.to_lowercase();
    let short = lower.chars().count() == 3;
    if table.contains("template") && !lower.contains("template") && !short && lower != "tid" {
        return None;
    }
    if short {
        return Some((lower.to_uppercase(), Some(REFERENCES.to_string())));
    }

    if let Some(prefix) = QUALIFIER_PREFIXES.iter().find(|p| lower.starts_with(&p.to_lowercase())) {
        let family = prefix.trim_end_matches('_');
        let rest = column.trim().get(prefix.len()..).unwrap_or("");
        let option = ctx
            .qualifiers
            .iter()
            .find(|q| q.name.eq_ignore_ascii_case(family))
            .and_then(|q| q.options.iter().find(|o| o.eq_ignore_ascii_case(rest)).map(|o| (o, &q.name)));
        if let Some((option, name)) = option {
            return Some((option.clone(), Some(name.clone())));
        }
    }

    let mother_key = squash(mother);
    let label = match fixed_rename(&lower, &table) {
        Some("TID") => return Some(("TID".to_string(), None)),
        Some(renamed) => renamed.to_string(),
        None => {
            let key = squash(&lower);
            if let Some(child) = key.strip_prefix(&mother_key).filter(|r| !r.is_empty()).and_then(child_label) {
                return Some((child.to_string(), None));
            }
            ctx.known_labels.iter().find(|k| squash(k) == key)?.clone()
        }
    };

    let label = strip_mother(&label, mother).unwrap_or(label);
    let label = match squash(&label).as_str() {
        "fulladdress" => "block".to_string(),
        "templateid" => "TID".to_string(),
        key => child_label(key).filter(|c| ADDRESS_CHILD_LABELS.contains(c) && *c != "name").map_or(label, str::to_string),
    };
    Some((label, None))
}

/// Translate every usable column of an accepted row.
pub(super) fn merged(
    node: &FieldNode,
    row: &Record,
    naming: &Naming,
    score: u8,
    full_address: bool,
    ctx: &Context,
) -> MergedFields {
    let mut out = MergedFields { table: naming.table.clone(), score, ..MergedFields::default() };
    if full_address {
        out.full_address = row.get(&naming.full_address).map(str::to_string);
    }
    for (column, value) in row.columns() {
        let value = value.trim();
        if value.is_empty() || column.eq_ignore_ascii_case(PROFILE_COLUMN) {
            continue;
        }
        let Some((label, qualifier)) = translate(column, &node.label, &naming.table, ctx) else {
            debug!(column, table = %naming.table, "registry column dropped");
            continue;
        };
        let inside = qualifier.is_none() && (label == "block" || ADDRESS_CHILD_LABELS.contains(&label.as_str()));
        if !inside {
            out.siblings.push(SiblingField { label, value: value.to_string(), qualifier });
            continue;
        }
        match label.as_str() {
            "block" => {}
            "name" if !full_address => {}
            "accountNumber" | "shortCode" if !node.child_value(&label).trim().is_empty() => {}
            _ => out.children.push((label, value.to_string())),
        }
    }
    out
}

// --- Applying a decision ----------------------------------------------------------

/// Write `decision` into the AddressBlock at `id` and return the messages it produces.
pub(crate) fn apply_decision(section: &mut FieldSection, id: NodeId, decision: &Decision, ctx: &Context) -> Vec<Message> {
    let Some(node) = section.get_mut(id) else {
        return Vec::new();
    };
    let label = node.label.clone();
    let merged = match decision {
        Decision::NotFound(miss) => {
            node.set_status_deep(Status::Unresolved);
            let text = match miss {
                Miss::NoCandidates => format!("No match found for {label}"),
                Miss::BelowThreshold { .. } => {
                    format!("{label} company name did not reach minimum required match score of {NAME_THRESHOLD}%")
                }
            };
            return vec![Message::warning(label, text)];
        }
        Decision::Ambiguous(why) => {
            node.set_status_deep(Status::Ambiguous);
            let text = match why {
                Ambiguity::CloseMatches { .. } => format!("{label} company name has multiple close matches"),
                Ambiguity::AttributeMismatch => format!("{label} address line/account number initials mismatch"),
            };
            return vec![Message::warning(label, text)];
        }
        Decision::ServiceError(err) => {
            node.set_status_deep(Status::Error);
            return vec![Message::error(label.clone(), format!("{label} lookup failed: {err}"))];
        }
        Decision::Resolved(merged) => merged,
    };

    if let Some(full) = &merged.full_address {
        node.value = full.clone();
        node.children = parse_address(full, ctx).into_children(&node.id);
    }
    for (child, value) in &merged.children {
        if let Some(slot) = node.child_mut(child) {
            slot.value = value.clone();
            slot.origin = Origin::LookupGenerated;
        }
    }
    node.set_status_deep(Status::Resolved);
    let (anchor_id, anchor_unique) = (node.id.clone(), node.unique_id.clone());

    let mut added: Vec<NodeId> = Vec::new();
    for sibling in &merged.siblings {
        let stale: Vec<NodeId> = section
            .ids()
            .into_iter()
            .filter(|&other| other != id && !added.contains(&other))
            .filter(|&other| {
                section.get(other).is_some_and(|n| n.label == sibling.label && n.qualifier == sibling.qualifier)
            })
            .collect();
        for other in stale {
            section.remove(other);
        }
        let mut field = FieldNode::plain(format!("{anchor_id}.{}", sibling.label), &sibling.label, &sibling.value)
            .with_unique_id(format!("{anchor_unique}_{}", sibling.label))
            .with_origin(Origin::LookupGenerated)
            .with_status(Status::Resolved);
        field.qualifier = sibling.qualifier.clone();
        added.push(section.insert_after(id, field));
    }
    debug!(label = %label, table = %merged.table, siblings = added.len(), "registry row merged");

    vec![Message::info(label.clone(), format!("{label} auto query matched at {} pct", merged.score))]
}
