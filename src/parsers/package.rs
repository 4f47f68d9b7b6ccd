//! Package counts: `"3 PLT"`, `"12 cartons on 2 pallets"`.

use crate::error::ParseError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCount {
    pub count: String,
    pub package_type: String,
    pub extra_text: String,
}

static PACKAGE_CODES: Lazy<HashMap<&'static str, &'static str>> = table! {
    "pallet" => "PLT", "pallets" => "PLT", "plt" => "PLT", "plts" => "PLT", "pal" => "PLT", "palletpallet" => "PLT",
    "carton" => "CTN", "cartons" => "CTN", "ctn" => "CTN", "ctns" => "CTN",
    "box" => "BOX", "boxes" => "BOX", "bx" => "BOX",
    "piece" => "PCE", "pieces" => "PCE", "pcs" => "PCE", "pc" => "PCE", "pce" => "PCE",
    "bag" => "BAG", "bags" => "BAG",
    "drum" => "DR", "drums" => "DR",
    "case" => "CS", "cases" => "CS",
    "crate" => "CR", "crates" => "CR",
    "roll" => "RO", "rolls" => "RO",
    "package" => "PKG", "packages" => "PKG", "pkg" => "PKG", "pkgs" => "PKG",
    "colli" => "PKG", "coll" => "PKG",
};

pub(super) fn parse(raw: &str) -> Result<PackageCount, ParseError> {
    let text = raw.trim();
    let split_at = text.find(char::is_alphabetic).unwrap_or(text.len());
    let count = text[..split_at].trim().trim_end_matches(['x', 'X', '*']).trim();
    if !count.chars().any(|c| c.is_ascii_digit()) {
        return Err(ParseError::Unrecognized(text.to_string()));
    }
    let count: String = count.chars().filter(|c| !c.is_whitespace()).collect();

    let mut words = text[split_at..].split_whitespace();
    let package_type = words
        .next()
        .map(|w| {
            let folded = w.to_lowercase().replace(['.', ',', ':'], "");
            PACKAGE_CODES.get(folded.as_str()).map(|c| c.to_string()).unwrap_or_else(|| folded.to_uppercase())
        })
        .unwrap_or_default();
    let extra_text = words.collect::<Vec<_>>().join(" ");
    Ok(PackageCount { count, package_type, extra_text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_type_and_rest() {
        let p = parse("3 PLT").unwrap();
        assert_eq!((p.count.as_str(), p.package_type.as_str(), p.extra_text.as_str()), ("3", "PLT", ""));

        let p = parse("12 cartons on 2 pallets").unwrap();
        assert_eq!((p.count.as_str(), p.package_type.as_str(), p.extra_text.as_str()), ("12", "CTN", "on 2 pallets"));

        let p = parse("4 skids").unwrap();
        assert_eq!(p.package_type, "SKIDS");

        let p = parse("7").unwrap();
        assert_eq!((p.count.as_str(), p.package_type.as_str()), ("7", ""));
    }

    #[test]
    fn requires_a_number_first() {
        assert!(parse("pallets").is_err());
    }
}
