//! Value decomposition parsers.
//!
//! Each parser turns one free-text value into zero or more structured tuples.
//! A vector comes back because one cell may describe several physical items
//! (`"2x 115x140x92cm 1x 80x60x50cm"`).
//!
//! ```text
//! raw ──> scan (ValueTraits) ──> Tier 2 exception shapes ──┐
//!                           └──> Tier 1 token classifier ──┴─> Vec<Parsed>
//!                                        │ empty
//!                                        v
//!                                 Tier 2 fallback ──> nothing ──> [Parsed::Opaque(raw)]
//! ```
//!
//! ## Responsibilities by module
//!
//! - `scan.rs`: cheap input classification shared by every parser.
//! - `tables.rs`: built-in reference vocabularies (countries, states, legal
//!   markers, street words, ports).
//! - `dimension.rs`, `address.rs`, `measure.rs` (weight and volume),
//!   `temperature.rs`, `incoterm.rs`, `location.rs`, `package.rs`.
//!
//! Parsers never fail outward: a value nothing understands is returned as a
//! single [`Parsed::Opaque`]. For addresses that means text in which nothing
//! past a name was found. AddressBlocks themselves always get the full child
//! set, with such text in `name`.

#[path = "parsers/address.rs"]
mod address;
#[path = "parsers/dimension.rs"]
mod dimension;
#[path = "parsers/incoterm.rs"]
mod incoterm;
#[path = "parsers/location.rs"]
mod location;
#[path = "parsers/measure.rs"]
mod measure;
#[path = "parsers/package.rs"]
mod package;
#[path = "parsers/scan.rs"]
mod scan;
#[path = "parsers/tables.rs"]
pub(crate) mod tables;
#[path = "parsers/temperature.rs"]
mod temperature;

#[cfg(test)]
#[path = "parsers/tests.rs"]
mod tests;

pub use address::AddressParts;
pub use dimension::{Dimensions, LengthUom};
pub use incoterm::IncotermPlace;
pub use location::LocationMatch;
pub use measure::Measure;
pub use package::PackageCount;
pub use temperature::TemperatureRange;

pub(crate) use address::parse_address;

use crate::Context;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which decomposition a label's values go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParserKind {
    Dimension,
    Address,
    Weight,
    Volume,
    Temperature,
    Incoterm,
    Location,
    PackageCount,
}

/// One structured tuple produced by a parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parsed {
    Dimensions(Dimensions),
    Address(AddressParts),
    Weight(Measure),
    Volume(Measure),
    Temperature(TemperatureRange),
    Incoterm(IncotermPlace),
    Location(LocationMatch),
    PackageCount(PackageCount),
    /// Raw text kept as-is because no tier understood it.
    Opaque(String),
}

impl Parsed {
    pub fn is_opaque(&self) -> bool {
        matches!(self, Parsed::Opaque(_))
    }

    /// Flatten into `(label, value)` pairs for the field named `label`.
    ///
    /// Empty components are left out. Labels follow the document conventions:
    /// `{label}Uom` for units, `{label}_1` for leftover text.
    pub fn fields(&self, label: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut push = |l: String, v: &str| {
            if !v.trim().is_empty() {
                out.push((l, v.trim().to_string()));
            }
        };
        match self {
            Parsed::Dimensions(d) => {
                push("length".into(), &d.length);
                push("width".into(), &d.width);
                push("height".into(), &d.height);
                push(format!("{label}Uom"), d.uom.code());
                let optional = [
                    ("packageCount", &d.package_count),
                    ("packageType", &d.package_type),
                    ("innerPackageCount", &d.inner_package_count),
                    ("innerPackageType", &d.inner_package_type),
                    ("grossWeight", &d.gross_weight),
                    ("grossWeightUom", &d.gross_weight_uom),
                ];
                for (l, v) in optional {
                    if let Some(v) = v {
                        push(l.into(), v);
                    }
                }
                if let Some(extra) = &d.extra_text {
                    push(format!("{label}_1"), extra);
                }
            }
            Parsed::Address(parts) => {
                for (l, v) in parts.pairs() {
                    push(l.into(), v);
                }
            }
            Parsed::Weight(m) | Parsed::Volume(m) => {
                push(label.into(), &m.value);
                push(format!("{label}Uom"), &m.uom);
                push(format!("{label}_1"), &m.extra_text);
            }
            Parsed::Temperature(t) => {
                push("requiresTemperatureControl".into(), if t.controlled { "TRUE" } else { "FALSE" });
                if let Some(min) = &t.min {
                    push("requiredMinimum".into(), min);
                }
                if let Some(max) = &t.max {
                    push("requiredMaximum".into(), max);
                }
                if let Some(uom) = &t.uom {
                    push("temperatureUom".into(), uom);
                }
            }
            Parsed::Incoterm(i) => {
                push(label.into(), &i.term);
                push(format!("{label}Location"), &i.place);
            }
            Parsed::Location(l) => {
                let stem = label.strip_suffix("Name").unwrap_or(label);
                let prefix = label.strip_suffix("LocationName").unwrap_or(stem);
                push(label.into(), &l.name);
                push(format!("{stem}Code"), &l.code);
                push(format!("{prefix}CountryCode"), &l.country_code);
            }
            Parsed::PackageCount(p) => {
                let type_label = if label.contains("inner") {
                    "innerPackageType"
                } else if label.contains("total") {
                    "totalPackageType"
                } else {
                    "packageType"
                };
                push(label.into(), &p.count);
                push(type_label.into(), &p.package_type);
                push(format!("{label}_1"), &p.extra_text);
            }
            Parsed::Opaque(raw) => push(label.into(), raw),
        }
        out
    }
}

/// Run the `kind` parser over `raw`.
///
/// Always returns at least one tuple; unparseable input comes back as a
/// single [`Parsed::Opaque`].
pub(crate) fn parse(kind: ParserKind, raw: &str, ctx: &Context) -> Vec<Parsed> {
    let outcome: Result<Vec<Parsed>, ParseError> = if raw.trim().is_empty() {
        Err(ParseError::Empty)
    } else {
        match kind {
            ParserKind::Dimension => dimension::parse(raw).map(|v| v.into_iter().map(Parsed::Dimensions).collect()),
            ParserKind::Address => {
                let parts = parse_address(raw, ctx);
                if parts.has_structure() {
                    Ok(vec![Parsed::Address(parts)])
                } else {
                    Err(ParseError::Unrecognized(raw.trim().to_string()))
                }
            }
            ParserKind::Weight => measure::parse_weight(raw).map(|m| vec![Parsed::Weight(m)]),
            ParserKind::Volume => measure::parse_volume(raw).map(|m| vec![Parsed::Volume(m)]),
            ParserKind::Temperature => Ok(vec![Parsed::Temperature(temperature::parse(raw))]),
            ParserKind::Incoterm => incoterm::parse(raw).map(|i| vec![Parsed::Incoterm(i)]),
            ParserKind::Location => location::parse(raw, ctx).map(|l| vec![Parsed::Location(l)]),
            ParserKind::PackageCount => package::parse(raw).map(|p| vec![Parsed::PackageCount(p)]),
        }
    };
    match outcome {
        Ok(tuples) if !tuples.is_empty() => tuples,
        Ok(_) => vec![Parsed::Opaque(raw.to_string())],
        Err(e) => {
            debug!(?kind, error = %e, "value kept opaque");
            vec![Parsed::Opaque(raw.to_string())]
        }
    }
}
