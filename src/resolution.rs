//! Entity resolution: AddressBlock fields against the trading-partner registry.
//!
//! ```text
//! AddressBlock ── search key ("ACME", "DB SCHENKER") ──> registry.query(table, filters)
//!                                                              │ rows
//!                        full-address score >= 95 ─────────────┼──> Resolved (wholesale)
//!                        name score >= 90                      │
//!                        address line / account prefix checks  │
//!                        close-match tie-break ────────────────┴──> Resolved | Ambiguous | NotFound
//!
//! apply_decision: status on the node and its children, keep-inside columns
//! into the children, everything else as LookupGenerated siblings.
//! ```
//!
//! ## Responsibilities by module
//!
//! - `registry.rs`: the [`RegistryClient`] seam, rows, filters, the per-label
//!   table and column names, and the in-memory [`StaticRegistry`].
//! - `matching.rs`: candidate scoring and the decision.
//! - `merge.rs`: registry column translation and applying a decision to a section.
//! - `fuzzy.rs`: similarity scores shared with the location parser.

#[path = "resolution/fuzzy.rs"]
pub(crate) mod fuzzy;
#[path = "resolution/matching.rs"]
mod matching;
#[path = "resolution/merge.rs"]
mod merge;
#[path = "resolution/registry.rs"]
mod registry;

#[cfg(test)]
#[path = "resolution/tests.rs"]
mod tests;

pub use matching::resolve;
pub use merge::{MergedFields, SiblingField};
pub use registry::{Filter, FilterOp, Record, RegistryClient, StaticRegistry};

pub(crate) use merge::apply_decision;

use crate::error::RegistryError;

/// Minimum company-name score for a candidate to be considered.
pub const NAME_THRESHOLD: u8 = 90;
/// Address-line score a candidate must exceed in explicit mode.
pub const ADDRESS_LINE_THRESHOLD: u8 = 90;
/// Full-address score that accepts a candidate outright.
pub const FULL_ADDRESS_THRESHOLD: u8 = 95;
/// Scores this close to the best one make the match ambiguous.
pub const CLOSE_MATCH_MARGIN: u8 = 2;

/// Outcome of resolving one AddressBlock.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Resolved(MergedFields),
    Ambiguous(Ambiguity),
    NotFound(Miss),
    ServiceError(RegistryError),
}

/// Why several candidates could not be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ambiguity {
    /// Two or more name scores tie or lie within [`CLOSE_MATCH_MARGIN`] of the best.
    CloseMatches { scores: Vec<u8> },
    /// Names matched, but every such candidate failed the address-line or
    /// account-prefix check.
    AttributeMismatch,
}

/// Why nothing was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// No usable search key, or the registry returned no rows.
    NoCandidates,
    /// Rows came back, none reached [`NAME_THRESHOLD`].
    BelowThreshold { best: u8 },
}

impl Decision {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Decision::Resolved(_))
    }
}
