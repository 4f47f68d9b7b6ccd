//! Error taxonomy.
//!
//! None of these errors escape [`crate::resolve_document`]: each one is caught
//! at the node it concerns and turned into a [`crate::Message`]. They are
//! public so single-node entry points and custom registry clients can name
//! them.

use thiserror::Error;

/// A single rule could not be applied to a value. The rule is skipped and the
/// rest of the chain keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("`{0}` is not a recognised date")]
    InvalidDate(String),

    #[error("`{0}` is not a recognised amount")]
    InvalidCurrency(String),

    #[error("cannot evaluate expression `{0}`")]
    InvalidExpression(String),

    #[error("no sibling field labelled `{0}`")]
    MissingReference(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("data type mask `{mask}` does not fit `{value}`")]
    MaskMismatch { mask: String, value: String },
}

/// A value decomposition parser found nothing usable in its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("unrecognised value `{0}`")]
    Unrecognized(String),
}

/// The registry could not answer a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry query on `{0}` timed out")]
    Timeout(String),

    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// A node does not have the shape its kind requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("node `{0}` has an empty label")]
    EmptyLabel(String),

    #[error("address block `{id}` is missing child `{child}`")]
    PartialAddressBlock { id: String, child: String },

    #[error("address block `{id}` has unexpected child `{child}`")]
    UnexpectedAddressChild { id: String, child: String },

    #[error("compound key `{0}` has no sub-fields")]
    EmptyCompound(String),

    #[error("compound key `{id}` has no display sub-field `{child}`")]
    MissingCompoundChild { id: String, child: String },

    #[error("node id `{0}` is used more than once")]
    DuplicateId(String),
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule set `{key}`: {reason}")]
    InvalidRule { key: String, reason: String },

    #[error("compound group `{0}` names no display sub-field")]
    InvalidCompoundGroup(String),
}
