//! The registry seam.
//!
//! A registry is any synchronous request/response store of company rows.
//! Tables and columns follow one naming scheme per mother label:
//!
//! ```text
//! label "shipper"   table SHIPPER_MASTER
//!                   columns SHIPPERNAME, SHIPPERACCOUNTNUMBER, SHIPPERADDRESSLINE1,
//!                           SHIPPERADDRESSLINE2, SHIPPER_FULL_ADDRESS, SHIPPER_SHORT_CODE
//! label "supplier"  table CDZ_SUPPLIER (same column scheme)
//! every table       scope column PROFILE_NAME
//! ```

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels whose rows live in `CDZ_` tables.
const CDZ_LABELS: [&str; 2] = ["supplier", "importer"];
pub(crate) const PROFILE_COLUMN: &str = "PROFILE_NAME";

/// One flat registry row. Column names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Record(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Non-blank value of `column`, trimmed.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .get(column)
            .or_else(|| self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(column)).map(|(_, v)| v))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Equals,
    StartsWith,
}

/// One column condition of a registry query; all filters must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter { column: column.into(), op: FilterOp::Equals, value: value.into() }
    }

    pub fn starts_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter { column: column.into(), op: FilterOp::StartsWith, value: value.into() }
    }

    /// Case-insensitive test against a row. A missing column never matches.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(value) = record.get(&self.column) else {
            return false;
        };
        let (have, want) = (value.to_uppercase(), self.value.trim().to_uppercase());
        match self.op {
            FilterOp::Equals => have == want,
            FilterOp::StartsWith => have.starts_with(&want),
        }
    }
}

/// Synchronous registry access. Implementations own transport and timeouts.
pub trait RegistryClient {
    fn query(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, RegistryError>;
}

/// In-memory registry: named tables of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticRegistry {
    tables: BTreeMap<String, Vec<Record>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        StaticRegistry::default()
    }

    pub fn with(mut self, table: impl Into<String>, record: Record) -> Self {
        self.tables.entry(table.into()).or_default().push(record);
        self
    }
}

impl RegistryClient for StaticRegistry {
    fn query(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, RegistryError> {
        let rows = self
            .tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[]);
        Ok(rows.iter().filter(|r| filters.iter().all(|f| f.matches(r))).cloned().collect())
    }
}

// --- Naming -------------------------------------------------------------------

/// Table and column names for one mother label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Naming {
    pub(crate) table: String,
    pub(crate) name: String,
    pub(crate) account: String,
    pub(crate) line1: String,
    pub(crate) full_address: String,
}

impl Naming {
    pub(crate) fn for_label(label: &str) -> Self {
        let upper = label.to_uppercase();
        let table = if CDZ_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            format!("CDZ_{upper}")
        } else {
            format!("{upper}_MASTER")
        };
        Naming {
            table,
            name: format!("{upper}NAME"),
            account: format!("{upper}ACCOUNTNUMBER"),
            line1: format!("{upper}ADDRESSLINE1"),
            full_address: format!("{upper}_FULL_ADDRESS"),
        }
    }
}
