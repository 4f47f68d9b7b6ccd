//! Run configuration.
//!
//! A [`Context`] is built once per run (usually from JSON) and then only read.
//! It replaces the process-wide "current profile" state of older pipelines:
//! every engine entry point takes it by reference.

use crate::error::ConfigError;
use crate::parsers::ParserKind;
use crate::rules::Rule;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Labels queried against the registry when no explicit list is configured.
pub const DEFAULT_LOOKUP_LABELS: [&str; 7] = ["consignee", "shipper", "notify", "pickup", "delivery", "importer", "supplier"];

// --- Rule book --------------------------------------------------------------

/// An ordered rule list, aimed at the node itself or at one named child.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// `None` targets the whole node; `Some("addressLine1")` targets that child.
    #[serde(default)]
    pub child: Option<String>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn node(rules: Vec<Rule>) -> Self {
        RuleSet { child: None, rules }
    }

    pub fn child(child: impl Into<String>, rules: Vec<Rule>) -> Self {
        RuleSet { child: Some(child.into()), rules }
    }
}

/// Rule sets keyed by `label`, or by `label#uniqueId` for one field instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleBook(BTreeMap<String, Vec<RuleSet>>);

impl RuleBook {
    pub fn with(mut self, key: impl Into<String>, set: RuleSet) -> Self {
        self.0.entry(key.into()).or_default().push(set);
        self
    }

    /// Instance-scoped sets win over label-wide ones.
    pub fn for_node(&self, label: &str, unique_id: &str) -> &[RuleSet] {
        if !unique_id.is_empty() {
            if let Some(sets) = self.0.get(&format!("{label}#{unique_id}")) {
                return sets;
            }
        }
        self.0.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = (&String, &Vec<RuleSet>)> {
        self.0.iter()
    }
}

// --- Label classes and reference tables -------------------------------------

/// A compound field and the sub-field that supplies its display value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundGroup {
    pub display_child: String,
}

/// A qualifier family (e.g. `PARTIES`) and the codes it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifierTable {
    pub name: String,
    pub options: Vec<String>,
}

/// One known port or place, matched by the location parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortEntry {
    pub name: String,
    pub code: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LookupMode {
    /// Company-name score alone decides.
    Normal,
    /// Address-line and account-prefix checks must also pass.
    #[default]
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupSettings {
    pub enabled: bool,
    pub mode: LookupMode,
    pub country_check: bool,
    pub labels: Vec<String>,
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            enabled: true,
            mode: LookupMode::default(),
            country_check: true,
            labels: DEFAULT_LOOKUP_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// --- Context ----------------------------------------------------------------

/// Immutable per-run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    /// Reference datetime for relative date expressions ("tomorrow").
    pub reference_time: NaiveDateTime,
    /// Registry scope: only rows of this profile are candidates.
    pub profile: String,
    pub rules: RuleBook,
    pub address_labels: BTreeSet<String>,
    pub compound_groups: BTreeMap<String, CompoundGroup>,
    /// Fields of reference-qualifier type; split tokens on them are deduplicated.
    pub reference_labels: BTreeSet<String>,
    pub parsers: BTreeMap<String, ParserKind>,
    pub qualifiers: Vec<QualifierTable>,
    /// Labels a registry column may be mapped onto when merging a match.
    pub known_labels: Vec<String>,
    pub lookup: LookupSettings,
    /// Extra country-name -> ISO2 entries layered over the built-in table.
    pub countries: BTreeMap<String, String>,
    /// Extra ports layered over the built-in table.
    pub ports: Vec<PortEntry>,
}

impl Default for Context {
    fn default() -> Self {
        let reference_time = if cfg!(test) {
            let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap_or_default();
            NaiveDateTime::new(date, NaiveTime::MIN)
        } else {
            Local::now().naive_local()
        };
        Context {
            reference_time,
            profile: String::new(),
            rules: RuleBook::default(),
            address_labels: BTreeSet::new(),
            compound_groups: BTreeMap::new(),
            reference_labels: BTreeSet::new(),
            parsers: BTreeMap::new(),
            qualifiers: Vec::new(),
            known_labels: Vec::new(),
            lookup: LookupSettings::default(),
            countries: BTreeMap::new(),
            ports: Vec::new(),
        }
    }
}

impl Context {
    /// Load and check a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let ctx: Context = serde_json::from_str(json)?;
        ctx.check()?;
        Ok(ctx)
    }

    /// Reject configurations that could never apply: rule regexes that do
    /// not compile and compound groups without a display sub-field.
    pub fn check(&self) -> Result<(), ConfigError> {
        for (key, sets) in self.rules.entries() {
            for set in sets {
                for rule in &set.rules {
                    rule.check().map_err(|e| ConfigError::InvalidRule { key: key.clone(), reason: e.to_string() })?;
                }
            }
        }
        for (label, group) in &self.compound_groups {
            if group.display_child.trim().is_empty() {
                return Err(ConfigError::InvalidCompoundGroup(label.clone()));
            }
        }
        Ok(())
    }

    pub fn with_rules(mut self, key: impl Into<String>, set: RuleSet) -> Self {
        self.rules = std::mem::take(&mut self.rules).with(key, set);
        self
    }

    pub fn with_address_label(mut self, label: impl Into<String>) -> Self {
        self.address_labels.insert(label.into());
        self
    }

    pub fn with_reference_label(mut self, label: impl Into<String>) -> Self {
        self.reference_labels.insert(label.into());
        self
    }

    pub fn with_parser(mut self, label: impl Into<String>, kind: ParserKind) -> Self {
        self.parsers.insert(label.into(), kind);
        self
    }

    pub fn with_compound(mut self, label: impl Into<String>, display_child: impl Into<String>) -> Self {
        self.compound_groups.insert(label.into(), CompoundGroup { display_child: display_child.into() });
        self
    }

    pub fn is_address_label(&self, label: &str) -> bool {
        self.address_labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn is_reference_label(&self, label: &str) -> bool {
        self.reference_labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn is_lookup_label(&self, label: &str) -> bool {
        self.lookup.enabled && self.lookup.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn parser_for(&self, label: &str) -> Option<ParserKind> {
        self.parsers.get(label).copied()
    }

    pub fn display_child(&self, label: &str) -> Option<&str> {
        self.compound_groups.get(label).map(|g| g.display_child.as_str())
    }

    /// Country name or code to ISO2, configured entries first.
    pub fn country_code(&self, name: &str) -> Option<String> {
        let key = name.trim().trim_end_matches(['.', ',']).to_uppercase();
        if key.is_empty() {
            return None;
        }
        self.countries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            .map(|(_, v)| v.to_uppercase())
            .or_else(|| crate::parsers::tables::country_code(&key).map(str::to_string))
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Run value decomposition parsers before the rule engine.
    pub parse_values: bool,
    /// Query the registry for address fields.
    pub resolve_entities: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { parse_values: true, resolve_entities: true }
    }
}
