//! Rule-driven field resolution for shipping and customs documents.
//!
//! Upstream extraction hands over a [`Document`]: ordered sections of
//! extracted fields and tables. This crate normalises that tree in place.
//!
//! ```text
//! Document ──┬─ Section::Fields ── FieldSection (arena of FieldNode, ordered by OrderKey)
//!            └─ Section::Table  ── TableSection ── TableRow ── Cell
//!
//! resolve_document (api.rs)
//!   1. structural check        per node, bad nodes pass through untouched
//!   2. value parsers           parsers.rs    raw text -> Parsed tuples -> sibling fields
//!   3. rule engine             engine.rs     up to MAX_PASSES passes over generated nodes
//!   4. entity resolution       resolution.rs AddressBlock fields vs. the registry
//!   5. status propagation      Unresolved/Ambiguous parents mark their children
//! ```
//!
//! Everything is driven by an immutable [`Context`] (rules, label classes,
//! reference tables) passed into every entry point. Failures never escape:
//! they end up in the returned [`Message`] list and the document comes back
//! degraded in place.

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod error;
mod parsers;
mod resolution;
mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use api::{Resolution, apply_rules, parse_value, resolve_document};
pub use config::{CompoundGroup, Context, LookupMode, LookupSettings, Options, PortEntry, QualifierTable, RuleBook, RuleSet};
pub use engine::{Applied, MAX_PASSES, PassMetrics, RunMetrics};
pub use error::{ConfigError, ParseError, RegistryError, RuleError, StructuralError};
pub use parsers::{
    AddressParts, Dimensions, IncotermPlace, LengthUom, LocationMatch, Measure, PackageCount, Parsed, ParserKind,
    TemperatureRange,
};
pub use resolution::{
    Ambiguity, Decision, Filter, FilterOp, MergedFields, Miss, Record, RegistryClient, SiblingField, StaticRegistry,
    resolve,
};
pub use rules::{ArithmeticOp, Condition, FilterTest, LetterCase, Matcher, Replacement, RoundMode, Rule};

/// Canonical children of every AddressBlock node, in display order.
pub const ADDRESS_CHILD_LABELS: [&str; 12] = [
    "name",
    "accountNumber",
    "shortCode",
    "addressLine1",
    "addressLine2",
    "city",
    "stateProvince",
    "postalCode",
    "countryCode",
    "contactName",
    "contactPhone",
    "contactEmail",
];

// --- Node attributes --------------------------------------------------------

/// Review state of a field.
///
/// Fields start `Unresolved`; a registry match or a reviewer moves them on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    Resolved,
    #[default]
    Unresolved,
    Ambiguous,
    Error,
}

impl Status {
    /// True for every state that still needs a human look.
    pub fn needs_review(self) -> bool {
        !matches!(self, Status::Resolved)
    }
}

/// Who produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Origin {
    #[default]
    Extracted,
    RuleGenerated,
    LookupGenerated,
    Parsed,
}

/// Structural variant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Plain,
    AddressBlock,
    CompoundKey,
    TableCell,
}

// --- FieldNode --------------------------------------------------------------

/// One extracted field instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldNode {
    pub id: String,
    pub unique_id: String,
    pub label: String,
    pub value: String,
    pub status: Status,
    pub origin: Origin,
    pub kind: NodeKind,
    /// Qualifier family for coded fields, e.g. `references`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
    /// Set on clones emitted by `SplitBySeparator`; they never evict same-label nodes.
    #[serde(skip)]
    pub(crate) split_clone: bool,
}

impl FieldNode {
    pub fn plain(id: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        let id = id.into();
        FieldNode { unique_id: id.clone(), id, label: label.into(), value: value.into(), ..FieldNode::default() }
    }

    /// Build an AddressBlock whose children are the full canonical set.
    pub fn address_block(
        id: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
        parts: AddressParts,
    ) -> Self {
        let id = id.into();
        let children = parts.into_children(&id);
        FieldNode {
            unique_id: id.clone(),
            id,
            label: label.into(),
            value: value.into(),
            kind: NodeKind::AddressBlock,
            children,
            ..FieldNode::default()
        }
    }

    /// Build a CompoundKey node; its display value starts as the first sub-field's value.
    pub fn compound(id: impl Into<String>, label: impl Into<String>, children: Vec<FieldNode>) -> Self {
        let id = id.into();
        let value = children.first().map(|c| c.value.clone()).unwrap_or_default();
        FieldNode {
            unique_id: id.clone(),
            id,
            label: label.into(),
            value,
            kind: NodeKind::CompoundKey,
            children,
            ..FieldNode::default()
        }
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = unique_id.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.set_status_deep(status);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn is_address(&self) -> bool {
        self.kind == NodeKind::AddressBlock
    }

    pub fn is_compound(&self) -> bool {
        self.kind == NodeKind::CompoundKey
    }

    pub fn child(&self, label: &str) -> Option<&FieldNode> {
        self.children.iter().find(|c| c.label == label)
    }

    pub fn child_mut(&mut self, label: &str) -> Option<&mut FieldNode> {
        self.children.iter_mut().find(|c| c.label == label)
    }

    /// Value of the named child, or `""` when absent.
    pub fn child_value(&self, label: &str) -> &str {
        self.child(label).map(|c| c.value.as_str()).unwrap_or("")
    }

    /// Set the status on this node and every descendant.
    pub fn set_status_deep(&mut self, status: Status) {
        self.status = status;
        for child in &mut self.children {
            child.set_status_deep(status);
        }
    }

    /// Push an Unresolved/Ambiguous/Error status down to the children.
    pub(crate) fn propagate_status(&mut self) {
        if self.status.needs_review() {
            let status = self.status;
            for child in &mut self.children {
                child.set_status_deep(status);
            }
        } else {
            for child in &mut self.children {
                child.propagate_status();
            }
        }
    }

    /// A fresh plain node derived from this one (same unique id family, no children).
    pub(crate) fn spawn(&self, id: String, label: &str, value: &str, origin: Origin) -> FieldNode {
        FieldNode {
            unique_id: format!("{}_{}", self.unique_id, label),
            id,
            label: label.to_string(),
            value: value.to_string(),
            status: self.status,
            origin,
            kind: if self.kind == NodeKind::TableCell { NodeKind::TableCell } else { NodeKind::Plain },
            ..FieldNode::default()
        }
    }

    /// Check the shape this node's kind requires.
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.label.trim().is_empty() {
            return Err(StructuralError::EmptyLabel(self.id.clone()));
        }
        match self.kind {
            NodeKind::AddressBlock => {
                for expected in ADDRESS_CHILD_LABELS {
                    if self.child(expected).is_none() {
                        return Err(StructuralError::PartialAddressBlock {
                            id: self.id.clone(),
                            child: expected.to_string(),
                        });
                    }
                }
                if let Some(extra) = self.children.iter().find(|c| !ADDRESS_CHILD_LABELS.contains(&c.label.as_str())) {
                    return Err(StructuralError::UnexpectedAddressChild {
                        id: self.id.clone(),
                        child: extra.label.clone(),
                    });
                }
                Ok(())
            }
            NodeKind::CompoundKey if self.children.is_empty() => Err(StructuralError::EmptyCompound(self.id.clone())),
            _ => Ok(()),
        }
    }
}

// --- FieldSection: arena + insertion-order keys -----------------------------

/// Handle to a node slot inside one [`FieldSection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Position of a node in its section.
///
/// Extracted nodes get `[i]`; the `n`-th node generated from a node with key
/// `k` gets `k ++ [n]`. Lexicographic order therefore places every generated
/// node right after its origin, in generation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OrderKey(Vec<u32>);

impl OrderKey {
    pub fn root(position: u32) -> Self {
        OrderKey(vec![position])
    }

    pub fn spawn(&self, seq: u32) -> Self {
        let mut path = self.0.clone();
        path.push(seq);
        OrderKey(path)
    }

    /// 1 for extracted nodes, +1 per generation.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    key: OrderKey,
    spawned: u32,
    node: Option<FieldNode>,
}

/// Ordered list of fields, stored as an arena of slots.
///
/// Removing a node leaves a tombstone so outstanding [`NodeId`]s and the
/// order keys of generated nodes stay valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldNode>", into = "Vec<FieldNode>")]
pub struct FieldSection {
    slots: Vec<Slot>,
}

impl FieldSection {
    pub fn new(nodes: Vec<FieldNode>) -> Self {
        let slots = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| Slot { key: OrderKey::root(i as u32), spawned: 0, node: Some(node) })
            .collect();
        FieldSection { slots }
    }

    /// Append a node after every existing root.
    pub fn push(&mut self, node: FieldNode) -> NodeId {
        let next = self.slots.iter().filter(|s| s.key.depth() == 1).count() as u32;
        let node = self.uniquify(node);
        self.slots.push(Slot { key: OrderKey::root(next), spawned: 0, node: Some(node) });
        NodeId(self.slots.len() - 1)
    }

    /// Insert `node` right after `anchor` and after anything previously spawned from it.
    pub fn insert_after(&mut self, anchor: NodeId, node: FieldNode) -> NodeId {
        let node = self.uniquify(node);
        let key = match self.slots.get_mut(anchor.0) {
            Some(slot) => {
                slot.spawned += 1;
                slot.key.spawn(slot.spawned)
            }
            None => OrderKey::root(self.slots.len() as u32),
        };
        self.slots.push(Slot { key, spawned: 0, node: Some(node) });
        NodeId(self.slots.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&FieldNode> {
        self.slots.get(id.0).and_then(|s| s.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut FieldNode> {
        self.slots.get_mut(id.0).and_then(|s| s.node.as_mut())
    }

    pub fn order_key(&self, id: NodeId) -> Option<&OrderKey> {
        self.slots.get(id.0).map(|s| &s.key)
    }

    /// Take a node out, leaving a tombstone. Use [`FieldSection::restore`] to put it back.
    pub fn take(&mut self, id: NodeId) -> Option<FieldNode> {
        self.slots.get_mut(id.0).and_then(|s| s.node.take())
    }

    pub fn restore(&mut self, id: NodeId, node: FieldNode) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.node = Some(node);
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<FieldNode> {
        self.take(id)
    }

    /// Live node ids in display order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut live: Vec<(&OrderKey, NodeId)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.node.is_some())
            .map(|(i, s)| (&s.key, NodeId(i)))
            .collect();
        live.sort();
        live.into_iter().map(|(_, id)| id).collect()
    }

    /// Live nodes in display order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldNode> + '_ {
        self.ids().into_iter().filter_map(move |id| self.get(id))
    }

    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.ids().into_iter().find(|&id| self.get(id).is_some_and(|n| n.label == label))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_nodes(self) -> Vec<FieldNode> {
        let order = self.ids();
        let mut slots: Vec<Option<FieldNode>> = self.slots.into_iter().map(|s| s.node).collect();
        order.into_iter().filter_map(|id| slots.get_mut(id.0).and_then(Option::take)).collect()
    }

    fn uniquify(&self, mut node: FieldNode) -> FieldNode {
        let base = node.id.clone();
        let mut n = 1;
        while self.slots.iter().any(|s| s.node.as_ref().is_some_and(|other| other.id == node.id)) {
            n += 1;
            node.id = format!("{base}~{n}");
        }
        node
    }
}

impl From<Vec<FieldNode>> for FieldSection {
    fn from(nodes: Vec<FieldNode>) -> Self {
        FieldSection::new(nodes)
    }
}

impl From<FieldSection> for Vec<FieldNode> {
    fn from(section: FieldSection) -> Self {
        section.into_nodes()
    }
}

// --- Tables -----------------------------------------------------------------

/// One table cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cell {
    pub label: String,
    pub value: String,
    pub position: usize,
    pub status: Status,
    pub origin: Origin,
}

impl Cell {
    pub fn new(label: impl Into<String>, value: impl Into<String>, position: usize) -> Self {
        Cell { label: label.into(), value: value.into(), position, ..Cell::default() }
    }

    pub(crate) fn to_node(&self, row: usize) -> FieldNode {
        let id = format!("r{row}c{}", self.position);
        FieldNode {
            unique_id: id.clone(),
            id,
            label: self.label.clone(),
            value: self.value.clone(),
            status: self.status,
            origin: self.origin,
            kind: NodeKind::TableCell,
            ..FieldNode::default()
        }
    }

    pub(crate) fn from_node(node: FieldNode, position: usize) -> Self {
        Cell { label: node.label, value: node.value, position, status: node.status, origin: node.origin }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        TableRow { cells }
    }

    pub fn cell(&self, label: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSection {
    pub label: String,
    pub rows: Vec<TableRow>,
}

// --- Document ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Fields(FieldSection),
    Table(TableSection),
}

/// A per-document field tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub id: String,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(id: impl Into<String>, sections: Vec<Section>) -> Self {
        Document { id: id.into(), sections }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Field sections only, in order.
    pub fn field_sections(&self) -> impl Iterator<Item = &FieldSection> {
        self.sections.iter().filter_map(|s| match s {
            Section::Fields(f) => Some(f),
            Section::Table(_) => None,
        })
    }

    /// First live field with `label` in any field section.
    pub fn field(&self, label: &str) -> Option<&FieldNode> {
        self.field_sections().flat_map(|s| s.iter()).find(|n| n.label == label)
    }

    /// Ids that occur more than once across all field sections (children included).
    pub fn duplicate_ids(&self) -> Vec<String> {
        fn walk<'a>(node: &'a FieldNode, seen: &mut std::collections::HashSet<&'a str>, dups: &mut Vec<String>) {
            if !seen.insert(node.id.as_str()) && !dups.contains(&node.id) {
                dups.push(node.id.clone());
            }
            for child in &node.children {
                walk(child, seen, dups);
            }
        }
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for section in self.field_sections() {
            for node in section.iter() {
                walk(node, &mut seen, &mut dups);
            }
        }
        dups
    }
}

// --- Messages ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// A human-readable note about one field, collected across a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub label: String,
    pub text: String,
}

impl Message {
    pub fn info(label: impl Into<String>, text: impl Into<String>) -> Self {
        Message { level: Level::Info, label: label.into(), text: text.into() }
    }

    pub fn warning(label: impl Into<String>, text: impl Into<String>) -> Self {
        Message { level: Level::Warning, label: label.into(), text: text.into() }
    }

    pub fn error(label: impl Into<String>, text: impl Into<String>) -> Self {
        Message { level: Level::Error, label: label.into(), text: text.into() }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.level, self.label, self.text)
    }
}

/// Send `tracing` output to the test harness, filtered by `RUST_LOG`.
/// Later calls keep the first subscriber.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
