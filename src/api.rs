use crate::engine::{self, Applied, RunMetrics};
use crate::error::{RegistryError, StructuralError};
use crate::parsers::{self, Parsed, ParserKind, parse_address};
use crate::resolution::{self, Filter, Record, RegistryClient, apply_decision};
use crate::{Cell, Context, Document, FieldNode, FieldSection, Message, NodeId, NodeKind, Options, Origin, Section};
use crate::{TableRow, TableSection};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`resolve_document`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Every note produced during the run, in the order it was produced.
    pub messages: Vec<Message>,
    pub metrics: RunMetrics,
}

impl Resolution {
    /// Messages about the field labelled `label`.
    pub fn messages_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| m.label == label)
    }
}

/// Normalise `doc` in place.
///
/// Sections are processed in order. Within a field section the stages are:
/// structural check, value parsers, rule engine, entity resolution, status
/// propagation. Table sections get the parsers and the rule engine, row by
/// row. Nothing here fails: per-node problems become messages.
///
/// # Example
/// ```
/// use fieldresolve::{Context, Document, FieldNode, Options, Section, StaticRegistry, resolve_document};
///
/// let mut doc = Document::new("d1", vec![Section::Fields(vec![FieldNode::plain("n1", "hawb", "H1")].into())]);
/// let out = resolve_document(&mut doc, &Context::default(), &Options::default(), &StaticRegistry::new());
/// assert!(out.messages.is_empty());
/// assert_eq!(doc.field("hawb").map(|n| n.value.as_str()), Some("H1"));
/// ```
pub fn resolve_document(
    doc: &mut Document,
    ctx: &Context,
    options: &Options,
    registry: &dyn RegistryClient,
) -> Resolution {
    let started = Instant::now();
    let registry = Counted { inner: registry, calls: std::cell::Cell::new(0) };
    let mut out = Resolution::default();
    let mut seen: HashSet<String> = HashSet::new();

    for section in &mut doc.sections {
        match section {
            Section::Fields(fields) => {
                let held = hold_invalid(fields, ctx, &mut seen, &mut out.messages);
                if options.parse_values {
                    parse_section(fields, ctx);
                }
                let run = engine::run_section(fields, ctx);
                out.messages.extend(run.messages);
                out.metrics.absorb(run.passes);
                out.metrics.truncated += run.truncated;
                if options.resolve_entities && ctx.lookup.enabled {
                    lookup_section(fields, ctx, &registry, &mut out.messages);
                }
                for id in fields.ids() {
                    if let Some(node) = fields.get_mut(id) {
                        node.propagate_status();
                    }
                }
                for (id, node) in held {
                    fields.restore(id, node);
                }
            }
            Section::Table(table) => {
                if options.parse_values {
                    parse_table(table, ctx);
                }
                let run = engine::run_table(table, ctx);
                out.messages.extend(run.messages);
                out.metrics.absorb(run.passes);
                out.metrics.truncated += run.truncated;
            }
        }
    }

    out.metrics.lookups = registry.calls.get();
    out.metrics.total = started.elapsed();
    info!(
        document = %doc.id,
        messages = out.messages.len(),
        passes = out.metrics.passes.len(),
        generated = out.metrics.generated(),
        lookups = out.metrics.lookups,
        truncated = out.metrics.truncated,
        elapsed_ms = out.metrics.total.as_millis() as u64,
        "document resolved"
    );
    out
}

/// Run the rule sets configured for `node` on it alone.
///
/// `siblings` stand in for the rest of the section (for `CalculateFields`).
pub fn apply_rules(node: FieldNode, siblings: &[FieldNode], ctx: &Context) -> Applied {
    let sets = ctx.rules.for_node(&node.label, &node.unique_id);
    engine::apply(node, sets, siblings.iter().collect(), ctx)
}

/// Run one value decomposition parser. Never empty; unparseable input comes
/// back as a single [`Parsed::Opaque`].
pub fn parse_value(kind: ParserKind, raw: &str, ctx: &Context) -> Vec<Parsed> {
    parsers::parse(kind, raw, ctx)
}

// --- Structural check ---------------------------------------------------------------

fn check(node: &FieldNode, ctx: &Context, seen: &mut HashSet<String>) -> Result<(), StructuralError> {
    let mut ids = vec![node.id.as_str()];
    ids.extend(node.children.iter().map(|c| c.id.as_str()));
    if let Some(dup) = ids.iter().find(|id| seen.contains(**id)) {
        return Err(StructuralError::DuplicateId(dup.to_string()));
    }
    seen.extend(ids.into_iter().map(str::to_string));

    node.validate()?;
    if node.is_compound() {
        if let Some(display) = ctx.display_child(&node.label) {
            if node.child(display).is_none() {
                return Err(StructuralError::MissingCompoundChild { id: node.id.clone(), child: display.to_string() });
            }
        }
    }
    Ok(())
}

/// Take malformed nodes out of the section for the run; they go back untouched.
fn hold_invalid(
    section: &mut FieldSection,
    ctx: &Context,
    seen: &mut HashSet<String>,
    messages: &mut Vec<Message>,
) -> Vec<(NodeId, FieldNode)> {
    let mut held = Vec::new();
    for id in section.ids() {
        let Some(node) = section.get(id) else { continue };
        if let Err(err) = check(node, ctx, seen) {
            warn!(label = %node.label, node_id = %node.id, error = %err, "malformed field left untouched");
            messages.push(Message::warning(&node.label, format!("field left untouched: {err}")));
            if let Some(node) = section.take(id) {
                held.push((id, node));
            }
        }
    }
    held
}

// --- Value parsers ----------------------------------------------------------------------

fn parse_section(section: &mut FieldSection, ctx: &Context) {
    for id in section.ids() {
        let Some(node) = section.get_mut(id) else { continue };
        let kind = ctx.parser_for(&node.label);
        let wants_block = kind == Some(ParserKind::Address) || ctx.is_address_label(&node.label);
        let node_kind = node.kind;
        match node_kind {
            NodeKind::AddressBlock => fill_address(node, ctx),
            NodeKind::Plain if wants_block => fill_address(node, ctx),
            NodeKind::Plain => {
                let Some(kind) = kind else { continue };
                let generated = decompose(node, kind, ctx);
                for field in generated {
                    section.insert_after(id, field);
                }
            }
            NodeKind::CompoundKey | NodeKind::TableCell => {}
        }
    }
}

/// Give an address field its parsed children. Plain fields become AddressBlocks;
/// blocks that already carry any child value are left as they are.
fn fill_address(node: &mut FieldNode, ctx: &Context) {
    if node.value.trim().is_empty() || node.children.iter().any(|c| !c.value.trim().is_empty()) {
        return;
    }
    let status = node.status;
    node.kind = NodeKind::AddressBlock;
    node.children = parse_address(&node.value, ctx).into_children(&node.id);
    node.set_status_deep(status);
    debug!(label = %node.label, node_id = %node.id, "address decomposed");
}

/// Rewrite `node` with its first tuple and return the remaining fields as siblings.
fn decompose(node: &mut FieldNode, kind: ParserKind, ctx: &Context) -> Vec<FieldNode> {
    let tuples: Vec<Parsed> = parsers::parse(kind, &node.value, ctx).into_iter().filter(|p| !p.is_opaque()).collect();
    let mut generated = Vec::new();
    for (t, tuple) in tuples.iter().enumerate() {
        for (label, value) in tuple.fields(&node.label) {
            if t == 0 && label == node.label {
                node.value = value;
                continue;
            }
            generated.push(node.spawn(format!("{}.{label}", node.id), &label, &value, Origin::Parsed));
        }
    }
    debug!(label = %node.label, ?kind, tuples = tuples.len(), fields = generated.len(), "value decomposed");
    generated
}

/// Parse every configured cell. A cell that yields several tuples multiplies
/// its row, one copy per tuple.
fn parse_table(table: &mut TableSection, ctx: &Context) {
    let before = table.rows.len();
    let rows = std::mem::take(&mut table.rows);
    table.rows = rows.into_iter().flat_map(|row| expand_row(row, ctx)).collect();
    if table.rows.len() != before {
        debug!(table = %table.label, before, after = table.rows.len(), "table rows expanded");
    }
}

fn expand_row(row: TableRow, ctx: &Context) -> Vec<TableRow> {
    let targets: Vec<(String, ParserKind, String)> = row
        .cells
        .iter()
        .filter_map(|c| ctx.parser_for(&c.label).map(|kind| (c.label.clone(), kind, c.value.clone())))
        .collect();
    let mut rows = vec![row];
    for (label, kind, raw) in targets {
        let tuples: Vec<Parsed> = parsers::parse(kind, &raw, ctx).into_iter().filter(|p| !p.is_opaque()).collect();
        if tuples.is_empty() {
            continue;
        }
        let mut expanded = Vec::with_capacity(rows.len() * tuples.len());
        for row in &rows {
            for tuple in &tuples {
                expanded.push(fill_row(row.clone(), &label, tuple));
            }
        }
        rows = expanded;
    }
    rows
}

fn fill_row(mut row: TableRow, label: &str, tuple: &Parsed) -> TableRow {
    for (l, value) in tuple.fields(label) {
        match row.cells.iter_mut().find(|c| c.label == l) {
            Some(cell) => {
                cell.value = value;
                if l != label {
                    cell.origin = Origin::Parsed;
                }
            }
            None => {
                let position = row.cells.len();
                row.cells.push(Cell { origin: Origin::Parsed, ..Cell::new(l, value, position) });
            }
        }
    }
    row
}

// --- Entity resolution --------------------------------------------------------------------

/// Counts queries on their way to the real registry.
struct Counted<'a> {
    inner: &'a dyn RegistryClient,
    calls: std::cell::Cell<usize>,
}

impl RegistryClient for Counted<'_> {
    fn query(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, RegistryError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.query(table, filters)
    }
}

fn lookup_section(section: &mut FieldSection, ctx: &Context, registry: &dyn RegistryClient, messages: &mut Vec<Message>) {
    for id in section.ids() {
        let Some(node) = section.get(id) else { continue };
        if !node.is_address() || !ctx.is_lookup_label(&node.label) {
            continue;
        }
        let decision = resolution::resolve(node, registry, ctx);
        debug!(label = %node.label, node_id = %node.id, resolved = decision.is_resolved(), "lookup decided");
        messages.extend(apply_decision(section, id, &decision, ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSet;
    use crate::{AddressParts, FilterTest, Level, Matcher, Rule, StaticRegistry, Status};

    fn no_registry() -> StaticRegistry {
        StaticRegistry::new()
    }

    fn fields(doc: &Document) -> Vec<(String, String)> {
        doc.field_sections().flat_map(|s| s.iter()).map(|n| (n.label.clone(), n.value.clone())).collect()
    }

    fn single(nodes: Vec<FieldNode>) -> Document {
        Document::new("d1", vec![Section::Fields(FieldSection::new(nodes))])
    }

    fn shipper_block() -> FieldNode {
        let parts = AddressParts {
            name: "ACME LOGISTICS LTD".into(),
            address_line1: "12 Harbour Road".into(),
            city: "LIVERPOOL".into(),
            country_code: "GB".into(),
            ..AddressParts::default()
        };
        FieldNode::address_block("s1", "shipper", "ACME LOGISTICS LTD\n12 Harbour Road\nLIVERPOOL", parts)
    }

    #[test]
    fn fields_without_rules_come_back_unchanged() {
        let node = FieldNode::plain("n1", "hawb", " H-1 ").with_status(Status::Ambiguous);
        let mut doc = single(vec![node.clone()]);
        let out = resolve_document(&mut doc, &Context::default(), &Options::default(), &no_registry());

        assert!(out.messages.is_empty());
        assert_eq!(doc.field("hawb"), Some(&node));
        assert_eq!(out.metrics.lookups, 0);
    }

    #[test]
    fn rejected_fields_disappear() {
        let ctx = Context::default().with_rules(
            "hawb",
            RuleSet::node(vec![Rule::Filter { test: FilterTest::StartsWith, pattern: Matcher::Text("HW".into()) }]),
        );
        let mut doc = single(vec![FieldNode::plain("a", "hawb", "XX1"), FieldNode::plain("b", "mawb", "M1")]);
        resolve_document(&mut doc, &ctx, &Options::default(), &no_registry());
        assert_eq!(fields(&doc), vec![("mawb".to_string(), "M1".to_string())]);
    }

    #[test]
    fn generation_chains_stop_after_five_passes() {
        let ctx = (1..=6).fold(Context::default(), |ctx, i| {
            ctx.with_rules(format!("f{i}"), RuleSet::node(vec![Rule::CopyValue { target: format!("f{}", i + 1) }]))
        });
        let mut doc = single(vec![FieldNode::plain("f", "f1", "v")]);
        let out = resolve_document(&mut doc, &ctx, &Options::default(), &no_registry());

        let labels: Vec<String> = fields(&doc).into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["f1", "f2", "f3", "f4", "f5"]);
        assert_eq!(out.metrics.truncated, 1);
        assert_eq!(out.metrics.passes.len(), 5);
        assert!(out.messages.iter().any(|m| m.label == "f6" && m.level == Level::Warning));
    }

    #[test]
    fn parsed_values_become_sibling_fields() {
        let ctx = Context::default().with_parser("grossWeight", ParserKind::Weight);
        let mut doc = single(vec![FieldNode::plain("w", "grossWeight", "500 KGS"), FieldNode::plain("h", "hawb", "H1")]);
        resolve_document(&mut doc, &ctx, &Options::default(), &no_registry());

        assert_eq!(
            fields(&doc),
            vec![
                ("grossWeight".to_string(), "500".to_string()),
                ("grossWeightUom".to_string(), "KGM".to_string()),
                ("hawb".to_string(), "H1".to_string()),
            ]
        );
        assert_eq!(doc.field("grossWeightUom").map(|n| n.origin), Some(Origin::Parsed));

        let mut doc = single(vec![FieldNode::plain("w", "grossWeight", "500 KGS")]);
        let off = Options { parse_values: false, ..Options::default() };
        resolve_document(&mut doc, &ctx, &off, &no_registry());
        assert_eq!(fields(&doc), vec![("grossWeight".to_string(), "500 KGS".to_string())]);
    }

    #[test]
    fn address_labels_are_decomposed_into_blocks() {
        let ctx = Context::default().with_address_label("consignee");
        let raw = "ACME LTD\n12 Harbour Road\nLIVERPOOL L3 4AB\nUNITED KINGDOM";
        let mut doc = single(vec![FieldNode::plain("c", "consignee", raw)]);
        let off = Options { resolve_entities: false, ..Options::default() };
        resolve_document(&mut doc, &ctx, &off, &no_registry());

        let Some(node) = doc.field("consignee") else {
            panic!("consignee missing");
        };
        assert!(node.is_address());
        assert!(node.validate().is_ok());
        assert_eq!(node.child_value("postalCode"), "L3 4AB");
        assert_eq!(node.child_value("countryCode"), "GB");
    }

    #[test]
    fn dimension_cells_multiply_their_row() {
        let ctx = Context::default().with_parser("dimensions", ParserKind::Dimension);
        let table = TableSection {
            label: "packages".into(),
            rows: vec![TableRow::new(vec![
                Cell::new("dimensions", "2x 115x140x92cm 1x 80x60x50cm", 0),
                Cell::new("hawb", "H1", 1),
            ])],
        };
        let mut doc = Document::new("d1", vec![Section::Table(table)]);
        resolve_document(&mut doc, &ctx, &Options::default(), &no_registry());

        let Section::Table(table) = &doc.sections[0] else {
            panic!("table expected");
        };
        assert_eq!(table.rows.len(), 2);
        let value = |r: usize, l: &str| table.rows[r].cell(l).map(|c| c.value.clone()).unwrap_or_default();
        assert_eq!((value(0, "length"), value(0, "packageCount")), ("115".to_string(), "2".to_string()));
        assert_eq!((value(1, "length"), value(1, "packageCount")), ("80".to_string(), "1".to_string()));
        assert_eq!(value(1, "hawb"), "H1");
        assert_eq!(value(1, "dimensionsUom"), "CMT");
    }

    #[test]
    fn address_blocks_are_looked_up_once() {
        let ctx = Context { profile: "P1".into(), ..Context::default() };
        let registry = StaticRegistry::new().with(
            "SHIPPER_MASTER",
            Record::new([
                ("SHIPPERNAME", "ACME LOGISTICS LTD"),
                ("SHIPPERACCOUNTNUMBER", "GB42"),
                ("SHIPPERADDRESSLINE1", "12 Harbour Road"),
                ("PROFILE_NAME", "P1"),
            ]),
        );
        let mut doc = single(vec![shipper_block(), FieldNode::plain("h", "hawb", "H1")]);
        let out = resolve_document(&mut doc, &ctx, &Options::default(), &registry);

        assert_eq!(out.metrics.lookups, 1);
        let node = doc.field("shipper").unwrap();
        assert_eq!(node.status, Status::Resolved);
        assert_eq!(node.child_value("accountNumber"), "GB42");
        assert_eq!(out.messages_for("shipper").count(), 1);

        let mut doc = single(vec![shipper_block()]);
        let off = Options { resolve_entities: false, ..Options::default() };
        let out = resolve_document(&mut doc, &ctx, &off, &registry);
        assert_eq!(out.metrics.lookups, 0);
        assert_eq!(doc.field("shipper"), Some(&shipper_block()));
    }

    #[test]
    fn weak_matches_leave_the_block_for_review() {
        let ctx = Context { profile: "P1".into(), ..Context::default() };
        let registry = StaticRegistry::new()
            .with("SHIPPER_MASTER", Record::new([("SHIPPERNAME", "ACME FOODS INC"), ("PROFILE_NAME", "P1")]));
        let mut doc = single(vec![shipper_block().with_status(Status::Resolved)]);
        let out = resolve_document(&mut doc, &ctx, &Options::default(), &registry);

        let node = doc.field("shipper").unwrap();
        assert_eq!(node.status, Status::Unresolved);
        assert!(node.children.iter().all(|c| c.status == Status::Unresolved));
        assert_eq!(node.child_value("accountNumber"), "");
        assert_eq!(
            out.messages[0].text,
            "shipper company name did not reach minimum required match score of 90%"
        );
    }

    #[test]
    fn registry_outage_degrades_the_node_only() {
        crate::init_test_tracing();
        struct Down;
        impl RegistryClient for Down {
            fn query(&self, _: &str, _: &[Filter]) -> Result<Vec<Record>, RegistryError> {
                Err(RegistryError::Unavailable("connection refused".into()))
            }
        }
        let mut doc = single(vec![shipper_block(), FieldNode::plain("h", "hawb", "H1")]);
        let out = resolve_document(&mut doc, &Context::default(), &Options::default(), &Down);

        assert_eq!(doc.field("shipper").map(|n| n.status), Some(Status::Error));
        assert_eq!(doc.field("hawb").map(|n| n.status), Some(Status::Unresolved));
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].level, Level::Error);
    }

    #[test]
    fn malformed_nodes_pass_through_untouched() {
        crate::init_test_tracing();
        let ctx = Context::default().with_rules("shipper", RuleSet::node(vec![Rule::Trim]));
        let mut partial = shipper_block();
        partial.value = "  ACME  ".into();
        partial.children.truncate(3);
        let mut doc = single(vec![partial.clone(), FieldNode::plain("s1", "hawb", "H1")]);
        let out = resolve_document(&mut doc, &ctx, &Options::default(), &no_registry());

        assert_eq!(doc.field("shipper"), Some(&partial));
        assert_eq!(out.metrics.lookups, 0);
        let notes: Vec<&str> = out.messages.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(notes, vec!["shipper", "hawb"]);
        assert!(out.messages.iter().all(|m| m.level == Level::Warning));
    }

    #[test]
    fn review_states_reach_compound_children() {
        let children = vec![FieldNode::plain("q", "qualifier", "MRN"), FieldNode::plain("v", "value", "24DE1")];
        let mut compound = FieldNode::compound("c1", "customsEntry", children).with_status(Status::Resolved);
        compound.status = Status::Ambiguous;
        let mut doc = single(vec![compound]);
        resolve_document(&mut doc, &Context::default(), &Options::default(), &no_registry());

        let node = doc.field("customsEntry").unwrap();
        assert!(node.children.iter().all(|c| c.status == Status::Ambiguous));
    }

    #[test]
    fn single_node_entry_points() {
        let ctx = Context::default().with_rules("hawb", RuleSet::node(vec![Rule::AddPrefix { text: "H-".into() }]));
        let applied = apply_rules(FieldNode::plain("h", "hawb", "1"), &[], &ctx);
        assert_eq!(applied.node.map(|n| n.value), Some("H-1".to_string()));

        let out = parse_value(ParserKind::Incoterm, "FCA Graz", &ctx);
        assert!(matches!(&out[..], [Parsed::Incoterm(i)] if i.term == "FCA"));
    }
}
