//! Per-node rule application.
//!
//! ```text
//! node ── whole-node sets ──> value chain ──> (AddressBlock) re-decompose children
//!      ├─ sub-field sets ───> (CompoundKey) each child under its own label
//!      └─ child sets ───────> one chain per named child ──> (CompoundKey) refresh display value
//! ```
//!
//! A chain threads a working value through its rules. Once a split has run,
//! the chain carries every token and later value rules rewrite all of them;
//! the first token stays on the node and the others become split clones.

use crate::config::RuleSet;
use crate::parsers::parse_address;
use crate::rules::{Rule, RuleEnv, rewrite};
use crate::{Context, FieldNode, Message, NodeKind, Origin};
use std::mem;
use tracing::debug;

/// Outcome of applying a node's rule sets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Applied {
    /// `None` when a filter rejected the node or its value was emptied.
    pub node: Option<FieldNode>,
    /// New sibling nodes in generation order, to be placed right after the node.
    pub generated: Vec<FieldNode>,
    pub messages: Vec<Message>,
}

struct Chain {
    /// Working value first, then split tokens.
    values: Vec<String>,
    rejected: bool,
    generated: Vec<FieldNode>,
    messages: Vec<Message>,
}

impl Chain {
    fn new(value: &str) -> Self {
        Chain { values: vec![value.to_string()], rejected: false, generated: Vec::new(), messages: Vec::new() }
    }

    fn primary(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }

    fn run(&mut self, rules: &[Rule], source: &FieldNode, env: &RuleEnv<'_>, ctx: &Context) {
        for rule in rules {
            if self.rejected {
                return;
            }
            match rule {
                Rule::Filter { test, pattern } => match pattern.test(*test, self.primary()) {
                    Ok(false) => {
                        debug!(label = %source.label, node_id = %source.id, "filter rejected node");
                        self.rejected = true;
                    }
                    Ok(true) => {
                        let mut kept = Vec::with_capacity(self.values.len());
                        for (i, v) in mem::take(&mut self.values).into_iter().enumerate() {
                            if i == 0 || pattern.test(*test, &v).unwrap_or(true) {
                                kept.push(v);
                            }
                        }
                        self.values = kept;
                    }
                    Err(e) => self.skip(rule, source, e),
                },
                Rule::SplitBySeparator { separator } => self.split(separator, source, ctx),
                Rule::ParseFrom { marker, target } => {
                    let value = self.primary().to_string();
                    match marker.locate(&value) {
                        Ok(Some(range)) => {
                            let tail = value[range.start..].trim();
                            if !tail.is_empty() {
                                self.emit(source, format!("{}_parsed_{target}", source.id), target, tail, ctx);
                            }
                            self.values[0] = value[..range.start].trim().to_string();
                        }
                        Ok(None) => {}
                        Err(e) => self.skip(rule, source, e),
                    }
                }
                Rule::CopyValue { target } => {
                    let value = self.primary().to_string();
                    if !value.is_empty() {
                        self.emit(source, format!("{}_{target}", source.id), target, &value, ctx);
                    }
                }
                Rule::Conditional { when, then } => match when.holds(self.primary()) {
                    Ok(true) => self.run(then, source, env, ctx),
                    Ok(false) => {}
                    Err(e) => self.skip(rule, source, e),
                },
                _ => {
                    let mut failure = None;
                    for value in &mut self.values {
                        match rewrite(rule, value, env) {
                            Ok(next) => *value = next,
                            Err(e) => failure = failure.or(Some(e)),
                        }
                    }
                    match failure {
                        Some(e) => self.skip(rule, source, e),
                        None => debug!(label = %source.label, rule = rule.name(), value = %self.primary(), "rule applied"),
                    }
                }
            }
        }
    }

    fn split(&mut self, separator: &str, source: &FieldNode, ctx: &Context) {
        if separator.is_empty() {
            return;
        }
        let dedup = source.qualifier.as_deref().is_some_and(|q| q.eq_ignore_ascii_case("references"))
            || ctx.is_reference_label(&source.label);
        let mut tokens: Vec<String> = Vec::new();
        for value in &self.values {
            for token in value.split(separator).map(str::trim).filter(|t| !t.is_empty()) {
                if dedup && tokens.iter().any(|t| t == token) {
                    continue;
                }
                tokens.push(token.to_string());
            }
        }
        if tokens.is_empty() {
            tokens.push(String::new());
        }
        debug!(label = %source.label, tokens = tokens.len(), dedup, "split value");
        self.values = tokens;
    }

    fn emit(&mut self, source: &FieldNode, id: String, label: &str, value: &str, ctx: &Context) {
        let node = if ctx.is_address_label(label) {
            let mut block = FieldNode::address_block(id, label, value, parse_address(value, ctx))
                .with_unique_id(format!("{}_{}", source.unique_id, label))
                .with_origin(Origin::RuleGenerated);
            block.set_status_deep(source.status);
            block
        } else {
            source.spawn(id, label, value, Origin::RuleGenerated)
        };
        self.generated.push(node);
    }

    fn skip(&mut self, rule: &Rule, source: &FieldNode, err: crate::RuleError) {
        debug!(label = %source.label, rule = rule.name(), error = %err, "rule skipped");
        self.messages.push(Message::warning(&source.label, format!("rule {} skipped: {err}", rule.name())));
    }

    /// One clone per split token after the first.
    fn clones(&self, source: &FieldNode) -> Vec<FieldNode> {
        self.values
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, token)| {
                let mut clone = source.spawn(format!("{}_split{i}", source.id), &source.label, token, Origin::RuleGenerated);
                clone.qualifier = source.qualifier.clone();
                clone.split_clone = true;
                clone
            })
            .collect()
    }

    fn drain_into(self, out: &mut Applied) {
        out.generated.extend(self.generated);
        out.messages.extend(self.messages);
    }
}

/// Run every applicable rule set over `node`.
///
/// Whole-node sets run before child-targeted sets, so child rules always see
/// children decomposed from the final whole-node value.
pub(crate) fn apply(mut node: FieldNode, sets: &[RuleSet], siblings: Vec<&FieldNode>, ctx: &Context) -> Applied {
    let mut out = Applied::default();
    let env = RuleEnv::new(siblings, ctx.reference_time);

    let mut whole_ran = false;
    for set in sets.iter().filter(|s| s.child.is_none() && !s.rules.is_empty()) {
        whole_ran = true;
        let mut chain = Chain::new(&node.value);
        chain.run(&set.rules, &node, &env, ctx);
        node.value = chain.primary().to_string();
        out.generated.extend(chain.clones(&node));
        let rejected = chain.rejected;
        chain.drain_into(&mut out);
        if rejected {
            return out;
        }
    }

    if whole_ran {
        match node.kind {
            NodeKind::Plain | NodeKind::TableCell if node.value.trim().is_empty() => {
                debug!(label = %node.label, node_id = %node.id, "value emptied, node dropped");
                return out;
            }
            NodeKind::AddressBlock => redecompose(&mut node, ctx),
            _ => {}
        }
    }

    if node.is_compound() {
        run_sub_fields(&mut node, &env, ctx, &mut out);
    }

    for set in sets.iter().filter(|s| !s.rules.is_empty()) {
        let Some(label) = set.child.as_deref() else { continue };
        let Some(pos) = node.children.iter().position(|c| c.label == label) else {
            debug!(label = %node.label, child = label, "no such child, rule set skipped");
            continue;
        };
        let chain = {
            let child = &node.children[pos];
            let mut nearby: Vec<&FieldNode> = node.children.iter().filter(|c| c.label != label).collect();
            nearby.extend(env.siblings.iter().copied());
            let child_env = RuleEnv::new(nearby, ctx.reference_time);
            let mut chain = Chain::new(&child.value);
            chain.run(&set.rules, child, &child_env, ctx);
            chain
        };
        if chain.rejected {
            if node.is_address() {
                node.children[pos].value.clear();
            } else {
                node.children.remove(pos);
            }
        } else {
            node.children[pos].value = chain.primary().to_string();
            out.generated.extend(chain.clones(&node.children[pos]));
        }
        chain.drain_into(&mut out);
    }

    if node.is_compound() {
        let display = ctx.display_child(&node.label).and_then(|label| node.child(label)).or(node.children.first());
        node.value = display.map(|c| c.value.clone()).unwrap_or_default();
    }

    out.node = Some(node);
    out
}

/// Run each compound sub-field through the whole-node sets of its own label.
///
/// Nodes generated under a label the compound already has overwrite that
/// sub-field instead of becoming siblings; split tokens after the first are
/// dropped. A rejected sub-field is removed.
fn run_sub_fields(node: &mut FieldNode, env: &RuleEnv<'_>, ctx: &Context, out: &mut Applied) {
    let mut pos = 0;
    while pos < node.children.len() {
        let sets = {
            let child = &node.children[pos];
            ctx.rules.for_node(&child.label, &child.unique_id)
        };
        let mut rejected = false;
        for set in sets.iter().filter(|s| s.child.is_none() && !s.rules.is_empty()) {
            let chain = {
                let child = &node.children[pos];
                let mut nearby: Vec<&FieldNode> = node.children.iter().filter(|c| c.label != child.label).collect();
                nearby.extend(env.siblings.iter().copied());
                let child_env = RuleEnv::new(nearby, ctx.reference_time);
                let mut chain = Chain::new(&child.value);
                chain.run(&set.rules, child, &child_env, ctx);
                chain
            };
            rejected = chain.rejected;
            if !rejected {
                node.children[pos].value = chain.primary().to_string();
            }
            out.messages.extend(chain.messages);
            for generated in chain.generated {
                match node.children.iter_mut().find(|c| c.label == generated.label) {
                    Some(slot) => {
                        debug!(label = %node.label, child = %generated.label, "generated value absorbed by compound");
                        slot.value = generated.value;
                    }
                    None => out.generated.push(generated),
                }
            }
            if rejected {
                break;
            }
        }
        if rejected {
            debug!(label = %node.label, child = %node.children[pos].label, "sub-field rejected");
            node.children.remove(pos);
        } else {
            pos += 1;
        }
    }
}

/// Rebuild an AddressBlock's children from its value, keeping registry data.
fn redecompose(node: &mut FieldNode, ctx: &Context) {
    let mut fresh = parse_address(&node.value, ctx).into_children(&node.id);
    for child in &mut fresh {
        child.status = node.status;
    }
    for old in mem::take(&mut node.children).into_iter().filter(|c| c.origin == Origin::LookupGenerated) {
        if let Some(slot) = fresh.iter_mut().find(|c| c.label == old.label) {
            *slot = old;
        }
    }
    node.children = fresh;
}
