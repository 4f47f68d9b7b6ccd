//! Bounded multi-pass execution over one section.
//!
//! ```text
//! pass 1   every node of the section
//! pass 2   nodes generated in pass 1
//!  ...
//! pass 5   nodes generated in pass 4; whatever pass 5 generates is dropped
//! ```
//!
//! There is no cycle detection: a configuration that keeps generating nodes
//! simply runs out of passes.

use super::MAX_PASSES;
use super::apply::apply;
use super::metrics::PassMetrics;
use crate::{Cell, Context, FieldNode, FieldSection, Message, NodeId, TableSection};
use std::time::Instant;
use tracing::{debug, warn};

/// What one section run reports back.
#[derive(Debug, Default)]
pub(crate) struct SectionRun {
    pub(crate) messages: Vec<Message>,
    pub(crate) passes: Vec<PassMetrics>,
    pub(crate) truncated: usize,
}

/// Run the rule engine over a field section until no pass generates
/// anything, or [`MAX_PASSES`] is reached.
pub(crate) fn run_section(section: &mut FieldSection, ctx: &Context) -> SectionRun {
    let mut run = SectionRun::default();
    let mut queue: Vec<NodeId> = section.ids();
    let mut processed: Vec<NodeId> = Vec::new();

    for pass in 1..=MAX_PASSES {
        if queue.is_empty() {
            break;
        }
        let started = Instant::now();
        let mut metrics = PassMetrics { pass, ..PassMetrics::default() };
        let mut next = Vec::new();

        for id in queue {
            // evicted earlier in this pass
            let Some(node) = section.take(id) else { continue };
            let sets = ctx.rules.for_node(&node.label, &node.unique_id);
            // compounds always run: sub-fields carry rules of their own
            if sets.is_empty() && !node.is_compound() {
                section.restore(id, node);
                processed.push(id);
                continue;
            }

            metrics.processed += 1;
            let origin_label = node.label.clone();
            let applied = {
                let siblings: Vec<&FieldNode> = section.iter().collect();
                apply(node, sets, siblings, ctx)
            };
            run.messages.extend(applied.messages);
            match applied.node {
                Some(node) => section.restore(id, node),
                None => metrics.removed += 1,
            }
            processed.push(id);

            for generated in applied.generated {
                if pass == MAX_PASSES && !generated.split_clone {
                    warn!(label = %generated.label, from = %origin_label, pass, "pass limit reached, generated field dropped");
                    run.messages.push(Message::warning(
                        &generated.label,
                        format!("not generated from {origin_label}: rule passes exhausted after {MAX_PASSES} passes"),
                    ));
                    run.truncated += 1;
                    continue;
                }
                if !generated.split_clone {
                    metrics.removed += evict(section, &mut processed, &generated.label, id);
                }
                let split = generated.split_clone;
                debug!(label = %generated.label, node_id = %generated.id, pass, "field generated");
                let new_id = section.insert_after(id, generated);
                metrics.generated += 1;
                if split {
                    processed.push(new_id);
                } else {
                    next.push(new_id);
                }
            }
        }

        metrics.duration = started.elapsed();
        debug!(pass, processed = metrics.processed, generated = metrics.generated, removed = metrics.removed, "pass done");
        run.passes.push(metrics);
        queue = next;
    }
    run
}

/// Replace-by-label: drop already processed nodes carrying `label`, except `keep`.
fn evict(section: &mut FieldSection, processed: &mut Vec<NodeId>, label: &str, keep: NodeId) -> usize {
    let mut evicted = 0;
    processed.retain(|&id| {
        let stale = id != keep && section.get(id).is_some_and(|n| n.label == label);
        if stale {
            section.remove(id);
            evicted += 1;
        }
        !stale
    });
    evicted
}

/// Run every row of a table as its own small section. Pass counters are
/// reported per row; [`RunMetrics::absorb`](super::RunMetrics::absorb) folds them.
pub(crate) fn run_table(table: &mut TableSection, ctx: &Context) -> SectionRun {
    let mut run = SectionRun::default();
    for (r, row) in table.rows.iter_mut().enumerate() {
        let mut section = FieldSection::new(row.cells.iter().map(|c| c.to_node(r)).collect());
        let row_run = run_section(&mut section, ctx);
        row.cells = section.into_nodes().into_iter().enumerate().map(|(pos, node)| Cell::from_node(node, pos)).collect();
        run.messages.extend(row_run.messages);
        run.truncated += row_run.truncated;
        run.passes.extend(row_run.passes);
    }
    run
}
