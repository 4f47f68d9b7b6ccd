//! Engine run metrics.
//!
//! Every run reports one [`PassMetrics`] per pass that did any work. Counts
//! from several sections (and table rows) are folded into the same pass slot,
//! so `passes[0]` always describes pass 1 across the whole document.

use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunMetrics {
    /// Total elapsed time for the document.
    pub total: Duration,
    /// Per-pass counters, index 0 is pass 1.
    pub passes: Vec<PassMetrics>,
    /// Registry queries issued by entity resolution.
    pub lookups: usize,
    /// Generated nodes dropped because they would have needed another pass.
    pub truncated: usize,
}

/// Timing and node counts for a single pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassMetrics {
    /// 1-based pass number.
    pub pass: usize,
    pub duration: Duration,
    /// Nodes that had at least one rule set.
    pub processed: usize,
    /// Nodes emitted by generator rules and kept.
    pub generated: usize,
    /// Nodes dropped by filters, emptied values, or replace-by-label eviction.
    pub removed: usize,
}

impl RunMetrics {
    /// Fold one section's pass counters into the document totals.
    pub(crate) fn absorb(&mut self, passes: Vec<PassMetrics>) {
        for pass in passes {
            let slot = pass.pass.saturating_sub(1);
            while self.passes.len() <= slot {
                let next = self.passes.len() + 1;
                self.passes.push(PassMetrics { pass: next, ..PassMetrics::default() });
            }
            let into = &mut self.passes[slot];
            into.duration += pass.duration;
            into.processed += pass.processed;
            into.generated += pass.generated;
            into.removed += pass.removed;
        }
    }

    pub fn generated(&self) -> usize {
        self.passes.iter().map(|p| p.generated).sum()
    }
}
