//! Rule engine.
//!
//! The engine takes a section of fields and the rule book from the
//! [`Context`](crate::Context) and rewrites the section in place.
//!
//! ```text
//! FieldSection ── run_section (passes.rs) ─────────────────────────────┐
//!                   pass 1: every node                                 │
//!                   pass n: nodes generated in pass n-1  (n <= 5)      │
//!                      │                                               │
//!                      v                                               │
//!                 apply (apply.rs)                                     │
//!                   whole-node sets ─> value chain ─> re-decompose     │
//!                   child sets      ─> child chains ─> compound value  │
//!                      │                                               │
//!                      v                                               │
//!                 Applied { node, generated, messages }                │
//!                   generated nodes: insert after origin,              │
//!                   evict processed nodes of the same label ───────────┘
//! ```
//!
//! ## Responsibilities by module
//!
//! - `apply.rs`: runs one node's rule sets, including filters, splits and
//!   the other generators.
//! - `passes.rs`: the bounded pass loop over a field section, and the per-row
//!   variant for table sections.
//! - `metrics.rs`: per-pass counters and timings.
//!
//! Value rewrites themselves live in `crate::rules`.
//!
//! ## Debugging
//!
//! Every applied or skipped rule is logged at `debug` level with the node
//! label; pass truncation is logged at `warn`.

#[path = "engine/apply.rs"]
mod apply;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/passes.rs"]
mod passes;


pub use apply::Applied;
pub use metrics::{PassMetrics, RunMetrics};

pub(crate) use apply::apply;
pub(crate) use passes::{SectionRun, run_section, run_table};

/// Hard cap on rule passes per section. Nodes a fifth pass generates are dropped.
pub const MAX_PASSES: usize = 5;
