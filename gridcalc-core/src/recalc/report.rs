//! Recalculation Report
//!
//! What one recalculation run did. Failures are absorbed into zero values, so
//! the report is the only place they remain visible to the caller.

use crate::error::EvalError;
use crate::graph::NodeId;

/// Errors kept per report; the rest are only counted.
pub const MAX_REPORTED_ERRORS: usize = 100;

/// Counters and errors from one [`Recalculator::recalculate`](super::Recalculator::recalculate) run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcReport {
    /// Time taken for the whole run in milliseconds.
    pub duration_ms: u64,

    /// Nodes evaluated in the acyclic pass.
    pub ordered_nodes: usize,

    /// Nodes on, or downstream of, a cycle.
    pub residual_nodes: usize,

    /// Formula evaluations performed, across both passes.
    pub evaluations: usize,

    /// Ordered cells whose cached result was reused instead of evaluated.
    pub cache_hits: usize,

    /// Formulas whose references could not be extracted.
    pub extraction_failures: usize,

    /// References to cells or variables absent from the workbook.
    pub unknown_references: usize,

    /// Evaluations that failed and produced zero.
    pub evaluation_failures: usize,

    /// Sweeps run over the residual nodes.
    pub circular_sweeps: usize,

    /// Failed evaluations (truncated to the first [`MAX_REPORTED_ERRORS`]).
    pub errors: Vec<RecalcError>,
}

impl RecalcReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any node could not be ordered.
    pub fn had_cycles(&self) -> bool {
        self.residual_nodes > 0
    }

    /// Count a failed evaluation of `node`.
    pub(crate) fn record_failure(&mut self, node: &NodeId, error: EvalError) {
        self.evaluation_failures += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(RecalcError {
                node: node.clone(),
                error,
            });
        }
    }

    /// Format as a concise one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} evaluations in {}ms, ordered={}, residual={}, cached={}, sweeps={}, failures={}",
            self.evaluations,
            self.duration_ms,
            self.ordered_nodes,
            self.residual_nodes,
            self.cache_hits,
            self.circular_sweeps,
            self.extraction_failures + self.evaluation_failures,
        )
    }
}

/// An evaluation failure of a specific node.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalcError {
    /// The cell or variable whose formula failed.
    pub node: NodeId,

    pub error: EvalError,
}
