//! Recalculation Driver
//!
//! Runs a workbook through the whole pipeline: build the dependency graph,
//! sort it, then evaluate.
//!
//! # Passes
//!
//! 1. **Acyclic pass.** Every ordered node is visited once, dependencies
//!    first. Variables with a formula are evaluated at the default position
//!    and stored in `result`. Cells with formula data that already carry a
//!    cached result take it as their value without being evaluated; other
//!    formula cells are evaluated at their own position and cached.
//! 2. **Circular pass.** The residual cells are re-evaluated for exactly
//!    `max_iterations` sweeps, ignoring and overwriting their caches. There is
//!    no convergence check. Residual variables are not evaluated.
//!
//! Extraction and evaluation failures never escape: a failed evaluation
//! yields zero and is counted in the [`RecalcReport`].

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace};

use super::report::RecalcReport;
use super::resolver::{variable_index, VariableIndex, WorkbookResolver};
use crate::config::RecalcConfig;
use crate::error::EvalError;
use crate::formula::BuiltinFormulas;
use crate::graph::{GraphBuilder, NodeId};
use crate::interface::{
    strip_formula_marker, FormulaEvaluator, Position, ReferenceExtractor, ValueResolver,
};
use crate::workbook::{CellRecord, Value, WorkbookSnapshot};

/// `(sheet index, cell index)` of a cell inside `WorkbookSnapshot::sheets`.
type CellSlot = (usize, usize);

/// Recalculates workbooks with a pair of formula collaborators.
pub struct Recalculator<'a> {
    extractor: &'a dyn ReferenceExtractor,
    evaluator: &'a dyn FormulaEvaluator,
    config: RecalcConfig,
}

impl<'a> Recalculator<'a> {
    /// Create a recalculator with the default configuration.
    pub fn new(extractor: &'a dyn ReferenceExtractor, evaluator: &'a dyn FormulaEvaluator) -> Self {
        Self {
            extractor,
            evaluator,
            config: RecalcConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RecalcConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RecalcConfig {
        &self.config
    }

    /// Recalculate `workbook` in place.
    #[tracing::instrument(
        skip_all,
        fields(cells = workbook.cell_count(), variables = workbook.variables.len())
    )]
    pub fn recalculate(&self, workbook: &mut WorkbookSnapshot) -> RecalcReport {
        let start = Instant::now();

        let graph = GraphBuilder::new(self.extractor)
            .with_max_range_cells(self.config.max_range_cells)
            .build(workbook);
        let stats = graph.stats();
        let schedule = graph.schedule();

        let mut report = RecalcReport {
            ordered_nodes: schedule.ordered().len(),
            residual_nodes: schedule.residual().len(),
            extraction_failures: stats.extraction_failures,
            unknown_references: stats.unknown_references,
            ..RecalcReport::default()
        };

        let cells = cell_slots(workbook);
        let variables = variable_index(workbook);
        let mut pass = Pass {
            evaluator: self.evaluator,
            cells: &cells,
            variables: &variables,
            default_position: Position::new(1, 1, self.config.default_sheet.as_str()),
            report: &mut report,
        };

        for node in schedule.ordered() {
            pass.ordered(workbook, node.id());
        }

        if !schedule.is_acyclic() {
            for _ in 0..self.config.max_iterations {
                for node in schedule.residual() {
                    pass.circular(workbook, node.id());
                }
                pass.report.circular_sweeps += 1;
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        debug!(summary = %report.summary(), "recalculation finished");
        report
    }
}

/// State shared by every evaluation of one run.
struct Pass<'r> {
    evaluator: &'r dyn FormulaEvaluator,
    cells: &'r HashMap<NodeId, CellSlot>,
    variables: &'r VariableIndex,
    default_position: Position,
    report: &'r mut RecalcReport,
}

impl Pass<'_> {
    /// Acyclic pass step for one node.
    fn ordered(&mut self, workbook: &mut WorkbookSnapshot, id: &NodeId) {
        match id {
            NodeId::Variable(name) => self.variable(workbook, id, name),
            NodeId::Cell { .. } => {
                let Some(&slot) = self.cells.get(id) else {
                    return;
                };
                let Some(cell) = cell_at(workbook, slot) else {
                    return;
                };
                if cell.formula.is_none() {
                    return;
                }

                if let Some(cached) = cell.cached_result().cloned() {
                    trace!(node = %id, "cached result reused");
                    self.report.cache_hits += 1;
                    if let Some(cell) = cell_at_mut(workbook, slot) {
                        cell.value = Some(cached);
                    }
                    return;
                }

                self.cell(workbook, id, slot);
            }
        }
    }

    /// Circular pass step for one node. Only cells are re-evaluated.
    fn circular(&mut self, workbook: &mut WorkbookSnapshot, id: &NodeId) {
        if let Some(&slot) = self.cells.get(id) {
            self.cell(workbook, id, slot);
        }
    }

    /// Evaluate a formula cell at its own position and store the result.
    fn cell(&mut self, workbook: &mut WorkbookSnapshot, id: &NodeId, slot: CellSlot) {
        let value = {
            let Some(cell) = cell_at(workbook, slot) else {
                return;
            };
            let Some(text) = cell.evaluable_text() else {
                return;
            };
            let address = &cell.address;
            let position = Position::new(address.row, address.col, address.sheet.as_str());
            let resolver = WorkbookResolver::with_index(workbook, self.variables);
            self.evaluate(id, text, &position, &resolver)
        };

        if let Some(cell) = cell_at_mut(workbook, slot) {
            cell.store_result(value);
        }
    }

    /// Evaluate a variable's formula at the default position into `result`.
    fn variable(&mut self, workbook: &mut WorkbookSnapshot, id: &NodeId, name: &str) {
        let Some(&index) = self.variables.get(name) else {
            return;
        };
        let value = {
            let Some(text) = workbook.variables.get(index).and_then(|v| v.formula_text()) else {
                return;
            };
            let position = self.default_position.clone();
            let resolver = WorkbookResolver::with_index(workbook, self.variables);
            self.evaluate(id, text, &position, &resolver)
        };

        if let Some(variable) = workbook.variables.get_mut(index) {
            variable.result = Some(value);
        }
    }

    fn evaluate(
        &mut self,
        id: &NodeId,
        formula: &str,
        position: &Position,
        resolver: &dyn ValueResolver,
    ) -> Value {
        self.report.evaluations += 1;
        match try_evaluate(self.evaluator, formula, position, resolver) {
            Ok(value) => value,
            Err(err) => {
                debug!(node = %id, error = %err, "evaluation failed; using zero");
                self.report.record_failure(id, err);
                Value::ZERO
            }
        }
    }
}

fn try_evaluate(
    evaluator: &dyn FormulaEvaluator,
    formula: &str,
    position: &Position,
    resolver: &dyn ValueResolver,
) -> Result<Value, EvalError> {
    evaluator.evaluate(strip_formula_marker(formula), position, resolver)
}

/// Map every cell identity to where it lives. The first cell with a given
/// address wins.
fn cell_slots(workbook: &WorkbookSnapshot) -> HashMap<NodeId, CellSlot> {
    let mut slots = HashMap::with_capacity(workbook.cell_count());
    for (s, sheet) in workbook.sheets.values().enumerate() {
        for (c, cell) in sheet.values().enumerate() {
            let address = &cell.address;
            slots
                .entry(NodeId::cell(address.sheet.as_str(), address.row, address.col))
                .or_insert((s, c));
        }
    }
    slots
}

fn cell_at(workbook: &WorkbookSnapshot, (s, c): CellSlot) -> Option<&CellRecord> {
    workbook
        .sheets
        .get_index(s)?
        .1
        .get_index(c)
        .map(|(_, cell)| cell)
}

fn cell_at_mut(workbook: &mut WorkbookSnapshot, (s, c): CellSlot) -> Option<&mut CellRecord> {
    workbook
        .sheets
        .get_index_mut(s)?
        .1
        .get_index_mut(c)
        .map(|(_, cell)| cell)
}

/// Evaluate a single formula outside a workbook pass.
///
/// A leading `=` is stripped. Without a position the formula is evaluated at
/// `Sheet1!A1`. Any failure yields `Number(0)`.
pub fn evaluate_formula(
    evaluator: &dyn FormulaEvaluator,
    formula: &str,
    position: Option<&Position>,
    resolver: &dyn ValueResolver,
) -> Value {
    let default_position;
    let position = match position {
        Some(position) => position,
        None => {
            default_position = Position::default();
            &default_position
        }
    };

    try_evaluate(evaluator, formula, position, resolver).unwrap_or_else(|err| {
        debug!(formula, error = %err, "evaluation failed; using zero");
        Value::ZERO
    })
}

/// Recalculate `workbook` with the built-in formula language and the default
/// configuration, returning the same snapshot.
pub fn evaluate_workbook(mut workbook: WorkbookSnapshot) -> WorkbookSnapshot {
    let formulas = BuiltinFormulas;
    Recalculator::new(&formulas, &formulas).recalculate(&mut workbook);
    workbook
}
