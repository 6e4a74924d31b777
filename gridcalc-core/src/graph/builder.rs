//! Dependency Graph Builder
//!
//! Walks a workbook snapshot and produces one [`DependencyNode`] per cell and
//! per variable, cells first, in workbook iteration order.
//!
//! # Process
//!
//! 1. Scan every cell address once into a [`SparseColumnIndex`].
//! 2. For each formula cell, ask the extractor for the references its formula
//!    reads (positioned at the cell, with the cell's sheet as default), then
//!    normalize them into node identities.
//! 3. Do the same for each variable formula, positioned at `(1, 1)` with no
//!    default sheet.
//! 4. Drop identities that name neither a cell nor a variable.
//!
//! An extraction failure leaves the node with no dependencies. It is then
//! scheduled immediately and reports its problem when evaluated.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::node::{DependencyNode, NodeId};
use super::normalize::normalize_references;
use super::scheduler::{topologically_sort, Schedule};
use super::sparse::SparseColumnIndex;
use crate::config::DEFAULT_MAX_RANGE_CELLS;
use crate::error::ExtractError;
use crate::interface::{
    strip_formula_marker, Position, ReferenceExtractor, VariableMarker, VariableRecognizer,
};
use crate::workbook::WorkbookSnapshot;

/// Recognizes the variable names defined in one workbook.
pub struct WorkbookVariables<'a> {
    names: HashSet<&'a str>,
}

impl<'a> WorkbookVariables<'a> {
    pub fn new(workbook: &'a WorkbookSnapshot) -> Self {
        Self {
            names: workbook.variables.iter().map(|v| v.name.as_str()).collect(),
        }
    }
}

impl VariableRecognizer for WorkbookVariables<'_> {
    fn recognize(&self, name: &str, _sheet: Option<&str>) -> Option<VariableMarker> {
        self.names.contains(name).then(|| VariableMarker {
            name: name.to_string(),
        })
    }
}

/// Counters describing one graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub cells: usize,
    pub variables: usize,
    /// Formulas whose references could not be extracted.
    pub extraction_failures: usize,
    /// References to cells or variables absent from the workbook.
    pub unknown_references: usize,
}

/// The nodes of one workbook plus the occupancy index built alongside them.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: SparseColumnIndex,
    stats: BuildStats,
}

impl DependencyGraph {
    /// All nodes, cells first, in workbook order.
    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&DependencyNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn sparse_index(&self) -> &SparseColumnIndex {
        &self.index
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Order the nodes for evaluation.
    pub fn schedule(self) -> Schedule {
        topologically_sort(self.nodes)
    }
}

/// Builds [`DependencyGraph`]s using a reference extractor.
pub struct GraphBuilder<'a> {
    extractor: &'a dyn ReferenceExtractor,
    max_range_cells: u64,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder with the default range cap.
    pub fn new(extractor: &'a dyn ReferenceExtractor) -> Self {
        Self {
            extractor,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    /// Set the largest range expanded without the sparse index.
    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }

    /// Build the dependency graph of `workbook`.
    pub fn build(&self, workbook: &WorkbookSnapshot) -> DependencyGraph {
        let index = SparseColumnIndex::from_addresses(workbook.cells().map(|cell| &cell.address));
        let variables = WorkbookVariables::new(workbook);

        let known: HashSet<NodeId> = workbook
            .cells()
            .map(|cell| NodeId::cell(cell.address.sheet.as_str(), cell.address.row, cell.address.col))
            .chain(workbook.variables.iter().map(|v| NodeId::variable(v.name.as_str())))
            .collect();

        let mut stats = BuildStats::default();
        let mut nodes = Vec::with_capacity(known.len());

        for cell in workbook.cells() {
            stats.cells += 1;
            let address = &cell.address;
            let id = NodeId::cell(address.sheet.as_str(), address.row, address.col);

            let node = match cell.evaluable_text() {
                None => DependencyNode::new(id),
                Some(text) => {
                    let position = Position::new(address.row, address.col, address.sheet.as_str());
                    let found = self.dependencies_of(
                        text,
                        &position,
                        Some(address.sheet.as_str()),
                        &index,
                        &variables,
                    );
                    self.finish_node(id, found, &known, &mut stats)
                }
            };
            nodes.push(node);
        }

        for variable in &workbook.variables {
            stats.variables += 1;
            let id = NodeId::variable(variable.name.as_str());

            let node = match variable.formula_text() {
                None => DependencyNode::new(id),
                Some(text) => {
                    let found = self.dependencies_of(
                        text,
                        &Position::unqualified(1, 1),
                        None,
                        &index,
                        &variables,
                    );
                    self.finish_node(id, found, &known, &mut stats)
                }
            };
            nodes.push(node);
        }

        debug!(
            cells = stats.cells,
            variables = stats.variables,
            extraction_failures = stats.extraction_failures,
            unknown_references = stats.unknown_references,
            "dependency graph built"
        );

        DependencyGraph {
            nodes,
            index,
            stats,
        }
    }

    /// Identities read by `formula`, before filtering against the workbook.
    fn dependencies_of(
        &self,
        formula: &str,
        position: &Position,
        default_sheet: Option<&str>,
        index: &SparseColumnIndex,
        variables: &dyn VariableRecognizer,
    ) -> Result<Vec<NodeId>, ExtractError> {
        let references =
            self.extractor
                .extract(strip_formula_marker(formula), position, Some(variables))?;
        Ok(normalize_references(
            &references,
            default_sheet,
            Some(index),
            self.max_range_cells,
        ))
    }

    fn finish_node(
        &self,
        id: NodeId,
        found: Result<Vec<NodeId>, ExtractError>,
        known: &HashSet<NodeId>,
        stats: &mut BuildStats,
    ) -> DependencyNode {
        match found {
            Ok(ids) => {
                let (kept, unknown): (Vec<_>, Vec<_>) =
                    ids.into_iter().partition(|dep| known.contains(dep));
                if !unknown.is_empty() {
                    trace!(node = %id, unknown = unknown.len(), "references outside the workbook ignored");
                }
                stats.unknown_references += unknown.len();
                DependencyNode::with_dependencies(id, kept)
            }
            Err(err) => {
                debug!(node = %id, error = %err, "reference extraction failed; node scheduled without dependencies");
                stats.extraction_failures += 1;
                DependencyNode::new(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{CellRef, GridPoint, RangeRef, Reference};
    use crate::workbook::{CellAddress, CellRecord, VariableRecord};

    /// Extractor that reads a tiny fixed syntax: `;`-separated tokens where
    /// `r,c` is a cell, `r,c..r,c` a range, `!` a failure and anything else a
    /// bare name.
    struct ScriptedExtractor;

    fn point(text: &str) -> (u32, u32) {
        let (r, c) = text.split_once(',').unwrap();
        (r.trim().parse().unwrap(), c.trim().parse().unwrap())
    }

    impl ReferenceExtractor for ScriptedExtractor {
        fn extract(
            &self,
            formula: &str,
            _position: &Position,
            variables: Option<&dyn VariableRecognizer>,
        ) -> Result<Vec<Reference>, ExtractError> {
            let mut refs = Vec::new();
            for token in formula.split(';').map(str::trim).filter(|t| !t.is_empty()) {
                if token == "!" {
                    return Err(ExtractError::Other("scripted failure".into()));
                }
                if let Some((from, to)) = token.split_once("..") {
                    let (fr, fc) = point(from);
                    let (tr, tc) = point(to);
                    refs.push(Reference::Range(RangeRef {
                        sheet: None,
                        from: GridPoint::new(fr, fc),
                        to: GridPoint::new(tr, tc),
                    }));
                } else if token.contains(',') {
                    let (row, col) = point(token);
                    refs.push(Reference::Cell(CellRef { sheet: None, row, col }));
                } else if let Some(marker) = variables.and_then(|v| v.recognize(token, None)) {
                    refs.push(Reference::Variable(marker.name));
                }
            }
            Ok(refs)
        }
    }

    fn workbook() -> WorkbookSnapshot {
        let mut wb = WorkbookSnapshot::new();
        wb.insert_cell(CellRecord::constant(CellAddress::new("S", 1, 1), 1.0))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 2, 1), "=1,1; Rate; Nope"))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 3, 1), "=!"))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 4, 1), "=9,9"))
            .insert_variable(VariableRecord::with_formula("Rate", "=1,1"))
            .insert_variable(VariableRecord::with_value("Plain", 2.0));
        wb
    }

    #[test]
    fn one_node_per_cell_then_variables() {
        let graph = GraphBuilder::new(&ScriptedExtractor).build(&workbook());
        let ids: Vec<_> = graph.nodes().iter().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, ["S:1:1", "S:2:1", "S:3:1", "S:4:1", "Rate", "Plain"]);
        assert_eq!(graph.stats().cells, 4);
        assert_eq!(graph.stats().variables, 2);
    }

    #[test]
    fn formula_cells_read_cells_and_recognized_variables() {
        let graph = GraphBuilder::new(&ScriptedExtractor).build(&workbook());
        let node = graph.node(&NodeId::cell("S", 2, 1)).unwrap();
        let deps: Vec<_> = node.dependencies().iter().cloned().collect();
        assert_eq!(deps, vec![NodeId::cell("S", 1, 1), NodeId::variable("Rate")]);
    }

    #[test]
    fn extraction_failure_yields_empty_dependencies() {
        let graph = GraphBuilder::new(&ScriptedExtractor).build(&workbook());
        assert!(graph.node(&NodeId::cell("S", 3, 1)).unwrap().is_leaf());
        assert_eq!(graph.stats().extraction_failures, 1);
    }

    #[test]
    fn references_outside_the_workbook_are_dropped() {
        let graph = GraphBuilder::new(&ScriptedExtractor).build(&workbook());
        assert!(graph.node(&NodeId::cell("S", 4, 1)).unwrap().is_leaf());
        assert_eq!(graph.stats().unknown_references, 1);
    }

    #[test]
    fn variables_have_no_default_sheet() {
        let graph = GraphBuilder::new(&ScriptedExtractor).build(&workbook());
        // `1,1` is unqualified, so a variable formula cannot resolve it.
        assert!(graph.node(&NodeId::variable("Rate")).unwrap().is_leaf());
        assert!(graph.node(&NodeId::variable("Plain")).unwrap().is_leaf());
    }

    #[test]
    fn large_ranges_only_link_populated_cells() {
        let mut wb = WorkbookSnapshot::new();
        wb.insert_cell(CellRecord::constant(CellAddress::new("S", 3, 1), 1.0))
            .insert_cell(CellRecord::constant(CellAddress::new("S", 4000, 2), 1.0))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 1, 5), "1,1..5000,2"));

        let graph = GraphBuilder::new(&ScriptedExtractor).build(&wb);
        let node = graph.node(&NodeId::cell("S", 1, 5)).unwrap();
        assert_eq!(node.dependencies().len(), 2);
        assert_eq!(graph.stats().unknown_references, 0);
        assert_eq!(graph.sparse_index().len(), 3);
    }

    #[test]
    fn small_ranges_drop_empty_cells() {
        let mut wb = WorkbookSnapshot::new();
        wb.insert_cell(CellRecord::constant(CellAddress::new("S", 1, 1), 1.0))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 1, 3), "1,1..3,2"));

        let graph = GraphBuilder::new(&ScriptedExtractor).build(&wb);
        let node = graph.node(&NodeId::cell("S", 1, 3)).unwrap();
        assert_eq!(node.dependencies().len(), 1);
        assert_eq!(graph.stats().unknown_references, 5);
    }

    #[test]
    fn custom_range_cap_applies() {
        let mut wb = WorkbookSnapshot::new();
        wb.insert_cell(CellRecord::constant(CellAddress::new("S", 2, 2), 1.0))
            .insert_cell(CellRecord::formula(CellAddress::new("S", 1, 3), "1,1..3,2"));

        let graph = GraphBuilder::new(&ScriptedExtractor)
            .with_max_range_cells(4)
            .build(&wb);
        let node = graph.node(&NodeId::cell("S", 1, 3)).unwrap();
        assert_eq!(node.dependencies().len(), 1);
        assert_eq!(graph.stats().unknown_references, 0);
    }
}
