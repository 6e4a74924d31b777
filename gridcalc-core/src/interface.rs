//! Collaborator Interfaces
//!
//! The engine does not parse or evaluate formulas itself. It talks to two
//! collaborators through the traits below:
//!
//! - a [`ReferenceExtractor`] that reports which cells, ranges and variables a
//!   formula reads, and
//! - a [`FormulaEvaluator`] that computes a formula's value, calling back into
//!   a [`ValueResolver`] for every reference it encounters.
//!
//! The built-in [`formula`](crate::formula) module implements both.

use crate::config::DEFAULT_SHEET;
use crate::error::{EvalError, ExtractError};
use crate::workbook::Value;

/// The location a formula is parsed or evaluated at.
///
/// Relative references resolve against `row`/`col`; unqualified references
/// resolve against `sheet` when one is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub row: u32,
    pub col: u32,
    pub sheet: Option<String>,
}

impl Position {
    pub fn new(row: u32, col: u32, sheet: impl Into<String>) -> Self {
        Self {
            row,
            col,
            sheet: Some(sheet.into()),
        }
    }

    /// A position with no sheet context. Used for variable formulas.
    pub fn unqualified(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            sheet: None,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1, DEFAULT_SHEET)
    }
}

/// A `(row, col)` corner of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub row: u32,
    pub col: u32,
}

impl GridPoint {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// A single-cell reference. `sheet` is `None` when the formula left it implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub row: u32,
    pub col: u32,
}

/// A rectangular range reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub from: GridPoint,
    pub to: GridPoint,
}

impl RangeRef {
    /// The range with its corners ordered so `from <= to` on both axes.
    pub fn normalized(&self) -> (GridPoint, GridPoint) {
        (
            GridPoint::new(self.from.row.min(self.to.row), self.from.col.min(self.to.col)),
            GridPoint::new(self.from.row.max(self.to.row), self.from.col.max(self.to.col)),
        )
    }

    /// Number of cells covered. Computed wide so huge ranges cannot overflow.
    pub fn cell_count(&self) -> u64 {
        let (from, to) = self.normalized();
        (u64::from(to.row - from.row) + 1) * (u64::from(to.col - from.col) + 1)
    }
}

/// A reference reported by a [`ReferenceExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Cell(CellRef),
    Range(RangeRef),
    Variable(String),
}

/// Returned by a [`VariableRecognizer`] for a name it knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMarker {
    pub name: String,
}

/// Answers whether a bare identifier in a formula names a workbook variable.
pub trait VariableRecognizer {
    fn recognize(&self, name: &str, sheet: Option<&str>) -> Option<VariableMarker>;
}

impl<F> VariableRecognizer for F
where
    F: Fn(&str, Option<&str>) -> Option<VariableMarker>,
{
    fn recognize(&self, name: &str, sheet: Option<&str>) -> Option<VariableMarker> {
        self(name, sheet)
    }
}

/// Reports the references a formula reads.
pub trait ReferenceExtractor {
    /// `formula` has no leading `=`. Bare identifiers become
    /// [`Reference::Variable`] only when `variables` recognizes them.
    fn extract(
        &self,
        formula: &str,
        position: &Position,
        variables: Option<&dyn VariableRecognizer>,
    ) -> Result<Vec<Reference>, ExtractError>;
}

/// Value lookups offered to a [`FormulaEvaluator`] during evaluation.
///
/// References handed to a resolver are fully qualified: the evaluator fills
/// in the sheet from its position before calling back.
pub trait ValueResolver {
    fn cell(&self, sheet: &str, row: u32, col: u32) -> Value;

    /// Row-major values of the rectangle `from..=to`, missing cells as zero.
    fn range(&self, sheet: &str, from: GridPoint, to: GridPoint) -> Vec<Vec<Value>>;

    fn variable(&self, name: &str) -> Value;
}

/// Computes the value of a formula.
pub trait FormulaEvaluator {
    /// `formula` has no leading `=`.
    fn evaluate(
        &self,
        formula: &str,
        position: &Position,
        resolver: &dyn ValueResolver,
    ) -> Result<Value, EvalError>;
}

/// Strip the leading formula marker, if any.
pub fn strip_formula_marker(formula: &str) -> &str {
    formula.strip_prefix('=').unwrap_or(formula)
}
