//! Recalculation
//!
//! Drives evaluation of a workbook over a schedule produced by the
//! [`graph`](crate::graph) module, and answers the evaluator's value lookups.

mod driver;
mod report;
mod resolver;

pub use driver::{evaluate_formula, evaluate_workbook, Recalculator};
pub use report::{RecalcError, RecalcReport, MAX_REPORTED_ERRORS};
pub use resolver::{variable_index, VariableIndex, WorkbookResolver};
