//! Gridcalc Core
//!
//! This crate provides the recalculation core of a spreadsheet-style
//! computation engine. It implements:
//!
//! - Dependency graph construction over cells and named variables
//! - Topological scheduling with explicit isolation of circular references
//! - Bounded iterative evaluation of the circular remainder
//! - A compact built-in formula language
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `workbook`: Cells, variables and values; JSON snapshot I/O
//! - `interface`: Traits for the formula extractor, evaluator and resolver
//! - `graph`: Dependency graph builder and topological scheduler
//! - `recalc`: Recalculation driver and value resolver
//! - `formula`: Built-in formula language implementing the interface traits
//! - `address`: A1 address codec
//!
//! # Example
//!
//! ```rust
//! use gridcalc_core::workbook::{CellAddress, CellRecord, Value, WorkbookSnapshot};
//! use gridcalc_core::recalc::evaluate_workbook;
//!
//! let mut workbook = WorkbookSnapshot::new();
//! workbook
//!     .insert_cell(CellRecord::constant(CellAddress::new("Sheet1", 1, 1), 100.0))
//!     .insert_cell(CellRecord::formula(CellAddress::new("Sheet1", 2, 1), "=A1 * 2"));
//!
//! let workbook = evaluate_workbook(workbook);
//! let a2 = workbook.cell("Sheet1", "A2").unwrap();
//! assert_eq!(a2.value, Some(Value::Number(200.0)));
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod formula;
pub mod graph;
pub mod interface;
pub mod recalc;
pub mod workbook;

pub use config::RecalcConfig;
pub use error::{AddressError, EvalError, ExtractError, SnapshotError};
pub use recalc::{evaluate_formula, evaluate_workbook, RecalcReport, Recalculator};
pub use workbook::{Value, WorkbookSnapshot};
