//! Recalculation Configuration
//!
//! The knobs that bound the cost of a recalculation run. Defaults match the
//! behaviour hosts expect from the engine out of the box: 30 circular sweeps,
//! ranges materialized up to 1000 cells, and `Sheet1` as the sheet an
//! unqualified formula is evaluated against when no position is given.

use serde::{Deserialize, Serialize};

/// Number of sweeps over the circular (residual) node set.
pub const DEFAULT_MAX_ITERATIONS: usize = 30;

/// Largest range, in cells, that is expanded cell by cell.
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 1000;

/// Sheet used for formulas evaluated without a position.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Configuration for a [`Recalculator`](crate::recalc::Recalculator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecalcConfig {
    /// Sweeps run over the circular set. Always run in full.
    pub max_iterations: usize,

    /// Ranges larger than this are only expanded through the sparse index.
    pub max_range_cells: u64,

    /// Sheet used by the default evaluation position.
    pub default_sheet: String,
}

impl RecalcConfig {
    /// Create a configuration with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of circular sweeps.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the range materialization cap.
    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }

    /// Set the sheet used by the default evaluation position.
    pub fn with_default_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.default_sheet = sheet.into();
        self
    }
}

impl Default for RecalcConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            default_sheet: DEFAULT_SHEET.to_string(),
        }
    }
}
