//! Reference Normalization
//!
//! Flattens the references an extractor reports into graph node identities.
//! Ranges are expanded to their cells, subject to a size cap:
//!
//! - up to `max_range_cells` cells, every cell in the rectangle is emitted;
//! - above the cap, only cells present in the [`SparseColumnIndex`] are
//!   emitted;
//! - above the cap with no index, the range contributes nothing.
//!
//! The last rule loses edges for large ranges. Empty cells read as zero at
//! evaluation time, so only populated cells matter for ordering.

use std::sync::Arc;

use tracing::{debug, trace};

use super::node::NodeId;
use super::sparse::SparseColumnIndex;
use crate::interface::{RangeRef, Reference};

/// Convert `references` into node identities.
///
/// References without a sheet inherit `default_sheet`; when there is none
/// they cannot name a cell and are skipped. The result may contain
/// duplicates.
pub fn normalize_references(
    references: &[Reference],
    default_sheet: Option<&str>,
    index: Option<&SparseColumnIndex>,
    max_range_cells: u64,
) -> Vec<NodeId> {
    let mut ids = Vec::new();

    for reference in references {
        match reference {
            Reference::Cell(cell) => match cell.sheet.as_deref().or(default_sheet) {
                Some(sheet) => ids.push(NodeId::cell(sheet, cell.row, cell.col)),
                None => trace!(row = cell.row, col = cell.col, "cell reference without sheet skipped"),
            },
            Reference::Range(range) => match range.sheet.as_deref().or(default_sheet) {
                Some(sheet) => expand_range(range, sheet, index, max_range_cells, &mut ids),
                None => trace!("range reference without sheet skipped"),
            },
            Reference::Variable(name) => ids.push(NodeId::variable(name.as_str())),
        }
    }

    ids
}

/// Push the identities of the cells `range` covers on `sheet` onto `out`.
fn expand_range(
    range: &RangeRef,
    sheet: &str,
    index: Option<&SparseColumnIndex>,
    max_range_cells: u64,
    out: &mut Vec<NodeId>,
) {
    let (from, to) = range.normalized();
    let total = range.cell_count();
    let sheet: Arc<str> = Arc::from(sheet);

    if total <= max_range_cells {
        for row in from.row..=to.row {
            for col in from.col..=to.col {
                out.push(NodeId::cell(Arc::clone(&sheet), row, col));
            }
        }
        return;
    }

    match index {
        Some(index) => {
            let before = out.len();
            out.extend(
                index
                    .occupied_in(&sheet, from, to)
                    .map(|(row, col)| NodeId::cell(Arc::clone(&sheet), row, col)),
            );
            trace!(
                %sheet,
                total,
                populated = out.len() - before,
                "large range expanded through sparse index"
            );
        }
        None => {
            debug!(%sheet, total, max_range_cells, "large range without sparse index dropped");
        }
    }
}
