//! Sparse Occupancy Index
//!
//! Records which cells actually exist, per sheet and per column. Large range
//! references are expanded through this index so a formula over `A1:Z100000`
//! only gains edges to the cells that are populated.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::interface::GridPoint;
use crate::workbook::CellAddress;

/// `sheet -> col -> rows` occupancy of a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseColumnIndex {
    sheets: HashMap<String, BTreeMap<u32, BTreeSet<u32>>>,
}

impl SparseColumnIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from every cell address in one pass.
    pub fn from_addresses<'a>(addresses: impl IntoIterator<Item = &'a CellAddress>) -> Self {
        let mut index = Self::new();
        for address in addresses {
            index.insert(&address.sheet, address.row, address.col);
        }
        index
    }

    /// Mark `(row, col)` on `sheet` as populated.
    pub fn insert(&mut self, sheet: &str, row: u32, col: u32) {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .entry(col)
            .or_default()
            .insert(row);
    }

    /// Check if the index knows about `sheet` at all.
    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets.contains_key(sheet)
    }

    pub fn contains(&self, sheet: &str, row: u32, col: u32) -> bool {
        self.sheets
            .get(sheet)
            .and_then(|columns| columns.get(&col))
            .is_some_and(|rows| rows.contains(&row))
    }

    /// Populated cells inside the rectangle `from..=to`, column by column and
    /// top to bottom within a column. Inverted corners yield nothing.
    pub fn occupied_in<'a>(
        &'a self,
        sheet: &str,
        from: GridPoint,
        to: GridPoint,
    ) -> impl Iterator<Item = (u32, u32)> + 'a {
        self.sheets
            .get(sheet)
            .into_iter()
            // BTreeMap::range panics on inverted bounds.
            .filter(move |_| from.row <= to.row && from.col <= to.col)
            .flat_map(move |columns| columns.range(from.col..=to.col))
            .flat_map(move |(&col, rows)| rows.range(from.row..=to.row).map(move |&row| (row, col)))
    }

    /// Total number of populated cells.
    pub fn len(&self) -> usize {
        self.sheets
            .values()
            .flat_map(|columns| columns.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SparseColumnIndex {
        let addresses = [
            CellAddress::new("Data", 1, 1),
            CellAddress::new("Data", 500, 1),
            CellAddress::new("Data", 2000, 1),
            CellAddress::new("Data", 7, 3),
            CellAddress::new("Data", 7, 30),
            CellAddress::new("Other", 1, 1),
        ];
        SparseColumnIndex::from_addresses(&addresses)
    }

    #[test]
    fn records_every_address() {
        let index = index();
        assert_eq!(index.len(), 6);
        assert!(index.contains("Data", 500, 1));
        assert!(!index.contains("Data", 501, 1));
        assert!(index.has_sheet("Other"));
        assert!(!index.has_sheet("Missing"));
    }

    #[test]
    fn occupied_cells_are_clipped_to_the_rectangle() {
        let index = index();
        let cells: Vec<_> = index
            .occupied_in("Data", GridPoint::new(1, 1), GridPoint::new(1000, 10))
            .collect();
        assert_eq!(cells, vec![(1, 1), (500, 1), (7, 3)]);
    }

    #[test]
    fn unknown_sheet_yields_nothing() {
        let index = index();
        assert_eq!(
            index
                .occupied_in("Missing", GridPoint::new(1, 1), GridPoint::new(10, 10))
                .count(),
            0
        );
    }

    #[test]
    fn duplicate_addresses_collapse() {
        let mut index = SparseColumnIndex::new();
        assert!(index.is_empty());
        index.insert("S", 1, 1);
        index.insert("S", 1, 1);
        assert_eq!(index.len(), 1);
    }
}
