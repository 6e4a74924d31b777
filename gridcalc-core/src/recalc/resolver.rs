//! Workbook Value Resolver
//!
//! Answers the evaluator's cell, range and variable lookups from a snapshot.
//! Anything missing reads as zero.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::address::row_col_to_address;
use crate::interface::{GridPoint, ValueResolver};
use crate::workbook::{CellKind, Value, WorkbookSnapshot};

/// Variable name to its position in `WorkbookSnapshot::variables`.
pub type VariableIndex = HashMap<String, usize>;

/// Index the variables of `workbook`. The first definition of a name wins,
/// like `WorkbookSnapshot::variable`.
pub fn variable_index(workbook: &WorkbookSnapshot) -> VariableIndex {
    let mut index = VariableIndex::with_capacity(workbook.variables.len());
    for (i, variable) in workbook.variables.iter().enumerate() {
        index.entry(variable.name.clone()).or_insert(i);
    }
    index
}

/// Read-only view of a snapshot for the evaluator.
pub struct WorkbookResolver<'a> {
    workbook: &'a WorkbookSnapshot,
    variables: Cow<'a, VariableIndex>,
}

impl<'a> WorkbookResolver<'a> {
    pub fn new(workbook: &'a WorkbookSnapshot) -> Self {
        Self {
            workbook,
            variables: Cow::Owned(variable_index(workbook)),
        }
    }

    /// Reuse an index built by [`variable_index`] for this same snapshot.
    pub fn with_index(workbook: &'a WorkbookSnapshot, variables: &'a VariableIndex) -> Self {
        Self {
            workbook,
            variables: Cow::Borrowed(variables),
        }
    }
}

impl ValueResolver for WorkbookResolver<'_> {
    /// A formula cell's cached result takes precedence over its value.
    fn cell(&self, sheet: &str, row: u32, col: u32) -> Value {
        let Some(cell) = self.workbook.cell(sheet, &row_col_to_address(row, col)) else {
            return Value::ZERO;
        };
        if cell.kind == CellKind::Formula {
            if let Some(cached) = cell.cached_result() {
                return cached.clone();
            }
        }
        cell.value.clone().unwrap_or(Value::ZERO)
    }

    fn range(&self, sheet: &str, from: GridPoint, to: GridPoint) -> Vec<Vec<Value>> {
        (from.row..=to.row)
            .map(|row| (from.col..=to.col).map(|col| self.cell(sheet, row, col)).collect())
            .collect()
    }

    fn variable(&self, name: &str) -> Value {
        self.variables
            .get(name)
            .and_then(|&i| self.workbook.variables.get(i))
            .map(|variable| variable.resolved())
            .unwrap_or(Value::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{CellAddress, CellRecord, VariableRecord};

    fn workbook() -> WorkbookSnapshot {
        let mut formula = CellRecord::formula(CellAddress::new("S", 2, 1), "=A1");
        formula.value = Some(Value::Number(1.0));
        formula.formula.as_mut().unwrap().cached_result = Some(Value::Number(9.0));

        let mut stale = CellRecord::formula(CellAddress::new("S", 3, 1), "=A1");
        stale.value = Some(Value::Number(4.0));

        let mut wb = WorkbookSnapshot::new();
        wb.insert_cell(CellRecord::constant(CellAddress::new("S", 1, 1), 7.0))
            .insert_cell(formula)
            .insert_cell(stale)
            .insert_cell(CellRecord::constant(CellAddress::new("S", 1, 2), "hi"))
            .insert_variable(VariableRecord::with_value("Rate", 0.5));
        wb
    }

    #[test]
    fn cell_lookup_order() {
        let wb = workbook();
        let resolver = WorkbookResolver::new(&wb);
        assert_eq!(resolver.cell("S", 1, 1), Value::Number(7.0));
        assert_eq!(resolver.cell("S", 2, 1), Value::Number(9.0));
        assert_eq!(resolver.cell("S", 3, 1), Value::Number(4.0));
        assert_eq!(resolver.cell("S", 9, 9), Value::ZERO);
        assert_eq!(resolver.cell("Missing", 1, 1), Value::ZERO);
    }

    #[test]
    fn range_keeps_its_shape() {
        let wb = workbook();
        let resolver = WorkbookResolver::new(&wb);
        let values = resolver.range("S", GridPoint::new(1, 1), GridPoint::new(2, 3));
        assert_eq!(
            values,
            vec![
                vec![Value::Number(7.0), Value::from("hi"), Value::ZERO],
                vec![Value::Number(9.0), Value::ZERO, Value::ZERO],
            ]
        );

        let missing = resolver.range("Missing", GridPoint::new(1, 1), GridPoint::new(2, 2));
        assert_eq!(missing, vec![vec![Value::ZERO; 2]; 2]);
    }

    #[test]
    fn variable_lookup() {
        let mut wb = workbook();
        assert_eq!(WorkbookResolver::new(&wb).variable("Rate"), Value::Number(0.5));
        assert_eq!(WorkbookResolver::new(&wb).variable("rate"), Value::ZERO);

        wb.variables[0].result = Some(Value::Number(0.25));
        assert_eq!(WorkbookResolver::new(&wb).variable("Rate"), Value::Number(0.25));
    }

    #[test]
    fn duplicate_variable_names_resolve_to_the_first() {
        let mut wb = workbook();
        wb.insert_variable(VariableRecord::with_value("Rate", 99.0));
        let index = variable_index(&wb);
        assert_eq!(index.len(), 1);
        assert_eq!(WorkbookResolver::with_index(&wb, &index).variable("Rate"), Value::Number(0.5));
    }
}
