//! Workbook Model
//!
//! The mutable subject of recalculation: sheets of cells, a list of named
//! variables, and the values both carry. The serialized form is plain JSON
//! with camelCase keys, so a snapshot produced by a host application can be
//! loaded directly.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::address::row_col_to_address;
use crate::error::SnapshotError;

/// A computed or constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Text(String),
    /// Row-major rectangle, produced by range references.
    Array(Vec<Vec<Value>>),
}

impl Value {
    /// The neutral value used for anything missing or failed.
    pub const ZERO: Value = Value::Number(0.0);

    /// Short name of the variant, used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Array(_) => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::ZERO
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Text(s) => f.write_str(s),
            Value::Array(rows) => {
                f.write_str("{")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    for (j, value) in row.iter().enumerate() {
                        if j > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{value}")?;
                    }
                }
                f.write_str("}")
            }
        }
    }
}

/// Whether a cell holds a constant or a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Constant,
    Formula,
}

/// Where a cell lives. Rows and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
    pub sheet: String,
}

impl CellAddress {
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            sheet: sheet.into(),
        }
    }

    /// The A1 form of this address, without the sheet.
    pub fn a1(&self) -> String {
        row_col_to_address(self.row, self.col)
    }
}

/// Formula text plus the memoized result of its last evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaData {
    #[serde(rename = "formulaString")]
    pub text: String,

    /// Once set, the cell is not re-evaluated outside the circular loop.
    #[serde(default, alias = "cachesResult", skip_serializing_if = "Option::is_none")]
    pub cached_result: Option<Value>,
}

impl FormulaData {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cached_result: None,
        }
    }
}

/// One cell of a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    #[serde(rename = "type")]
    pub kind: CellKind,

    pub address: CellAddress,

    #[serde(default, rename = "formulaData", skip_serializing_if = "Option::is_none")]
    pub formula: Option<FormulaData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl CellRecord {
    /// A constant cell holding `value`.
    pub fn constant(address: CellAddress, value: impl Into<Value>) -> Self {
        Self {
            kind: CellKind::Constant,
            address,
            formula: None,
            value: Some(value.into()),
        }
    }

    /// A formula cell that has not been evaluated yet.
    pub fn formula(address: CellAddress, text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Formula,
            address,
            formula: Some(FormulaData::new(text)),
            value: None,
        }
    }

    /// Formula text, if the cell has any.
    pub fn formula_text(&self) -> Option<&str> {
        self.formula
            .as_ref()
            .map(|f| f.text.as_str())
            .filter(|text| !text.is_empty())
    }

    /// Formula text of a formula-kind cell. Constants never evaluate.
    pub fn evaluable_text(&self) -> Option<&str> {
        match self.kind {
            CellKind::Formula => self.formula_text(),
            CellKind::Constant => None,
        }
    }

    pub fn cached_result(&self) -> Option<&Value> {
        self.formula.as_ref().and_then(|f| f.cached_result.as_ref())
    }

    /// Store a freshly evaluated result in both `value` and the cache.
    pub fn store_result(&mut self, result: Value) {
        if let Some(formula) = self.formula.as_mut() {
            formula.cached_result = Some(result.clone());
        }
        self.value = Some(result);
    }
}

/// A named, workbook-scoped value, optionally defined by a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl VariableRecord {
    /// A variable defined by `formula`.
    pub fn with_formula(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: Some(formula.into()),
            value: None,
            result: None,
        }
    }

    /// A formula-less variable holding `value`.
    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            formula: None,
            value: Some(value.into()),
            result: None,
        }
    }

    pub fn formula_text(&self) -> Option<&str> {
        self.formula.as_deref().filter(|text| !text.is_empty())
    }

    /// The value other formulas see: `result`, else `value`, else zero.
    pub fn resolved(&self) -> Value {
        self.result
            .as_ref()
            .or(self.value.as_ref())
            .cloned()
            .unwrap_or(Value::ZERO)
    }
}

/// Cells of one sheet, keyed by A1 address.
pub type Sheet = IndexMap<String, CellRecord>;

/// Everything a recalculation run reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSnapshot {
    #[serde(default)]
    pub variables: Vec<VariableRecord>,

    #[serde(default)]
    pub sheets: IndexMap<String, Sheet>,
}

impl WorkbookSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Insert a cell under the A1 key derived from its own address.
    pub fn insert_cell(&mut self, cell: CellRecord) -> &mut Self {
        let key = cell.address.a1();
        self.sheets
            .entry(cell.address.sheet.clone())
            .or_default()
            .insert(key, cell);
        self
    }

    pub fn insert_variable(&mut self, variable: VariableRecord) -> &mut Self {
        self.variables.push(variable);
        self
    }

    pub fn cell(&self, sheet: &str, address: &str) -> Option<&CellRecord> {
        self.sheets.get(sheet)?.get(address)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// All cells, sheet by sheet, in insertion order.
    pub fn cells(&self) -> impl Iterator<Item = &CellRecord> + '_ {
        self.sheets.values().flat_map(|sheet| sheet.values())
    }

    pub fn cell_count(&self) -> usize {
        self.sheets.values().map(|sheet| sheet.len()).sum()
    }
}
