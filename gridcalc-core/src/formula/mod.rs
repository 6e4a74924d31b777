//! Built-in Formula Language
//!
//! A compact formula language that implements both collaborator traits, so
//! the engine can run without a host-supplied parser.
//!
//! # Syntax
//!
//! - literals: numbers (`1`, `2.5`, `1e3`), `"text"` and `TRUE`/`FALSE`
//! - references: `A1`, `$A$1`, `Data!A1`, `'My Sheet'!A1`, ranges `A1:B3`
//! - bare identifiers name workbook variables
//! - operators: unary `-`/`+`, `^`, `*`, `/`, `+`, `-`, `&`, comparisons and
//!   postfix `%`
//! - functions: `SUM`, `MIN`, `MAX`, `AVERAGE`, `COUNT`, `ABS`, `ROUND`, `IF`,
//!   `IFERROR`, `AND`, `OR`, `NOT`, `CONCAT`
//!
//! Formulas are parsed on every call. There is no AST cache.

mod eval;
mod extract;
mod functions;
mod lexer;
mod parser;

pub use eval::Interpreter;
pub use extract::collect_references;
pub use functions::Function;
pub use parser::{parse, BinaryOp, Expr, UnaryOp};

use crate::error::{EvalError, ExtractError};
use crate::interface::{
    FormulaEvaluator, Position, Reference, ReferenceExtractor, ValueResolver, VariableRecognizer,
};
use crate::workbook::Value;

/// The built-in formula language as an extractor and an evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormulas;

impl ReferenceExtractor for BuiltinFormulas {
    fn extract(
        &self,
        formula: &str,
        position: &Position,
        variables: Option<&dyn VariableRecognizer>,
    ) -> Result<Vec<Reference>, ExtractError> {
        let expr = parse(formula)?;
        Ok(collect_references(&expr, position.sheet.as_deref(), variables))
    }
}

impl FormulaEvaluator for BuiltinFormulas {
    fn evaluate(
        &self,
        formula: &str,
        position: &Position,
        resolver: &dyn ValueResolver,
    ) -> Result<Value, EvalError> {
        let expr = parse(formula)?;
        Interpreter::new(position, resolver).evaluate(&expr)
    }
}
