//! Reference extraction from formula AST.
//!
//! Collects every cell, range and recognized variable an expression reads, in
//! source order, for dependency graph construction.

use crate::interface::{Reference, VariableRecognizer};

use super::parser::Expr;

/// Extract the references `expr` reads.
///
/// References keep the sheet written in the formula (`None` when unqualified);
/// qualifying them is the normalizer's job. Bare names only produce a
/// reference when `variables` recognizes them against `sheet`.
pub fn collect_references(
    expr: &Expr,
    sheet: Option<&str>,
    variables: Option<&dyn VariableRecognizer>,
) -> Vec<Reference> {
    let mut refs = Vec::new();
    collect(expr, sheet, variables, &mut refs);
    refs
}

fn collect(
    expr: &Expr,
    sheet: Option<&str>,
    variables: Option<&dyn VariableRecognizer>,
    refs: &mut Vec<Reference>,
) {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) => {}
        Expr::Cell(cell) => refs.push(Reference::Cell(cell.clone())),
        Expr::Range(range) => refs.push(Reference::Range(range.clone())),
        Expr::Name(name) => {
            if let Some(marker) = variables.and_then(|v| v.recognize(name, sheet)) {
                refs.push(Reference::Variable(marker.name));
            }
        }
        Expr::Unary { operand, .. } => collect(operand, sheet, variables, refs),
        Expr::Binary { left, right, .. } => {
            collect(left, sheet, variables, refs);
            collect(right, sheet, variables, refs);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect(arg, sheet, variables, refs);
            }
        }
    }
}
