//! Formula Interpreter
//!
//! Walks an [`Expr`] tree and computes its value. Cell, range and variable
//! reads go through the caller's [`ValueResolver`].

use std::cmp::Ordering;

use crate::error::EvalError;
use crate::interface::{Position, ValueResolver};
use crate::workbook::Value;

use super::functions::{call, Function};
use super::parser::{BinaryOp, Expr, UnaryOp};

/// Evaluates expressions at one position against one resolver.
pub struct Interpreter<'a> {
    position: &'a Position,
    resolver: &'a dyn ValueResolver,
}

impl<'a> Interpreter<'a> {
    pub fn new(position: &'a Position, resolver: &'a dyn ValueResolver) -> Self {
        Self { position, resolver }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Cell(cell) => {
                let sheet = self.sheet(cell.sheet.as_deref())?;
                Ok(self.resolver.cell(sheet, cell.row, cell.col))
            }
            Expr::Range(range) => {
                let sheet = self.sheet(range.sheet.as_deref())?;
                let (from, to) = range.normalized();
                Ok(Value::Array(self.resolver.range(sheet, from, to)))
            }
            Expr::Name(name) => Ok(self.resolver.variable(name)),
            Expr::Unary { op, operand } => {
                let n = to_number(&self.evaluate(operand)?)?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -n,
                    UnaryOp::Plus => n,
                }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, &left, &right)
            }
            Expr::Call { name, args } => {
                let function =
                    Function::lookup(name).ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
                call(self, function, args)
            }
        }
    }

    /// Sheet of a reference: its own, else the evaluation position's.
    fn sheet<'s>(&'s self, sheet: Option<&'s str>) -> Result<&'s str, EvalError> {
        sheet
            .or(self.position.sheet.as_deref())
            .ok_or_else(|| EvalError::Other("reference has no sheet to resolve against".into()))
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let a = to_number(left)?;
            let b = to_number(right)?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => a / b,
                _ => a.powf(b),
            };
            finite(n)
        }
        BinaryOp::Concat => Ok(Value::Text(to_text(left)? + &to_text(right)?)),
        _ => {
            let ordering = compare(&scalar(left)?, &scalar(right)?);
            Ok(Value::Boolean(match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::NotEq => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
    }
}

/// Reject results that are not finite numbers.
pub(super) fn finite(n: f64) -> Result<Value, EvalError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(EvalError::Other("numeric result out of range".into()))
    }
}

/// A 1x1 array collapses to its element. Larger arrays are not scalars.
pub(super) fn scalar(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Array(rows) => match rows.as_slice() {
            [row] if row.len() == 1 => Ok(row[0].clone()),
            _ => Err(EvalError::Type {
                expected: "single value",
                found: "array",
            }),
        },
        other => Ok(other.clone()),
    }
}

pub(super) fn to_number(value: &Value) -> Result<f64, EvalError> {
    let value = scalar(value)?;
    value.as_number().ok_or(EvalError::Type {
        expected: "number",
        found: value.type_name(),
    })
}

pub(super) fn to_bool(value: &Value) -> Result<bool, EvalError> {
    match scalar(value)? {
        Value::Boolean(b) => Ok(b),
        Value::Number(n) => Ok(n != 0.0),
        Value::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        Value::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        other => Err(EvalError::Type {
            expected: "boolean",
            found: other.type_name(),
        }),
    }
}

pub(super) fn to_text(value: &Value) -> Result<String, EvalError> {
    Ok(scalar(value)?.to_string())
}

/// Numbers sort before text, text before booleans. Text compares without case.
fn compare(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Boolean(_) => 2,
            Value::Array(_) => 3,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use crate::interface::GridPoint;

    /// Resolver over a fixed 3x2 grid on `Sheet1` plus one variable.
    struct Grid;

    impl ValueResolver for Grid {
        fn cell(&self, sheet: &str, row: u32, col: u32) -> Value {
            match (sheet, row, col) {
                ("Sheet1", r @ 1..=3, 1) => Value::Number(f64::from(r)),
                ("Sheet1", 1, 2) => Value::from("label"),
                ("Other", 1, 1) => Value::Number(100.0),
                _ => Value::ZERO,
            }
        }

        fn range(&self, sheet: &str, from: GridPoint, to: GridPoint) -> Vec<Vec<Value>> {
            (from.row..=to.row)
                .map(|row| (from.col..=to.col).map(|col| self.cell(sheet, row, col)).collect())
                .collect()
        }

        fn variable(&self, name: &str) -> Value {
            match name {
                "Rate" => Value::Number(0.5),
                _ => Value::ZERO,
            }
        }
    }

    fn eval(formula: &str) -> Result<Value, EvalError> {
        let position = Position::default();
        let expr = parse(formula).map_err(EvalError::from)?;
        Interpreter::new(&position, &Grid).evaluate(&expr)
    }

    fn number(formula: &str) -> f64 {
        match eval(formula) {
            Ok(Value::Number(n)) => n,
            other => panic!("{formula} evaluated to {other:?}"),
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(number("(1 + 2) * 3"), 9.0);
        assert_eq!(number("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(number("-2 ^ 2"), 4.0);
        assert_eq!(number("50%"), 0.5);
        assert_eq!(number("10 / 4"), 2.5);
        assert_eq!(number("\"3\" * 2"), 6.0);
    }

    #[test]
    fn references_and_variables() {
        assert_eq!(number("A1 + A2 + A3"), 6.0);
        assert_eq!(number("Other!A1 * Rate"), 50.0);
        assert_eq!(number("Unknown + Z99"), 0.0);
    }

    #[test]
    fn unqualified_reference_needs_a_sheet() {
        let position = Position::unqualified(1, 1);
        let expr = parse("A1").unwrap();
        assert!(matches!(
            Interpreter::new(&position, &Grid).evaluate(&expr),
            Err(EvalError::Other(_))
        ));

        let expr = parse("Other!A1").unwrap();
        assert_eq!(
            Interpreter::new(&position, &Grid).evaluate(&expr),
            Ok(Value::Number(100.0))
        );
    }

    #[test]
    fn ranges_become_arrays() {
        assert_eq!(
            eval("A2:B1").unwrap(),
            Value::Array(vec![
                vec![Value::Number(1.0), Value::from("label")],
                vec![Value::Number(2.0), Value::ZERO],
            ])
        );
        // A single-cell range collapses in scalar context.
        assert_eq!(number("A3:A3 * 2"), 6.0);
    }

    #[test]
    fn comparison_and_concat() {
        assert_eq!(eval("A2 > A1"), Ok(Value::Boolean(true)));
        assert_eq!(eval("\"abc\" = \"ABC\""), Ok(Value::Boolean(true)));
        assert_eq!(eval("1 < \"a\""), Ok(Value::Boolean(true)));
        assert_eq!(eval("B1 & \"-\" & A3"), Ok(Value::from("label-3")));
        assert_eq!(eval("TRUE & 1.5"), Ok(Value::from("TRUE1.5")));
    }

    #[test]
    fn errors() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(
            eval("B1 + 1"),
            Err(EvalError::Type {
                expected: "number",
                found: "text"
            })
        );
        assert_eq!(
            eval("A1:A3 + 1"),
            Err(EvalError::Type {
                expected: "single value",
                found: "array"
            })
        );
        assert_eq!(eval("NOPE(1)"), Err(EvalError::UnknownFunction("NOPE".into())));
        assert!(matches!(eval("0 ^ -1"), Err(EvalError::Other(_))));
        assert!(matches!(eval("1 +"), Err(EvalError::Parse { .. })));
    }
}
