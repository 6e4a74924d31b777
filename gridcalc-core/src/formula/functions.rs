//! Built-in Functions

use crate::error::EvalError;
use crate::workbook::Value;

use super::eval::{finite, to_bool, to_number, to_text, Interpreter};
use super::parser::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sum,
    Min,
    Max,
    Average,
    Count,
    Abs,
    Round,
    If,
    IfError,
    And,
    Or,
    Not,
    Concat,
}

impl Function {
    /// Look up a function by its uppercase name.
    /// This is the single source of truth for supported functions.
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "SUM" => Self::Sum,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "AVERAGE" => Self::Average,
            "COUNT" => Self::Count,
            "ABS" => Self::Abs,
            "ROUND" => Self::Round,
            "IF" => Self::If,
            "IFERROR" => Self::IfError,
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "CONCAT" => Self::Concat,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Average => "AVERAGE",
            Self::Count => "COUNT",
            Self::Abs => "ABS",
            Self::Round => "ROUND",
            Self::If => "IF",
            Self::IfError => "IFERROR",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Concat => "CONCAT",
        }
    }

    /// Accepted argument counts as `(min, max, description)`.
    fn arity(self) -> (usize, usize, &'static str) {
        match self {
            Self::Sum | Self::Min | Self::Max | Self::Average | Self::Count => {
                (1, usize::MAX, "at least 1")
            }
            Self::And | Self::Or | Self::Concat => (1, usize::MAX, "at least 1"),
            Self::Abs | Self::Not => (1, 1, "1"),
            Self::Round => (1, 2, "1 or 2"),
            Self::If => (2, 3, "2 or 3"),
            Self::IfError => (2, 2, "2"),
        }
    }
}

/// Evaluate a call to `function`. Arguments are evaluated lazily so IF and
/// IFERROR only touch the branch they pick.
pub(super) fn call(
    interp: &Interpreter<'_>,
    function: Function,
    args: &[Expr],
) -> Result<Value, EvalError> {
    let (min, max, expected) = function.arity();
    if args.len() < min || args.len() > max {
        return Err(EvalError::Arity {
            name: function.name(),
            expected,
            got: args.len(),
        });
    }

    match function {
        Function::Sum => Ok(Value::Number(numbers(interp, args)?.iter().sum())),
        Function::Min => Ok(Value::Number(
            numbers(interp, args)?.into_iter().reduce(f64::min).unwrap_or(0.0),
        )),
        Function::Max => Ok(Value::Number(
            numbers(interp, args)?.into_iter().reduce(f64::max).unwrap_or(0.0),
        )),
        Function::Average => {
            let values = numbers(interp, args)?;
            if values.is_empty() {
                return Err(EvalError::DivisionByZero);
            }
            finite(values.iter().sum::<f64>() / values.len() as f64)
        }
        Function::Count => {
            let mut count = 0usize;
            for arg in args {
                match interp.evaluate(arg)? {
                    Value::Array(rows) => {
                        count += rows.iter().flatten().filter(|v| matches!(v, Value::Number(_))).count();
                    }
                    value if is_reference(arg) => count += usize::from(matches!(value, Value::Number(_))),
                    value => count += usize::from(value.as_number().is_some()),
                }
            }
            Ok(Value::Number(count as f64))
        }
        Function::Abs => Ok(Value::Number(to_number(&interp.evaluate(&args[0])?)?.abs())),
        Function::Round => {
            let n = to_number(&interp.evaluate(&args[0])?)?;
            let digits = match args.get(1) {
                Some(arg) => to_number(&interp.evaluate(arg)?)?.trunc(),
                None => 0.0,
            };
            if digits >= 0.0 {
                let factor = 10f64.powf(digits);
                finite((n * factor).round() / factor)
            } else {
                let factor = 10f64.powf(-digits);
                finite((n / factor).round() * factor)
            }
        }
        Function::If => {
            if to_bool(&interp.evaluate(&args[0])?)? {
                interp.evaluate(&args[1])
            } else {
                match args.get(2) {
                    Some(otherwise) => interp.evaluate(otherwise),
                    None => Ok(Value::Boolean(false)),
                }
            }
        }
        Function::IfError => match interp.evaluate(&args[0]) {
            Ok(value) => Ok(value),
            Err(_) => interp.evaluate(&args[1]),
        },
        Function::And => Ok(Value::Boolean(booleans(interp, args)?.into_iter().all(|b| b))),
        Function::Or => Ok(Value::Boolean(booleans(interp, args)?.into_iter().any(|b| b))),
        Function::Not => Ok(Value::Boolean(!to_bool(&interp.evaluate(&args[0])?)?)),
        Function::Concat => {
            let mut text = String::new();
            for arg in args {
                match interp.evaluate(arg)? {
                    Value::Array(rows) => {
                        for value in rows.iter().flatten() {
                            text.push_str(&to_text(value)?);
                        }
                    }
                    value => text.push_str(&to_text(&value)?),
                }
            }
            Ok(Value::Text(text))
        }
    }
}

/// References skip non-numeric values; literals must convert.
fn is_reference(arg: &Expr) -> bool {
    matches!(arg, Expr::Cell(_) | Expr::Range(_) | Expr::Name(_))
}

/// Numeric arguments of an aggregate, with ranges flattened row by row.
fn numbers(interp: &Interpreter<'_>, args: &[Expr]) -> Result<Vec<f64>, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        match interp.evaluate(arg)? {
            Value::Array(rows) => out.extend(rows.iter().flatten().filter_map(|v| match v {
                Value::Number(n) => Some(*n),
                _ => None,
            })),
            Value::Number(n) => out.push(n),
            _ if is_reference(arg) => {}
            value => out.push(to_number(&value)?),
        }
    }
    Ok(out)
}

/// Logical arguments of AND/OR. Text inside ranges is ignored.
fn booleans(interp: &Interpreter<'_>, args: &[Expr]) -> Result<Vec<bool>, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        match interp.evaluate(arg)? {
            Value::Array(rows) => {
                for value in rows.iter().flatten() {
                    if !matches!(value, Value::Text(_)) {
                        out.push(to_bool(value)?);
                    }
                }
            }
            value => out.push(to_bool(&value)?),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use crate::interface::{GridPoint, Position, ValueResolver};

    /// `Sheet1!A1:A4` holds 1, 2, "x", TRUE; everything else is empty.
    struct Column;

    impl ValueResolver for Column {
        fn cell(&self, sheet: &str, row: u32, col: u32) -> Value {
            match (sheet, row, col) {
                ("Sheet1", 1, 1) => Value::Number(1.0),
                ("Sheet1", 2, 1) => Value::Number(2.0),
                ("Sheet1", 3, 1) => Value::from("x"),
                ("Sheet1", 4, 1) => Value::Boolean(true),
                _ => Value::ZERO,
            }
        }

        fn range(&self, sheet: &str, from: GridPoint, to: GridPoint) -> Vec<Vec<Value>> {
            (from.row..=to.row)
                .map(|row| (from.col..=to.col).map(|col| self.cell(sheet, row, col)).collect())
                .collect()
        }

        fn variable(&self, _name: &str) -> Value {
            Value::ZERO
        }
    }

    fn eval(formula: &str) -> Result<Value, EvalError> {
        let position = Position::default();
        let expr = parse(formula)?;
        Interpreter::new(&position, &Column).evaluate(&expr)
    }

    #[test]
    fn lookup_matches_names() {
        for name in ["SUM", "IFERROR", "CONCAT"] {
            assert_eq!(Function::lookup(name).map(Function::name), Some(name));
        }
        assert_eq!(Function::lookup("sum"), None);
    }

    #[test]
    fn aggregates_skip_text_in_ranges() {
        assert_eq!(eval("SUM(A1:A4)"), Ok(Value::Number(3.0)));
        assert_eq!(eval("SUM(A1:A4, 10, \"5\")"), Ok(Value::Number(18.0)));
        assert_eq!(eval("MIN(A1:A4, -1)"), Ok(Value::Number(-1.0)));
        assert_eq!(eval("MAX(A1:A2, A3)"), Ok(Value::Number(2.0)));
        assert_eq!(eval("AVERAGE(A1:A4)"), Ok(Value::Number(1.5)));
        assert_eq!(eval("COUNT(A1:A4, 7, \"8\", \"y\")"), Ok(Value::Number(4.0)));
    }

    #[test]
    fn aggregates_reject_text_literals() {
        assert!(matches!(eval("SUM(1, \"abc\")"), Err(EvalError::Type { .. })));
    }

    #[test]
    fn empty_aggregates() {
        assert_eq!(eval("MAX(A3)"), Ok(Value::Number(0.0)));
        assert_eq!(eval("AVERAGE(A3)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn math() {
        assert_eq!(eval("ABS(-4)"), Ok(Value::Number(4.0)));
        assert_eq!(eval("ROUND(2.5)"), Ok(Value::Number(3.0)));
        assert_eq!(eval("ROUND(-2.5)"), Ok(Value::Number(-3.0)));
        assert_eq!(eval("ROUND(1234.5678, -2)"), Ok(Value::Number(1200.0)));
    }

    #[test]
    fn logic() {
        assert_eq!(eval("IF(A1 > 0, \"pos\", \"neg\")"), Ok(Value::from("pos")));
        assert_eq!(eval("IF(A1 > 5, 1)"), Ok(Value::Boolean(false)));
        // The untaken branch is never evaluated.
        assert_eq!(eval("IF(TRUE, 1, 1/0)"), Ok(Value::Number(1.0)));
        assert_eq!(eval("IFERROR(1/0, -1)"), Ok(Value::Number(-1.0)));
        assert_eq!(eval("IFERROR(NOPE(), 0)"), Ok(Value::Number(0.0)));
        assert_eq!(eval("AND(A1:A4)"), Ok(Value::Boolean(true)));
        assert_eq!(eval("AND(1, 0)"), Ok(Value::Boolean(false)));
        assert_eq!(eval("OR(0, \"true\")"), Ok(Value::Boolean(true)));
        assert_eq!(eval("NOT(A1)"), Ok(Value::Boolean(false)));
    }

    #[test]
    fn concat_flattens_ranges() {
        assert_eq!(eval("CONCAT(A1:A4, \"!\")"), Ok(Value::from("12xTRUE!")));
    }

    #[test]
    fn arity_errors() {
        assert_eq!(
            eval("ABS(1, 2)"),
            Err(EvalError::Arity {
                name: "ABS",
                expected: "1",
                got: 2
            })
        );
        assert_eq!(
            eval("SUM()"),
            Err(EvalError::Arity {
                name: "SUM",
                expected: "at least 1",
                got: 0
            })
        );
        assert!(matches!(eval("IF(TRUE)"), Err(EvalError::Arity { name: "IF", .. })));
    }
}
