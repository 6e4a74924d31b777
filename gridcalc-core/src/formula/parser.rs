//! Formula Parser
//!
//! Recursive descent from tokens to an [`Expr`] tree. Precedence, lowest
//! first: comparison, `&`, `+ -`, `* /`, `^` (right-associative), unary
//! `+ -`, postfix `%`, primary.
//!
//! Tree height is capped at [`MAX_DEPTH`]. Every nested parenthesis, call,
//! unary operator, exponent and chained binary operator counts toward it, so
//! the interpreter and the reference walk never recurse deeper than that.

use crate::address::address_to_row_col;
use crate::error::ExtractError;
use crate::interface::{CellRef, GridPoint, RangeRef};

use super::lexer::{tokenize, Token, TokenKind};

/// Deepest expression tree a formula may produce.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    Cell(CellRef),
    Range(RangeRef),
    /// A bare identifier, resolved as a workbook variable
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function call; `name` is uppercase
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Parse formula text (without the leading `=`) into an expression tree.
pub fn parse(formula: &str) -> Result<Expr, ExtractError> {
    let tokens = tokenize(formula)?;
    if tokens.is_empty() {
        return Err(ExtractError::Parse {
            offset: 0,
            message: "empty formula".into(),
        });
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: formula.len(),
        depth: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error_at(token.offset, "unexpected token after expression")),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Offset reported for errors at end of input.
    end: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ExtractError {
        ExtractError::Parse {
            offset,
            message: message.into(),
        }
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.offset)
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ExtractError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error_at(self.current_offset(), format!("expected {what}"))),
        }
    }

    /// Take one level of the depth budget. Callers release it by resetting
    /// `depth`; on error the parse is abandoned anyway.
    fn enter(&mut self) -> Result<(), ExtractError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error_at(self.current_offset(), "formula nested too deeply"));
        }
        Ok(())
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ExtractError> {
        let depth = self.depth;
        let mut left = self.concat()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::LtEq) => BinaryOp::LtEq,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.concat()?;
            left = Self::binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, ExtractError> {
        let depth = self.depth;
        let mut left = self.additive()?;
        while let Some(TokenKind::Ampersand) = self.peek_kind() {
            self.pos += 1;
            self.enter()?;
            let right = self.additive()?;
            left = Self::binary(BinaryOp::Concat, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ExtractError> {
        let depth = self.depth;
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.multiplicative()?;
            left = Self::binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExtractError> {
        let depth = self.depth;
        let mut left = self.power()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.power()?;
            left = Self::binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn power(&mut self) -> Result<Expr, ExtractError> {
        let base = self.unary()?;
        if let Some(TokenKind::Caret) = self.peek_kind() {
            self.pos += 1;
            self.enter()?;
            let exponent = self.power()?;
            self.depth -= 1;
            return Ok(Self::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, ExtractError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Plus,
            _ => return self.percent(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // Percent postfix desugars to * 0.01
    fn percent(&mut self) -> Result<Expr, ExtractError> {
        let depth = self.depth;
        let mut expr = self.primary()?;
        while let Some(TokenKind::Percent) = self.peek_kind() {
            self.pos += 1;
            self.enter()?;
            expr = Self::binary(BinaryOp::Mul, expr, Expr::Number(0.01));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExtractError> {
        let offset = self.current_offset();
        let Some(token) = self.advance() else {
            return Err(self.error_at(offset, "unexpected end of formula"));
        };

        match &token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Text(s) => Ok(Expr::Text(s.clone())),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.comparison()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::SheetPrefix(sheet) => {
                let offset = self.current_offset();
                match self.advance().map(|t| &t.kind) {
                    Some(TokenKind::Ident(ident)) => match cell_point(ident) {
                        Some(point) => self.reference(Some(sheet.clone()), point),
                        None => Err(self.error_at(offset, format!("`{ident}` is not a cell reference"))),
                    },
                    _ => Err(self.error_at(offset, "sheet name must be followed by a cell reference")),
                }
            }
            TokenKind::Ident(ident) => {
                if let Some(TokenKind::LParen) = self.peek_kind() {
                    self.pos += 1;
                    let args = self.arguments()?;
                    return Ok(Expr::Call {
                        name: ident.to_ascii_uppercase(),
                        args,
                    });
                }
                if ident.eq_ignore_ascii_case("TRUE") {
                    return Ok(Expr::Boolean(true));
                }
                if ident.eq_ignore_ascii_case("FALSE") {
                    return Ok(Expr::Boolean(false));
                }
                match cell_point(ident) {
                    Some(point) => self.reference(None, point),
                    None => Ok(Expr::Name(ident.clone())),
                }
            }
            _ => Err(self.error_at(token.offset, "unexpected token")),
        }
    }

    /// A cell reference, or a range if a `:` and a second corner follow.
    fn reference(&mut self, sheet: Option<String>, from: GridPoint) -> Result<Expr, ExtractError> {
        if let Some(TokenKind::Colon) = self.peek_kind() {
            self.pos += 1;
            let offset = self.current_offset();
            let to = match self.advance().map(|t| &t.kind) {
                Some(TokenKind::Ident(ident)) => cell_point(ident),
                _ => None,
            };
            return match to {
                Some(to) => Ok(Expr::Range(RangeRef { sheet, from, to })),
                None => Err(self.error_at(offset, "expected a cell reference after `:`")),
            };
        }
        Ok(Expr::Cell(CellRef {
            sheet,
            row: from.row,
            col: from.col,
        }))
    }

    /// Comma-separated arguments up to the closing `)`. The `(` is consumed.
    fn arguments(&mut self) -> Result<Vec<Expr>, ExtractError> {
        let mut args = Vec::new();
        if let Some(TokenKind::RParen) = self.peek_kind() {
            self.pos += 1;
            return Ok(args);
        }
        self.enter()?;
        loop {
            args.push(self.comparison()?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    self.depth -= 1;
                    return Ok(args);
                }
                _ => return Err(self.error_at(self.current_offset(), "expected `,` or `)`")),
            }
        }
    }
}

fn cell_point(ident: &str) -> Option<GridPoint> {
    address_to_row_col(ident)
        .ok()
        .map(|(row, col)| GridPoint::new(row, col))
}
