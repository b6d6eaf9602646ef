//! Expression tree and recursive-descent parser.
//!
//! Precedence, lowest first:
//!
//! ```text
//! ternary      a ? b : c
//! nullish      a ?? b
//! or           a || b
//! and          a && b
//! equality     == != === !==
//! comparison   < > <= >=
//! additive     + -
//! multiplicative * / %
//! unary        ! -
//! postfix      a.b  a[b]  a(b, c)
//! primary      literal, identifier, (expr), [a, b]
//! ```
//!
//! Nesting is capped at [`MAX_DEPTH`] so hostile input cannot exhaust the
//! stack, either here or in the evaluator. Operator chains count too: every
//! operator folded into a left-deep tree is one more level.

use serde_json::Value;

use super::lexer::{Lexeme, Tok};
use super::value::number;
use crate::ExprError;

pub(crate) const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Ident(String),
    Member { object: Box<Expr>, property: String },
    Index { object: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Logical { op: LogicalOp, left: Box<Expr>, right: Box<Expr> },
    Conditional { test: Box<Expr>, consequent: Box<Expr>, alternate: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl Expr {
    /// Dotted name for identifier/member chains (`Math.round`), if that is all
    /// this expression is.
    pub(crate) fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Member { object, property } => Some(format!("{}.{}", object.dotted_name()?, property)),
            _ => None,
        }
    }
}

/// Parse a full token stream. `end` is the source length, used as the offset
/// for "unexpected end" errors.
pub(crate) fn parse(tokens: &[Lexeme], end: usize) -> Result<Expr, ExprError> {
    let mut parser = Parser { tokens, pos: 0, depth: 0, end };
    let expr = parser.expression()?;
    match parser.tokens.get(parser.pos) {
        Some(extra) => Err(ExprError::syntax(extra.offset, "unexpected trailing input")),
        None => Ok(expr),
    }
}

struct Parser<'t> {
    tokens: &'t [Lexeme],
    pos: usize,
    depth: usize,
    end: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Tok> {
        self.tokens.get(self.pos).map(|l| &l.tok)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |l| l.offset)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ExprError> {
        if self.eat(punct) { Ok(()) } else { Err(self.unexpected(&format!("expected '{punct}'"))) }
    }

    fn unexpected(&self, what: &str) -> ExprError {
        match self.peek() {
            Some(tok) => ExprError::syntax(self.offset(), format!("{what}, found {}", describe(tok))),
            None => ExprError::syntax(self.offset(), format!("{what}, found end of expression")),
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ExprError>) -> Result<T, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Account for one more node folded onto a left-deep chain. The caller
    /// restores `depth` once the chain is complete.
    fn deeper(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.nested(Self::ternary)
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let test = self.nullish()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(":")?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional { test: Box::new(test), consequent: Box::new(consequent), alternate: Box::new(alternate) })
    }

    fn nullish(&mut self) -> Result<Expr, ExprError> {
        self.logical(LogicalOp::Nullish, "??", Self::or)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.logical(LogicalOp::Or, "||", Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.logical(LogicalOp::And, "&&", Self::equality)
    }

    fn logical(
        &mut self,
        op: LogicalOp,
        punct: &str,
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let base_depth = self.depth;
        let mut left = operand(self)?;
        while self.eat(punct) {
            self.deeper()?;
            let right = operand(self)?;
            left = Expr::Logical { op, left: Box::new(left), right: Box::new(right) };
        }
        self.depth = base_depth;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[("===", BinaryOp::StrictEq), ("!==", BinaryOp::StrictNotEq), ("==", BinaryOp::Eq), ("!=", BinaryOp::NotEq)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[("<=", BinaryOp::LtEq), (">=", BinaryOp::GtEq), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary(&[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)], Self::unary)
    }

    fn binary(
        &mut self,
        ops: &[(&str, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let base_depth = self.depth;
        let mut left = operand(self)?;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(punct) {
                    self.deeper()?;
                    let right = operand(self)?;
                    left = Expr::Binary { op: *op, left: Box::new(left), right: Box::new(right) };
                    continue 'outer;
                }
            }
            self.depth = base_depth;
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else {
            return self.postfix();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        let base_depth = self.depth;

        loop {
            if self.eat(".") {
                let Some(Tok::Ident(name)) = self.peek() else {
                    return Err(self.unexpected("expected a property name"));
                };
                self.pos += 1;
                let property = name.clone();
                expr = Expr::Member { object: Box::new(expr), property };
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index) };
            } else if self.eat("(") {
                let args = self.arguments()?;
                expr = Expr::Call { callee: Box::new(expr), args };
            } else {
                break;
            }

            // Each postfix step is one more level for the evaluator.
            self.deeper()?;
        }

        self.depth = base_depth;
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(",") {
                continue;
            }
            self.expect(")")?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("expected a value"));
        };

        let expr = match tok {
            Tok::Number(n) => Expr::Literal(number(*n)),
            Tok::Str(s) => Expr::Literal(Value::String(s.clone())),
            Tok::Ident(name) => match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name.clone()),
            },
            Tok::Punct("(") => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(")")?;
                return Ok(inner);
            }
            Tok::Punct("[") => {
                self.pos += 1;
                let mut items = Vec::new();
                if !self.eat("]") {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(",") {
                            continue;
                        }
                        self.expect("]")?;
                        break;
                    }
                }
                return Ok(Expr::Array(items));
            }
            Tok::Punct(_) => return Err(self.unexpected("expected a value")),
        };

        self.pos += 1;
        Ok(expr)
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Number(n) => format!("number {n}"),
        Tok::Str(s) => format!("string '{s}'"),
        Tok::Ident(name) => format!("'{name}'"),
        Tok::Punct(p) => format!("'{p}'"),
    }
}
