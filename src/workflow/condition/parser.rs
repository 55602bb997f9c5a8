// SPDX-License-Identifier: MIT

//! Recursive-descent parser for translated condition expressions
//!
//! Parses expressions like:
//! - `doc.status === "Open"`
//! - `doc.grand_total > 1000 && !doc.is_return`
//! - `int(doc.qty) >= 5 || (doc.priority === "High")`

use super::ast::{Coercion, CompareOp, Expression, Literal, Operand};
use super::lexer::{tokenize, Spanned, Token};
use crate::error::ConditionError;

/// Limit on `!` and parenthesis nesting so hostile input cannot exhaust the stack
pub const MAX_DEPTH: usize = 64;

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ConditionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(ConditionError::UnexpectedToken {
            found: extra.token.describe(),
            offset: extra.offset,
            expected: "end of expression",
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|s| &s.token == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ConditionError> {
        match self.next() {
            Some(s) if s.token == token => Ok(()),
            Some(s) => Err(ConditionError::UnexpectedToken {
                found: s.token.describe(),
                offset: s.offset,
                expected,
            }),
            None => Err(ConditionError::UnexpectedEnd(expected)),
        }
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ConditionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    /// `a || b || c` parses flat, so chain length never adds tree depth
    fn parse_or(&mut self) -> Result<Expression, ConditionError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::OrOr) {
            terms.push(self.parse_and()?);
        }
        Ok(flatten(terms, Expression::Or))
    }

    fn parse_and(&mut self) -> Result<Expression, ConditionError> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::AndAnd) {
            terms.push(self.parse_unary()?);
        }
        Ok(flatten(terms, Expression::And))
    }

    fn parse_unary(&mut self) -> Result<Expression, ConditionError> {
        if self.eat(&Token::Bang) {
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ConditionError> {
        let left = self.parse_operand()?;

        let op = match self.peek().map(|s| &s.token) {
            Some(Token::StrictEq) => CompareOp::StrictEq,
            Some(Token::StrictNotEq) => CompareOp::StrictNotEq,
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::NotEq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Lte) => CompareOp::Lte,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Gte) => CompareOp::Gte,
            _ => return Ok(standalone(left)),
        };
        self.pos += 1;

        let right = self.parse_operand()?;
        Ok(Expression::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, ConditionError> {
        let Some(Spanned { token, offset }) = self.next() else {
            return Err(ConditionError::UnexpectedEnd("a value"));
        };

        match token {
            Token::Str(s) => Ok(Operand::Literal(Literal::String(s))),
            Token::Number(n) => Ok(Operand::Literal(Literal::Number(n))),
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                self.depth -= 1;
                Ok(Operand::Group(Box::new(inner)))
            }
            Token::Ident(name) => self.parse_identifier(name),
            other => Err(ConditionError::UnexpectedToken {
                found: other.describe(),
                offset,
                expected: "a value",
            }),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Operand, ConditionError> {
        match name.as_str() {
            "true" => return Ok(Operand::Literal(Literal::Boolean(true))),
            "false" => return Ok(Operand::Literal(Literal::Boolean(false))),
            "null" => return Ok(Operand::Literal(Literal::Null)),
            _ => {}
        }

        if self.eat(&Token::LParen) {
            let func = Coercion::from_name(&name).ok_or(ConditionError::UnknownFunction(name))?;
            self.descend()?;
            let arg = self.parse_operand()?;
            self.expect(Token::RParen, "')'")?;
            self.depth -= 1;
            return Ok(Operand::Call {
                func,
                arg: Box::new(arg),
            });
        }

        let mut path = vec![name];
        while self.eat(&Token::Dot) {
            match self.next() {
                Some(Spanned {
                    token: Token::Ident(segment),
                    ..
                }) => path.push(segment),
                Some(s) => {
                    return Err(ConditionError::UnexpectedToken {
                        found: s.token.describe(),
                        offset: s.offset,
                        expected: "a field name",
                    })
                }
                None => return Err(ConditionError::UnexpectedEnd("a field name")),
            }
        }
        Ok(Operand::Field(path))
    }
}

fn flatten(mut terms: Vec<Expression>, join: fn(Vec<Expression>) -> Expression) -> Expression {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

/// An operand with no comparison after it
fn standalone(operand: Operand) -> Expression {
    match operand {
        Operand::Group(inner) => *inner,
        Operand::Literal(Literal::Boolean(true)) => Expression::True,
        Operand::Literal(Literal::Boolean(false)) => Expression::False,
        other => Expression::Truthy(other),
    }
}
