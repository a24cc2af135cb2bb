//! Recursive-descent parser for filter expressions
//!
//! Grammar:
//!
//! ```text
//! expr       := or
//! or         := and (("||" | OR) and)*
//! and        := unary (("&&" | AND) unary)*
//! unary      := ("!" | NOT) unary | primary
//! primary    := "(" expr ")" | comparison
//! comparison := field relop literal | literal relop field
//! literal    := int | float | string | true | false
//! ```
//!
//! Both the parser's recursion and the depth of the resulting tree are
//! bounded by `MAX_DEPTH`; anything deeper is a compile error.

use std::fmt;

use super::errors::{CompileError, CompileResult};
use super::lexer::{Spanned, Token};
use super::relop::RelOp;

/// Deepest expression tree, and deepest `!`/parenthesis nesting, accepted
pub const MAX_DEPTH: usize = 256;

/// Literal operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "integer {}", v),
            Literal::Float(v) => write!(f, "float {}", v),
            Literal::Str(s) => write!(f, "string {:?}", s),
            Literal::Bool(b) => write!(f, "bool {}", b),
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `field op literal`, normalized so the field is on the left
    Compare {
        field: String,
        op: RelOp,
        literal: Literal,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// Parses a token stream into an expression tree.
pub fn parse(tokens: &[Spanned]) -> CompileResult<Expr> {
    if tokens.is_empty() {
        return Err(CompileError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, _) = parser.parse_or()?;

    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(CompileError::UnexpectedToken {
            expected: "end of expression",
            found: spanned.token.to_string(),
            position: spanned.position,
        }),
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    /// Open `!` and parenthesis levels at the current position
    nesting: usize,
}

/// Parsed subtree and its depth
type Parsed = (Expr, usize);

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &'static str) -> CompileResult<&'a Spanned> {
        let spanned = self
            .tokens
            .get(self.pos)
            .ok_or(CompileError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> CompileResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(CompileError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn parse_or(&mut self) -> CompileResult<Parsed> {
        let (mut left, mut depth) = self.parse_and()?;
        while self.eat(&Token::Or) {
            let (right, right_depth) = self.parse_and()?;
            depth = deeper(depth.max(right_depth))?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok((left, depth))
    }

    fn parse_and(&mut self) -> CompileResult<Parsed> {
        let (mut left, mut depth) = self.parse_unary()?;
        while self.eat(&Token::And) {
            let (right, right_depth) = self.parse_unary()?;
            depth = deeper(depth.max(right_depth))?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok((left, depth))
    }

    fn parse_unary(&mut self) -> CompileResult<Parsed> {
        if self.eat(&Token::Not) {
            self.enter()?;
            let (inner, depth) = self.parse_unary()?;
            self.leave();
            return Ok((Expr::Not(Box::new(inner)), deeper(depth)?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> CompileResult<Parsed> {
        if self.eat(&Token::LParen) {
            self.enter()?;
            let inner = self.parse_or()?;
            self.leave();
            let close = self.next("')'")?;
            if close.token != Token::RParen {
                return Err(unexpected("')'", close));
            }
            return Ok(inner);
        }
        Ok((self.parse_comparison()?, 1))
    }

    fn parse_comparison(&mut self) -> CompileResult<Expr> {
        let left = self.next("field or literal")?;
        let op = match &self.next("comparison operator")?.token {
            Token::Op(op) => *op,
            _ => return Err(unexpected("comparison operator", &self.tokens[self.pos - 1])),
        };
        let right = self.next("field or literal")?;

        match (&left.token, as_literal(&right.token)) {
            (Token::Ident(field), Some(literal)) => Ok(Expr::Compare {
                field: field.clone(),
                op,
                literal,
            }),
            (Token::Ident(_), None) => Err(unexpected("literal", right)),
            (other, _) => match (as_literal(other), &right.token) {
                (Some(literal), Token::Ident(field)) => Ok(Expr::Compare {
                    field: field.clone(),
                    op: op.flip(),
                    literal,
                }),
                (Some(_), _) => Err(unexpected("field", right)),
                (None, _) => Err(unexpected("field or literal", left)),
            },
        }
    }
}

/// Depth of a node over a subtree of `depth`
fn deeper(depth: usize) -> CompileResult<usize> {
    if depth >= MAX_DEPTH {
        return Err(CompileError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}

fn as_literal(token: &Token) -> Option<Literal> {
    match token {
        Token::Int(v) => Some(Literal::Int(*v)),
        Token::Float(v) => Some(Literal::Float(*v)),
        Token::Str(s) => Some(Literal::Str(s.clone())),
        Token::Bool(b) => Some(Literal::Bool(*b)),
        _ => None,
    }
}

fn unexpected(expected: &'static str, found: &Spanned) -> CompileError {
    CompileError::UnexpectedToken {
        expected,
        found: found.token.to_string(),
        position: found.position,
    }
}
