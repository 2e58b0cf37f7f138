use super::eval::Value;
use super::functions::{FunctionSpec, FunctionTable};
use super::lexer::{tokenize, Spanned, Token};
use crate::error::{DumpError, Result};
use regex::Regex;
use std::borrow::Cow;

/// Per-task attribute an expression can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Id,
    Dups,
    Duration,
    Lines,
    State,
    Trace,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Id,
        Attribute::Dups,
        Attribute::Duration,
        Attribute::Lines,
        Attribute::State,
        Attribute::Trace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Id => "id",
            Attribute::Dups => "dups",
            Attribute::Duration => "duration",
            Attribute::Lines => "lines",
            Attribute::State => "state",
            Attribute::Trace => "trace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Right-hand side of `=~` / `!~`
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal pattern compiled once with the expression
    Static(Regex),
    /// Pattern computed per task
    Dynamic(Box<Expr>),
}

/// Compiled expression tree
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value<'static>),
    Attribute(Attribute),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Match {
        negated: bool,
        subject: Box<Expr>,
        pattern: Pattern,
    },
    Call {
        function: FunctionSpec,
        args: Vec<Expr>,
    },
}

/// Deepest nesting of operators, parentheses and calls a predicate may use
pub const MAX_DEPTH: usize = 256;

/// Parse `source` into an expression tree, resolving names against `functions`
pub fn parse(source: &str, functions: &FunctionTable) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(DumpError::ExpressionSyntax("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
        functions,
    };
    let expr = parser.parse_or()?;

    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(parser.error(format!("unexpected {:?}", extra.token), extra.offset));
    }
    Ok(expr)
}

struct Parser<'t> {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
    functions: &'t FunctionTable,
}

impl Parser<'_> {
    fn error(&self, msg: impl Into<String>, offset: usize) -> DumpError {
        DumpError::ExpressionSyntax(format!("{} at offset {}", msg.into(), offset))
    }

    /// Enter one more level of the tree; fails past [`MAX_DEPTH`]
    fn descend(&mut self, offset: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(
                format!("expression nested too deeply (limit {})", MAX_DEPTH),
                offset,
            ));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(s) if s.token == expected => Ok(()),
            Some(s) => Err(self.error(
                format!("expected {:?}, found {:?}", expected, s.token),
                s.offset,
            )),
            None => Err(self.error(format!("expected {:?}", expected), self.end)),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.descend(self.offset())?;
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.descend(self.offset())?;
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_additive()?;

        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::Match) | Some(Token::NotMatch) => {
                let negated = self.peek() == Some(&Token::NotMatch);
                self.pos += 1;
                let pattern_offset = self.offset();
                let pattern = match self.parse_additive()? {
                    Expr::Literal(Value::Str(pattern)) => Pattern::Static(
                        Regex::new(&pattern).map_err(|e| {
                            self.error(format!("invalid pattern: {}", e), pattern_offset)
                        })?,
                    ),
                    other => Pattern::Dynamic(Box::new(other)),
                };
                return Ok(Expr::Match {
                    negated,
                    subject: Box::new(lhs),
                    pattern,
                });
            }
            _ => return Ok(lhs),
        };

        self.pos += 1;
        let rhs = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.descend(self.offset())?;
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.descend(self.offset())?;
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.descend(self.offset())?;
        self.pos += 1;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(Spanned { token, offset }) = self.next() else {
            return Err(self.error("unexpected end of expression", self.end));
        };

        match token {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(Cow::Owned(s)))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::LParen => {
                self.descend(offset)?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Token::Ident(name) if self.peek() == Some(&Token::LParen) => {
                self.descend(offset)?;
                self.pos += 1;
                let call = self.parse_call(&name, offset)?;
                self.depth -= 1;
                Ok(call)
            }
            Token::Ident(name) => Attribute::from_name(&name)
                .map(Expr::Attribute)
                .ok_or_else(|| self.error(format!("unknown identifier '{}'", name), offset)),
            other => Err(self.error(format!("unexpected {:?}", other), offset)),
        }
    }

    /// Parse call arguments after `name(`
    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Expr> {
        let spec = *self
            .functions
            .get(name)
            .ok_or_else(|| self.error(format!("unknown function '{}'", name), offset))?;

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.parse_or()?);
                match self.next() {
                    Some(Spanned {
                        token: Token::Comma,
                        ..
                    }) => continue,
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => break,
                    Some(s) => {
                        return Err(self.error(
                            format!("expected ',' or ')', found {:?}", s.token),
                            s.offset,
                        ))
                    }
                    None => return Err(self.error("unterminated argument list", self.end)),
                }
            }
        }

        if args.len() != spec.arity {
            return Err(DumpError::Arity {
                function: spec.name.to_string(),
                expected: spec.arity,
                actual: args.len(),
            });
        }

        Ok(Expr::Call {
            function: spec,
            args,
        })
    }
}
