//! Recursive-descent parser producing an [`Expr`] arena.
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, equality, relational,
//! additive, multiplicative, `**` (right associative), unary prefix, then
//! postfix member/index/call chains.

use super::ast::{BinaryOp, Expr, Global, LogicalOp, MathFn, Node, NodeId, UnaryOp, METHODS};
use super::lexer::{tokenize, Token, TokenKind};
use super::MAX_DEPTH;
use crate::error::MappingError;

pub fn parse_tokens(src: &str) -> Result<Expr, MappingError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        expr: Expr::new(),
    };
    let root = parser.expression()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(error(trailing.offset, "unexpected trailing input"));
    }
    parser.expr.set_root(root);
    Ok(parser.expr)
}

fn error(offset: usize, message: impl Into<String>) -> MappingError {
    MappingError::ExpressionParse {
        offset,
        message: message.into(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
    expr: Expr,
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), MappingError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(error(self.peek().offset, format!("expected {}", what)))
        }
    }

    fn push(&mut self, node: Node, offset: usize) -> Result<NodeId, MappingError> {
        let (id, height) = self.expr.push(node);
        if height > MAX_DEPTH {
            return Err(error(
                offset,
                format!("expression nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(id)
    }

    /// Run `f` one recursion level deeper, refusing runaway nesting before
    /// the native stack is at risk.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, MappingError>,
    ) -> Result<T, MappingError> {
        if self.nesting >= MAX_DEPTH {
            return Err(error(
                self.peek().offset,
                format!("expression nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.nesting += 1;
        let out = f(self);
        self.nesting -= 1;
        out
    }

    // -----------------------------------------------------------------------
    // Grammar
    // -----------------------------------------------------------------------

    fn expression(&mut self) -> Result<NodeId, MappingError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<NodeId, MappingError> {
        let offset = self.peek().offset;
        let test = self.logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let then = self.expression()?;
        self.expect(&TokenKind::Colon, "`:` in conditional expression")?;
        let otherwise = self.expression()?;
        self.push(
            Node::Conditional {
                test,
                then,
                otherwise,
            },
            offset,
        )
    }

    fn logical_or(&mut self) -> Result<NodeId, MappingError> {
        let mut lhs = self.logical_and()?;
        while self.peek().kind == TokenKind::OrOr {
            let offset = self.advance().offset;
            let rhs = self.logical_and()?;
            lhs = self.push(
                Node::Logical {
                    op: LogicalOp::Or,
                    lhs,
                    rhs,
                },
                offset,
            )?;
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<NodeId, MappingError> {
        let mut lhs = self.equality()?;
        while self.peek().kind == TokenKind::AndAnd {
            let offset = self.advance().offset;
            let rhs = self.equality()?;
            lhs = self.push(
                Node::Logical {
                    op: LogicalOp::And,
                    lhs,
                    rhs,
                },
                offset,
            )?;
        }
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        ops: fn(&TokenKind) -> Option<BinaryOp>,
        next: fn(&mut Self) -> Result<NodeId, MappingError>,
    ) -> Result<NodeId, MappingError> {
        let mut lhs = next(self)?;
        while let Some(op) = ops(&self.peek().kind) {
            let offset = self.advance().offset;
            let rhs = next(self)?;
            lhs = self.push(Node::Binary { op, lhs, rhs }, offset)?;
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<NodeId, MappingError> {
        self.binary_level(
            |k| match k {
                TokenKind::EqEq => Some(BinaryOp::Eq),
                TokenKind::NotEq => Some(BinaryOp::NotEq),
                TokenKind::EqEqEq => Some(BinaryOp::StrictEq),
                TokenKind::NotEqEq => Some(BinaryOp::StrictNotEq),
                _ => None,
            },
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<NodeId, MappingError> {
        self.binary_level(
            |k| match k {
                TokenKind::Lt => Some(BinaryOp::Lt),
                TokenKind::LtEq => Some(BinaryOp::LtEq),
                TokenKind::Gt => Some(BinaryOp::Gt),
                TokenKind::GtEq => Some(BinaryOp::GtEq),
                _ => None,
            },
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<NodeId, MappingError> {
        self.binary_level(
            |k| match k {
                TokenKind::Plus => Some(BinaryOp::Add),
                TokenKind::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<NodeId, MappingError> {
        self.binary_level(
            |k| match k {
                TokenKind::Star => Some(BinaryOp::Mul),
                TokenKind::Slash => Some(BinaryOp::Div),
                TokenKind::Percent => Some(BinaryOp::Rem),
                _ => None,
            },
            Self::exponent,
        )
    }

    fn exponent(&mut self) -> Result<NodeId, MappingError> {
        let lhs = self.unary()?;
        if self.peek().kind != TokenKind::StarStar {
            return Ok(lhs);
        }
        let offset = self.advance().offset;
        let rhs = self.nested(Self::exponent)?;
        self.push(
            Node::Binary {
                op: BinaryOp::Pow,
                lhs,
                rhs,
            },
            offset,
        )
    }

    fn unary(&mut self) -> Result<NodeId, MappingError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.postfix(),
        };
        let offset = self.advance().offset;
        let operand = self.nested(Self::unary)?;
        self.push(Node::Unary { op, operand }, offset)
    }

    fn postfix(&mut self) -> Result<NodeId, MappingError> {
        let mut node = self.primary()?;
        loop {
            let offset = self.peek().offset;
            if self.eat(&TokenKind::Dot) {
                let name = self.identifier("property name after `.`")?;
                if self.peek().kind == TokenKind::LParen {
                    if !METHODS.contains(&name.as_str()) {
                        return Err(error(offset, format!("method `{}` is not allowed", name)));
                    }
                    let args = self.arguments()?;
                    node = self.push(
                        Node::MethodCall {
                            receiver: node,
                            method: name,
                            args,
                        },
                        offset,
                    )?;
                } else {
                    node = self.push(
                        Node::Member {
                            object: node,
                            property: name,
                        },
                        offset,
                    )?;
                }
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(&TokenKind::RBracket, "`]`")?;
                node = self.push(Node::Index { object: node, index }, offset)?;
            } else if self.peek().kind == TokenKind::LParen {
                return Err(error(offset, "only whitelisted functions may be called"));
            } else {
                return Ok(node);
            }
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, MappingError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(error(tok.offset, format!("expected {}", what))),
        }
    }

    /// `(` already peeked; parses a comma-separated argument list.
    fn arguments(&mut self) -> Result<Vec<NodeId>, MappingError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            self.expect(&TokenKind::Comma, "`,` or `)`")?;
        }
    }

    fn primary(&mut self) -> Result<NodeId, MappingError> {
        let tok = self.advance();
        let offset = tok.offset;
        match tok.kind {
            TokenKind::Number(n) => self.push(Node::Number(n), offset),
            TokenKind::Str(s) => self.push(Node::Str(s), offset),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&TokenKind::RBracket) {
                            break;
                        }
                        self.expect(&TokenKind::Comma, "`,` or `]`")?;
                    }
                }
                self.push(Node::Array(items), offset)
            }
            TokenKind::Ident(name) => self.identifier_expr(&name, offset),
            TokenKind::Eof => Err(error(offset, "unexpected end of expression")),
            other => Err(error(offset, format!("unexpected token {:?}", other))),
        }
    }

    fn identifier_expr(&mut self, name: &str, offset: usize) -> Result<NodeId, MappingError> {
        let node = match name {
            "value" => Node::Input,
            "true" => Node::Bool(true),
            "false" => Node::Bool(false),
            "null" => Node::Null,
            "undefined" => Node::Undefined,
            "NaN" => Node::Number(f64::NAN),
            "Infinity" => Node::Number(f64::INFINITY),
            "Math" => {
                self.expect(&TokenKind::Dot, "`.` after `Math`")?;
                let fname = self.identifier("function name after `Math.`")?;
                let function = MathFn::from_name(&fname)
                    .ok_or_else(|| error(offset, format!("`Math.{}` is not allowed", fname)))?;
                if self.peek().kind != TokenKind::LParen {
                    return Err(error(offset, format!("`Math.{}` must be called", fname)));
                }
                let args = self.arguments()?;
                Node::MathCall { function, args }
            }
            other => match Global::from_name(other) {
                Some(function) => {
                    if self.peek().kind != TokenKind::LParen {
                        return Err(error(offset, format!("`{}` must be called", other)));
                    }
                    let args = self.arguments()?;
                    Node::GlobalCall { function, args }
                }
                None => {
                    return Err(error(offset, format!("unknown identifier `{}`", other)));
                }
            },
        };
        self.push(node, offset)
    }
}
