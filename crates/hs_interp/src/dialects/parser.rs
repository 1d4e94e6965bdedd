//! Token-stream parser shared by the expression grammars of the
//! NovaSec, NetScript, and CppSharp front-ends. Recursive descent with
//! one level of precedence per function.

use hs_ast::ast::{BinOp, Expr, Literal, UnaryOp};
use hs_ast::diagnostic::Diagnostic;
use hs_ast::{Span, Spanned};
use hs_lexer::{Token, TokenKind};

pub(crate) struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ── Token helpers ───────────────────────────────────────────

    pub fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| Span::new(t.span.end, t.span.end))
                    .unwrap_or_else(Span::dummy)
            })
    }

    pub fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    pub fn at_ident(&self, name: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s == name)
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub fn advance(&mut self) -> Token {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::dummy()));
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn expect(&mut self, expected: &TokenKind) -> Result<Token, Diagnostic> {
        if self.at(expected) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    pub fn expect_ident(&mut self) -> Result<(String, Span), Diagnostic> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let tok = self.advance();
                Ok((name, tok.span))
            }
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(message, self.peek_span())
    }

    /// Reject lexer error tokens up front so parse errors point at the
    /// first bad character rather than a confusing token mismatch.
    pub fn check_lex_errors(&self) -> Result<(), Diagnostic> {
        for tok in &self.tokens {
            if let TokenKind::Error(msg) = &tok.kind {
                return Err(Diagnostic::error(msg.clone(), tok.span));
            }
        }
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────────

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        let mut lhs = self.parse_and_expr()?;
        while matches!(self.peek(), TokenKind::PipePipe) || self.at_ident("or") {
            self.advance();
            let rhs = self.parse_and_expr()?;
            lhs = self.bin(start, BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        let mut lhs = self.parse_cmp_expr()?;
        while matches!(self.peek(), TokenKind::AmpAmp) || self.at_ident("and") {
            self.advance();
            let rhs = self.parse_cmp_expr()?;
            lhs = self.bin(start, BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cmp_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        let lhs = self.parse_add_expr()?;
        let op = match self.peek() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::LtEq => Some(BinOp::LtEq),
            TokenKind::GtEq => Some(BinOp::GtEq),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Gt => Some(BinOp::Gt),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_add_expr()?;
            Ok(self.bin(start, op, lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_add_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        let mut lhs = self.parse_mul_expr()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul_expr()?;
            lhs = self.bin(start, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_mul_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary_expr()?;
            lhs = self.bin(start, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let start = self.peek_span().start;
        match self.peek() {
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                let span = Span::new(start, operand.span.end);
                Ok(Spanned::new(
                    Expr::UnaryOp {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Ident(s) if s == "not" => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                let span = Span::new(start, operand.span.end);
                Ok(Spanned::new(
                    Expr::UnaryOp {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                let span = Span::new(start, operand.span.end);
                Ok(Spanned::new(
                    Expr::UnaryOp {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Spanned<Expr>, Diagnostic> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Int(n)), span))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Float(f)), span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Str(s)), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Bool(true)), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Bool(false)), span))
            }
            TokenKind::None => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::None), span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if matches!(self.peek(), TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    let end = self
                        .tokens
                        .get(self.pos.saturating_sub(1))
                        .map(|t| t.span.end)
                        .unwrap_or(span.end);
                    Ok(Spanned::new(
                        Expr::Call { name, args },
                        Span::new(span.start, end),
                    ))
                } else {
                    Ok(Spanned::new(Expr::Ident(name), span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(self.error(format!("expected expression, found {}", other.describe()))),
        }
    }

    /// `( expr, expr, ... )` — the opening paren is at the cursor.
    pub fn parse_call_args(&mut self) -> Result<Vec<Spanned<Expr>>, Diagnostic> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn bin(
        &self,
        start: usize,
        op: BinOp,
        lhs: Spanned<Expr>,
        rhs: Spanned<Expr>,
    ) -> Spanned<Expr> {
        let span = Span::new(start, rhs.span.end);
        Spanned::new(
            Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }
}

/// Shift all token spans by a base byte offset, so per-line or
/// per-block lexing still produces whole-source positions.
pub(crate) fn offset_spans(tokens: &mut [Token], base: usize) {
    for tok in tokens {
        if !tok.span.is_dummy() {
            tok.span.start += base;
            tok.span.end += base;
        }
    }
}
