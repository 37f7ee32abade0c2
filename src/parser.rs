//! A recursive descent parser from [`Token`] sequences to [`Expr`] trees.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    ast::{Expr, Field, Name, Param, TyAst},
    literal::{
        IntLiteralOverflowError, StringLiteralError, parse_int_literal,
        parse_string_literal,
    },
    span::{Span, Spanned},
    stack,
    token::{Token, lex},
};

/// The deepest nesting of expressions and types that [`parse`] accepts.
pub const MAX_NESTING: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognised token")]
    InvalidToken { span: Span },
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        span: Span,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str, span: Span },
    #[error("invalid escape sequence in string literal")]
    BadEscape { span: Span },
    #[error("integer literal does not fit in 64 bits")]
    IntOverflow { span: Span },
    #[error("duplicate field `{label}`")]
    DuplicateField {
        label: Name,
        span: Span,
        first: Span,
    },
    #[error("empty application `()`")]
    EmptyApplication { span: Span },
    #[error("unexpected {found} after the end of the program")]
    TrailingInput { found: String, span: Span },
    #[error("nesting exceeds the maximum depth of {}", MAX_NESTING)]
    TooDeep { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            Self::InvalidToken { span }
            | Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEof { span, .. }
            | Self::BadEscape { span }
            | Self::IntOverflow { span }
            | Self::DuplicateField { span, .. }
            | Self::EmptyApplication { span }
            | Self::TrailingInput { span, .. }
            | Self::TooDeep { span } => *span,
        }
    }
}

impl From<StringLiteralError> for ParseError {
    fn from(StringLiteralError { bad_escape_span }: StringLiteralError) -> Self {
        Self::BadEscape {
            span: bad_escape_span,
        }
    }
}

impl From<IntLiteralOverflowError> for ParseError {
    fn from(IntLiteralOverflowError { span }: IntLiteralOverflowError) -> Self {
        Self::IntOverflow { span }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Parses `source` as a single program expression.
pub fn parse(source: &str) -> ParseResult<Spanned<Expr>> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(tokens, source.len());
    let expr = parser.expr()?;

    match parser.peek() {
        None => {
            log::debug!("parsed program spanning {}", expr.span);
            Ok(expr)
        }
        Some(token) => Err(ParseError::TrailingInput {
            found: token.item.to_string(),
            span: token.span,
        }),
    }
}

struct Parser<'src> {
    tokens: Vec<Spanned<Token<'src>>>,
    position: usize,
    depth: usize,
    eof: Span,
}

impl<'src> Parser<'src> {
    fn new(tokens: Vec<Spanned<Token<'src>>>, source_len: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            eof: Span::from(source_len..source_len),
        }
    }

    fn expr(&mut self) -> ParseResult<Spanned<Expr>> {
        self.nested(Self::expr_layer)
    }

    fn expr_layer(&mut self) -> ParseResult<Spanned<Expr>> {
        let token = self.next("an expression")?;

        match token.item {
            Token::True => Ok(token.span.with(Expr::Bool(true))),
            Token::False => Ok(token.span.with(Expr::Bool(false))),
            Token::Int(raw) => {
                let value = parse_int_literal(token.span.with(raw))?;
                Ok(token.span.with(Expr::Int(value)))
            }
            Token::Str(raw) => {
                let value = parse_string_literal(token.span.with(raw))?;
                Ok(token.span.with(Expr::Str(value.into())))
            }
            Token::Ident("empty") => Ok(token.span.with(Expr::Empty)),
            Token::Ident(name) => Ok(token.span.with(Expr::Var(name.into()))),
            Token::LeftParen => self.form(token.span),
            Token::LeftBrace => self.record(token.span),
            _ => Err(unexpected(token, "an expression")),
        }
    }

    /// Parses the remainder of a parenthesised form whose opening paren is
    /// at `open`.
    fn form(&mut self, open: Span) -> ParseResult<Spanned<Expr>> {
        let Some(head) = self.peek() else {
            return Err(self.eof("an expression or `)`"));
        };

        match head.item {
            Token::RightParen => {
                self.bump();
                Err(ParseError::EmptyApplication {
                    span: open.merge(head.span),
                })
            }
            Token::Let => {
                self.bump();
                let name = self.ident("a binding name")?;
                let value = self.expr()?;
                let body = self.expr()?;
                let close = self.close()?;

                Ok(open.merge(close).with(Expr::Let {
                    name,
                    value: Box::new(value),
                    body: Box::new(body),
                }))
            }
            Token::If => {
                self.bump();
                let cond = self.expr()?;
                let then = self.expr()?;
                let else_ = self.expr()?;
                let close = self.close()?;

                Ok(open.merge(close).with(Expr::If {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    else_: Box::new(else_),
                }))
            }
            Token::Lambda => {
                self.bump();
                self.expect(Token::LeftParen, "a parameter list")?;
                let mut params = Vec::new();
                while !self.eat(Token::RightParen) {
                    params.push(self.param()?);
                }
                let body = self.expr()?;
                let close = self.close()?;

                Ok(open.merge(close).with(Expr::Lambda {
                    params: params.into_boxed_slice(),
                    body: Box::new(body),
                }))
            }
            Token::Ident("list") => {
                self.bump();
                let (elems, close) = self.exprs_until_close()?;
                Ok(open.merge(close).with(Expr::List(elems.into_boxed_slice())))
            }
            Token::Ident("get-field") => {
                self.bump();
                let record = self.expr()?;
                let label = self.label()?;
                let close = self.close()?;

                Ok(open.merge(close).with(Expr::GetField {
                    record: Box::new(record),
                    label,
                }))
            }
            _ => {
                let callee = self.expr()?;
                let (args, close) = self.exprs_until_close()?;
                let span = open.merge(close);
                Ok(span.with(special_form(callee, args)))
            }
        }
    }

    fn record(&mut self, open: Span) -> ParseResult<Spanned<Expr>> {
        let mut fields = Vec::new();
        let mut seen = HashMap::new();

        let close = loop {
            if let Some(close) = self.eat_span(Token::RightBrace) {
                break close;
            }

            let label = self.ident("a field label or `}`")?;
            check_duplicate(&mut seen, &label)?;
            self.expect(Token::Colon, "`:`")?;
            let value = self.expr()?;
            fields.push(Field { label, value });
        };

        Ok(open
            .merge(close)
            .with(Expr::Record(fields.into_boxed_slice())))
    }

    fn param(&mut self) -> ParseResult<Spanned<Param>> {
        if let Some(open) = self.eat_span(Token::LeftParen) {
            let name = self.ident("a parameter name")?;
            self.expect(Token::Colon, "`:`")?;
            let ty = self.ty()?;
            let close = self.close()?;

            Ok(open.merge(close).with(Param { name, ty: Some(ty) }))
        } else {
            let name = self.ident("a parameter")?;
            Ok(name.span.with(Param { name, ty: None }))
        }
    }

    fn ty(&mut self) -> ParseResult<Spanned<TyAst>> {
        self.nested(Self::ty_layer)
    }

    fn ty_layer(&mut self) -> ParseResult<Spanned<TyAst>> {
        let token = self.next("a type")?;

        match token.item {
            Token::Ident("int") => Ok(token.span.with(TyAst::Int)),
            Token::Ident("bool") => Ok(token.span.with(TyAst::Bool)),
            Token::Ident("str") => Ok(token.span.with(TyAst::Str)),
            Token::Ident("void") => Ok(token.span.with(TyAst::Void)),
            Token::LeftParen => {
                let head = self.next("`Listof`, `Refof` or `->`")?;
                let ty = match head.item {
                    Token::Ident("Listof") => TyAst::List(Box::new(self.ty()?)),
                    Token::Ident("Refof") => TyAst::Ref(Box::new(self.ty()?)),
                    Token::Arrow => {
                        let mut tys = vec![self.ty()?];
                        while !self.at(Token::RightParen) {
                            tys.push(self.ty()?);
                        }

                        // the final type is the codomain
                        let codomain = tys.pop().map(Box::new);
                        match codomain {
                            Some(codomain) => TyAst::Arrow {
                                domain: tys.into_boxed_slice(),
                                codomain,
                            },
                            None => return Err(self.eof("a type")),
                        }
                    }
                    _ => return Err(unexpected(head, "`Listof`, `Refof` or `->`")),
                };
                let close = self.close()?;
                Ok(token.span.merge(close).with(ty))
            }
            Token::LeftBrace => {
                let mut fields = Vec::new();
                let mut seen = HashMap::new();
                let mut open = false;

                let close = loop {
                    if let Some(close) = self.eat_span(Token::RightBrace) {
                        break close;
                    }

                    if self.eat(Token::Ellipsis) {
                        open = true;
                        break self.expect(Token::RightBrace, "`}`")?;
                    }

                    let label = self.ident("a field label, `...` or `}`")?;
                    check_duplicate(&mut seen, &label)?;
                    self.expect(Token::Colon, "`:`")?;
                    let value = self.ty()?;
                    fields.push(Field { label, value });
                };

                Ok(token.span.merge(close).with(TyAst::Record {
                    fields: fields.into_boxed_slice(),
                    open,
                }))
            }
            _ => Err(unexpected(token, "a type")),
        }
    }

    /// Parses expressions up to and including a closing paren, returning them
    /// together with the span of the paren.
    fn exprs_until_close(
        &mut self,
    ) -> ParseResult<(Vec<Spanned<Expr>>, Span)> {
        let mut exprs = Vec::new();

        loop {
            if let Some(close) = self.eat_span(Token::RightParen) {
                return Ok((exprs, close));
            }

            if self.peek().is_none() {
                return Err(self.eof("an expression or `)`"));
            }

            exprs.push(self.expr()?);
        }
    }

    fn ident(&mut self, expected: &'static str) -> ParseResult<Spanned<Name>> {
        let token = self.next(expected)?;

        match token.item {
            Token::Ident(name) => Ok(token.span.with(name.into())),
            _ => Err(unexpected(token, expected)),
        }
    }

    /// Parses a string literal used as a field label.
    fn label(&mut self) -> ParseResult<Spanned<Name>> {
        let token = self.next("a field label string")?;

        match token.item {
            Token::Str(raw) => {
                let label = parse_string_literal(token.span.with(raw))?;
                Ok(token.span.with(label.into()))
            }
            _ => Err(unexpected(token, "a field label string")),
        }
    }

    fn close(&mut self) -> ParseResult<Span> {
        self.expect(Token::RightParen, "`)`")
    }

    // TOKEN CURSOR METHODS

    /// Runs `parse` one level deeper, failing at the next token if that
    /// would exceed [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            let span = self.peek().map_or(self.eof, |token| token.span);
            return Err(ParseError::TooDeep { span });
        }

        self.depth += 1;
        let result = stack::guarded(|| parse(self));
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<Spanned<Token<'src>>> {
        self.tokens.get(self.position).copied()
    }

    fn bump(&mut self) {
        self.position += 1;
    }

    fn at(&self, token: Token<'_>) -> bool {
        self.peek().is_some_and(|next| next.item == token)
    }

    fn eat(&mut self, token: Token<'_>) -> bool {
        self.eat_span(token).is_some()
    }

    fn eat_span(&mut self, token: Token<'_>) -> Option<Span> {
        let next = self.peek().filter(|next| next.item == token)?;
        self.bump();
        Some(next.span)
    }

    fn next(
        &mut self,
        expected: &'static str,
    ) -> ParseResult<Spanned<Token<'src>>> {
        let token = self.peek().ok_or_else(|| self.eof(expected))?;
        self.bump();
        Ok(token)
    }

    fn expect(
        &mut self,
        token: Token<'_>,
        expected: &'static str,
    ) -> ParseResult<Span> {
        let next = self.next(expected)?;

        if next.item == token {
            Ok(next.span)
        } else {
            Err(unexpected(next, expected))
        }
    }

    fn eof(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedEof {
            expected,
            span: self.eof,
        }
    }
}

fn unexpected(token: Spanned<Token<'_>>, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        found: token.item.to_string(),
        expected,
        span: token.span,
    }
}

fn check_duplicate(
    seen: &mut HashMap<Name, Span>,
    label: &Spanned<Name>,
) -> ParseResult<()> {
    match seen.insert(label.item.clone(), label.span) {
        None => Ok(()),
        Some(first) => Err(ParseError::DuplicateField {
            label: label.item.clone(),
            span: label.span,
            first,
        }),
    }
}

/// Builds the node for an application, recognising the reference and list
/// forms when they appear in head position with their exact arity.
fn special_form(callee: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Expr {
    let head = match &callee.item {
        Expr::Var(name) => Some(name.clone()),
        _ => None,
    };

    let args = match (head.as_deref(), <[_; 1]>::try_from(args)) {
        (Some("ref"), Ok([value])) => return Expr::MakeRef(Box::new(value)),
        (Some("get-ref"), Ok([cell])) => return Expr::GetRef(Box::new(cell)),
        (_, Ok(args)) => Vec::from(args),
        (_, Err(args)) => args,
    };

    let args = match (head.as_deref(), <[_; 2]>::try_from(args)) {
        (Some("cons"), Ok([car, cdr])) => {
            return Expr::Cons {
                head: Box::new(car),
                tail: Box::new(cdr),
            };
        }
        (Some("set-ref"), Ok([cell, value])) => {
            return Expr::SetRef {
                cell: Box::new(cell),
                value: Box::new(value),
            };
        }
        (_, Ok(args)) => Vec::from(args),
        (_, Err(args)) => args,
    };

    Expr::App {
        callee: Box::new(callee),
        args: args.into_boxed_slice(),
    }
}
